//! LanceDB connection helpers.
use lancedb::{connect, Connection};
use std::path::Path;

use docqa_core::{Error, Result};

pub async fn open_db(dir: &Path) -> Result<Connection> {
    connect(dir.to_string_lossy().as_ref())
        .execute()
        .await
        .map_err(|e| Error::Storage(format!("open {}: {e}", dir.display())))
}
