use fs2::FileExt;
use std::path::Path;
use std::time::Instant;

use docqa_core::{Error, Result};

const LOCK_FILE: &str = "index.lock";

/// Exclusive advisory lock serialising writers of one index location.
/// Released on drop.
pub(crate) struct PersistLock {
    file: std::fs::File,
}

impl Drop for PersistLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

pub(crate) async fn acquire_persist_lock(root: &Path) -> Result<PersistLock> {
    tokio::fs::create_dir_all(root).await?;
    let path = root.join(LOCK_FILE);

    tokio::task::spawn_blocking(move || -> Result<PersistLock> {
        use std::fs::OpenOptions;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| Error::Storage(format!("open index lock {}: {err}", path.display())))?;

        let start = Instant::now();
        file.lock_exclusive()
            .map_err(|err| Error::Storage(format!("acquire index lock {}: {err}", path.display())))?;
        tracing::debug!(waited_ms = start.elapsed().as_millis() as u64, "acquired index lock");

        Ok(PersistLock { file })
    })
    .await
    .map_err(|err| Error::Storage(format!("join index lock task: {err}")))?
}
