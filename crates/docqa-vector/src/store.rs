//! On-disk lifecycle of the index: persist, load, status.
//!
//! Layout under the configured location:
//!
//! ```text
//! CURRENT              name of the active version
//! versions/<version>/  LanceDB database (`chunks` table) + manifest.json
//! .staging-<version>/  version being written
//! index.lock           writer lock
//! ```
//!
//! A version becomes visible only when `CURRENT` is replaced, which is a
//! single rename. Readers therefore see either the old or the new index.
use chrono::Utc;
use std::path::{Path, PathBuf};

use docqa_core::{Error, Result};

use crate::index_build::BuiltIndex;
use crate::lock::acquire_persist_lock;
use crate::manifest::{read_manifest, write_manifest, IndexManifest};
use crate::schema::{vector_width, CHUNKS_TABLE};
use crate::search::VectorIndex;
use crate::table::open_db;
use crate::writer::write_table;

const CURRENT_FILE: &str = "CURRENT";
const VERSIONS_DIR: &str = "versions";
const STAGING_PREFIX: &str = ".staging-";

#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.root.join(VERSIONS_DIR).join(version)
    }

    /// True when an active version is recorded. Says nothing about its health.
    pub fn exists(&self) -> bool {
        self.root.join(CURRENT_FILE).is_file()
    }

    /// Writes `index` as a new version and makes it the active one.
    ///
    /// Concurrent writers are serialised through `index.lock`. Returns the
    /// name of the new version.
    pub async fn persist(&self, index: &BuiltIndex) -> Result<String> {
        if index.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        index.check_consistent()?;
        let _lock = acquire_persist_lock(&self.root).await?;
        self.clear_staging().await?;

        let version = self.next_version_name(&index.manifest);
        let staging = self.root.join(format!("{STAGING_PREFIX}{version}"));
        tokio::fs::create_dir_all(&staging).await?;
        if let Err(e) = self.write_version(&staging, index).await {
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        tokio::fs::create_dir_all(self.root.join(VERSIONS_DIR)).await?;
        tokio::fs::rename(&staging, self.version_dir(&version)).await?;
        let previous = self.active_version().await.ok().flatten();
        self.flip_active_version(&version).await?;
        tracing::info!(root = %self.root.display(), %version, chunks = index.len(), "index persisted");

        self.prune(&version, previous.as_deref()).await;
        Ok(version)
    }

    /// Opens the active version and checks it against the embedder that will query it.
    pub async fn load(&self, embedder_id: &str, dim: usize) -> Result<VectorIndex> {
        let version = self.active_version().await?.ok_or_else(|| Error::IndexMissing(self.root.clone()))?;
        let dir = self.version_dir(&version);
        if !dir.is_dir() {
            return Err(Error::IndexCorrupt(format!("active version {version} is missing")));
        }

        let manifest = read_manifest(&dir).await?;
        manifest.check_compatible(embedder_id, dim)?;

        let corrupt = |what: &str, e: &dyn std::fmt::Display| Error::IndexCorrupt(format!("{what} {}: {e}", dir.display()));
        let db = open_db(&dir).await.map_err(|e| corrupt("open", &e))?;
        let table = db.open_table(CHUNKS_TABLE).execute().await.map_err(|e| corrupt("open table in", &e))?;
        let schema = table.schema().await.map_err(|e| corrupt("read schema of", &e))?;
        match vector_width(&schema) {
            Some(width) if width == manifest.dim => {}
            other => {
                return Err(Error::IndexCorrupt(format!(
                    "vector column width {other:?} does not match manifest dimension {}",
                    manifest.dim
                )))
            }
        }
        let rows = table.count_rows(None).await.map_err(|e| corrupt("count rows in", &e))?;
        if rows == 0 || rows != manifest.chunk_count {
            return Err(Error::IndexCorrupt(format!(
                "table has {rows} rows, manifest records {}",
                manifest.chunk_count
            )));
        }

        tracing::debug!(%version, rows, "index loaded");
        Ok(VectorIndex { table, manifest, version })
    }

    /// Active version and its manifest, without opening the table.
    pub async fn status(&self) -> Result<Option<(String, IndexManifest)>> {
        match self.active_version().await? {
            None => Ok(None),
            Some(version) => {
                let manifest = read_manifest(&self.version_dir(&version)).await?;
                Ok(Some((version, manifest)))
            }
        }
    }

    async fn write_version(&self, dir: &Path, index: &BuiltIndex) -> Result<()> {
        write_table(dir, index).await?;
        write_manifest(dir, &index.manifest).await
    }

    async fn active_version(&self) -> Result<Option<String>> {
        let path = self.root.join(CURRENT_FILE);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::IndexCorrupt(format!("read {}: {e}", path.display()))),
        };
        let version = raw.trim();
        if version.is_empty() || version.contains(['/', '\\']) || version.starts_with('.') {
            return Err(Error::IndexCorrupt(format!("malformed pointer in {}", path.display())));
        }
        Ok(Some(version.to_string()))
    }

    /// Points `CURRENT` at `version` with a write-then-rename.
    async fn flip_active_version(&self, version: &str) -> Result<()> {
        let path = self.root.join(CURRENT_FILE);
        let tmp = self.root.join(format!("{CURRENT_FILE}.tmp"));
        tokio::fs::write(&tmp, format!("{version}\n")).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    fn next_version_name(&self, manifest: &IndexManifest) -> String {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let hash = &manifest.corpus_hash[..manifest.corpus_hash.len().min(8)];
        let base = format!("{stamp}-{hash}");
        let mut name = base.clone();
        let mut n = 1;
        while self.version_dir(&name).exists() {
            name = format!("{base}-{n}");
            n += 1;
        }
        name
    }

    /// Staging dirs left behind by an interrupted writer. Only called under the lock.
    async fn clear_staging(&self) -> Result<()> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX) {
                tracing::warn!(path = %entry.path().display(), "removing abandoned staging dir");
                tokio::fs::remove_dir_all(entry.path()).await?;
            }
        }
        Ok(())
    }

    /// Keeps the active and the previously active version; readers that
    /// loaded the previous one can finish their queries.
    async fn prune(&self, active: &str, previous: Option<&str>) {
        let Ok(mut entries) = tokio::fs::read_dir(self.root.join(VERSIONS_DIR)).await else { return };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == active || Some(name.as_str()) == previous {
                continue;
            }
            if let Err(e) = tokio::fs::remove_dir_all(entry.path()).await {
                tracing::warn!(path = %entry.path().display(), error = %e, "failed to prune old index version");
            }
        }
    }
}
