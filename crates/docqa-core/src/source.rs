//! Built-in document sources.
use std::fs;
use std::path::{Path, PathBuf};

use crate::traits::DocumentSource;
use crate::types::Document;

/// Reads every file with a given extension below a directory.
///
/// Files are visited in sorted path order and labelled with their file name.
/// A missing directory or an unreadable file is logged, never raised.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    extension: String,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self { root: root.into(), extension: extension.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn list_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&self.root).into_iter() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(root = %self.root.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some(self.extension.as_str()) {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        files
    }

    fn read_file_content(file_path: &Path) -> std::io::Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }
}

impl DocumentSource for DirectorySource {
    fn fetch_documents(&self) -> Vec<Document> {
        if !self.root.is_dir() {
            tracing::warn!(root = %self.root.display(), "document directory not found");
            return Vec::new();
        }
        let mut docs = Vec::new();
        for path in self.list_files() {
            match Self::read_file_content(&path) {
                Ok(content) => {
                    let label = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                    docs.push(Document { content, source_label: label });
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to read document"),
            }
        }
        tracing::info!(root = %self.root.display(), count = docs.len(), "fetched documents");
        docs
    }
}

/// Fixed in-memory corpus.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    documents: Vec<Document>,
}

impl StaticSource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

impl DocumentSource for StaticSource {
    fn fetch_documents(&self) -> Vec<Document> {
        self.documents.clone()
    }
}
