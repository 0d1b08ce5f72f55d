//! Storage for uploaded files.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A file part received with a form submission.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist the file under `upload_to` and return the path to store in the row.
    async fn store(&self, upload_to: Option<&str>, file: &UploadedFile) -> std::io::Result<String>;
}

/// Writes uploads below a root directory, creating `upload_to` when missing.
#[derive(Clone, Debug)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalFileStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Final path component of a client-supplied name. Empty when nothing usable is left.
fn base_name(filename: &str) -> &str {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    match name {
        "." | ".." => "",
        other => other,
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, upload_to: Option<&str>, file: &UploadedFile) -> std::io::Result<String> {
        let name = base_name(&file.filename);
        if name.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("unusable file name '{}'", file.filename),
            ));
        }
        let (dir, stored) = match upload_to.filter(|d| !d.is_empty()) {
            Some(d) => (self.root.join(d), format!("{}/{}", d.trim_end_matches('/'), name)),
            None => (self.root.clone(), name.to_string()),
        };
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(name), &file.bytes).await?;
        tracing::debug!(path = %stored, bytes = file.bytes.len(), "stored upload");
        Ok(stored)
    }
}
