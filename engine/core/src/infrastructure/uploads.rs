// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Local filesystem store for transition attachments.
//!
//! Files are written under a configured directory with a random v4 UUID name
//! plus the sanitised extension of the original name; the original name is
//! never used as a path component.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::domain::config::UploadConfig;

const MAX_EXTENSION_LEN: usize = 10;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload is empty")]
    Empty,

    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoredUpload {
    pub file_name: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct LocalUploadStore {
    directory: PathBuf,
    public_base_url: String,
    max_bytes: u64,
}

impl LocalUploadStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            directory: PathBuf::from(&config.directory),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            max_bytes: config.max_bytes,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Route prefix to serve stored files under, when the public base URL is
    /// a local absolute path rather than an external host.
    pub fn public_path(&self) -> Option<&str> {
        let base = self.public_base_url.as_str();
        (base.starts_with('/') && base.len() > 1).then_some(base)
    }

    pub async fn store(&self, original_name: Option<&str>, bytes: Bytes) -> Result<StoredUpload, UploadError> {
        let size = bytes.len() as u64;
        if size == 0 {
            return Err(UploadError::Empty);
        }
        if size > self.max_bytes {
            return Err(UploadError::TooLarge { size, limit: self.max_bytes });
        }

        let file_name = match original_name.and_then(sanitized_extension) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };

        tokio::fs::create_dir_all(&self.directory).await?;
        tokio::fs::write(self.directory.join(&file_name), &bytes).await?;
        info!(file_name = %file_name, size, "Stored upload");

        Ok(StoredUpload {
            url: format!("{}/{}", self.public_base_url, file_name),
            file_name,
        })
    }
}

/// Lower-cased alphanumeric extension of `name`, if it has a usable one.
fn sanitized_extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    let cleaned: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_EXTENSION_LEN)
        .collect::<String>()
        .to_ascii_lowercase();
    (!cleaned.is_empty()).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path, max_bytes: u64) -> LocalUploadStore {
        LocalUploadStore::new(&UploadConfig {
            directory: dir.to_string_lossy().into_owned(),
            public_base_url: "https://files.example.org/uploads/".to_string(),
            max_bytes,
        })
    }

    #[test]
    fn extension_is_sanitised() {
        assert_eq!(sanitized_extension("receipt.PDF").as_deref(), Some("pdf"));
        assert_eq!(sanitized_extension("../../etc/passwd"), None);
        assert_eq!(sanitized_extension("scan.j$p/g"), None);
        assert_eq!(sanitized_extension("photo.jp$g").as_deref(), Some("jpg"));
        assert_eq!(sanitized_extension("noext"), None);
    }

    #[tokio::test]
    async fn stores_under_unique_name_with_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = store(dir.path(), 1024);

        let first = uploads.store(Some("license.png"), Bytes::from_static(b"png-bytes")).await.unwrap();
        let second = uploads.store(Some("license.png"), Bytes::from_static(b"png-bytes")).await.unwrap();

        assert_ne!(first.file_name, second.file_name);
        assert!(first.file_name.ends_with(".png"));
        assert_eq!(first.url, format!("https://files.example.org/uploads/{}", first.file_name));
        let written = tokio::fs::read(dir.path().join(&first.file_name)).await.unwrap();
        assert_eq!(written, b"png-bytes");
    }

    #[test]
    fn public_path_only_for_local_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store(dir.path(), 1).public_path(), None);

        let local = LocalUploadStore::new(&UploadConfig {
            directory: dir.path().to_string_lossy().into_owned(),
            public_base_url: "/uploads/".to_string(),
            max_bytes: 1,
        });
        assert_eq!(local.public_path(), Some("/uploads"));
    }

    #[tokio::test]
    async fn rejects_empty_and_oversized_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = store(dir.path(), 4);

        assert!(matches!(uploads.store(None, Bytes::new()).await, Err(UploadError::Empty)));
        assert!(matches!(
            uploads.store(None, Bytes::from_static(b"12345")).await,
            Err(UploadError::TooLarge { size: 5, limit: 4 })
        ));
    }
}
