//! Storage abstractions for service layer
//!
//! Contains reusable file-backed stores and the helpers they share for
//! bounded, atomic whole-file reads and writes.

pub mod document_store;
pub mod json_map_store;

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};

pub use document_store::{Document, DocumentStore};
pub use json_map_store::JsonMapStore;

pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt store file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }
}

/// Read a whole file; `Ok(None)` when it does not exist.
pub(crate) async fn read_optional(path: &Path, limit: Duration) -> Result<Option<Vec<u8>>, StoreError> {
    let read = async {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    };
    tokio::time::timeout(limit, read).await.map_err(|_| StoreError::Timeout(limit))?
}

/// Replace `path` with `bytes` through a sibling temp file and a rename, so an
/// interrupted write never leaves a truncated store behind.
///
/// `limit` bounds staging the temp file only. The rename itself always runs to
/// completion, so `StoreError::Timeout` means the target was not replaced. A
/// staging step that timed out keeps running on the blocking pool and may
/// still leave a stray `.tmp` file next to the target.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8], limit: Duration) -> Result<(), StoreError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple()));

    let stage = async {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| StoreError::io(parent, e))?;
        }
        let mut file = fs::File::create(&tmp).await.map_err(|e| StoreError::io(&tmp, e))?;
        file.write_all(bytes).await.map_err(|e| StoreError::io(&tmp, e))?;
        file.sync_all().await.map_err(|e| StoreError::io(&tmp, e))
    };

    let result = match tokio::time::timeout(limit, stage).await {
        Ok(Ok(())) => fs::rename(&tmp, path).await.map_err(|e| StoreError::io(path, e)),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(StoreError::Timeout(limit)),
    };
    if result.is_err() {
        let _ = fs::remove_file(&tmp).await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_atomic_replaces_and_leaves_no_temp_files() -> Result<(), anyhow::Error> {
        let dir = std::env::temp_dir().join(format!("atomic_{}", uuid::Uuid::new_v4()));
        let path = dir.join("doc.json");

        write_atomic(&path, b"{\"a\":1}", DEFAULT_IO_TIMEOUT).await?;
        write_atomic(&path, b"{\"b\":2}", DEFAULT_IO_TIMEOUT).await?;
        assert_eq!(fs::read(&path).await?, b"{\"b\":2}");

        let mut entries = fs::read_dir(&dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["doc.json".to_string()]);

        let _ = fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn zero_timeout_reports_timeout_and_keeps_target() -> Result<(), anyhow::Error> {
        let dir = std::env::temp_dir().join(format!("atomic_timeout_{}", uuid::Uuid::new_v4()));
        let path = dir.join("doc.json");
        write_atomic(&path, b"{\"a\":1}", DEFAULT_IO_TIMEOUT).await?;

        let res = write_atomic(&path, b"{\"b\":2}", Duration::ZERO).await;
        assert!(matches!(res, Err(StoreError::Timeout(d)) if d == Duration::ZERO));
        assert_eq!(fs::read(&path).await?, b"{\"a\":1}");

        let res = read_optional(&path, Duration::ZERO).await;
        assert!(matches!(res, Err(StoreError::Timeout(_))));

        let _ = fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn read_optional_missing_is_none() -> Result<(), anyhow::Error> {
        let path = std::env::temp_dir().join(format!("missing_{}.json", uuid::Uuid::new_v4()));
        assert!(read_optional(&path, DEFAULT_IO_TIMEOUT).await?.is_none());
        Ok(())
    }
}
