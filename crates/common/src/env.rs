//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected files and directories exist at startup.

use std::path::Path;

use tracing::warn;

/// Create the data directory if missing.
pub async fn ensure_data_dir(data_dir: &str) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(data_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {data_dir}: {e}"))?;
    Ok(())
}

/// Warn when an optional secret file is absent; the service still starts.
pub async fn check_secret_file(path: &Path) {
    if tokio::fs::metadata(path).await.is_err() {
        warn!(path = %path.display(), "secret file not found; dependent features will fail until it is provided");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_data_dir_creates_nested_dirs() -> anyhow::Result<()> {
        let base = std::env::temp_dir().join(format!("common_env_{}", std::process::id()));
        let nested = base.join("a/b");
        let nested_str = nested.to_string_lossy().to_string();
        ensure_data_dir(&nested_str).await?;
        assert!(tokio::fs::metadata(&nested).await?.is_dir());
        // second call is a no-op
        ensure_data_dir(&nested_str).await?;
        let _ = tokio::fs::remove_dir_all(&base).await;
        Ok(())
    }
}
