use crate::StoredFile;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const METADATA_SUFFIX: &str = ".meta.json";

/// Sidecar records stored next to each persisted file
pub struct Metadata;

impl Metadata {
    /// Path of the record belonging to `file`
    pub fn path_for(file: &Path) -> PathBuf {
        let mut name = file.file_name().unwrap_or_default().to_os_string();
        name.push(METADATA_SUFFIX);
        file.with_file_name(name)
    }

    pub async fn load(metadata_file: &Path) -> Result<StoredFile> {
        let content = tokio::fs::read_to_string(metadata_file)
            .await
            .with_context(|| format!("Failed to read metadata: {:?}", metadata_file))?;
        serde_json::from_str(&content).context("Failed to parse metadata")
    }

    /// Write the record with fsync, via a temp file and rename
    pub async fn save_atomic(metadata_file: &Path, record: &StoredFile) -> Result<()> {
        let json = serde_json::to_string_pretty(record).context("Failed to serialize metadata")?;

        let partial = partial_path(metadata_file);
        let mut file = tokio::fs::File::create(&partial)
            .await
            .context("Failed to create metadata file")?;
        file.write_all(json.as_bytes())
            .await
            .context("Failed to write metadata to file")?;
        file.sync_all()
            .await
            .context("Failed to sync metadata file to disk")?;
        drop(file);

        tokio::fs::rename(&partial, metadata_file)
            .await
            .context("Failed to move metadata into place")?;
        Ok(())
    }
}

/// Hidden sibling used while a file is being written
pub fn partial_path(target: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(target.file_name().unwrap_or_default());
    name.push(".partial");
    target.with_file_name(name)
}
