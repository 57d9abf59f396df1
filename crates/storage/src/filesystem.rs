//! Filesystem-based storage implementation

mod metadata;

use crate::{Storage, StoredFile};
use anyhow::{Context, Result};
use async_trait::async_trait;
use common::file_utils;
use intake::UploadedPart;
use metadata::{partial_path, Metadata};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use uuid::Uuid;

/// Stores accepted uploads under `<data_dir>/<category>/`
pub struct FilesystemStorage {
    data_dir: PathBuf,
}

impl FilesystemStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn get_category_dir(&self, category: &str) -> Result<PathBuf> {
        file_utils::validate_filename(category)
            .with_context(|| format!("Invalid storage category: {:?}", category))?;
        Ok(self.data_dir.join(category))
    }

    fn get_file_path(&self, category: &str, stored_name: &str) -> Result<PathBuf> {
        file_utils::validate_filename(stored_name)
            .with_context(|| format!("Invalid stored file name: {:?}", stored_name))?;
        Ok(self.get_category_dir(category)?.join(stored_name))
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[async_trait]
impl Storage for FilesystemStorage {
    async fn store_upload(&self, category: &str, part: &UploadedPart) -> Result<StoredFile> {
        let category_dir = self.get_category_dir(category)?;
        tokio::fs::create_dir_all(&category_dir)
            .await
            .context("Failed to create category directory")?;

        // Sanitized names are ASCII, so truncating cannot split a character
        let mut stored_name = format!(
            "{}-{}",
            Uuid::new_v4(),
            file_utils::sanitize_filename(&part.file_name)
        );
        stored_name.truncate(file_utils::MAX_FILENAME_LEN - ".meta.json".len());
        let file_path = category_dir.join(&stored_name);

        // Copy to a hidden sibling first so a crash never leaves a half file
        // under the final name
        let partial = partial_path(&file_path);
        tokio::fs::copy(part.path(), &partial)
            .await
            .with_context(|| format!("Failed to copy upload from {:?}", part.path()))?;
        let file = tokio::fs::File::open(&partial)
            .await
            .context("Failed to reopen stored file")?;
        file.sync_all()
            .await
            .context("Failed to sync stored file to disk")?;
        drop(file);
        tokio::fs::rename(&partial, &file_path)
            .await
            .context("Failed to move stored file into place")?;

        let record = StoredFile {
            category: category.to_string(),
            stored_name,
            original_name: part.file_name.clone(),
            content_type: part.content_type.clone(),
            size: part.size,
            stored_at_ms: now_ms(),
        };
        Metadata::save_atomic(&Metadata::path_for(&file_path), &record).await?;

        info!(
            category = %record.category,
            stored_name = %record.stored_name,
            size = record.size,
            "Upload persisted"
        );
        Ok(record)
    }

    async fn read_file(&self, category: &str, stored_name: &str) -> Result<Vec<u8>> {
        let file_path = self.get_file_path(category, stored_name)?;
        tokio::fs::read(&file_path)
            .await
            .with_context(|| format!("Failed to read file: {:?}", file_path))
    }

    async fn load_metadata(&self, category: &str, stored_name: &str) -> Result<StoredFile> {
        let file_path = self.get_file_path(category, stored_name)?;
        Metadata::load(&Metadata::path_for(&file_path)).await
    }

    async fn file_exists(&self, category: &str, stored_name: &str) -> Result<bool> {
        let file_path = self.get_file_path(category, stored_name)?;
        Ok(tokio::fs::try_exists(&file_path).await.unwrap_or(false))
    }
}
