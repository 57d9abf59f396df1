pub mod filesystem;

use anyhow::Result;
use async_trait::async_trait;
use intake::UploadedPart;
use serde::{Deserialize, Serialize};

pub use filesystem::FilesystemStorage;

/// Record of a file moved out of scratch space into permanent storage
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredFile {
    pub category: String,    // e.g. "documents", "registrations"
    pub stored_name: String, // unique name inside the category
    pub original_name: String,
    pub content_type: String,
    pub size: u64,
    pub stored_at_ms: u64, // milliseconds since Unix epoch
}

/// Permanent storage for accepted uploads
#[async_trait]
pub trait Storage: Send + Sync {
    /// Copy an uploaded part out of scratch space.
    /// The temp file is left in place for the janitor.
    async fn store_upload(&self, category: &str, part: &UploadedPart) -> Result<StoredFile>;

    /// Read a stored file's content
    async fn read_file(&self, category: &str, stored_name: &str) -> Result<Vec<u8>>;

    /// Load the record written alongside a stored file
    async fn load_metadata(&self, category: &str, stored_name: &str) -> Result<StoredFile>;

    /// Check if a stored file exists
    async fn file_exists(&self, category: &str, stored_name: &str) -> Result<bool>;
}
