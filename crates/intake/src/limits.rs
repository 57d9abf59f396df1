//! Per-endpoint upload limits

use std::time::Duration;

pub const MB: u64 = 1024 * 1024;

/// Default maximum size of a single document
pub const DEFAULT_DOCUMENT_MAX_BYTES: u64 = 10 * MB;

/// Default maximum size of a single registration image
pub const DEFAULT_IMAGE_MAX_BYTES: u64 = 5 * MB;

/// Default wall-clock budget for reading one request body (5 minutes)
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

pub const DEFAULT_MAX_FIELDS: usize = 20;
pub const DEFAULT_MAX_FIELD_SIZE: usize = 1024 * 1024;

/// Field name used by the document endpoint
pub const DOCUMENT_FIELD: &str = "document";
/// Field names used by the registration endpoint
pub const PHOTO_FIELD: &str = "photo";
pub const SIGNATURE_FIELD: &str = "signature";

pub const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];

pub const DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "image/jpeg",
    "image/jpg",
    "image/png",
];

/// What happens when a file grows past `max_file_size`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitPolicy {
    /// Fail the whole request immediately
    Abort,
    /// Stop writing, flag the part as truncated and let validation reject it
    Truncate,
}

/// What happens to a file whose content type is not allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypePolicy {
    /// Fail the whole request immediately
    Reject,
    /// Skip the part and report it as `invalid-type` during validation
    Defer,
}

/// A file field accepted by an endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileField {
    pub name: String,
    pub max_count: usize,
}

impl FileField {
    pub fn new(name: impl Into<String>, max_count: usize) -> Self {
        Self {
            name: name.into(),
            max_count,
        }
    }
}

/// Accepted shape of one endpoint's multipart requests
#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub max_file_size: u64,
    pub max_files: usize,
    pub max_fields: usize,
    pub max_field_size: usize,
    pub allowed_types: Vec<String>,
    pub file_fields: Vec<FileField>,
    pub required_fields: Vec<String>,
    pub max_duration: Duration,
    pub on_limit: LimitPolicy,
    pub on_invalid_type: TypePolicy,
    /// Shown to the user when a part has a disallowed type
    pub invalid_type_message: String,
}

impl UploadLimits {
    /// One document (PDF, Word or image) in the `document` field
    pub fn document() -> Self {
        Self {
            max_file_size: DEFAULT_DOCUMENT_MAX_BYTES,
            max_files: 1,
            max_fields: DEFAULT_MAX_FIELDS,
            max_field_size: DEFAULT_MAX_FIELD_SIZE,
            allowed_types: to_strings(DOCUMENT_TYPES),
            file_fields: vec![FileField::new(DOCUMENT_FIELD, 1)],
            required_fields: vec![DOCUMENT_FIELD.to_string()],
            max_duration: DEFAULT_UPLOAD_TIMEOUT,
            on_limit: LimitPolicy::Abort,
            on_invalid_type: TypePolicy::Defer,
            invalid_type_message: "Only PDF, Word documents and JPEG/PNG images are allowed"
                .to_string(),
        }
    }

    /// Exactly one `photo` and one `signature` image
    pub fn registration() -> Self {
        Self {
            max_file_size: DEFAULT_IMAGE_MAX_BYTES,
            max_files: 2,
            max_fields: DEFAULT_MAX_FIELDS,
            max_field_size: DEFAULT_MAX_FIELD_SIZE,
            allowed_types: to_strings(IMAGE_TYPES),
            file_fields: vec![
                FileField::new(PHOTO_FIELD, 1),
                FileField::new(SIGNATURE_FIELD, 1),
            ],
            required_fields: vec![PHOTO_FIELD.to_string(), SIGNATURE_FIELD.to_string()],
            max_duration: DEFAULT_UPLOAD_TIMEOUT,
            on_limit: LimitPolicy::Abort,
            on_invalid_type: TypePolicy::Reject,
            invalid_type_message: "Only JPEG and PNG images are allowed".to_string(),
        }
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = duration;
        self
    }

    pub fn with_limit_policy(mut self, policy: LimitPolicy) -> Self {
        self.on_limit = policy;
        self
    }

    pub fn file_field(&self, name: &str) -> Option<&FileField> {
        self.file_fields.iter().find(|f| f.name == name)
    }

    /// Compare on the MIME essence, ignoring parameters and case
    pub fn is_type_allowed(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.allowed_types.iter().any(|t| *t == essence)
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Render a byte count the way limits are quoted to users ("10MB", "512KB")
pub fn format_size(bytes: u64) -> String {
    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= MB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else if bytes >= 1024 && bytes % 1024 == 0 {
        format!("{}KB", bytes / 1024)
    } else {
        format!("{} bytes", bytes)
    }
}
