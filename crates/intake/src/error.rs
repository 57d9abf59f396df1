use crate::limits::format_size;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Broad classes used to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LimitExceeded,
    MalformedRequest,
    InvalidType,
    ValidationFailed,
    Timeout,
    InternalFault,
}

/// Failures raised while reading a multipart body
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("File too large. Maximum size is {}", limit_text(.limit))]
    FileTooLarge { field: String, limit: u64 },

    #[error("Too many files. Maximum is {limit}")]
    TooManyFiles { limit: usize },

    #[error("Too many fields. Maximum is {limit}")]
    TooManyFields { limit: usize },

    #[error("Field value too long: {field}. Maximum is {}", field_limit_text(.limit))]
    FieldTooLong { field: String, limit: usize },

    #[error("Unexpected file field: {field}")]
    UnexpectedField { field: String },

    #[error("Malformed multipart request: {0}")]
    Malformed(String),

    #[error("{message}")]
    InvalidType {
        field: String,
        content_type: String,
        message: String,
    },

    #[error("Upload did not complete within {} seconds", .0.as_secs())]
    TimedOut(Duration),

    #[error("Failed to write uploaded file: {0}")]
    Io(#[from] std::io::Error),
}

fn limit_text(limit: &u64) -> String {
    format_size(*limit)
}

fn field_limit_text(limit: &usize) -> String {
    format_size(*limit as u64)
}

impl IntakeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IntakeError::FileTooLarge { .. }
            | IntakeError::TooManyFiles { .. }
            | IntakeError::TooManyFields { .. }
            | IntakeError::FieldTooLong { .. } => ErrorKind::LimitExceeded,
            IntakeError::UnexpectedField { .. } | IntakeError::Malformed(_) => {
                ErrorKind::MalformedRequest
            }
            IntakeError::InvalidType { .. } => ErrorKind::InvalidType,
            IntakeError::TimedOut(_) => ErrorKind::Timeout,
            IntakeError::Io(_) => ErrorKind::InternalFault,
        }
    }

    /// Stable code reported in the `error` field of responses
    pub fn code(&self) -> &'static str {
        match self {
            IntakeError::FileTooLarge { .. } => "LIMIT_FILE_SIZE",
            IntakeError::TooManyFiles { .. } => "LIMIT_FILE_COUNT",
            IntakeError::TooManyFields { .. } => "LIMIT_FIELD_COUNT",
            IntakeError::FieldTooLong { .. } => "LIMIT_FIELD_VALUE",
            IntakeError::UnexpectedField { .. } => "LIMIT_UNEXPECTED_FILE",
            IntakeError::Malformed(_) => "MALFORMED_REQUEST",
            IntakeError::InvalidType { .. } => "INVALID_FILE_TYPE",
            IntakeError::TimedOut(_) => "UPLOAD_TIMEOUT",
            IntakeError::Io(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<actix_multipart::MultipartError> for IntakeError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        // Limits are enforced by the intake loop itself, so anything the
        // parser reports is a syntax fault or a broken payload.
        IntakeError::Malformed(err.to_string())
    }
}

/// Failures raised while removing temp files
#[derive(Debug, Error)]
pub enum JanitorError {
    #[error("Refusing to remove {path:?}: outside of scratch directory")]
    OutsideScratch { path: PathBuf },

    #[error("Failed to remove {path:?}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
