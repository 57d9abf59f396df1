//! Error responses for the upload endpoints

use crate::config::RunMode;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use common::ErrorResponse;
use intake::validator::details;
use intake::{ErrorKind, IntakeError, Problem, ProblemReason, UploadLimits};
use thiserror::Error;
use tracing::{error, warn};

/// Everything that can stop an upload request
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error("{message}")]
    Validation {
        message: String,
        problems: Vec<Problem>,
    },

    #[error("Upload could not be processed")]
    Internal(#[source] anyhow::Error),
}

impl UploadError {
    /// Build the rejection for a failed validation, worded for the endpoint
    pub fn rejected(problems: Vec<Problem>, limits: &UploadLimits) -> Self {
        let missing: Vec<&str> = problems
            .iter()
            .filter(|p| p.reason == ProblemReason::Missing)
            .map(|p| p.field.as_str())
            .collect();

        let message = if problems.iter().any(|p| p.reason == ProblemReason::InvalidType) {
            limits.invalid_type_message.clone()
        } else if !missing.is_empty() {
            format!("Missing required files: {}", missing.join(", "))
        } else if problems.iter().any(|p| p.reason == ProblemReason::TooLarge) {
            "Uploaded file exceeds the size limit".to_string()
        } else {
            "Uploaded files are empty".to_string()
        };

        UploadError::Validation { message, problems }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::Intake(e) => e.kind(),
            UploadError::Validation { .. } => ErrorKind::ValidationFailed,
            UploadError::Internal(_) => ErrorKind::InternalFault,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            UploadError::Intake(e) => e.code(),
            UploadError::Validation { .. } => "VALIDATION_FAILED",
            UploadError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::LimitExceeded => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::MalformedRequest | ErrorKind::InvalidType | ErrorKind::ValidationFailed => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::InternalFault => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// An [`UploadError`] rendered as the JSON error body
#[derive(Debug)]
pub struct ApiError {
    error: UploadError,
    mode: RunMode,
}

impl ApiError {
    pub fn new(error: UploadError, mode: RunMode) -> Self {
        match error.kind() {
            ErrorKind::InternalFault => error!(code = error.code(), error = ?error, "Upload failed"),
            _ => warn!(code = error.code(), error = %error, "Upload rejected"),
        }
        Self { error, mode }
    }

    pub fn body(&self) -> ErrorResponse {
        let mut body = ErrorResponse::new(self.error.to_string(), self.error.code());
        if let UploadError::Validation { problems, .. } = &self.error {
            body.details = Some(details(problems));
        }
        if !self.mode.is_production() {
            body.debug = Some(self.debug_chain());
        }
        body
    }

    fn debug_chain(&self) -> String {
        match &self.error {
            UploadError::Internal(e) => format!("{:#}", e),
            other => format!("{:?}", other),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        status_for(self.error.kind())
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}
