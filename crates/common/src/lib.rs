pub mod file_utils;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error body returned by every failing upload endpoint
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
    pub success: bool, // always false
    pub message: String,
    pub error: String, // short machine-readable code, e.g. LIMIT_FILE_SIZE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ValidationDetails>,
    /// Diagnostic chain, only present outside production mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: error.into(),
            details: None,
            debug: None,
        }
    }
}

/// Itemized problems of a rejected upload
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationDetails {
    pub missing_files: Vec<String>,
    pub invalid_files: Vec<InvalidFile>,
}

/// A file that was present but unacceptable
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct InvalidFile {
    pub field: String,
    pub reason: String, // "empty", "too-large" or "invalid-type"
}

/// Describes one accepted file
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFileInfo {
    pub field_name: String,
    pub original_name: String,
    pub mimetype: String,
    pub size: u64,
    pub stored_name: String, // name under permanent storage
}

/// Response of the document upload endpoint
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DocumentUploadResponse {
    pub success: bool,
    pub message: String,
    pub file: UploadedFileInfo,
}

/// Response of the registration upload endpoint
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RegistrationUploadResponse {
    pub success: bool,
    pub message: String,
    pub files: BTreeMap<String, UploadedFileInfo>, // keyed by field name
    /// Text fields submitted alongside the images
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// Response from health check endpoint
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String, // "ok" when healthy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let mut body = ErrorResponse::new("Missing required files", "VALIDATION_FAILED");
        body.details = Some(ValidationDetails {
            missing_files: vec!["signature".to_string()],
            invalid_files: vec![InvalidFile {
                field: "photo".to_string(),
                reason: "empty".to_string(),
            }],
        });

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "VALIDATION_FAILED");
        assert_eq!(json["details"]["missingFiles"][0], "signature");
        assert_eq!(json["details"]["invalidFiles"][0]["reason"], "empty");
        assert!(json.get("debug").is_none());
    }

    #[test]
    fn test_error_response_omits_empty_details() {
        let body = ErrorResponse::new("File too large", "LIMIT_FILE_SIZE");
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("details").is_none());
        assert_eq!(json["message"], "File too large");
    }

    #[test]
    fn test_file_info_is_camel_case() {
        let info = UploadedFileInfo {
            field_name: "document".to_string(),
            original_name: "notes.pdf".to_string(),
            mimetype: "application/pdf".to_string(),
            size: 42,
            stored_name: "abc-notes.pdf".to_string(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["fieldName"], "document");
        assert_eq!(json["originalName"], "notes.pdf");
        assert_eq!(json["storedName"], "abc-notes.pdf");
    }
}
