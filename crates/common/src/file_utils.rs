use std::path::Path;

/// Longest file name accepted on disk
pub const MAX_FILENAME_LEN: usize = 255;

/// Name used when a client-supplied name sanitizes down to nothing
pub const FALLBACK_FILENAME: &str = "upload";

/// Error type for filename validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilenameValidationError {
    Empty,
    ContainsNullByte,
    ContainsPathSeparator,
    IsSpecialDirectory,
    TooLong,
}

impl FilenameValidationError {
    pub fn message(&self) -> &'static str {
        match self {
            FilenameValidationError::Empty => "Filename cannot be empty",
            FilenameValidationError::ContainsNullByte => "Filename cannot contain null bytes",
            FilenameValidationError::ContainsPathSeparator => {
                "Filename cannot contain path separators (/ or \\)"
            }
            FilenameValidationError::IsSpecialDirectory => "Filename cannot be '.' or '..'",
            FilenameValidationError::TooLong => "Filename cannot exceed 255 bytes",
        }
    }
}

impl std::fmt::Display for FilenameValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for FilenameValidationError {}

/// Check that a name can be joined onto a storage directory without escaping it
pub fn validate_filename(filename: &str) -> Result<(), FilenameValidationError> {
    if filename.is_empty() {
        return Err(FilenameValidationError::Empty);
    }
    if filename.contains('\0') {
        return Err(FilenameValidationError::ContainsNullByte);
    }
    if filename.contains('/') || filename.contains('\\') {
        return Err(FilenameValidationError::ContainsPathSeparator);
    }
    if filename == "." || filename == ".." {
        return Err(FilenameValidationError::IsSpecialDirectory);
    }
    if filename.len() > MAX_FILENAME_LEN {
        return Err(FilenameValidationError::TooLong);
    }
    Ok(())
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Browsers sometimes send full paths (`C:\fakepath\cv.pdf`), so only the
/// last component is kept. Anything outside `[A-Za-z0-9._-]` becomes `_`,
/// leading dots are dropped so the result is never hidden or special.
pub fn sanitize_filename(filename: &str) -> String {
    let last = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    let mut result = if cleaned.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned.to_string()
    };
    // ASCII only at this point, byte truncation is safe
    result.truncate(MAX_FILENAME_LEN);
    result
}

/// Lowercased extension of a file name, if it is short and alphanumeric
pub fn file_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
