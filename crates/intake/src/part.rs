use common::UploadedFileInfo;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One file received in a multipart request, backed by a temp file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub field_name: String,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
    pub path: PathBuf,
    /// Set when the parser stopped writing because the size limit was hit
    pub truncated: bool,
}

impl UploadedPart {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn info(&self, stored_name: impl Into<String>) -> UploadedFileInfo {
        UploadedFileInfo {
            field_name: self.field_name.clone(),
            original_name: self.file_name.clone(),
            mimetype: self.content_type.clone(),
            size: self.size,
            stored_name: stored_name.into(),
        }
    }
}

/// A file part skipped because its content type is not allowed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedPart {
    pub field_name: String,
    pub file_name: String,
    pub content_type: String,
}

/// Everything the intake filter extracted from one request
#[derive(Debug, Clone, Default)]
pub struct UploadedFiles {
    files: BTreeMap<String, Vec<UploadedPart>>,
    fields: BTreeMap<String, String>,
    rejected: Vec<RejectedPart>,
}

impl UploadedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, part: UploadedPart) {
        self.files
            .entry(part.field_name.clone())
            .or_default()
            .push(part);
    }

    pub fn insert_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn reject(&mut self, part: RejectedPart) {
        self.rejected.push(part);
    }

    /// All parts received under `field`, in arrival order
    pub fn get(&self, field: &str) -> &[UploadedPart] {
        self.files.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn first(&self, field: &str) -> Option<&UploadedPart> {
        self.get(field).first()
    }

    pub fn contains(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    pub fn parts(&self) -> impl Iterator<Item = &UploadedPart> {
        self.files.values().flatten()
    }

    /// Number of parts for a field
    pub fn count(&self, field: &str) -> usize {
        self.get(field).len()
    }

    pub fn file_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn rejected(&self) -> &[RejectedPart] {
        &self.rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(field: &str, name: &str, size: u64) -> UploadedPart {
        UploadedPart {
            field_name: field.to_string(),
            file_name: name.to_string(),
            content_type: "image/png".to_string(),
            size,
            path: PathBuf::from(format!("/tmp/{}", name)),
            truncated: false,
        }
    }

    #[test]
    fn test_parts_grouped_by_field() {
        let mut files = UploadedFiles::new();
        files.insert(part("photo", "a.png", 10));
        files.insert(part("photo", "b.png", 20));
        files.insert(part("signature", "c.png", 0));

        assert_eq!(files.count("photo"), 2);
        assert_eq!(files.first("photo").map(|p| p.file_name.as_str()), Some("a.png"));
        assert!(files.first("signature").is_some_and(UploadedPart::is_empty));
        assert!(files.get("document").is_empty());
        assert_eq!(files.file_count(), 3);
        assert_eq!(files.parts().count(), 3);
    }

    #[test]
    fn test_info_from_part() {
        let info = part("photo", "a.png", 10).info("stored-a.png");
        assert_eq!(info.field_name, "photo");
        assert_eq!(info.original_name, "a.png");
        assert_eq!(info.mimetype, "image/png");
        assert_eq!(info.size, 10);
    }
}
