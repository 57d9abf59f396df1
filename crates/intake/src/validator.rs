//! Endpoint-level checks on a parsed upload

use crate::part::UploadedFiles;
use common::{InvalidFile, ValidationDetails};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemReason {
    Missing,
    Empty,
    TooLarge,
    InvalidType,
}

impl ProblemReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemReason::Missing => "missing",
            ProblemReason::Empty => "empty",
            ProblemReason::TooLarge => "too-large",
            ProblemReason::InvalidType => "invalid-type",
        }
    }
}

impl std::fmt::Display for ProblemReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub field: String,
    pub reason: ProblemReason,
}

impl Problem {
    fn new(field: &str, reason: ProblemReason) -> Self {
        Self {
            field: field.to_string(),
            reason,
        }
    }
}

#[derive(Debug)]
pub enum ValidationOutcome {
    Accepted(UploadedFiles),
    /// The files are handed back so the caller can clean them up
    Rejected {
        problems: Vec<Problem>,
        files: UploadedFiles,
    },
}

/// Check required fields and per-file sanity, collecting every problem.
///
/// Never touches the disk.
pub fn validate(files: UploadedFiles, required: &[String]) -> ValidationOutcome {
    let mut problems = Vec::new();

    for field in required {
        let parts = files.get(field);
        if parts.is_empty() {
            // A deferred type rejection explains the absence better
            if !files.rejected().iter().any(|r| &r.field_name == field) {
                problems.push(Problem::new(field, ProblemReason::Missing));
            }
            continue;
        }
        for part in parts {
            if part.truncated {
                problems.push(Problem::new(field, ProblemReason::TooLarge));
            } else if part.is_empty() {
                problems.push(Problem::new(field, ProblemReason::Empty));
            }
        }
    }

    for part in files.parts() {
        if part.truncated && !required.contains(&part.field_name) {
            problems.push(Problem::new(&part.field_name, ProblemReason::TooLarge));
        }
    }

    for rejected in files.rejected() {
        problems.push(Problem::new(&rejected.field_name, ProblemReason::InvalidType));
    }

    if problems.is_empty() {
        ValidationOutcome::Accepted(files)
    } else {
        ValidationOutcome::Rejected { problems, files }
    }
}

/// Split problems into the `missingFiles` / `invalidFiles` response shape
pub fn details(problems: &[Problem]) -> ValidationDetails {
    let mut details = ValidationDetails::default();
    for problem in problems {
        match problem.reason {
            ProblemReason::Missing => details.missing_files.push(problem.field.clone()),
            reason => details.invalid_files.push(InvalidFile {
                field: problem.field.clone(),
                reason: reason.as_str().to_string(),
            }),
        }
    }
    details
}
