//! Multipart upload intake: limits enforcement while streaming to disk,
//! post-upload validation and temp-file lifecycle management.

pub mod completion;
pub mod error;
pub mod intake;
pub mod janitor;
pub mod limits;
pub mod part;
pub mod session;
pub mod validator;

pub use completion::{Completion, CompletionBody, CompletionReason, CompletionSignal};
pub use error::{ErrorKind, IntakeError, JanitorError};
pub use intake::{is_multipart, Intake, UploadIntake};
pub use janitor::{CleanupReport, Removal, SweepReport, TempJanitor};
pub use limits::{FileField, LimitPolicy, TypePolicy, UploadLimits};
pub use part::{RejectedPart, UploadedFiles, UploadedPart};
pub use session::UploadSession;
pub use validator::{validate, Problem, ProblemReason, ValidationOutcome};
