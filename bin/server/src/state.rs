//! Server application state

use crate::config::RunMode;
use intake::{TempJanitor, UploadIntake, UploadLimits};
use std::sync::Arc;
use storage::Storage;

/// Shared across workers behind `web::Data`
pub struct AppState {
    pub janitor: Arc<TempJanitor>,
    pub storage: Arc<dyn Storage>,
    pub document_intake: UploadIntake,
    pub registration_intake: UploadIntake,
    pub mode: RunMode,
}

impl AppState {
    pub fn new(
        janitor: Arc<TempJanitor>,
        storage: Arc<dyn Storage>,
        document_limits: UploadLimits,
        registration_limits: UploadLimits,
        mode: RunMode,
    ) -> Self {
        Self {
            janitor,
            storage,
            document_intake: UploadIntake::new(document_limits),
            registration_intake: UploadIntake::new(registration_limits),
            mode,
        }
    }
}
