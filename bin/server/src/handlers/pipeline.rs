//! Shared front half of the upload endpoints: parse then validate

use super::error::{ApiError, UploadError};
use crate::state::AppState;
use actix_web::{web, HttpRequest};
use intake::{validate, Intake, UploadIntake, UploadSession, UploadedFiles, ValidationOutcome};
use tracing::debug;

/// Run the request body through `pipeline` and the validator.
///
/// On rejection the request's temp files are removed before returning.
pub async fn receive(
    state: &AppState,
    pipeline: &UploadIntake,
    session: &UploadSession,
    req: &HttpRequest,
    payload: web::Payload,
) -> Result<UploadedFiles, ApiError> {
    let files = match pipeline
        .accept(session, req.headers(), payload)
        .await
        .map_err(|e| ApiError::new(e.into(), state.mode))?
    {
        Intake::Parsed(files) => files,
        Intake::Bypassed(_) => {
            debug!(path = %req.path(), "Request is not multipart, nothing to parse");
            UploadedFiles::new()
        }
    };

    match validate(files, &pipeline.limits().required_fields) {
        ValidationOutcome::Accepted(files) => Ok(files),
        ValidationOutcome::Rejected { problems, .. } => {
            session.cleanup_now().await;
            Err(ApiError::new(
                UploadError::rejected(problems, pipeline.limits()),
                state.mode,
            ))
        }
    }
}
