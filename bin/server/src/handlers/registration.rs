use super::error::{ApiError, UploadError};
use super::pipeline::receive;
use crate::constants::REGISTRATIONS_CATEGORY;
use crate::state::AppState;
use actix_web::{post, web, HttpRequest, HttpResponse};
use anyhow::anyhow;
use common::RegistrationUploadResponse;
use intake::limits::{PHOTO_FIELD, SIGNATURE_FIELD};
use intake::UploadSession;
use std::collections::BTreeMap;
use tracing::info;

/// Handle the registration photo and signature upload
#[post("/api/uploads/registration")]
pub async fn upload_registration(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    info!("POST /api/uploads/registration - Request received");

    let session = UploadSession::begin(state.janitor.clone());
    let files = receive(&state, &state.registration_intake, &session, &req, payload).await?;

    let mut stored_files = BTreeMap::new();
    for field in [PHOTO_FIELD, SIGNATURE_FIELD] {
        let part = files.first(field).ok_or_else(|| {
            ApiError::new(
                UploadError::Internal(anyhow!("validated upload has no {} part", field)),
                state.mode,
            )
        })?;
        let stored = state
            .storage
            .store_upload(REGISTRATIONS_CATEGORY, part)
            .await
            .map_err(|e| ApiError::new(UploadError::Internal(e), state.mode))?;
        stored_files.insert(field.to_string(), part.info(stored.stored_name));
    }

    info!(
        files = stored_files.len(),
        fields = files.field_count(),
        "POST /api/uploads/registration - Registration files stored"
    );

    let response = HttpResponse::Ok().json(RegistrationUploadResponse {
        success: true,
        message: "Registration files uploaded successfully".to_string(),
        files: stored_files,
        fields: files.fields().clone(),
    });
    Ok(session.attach(response))
}
