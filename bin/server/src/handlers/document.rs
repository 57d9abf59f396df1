use super::error::{ApiError, UploadError};
use super::pipeline::receive;
use crate::constants::DOCUMENTS_CATEGORY;
use crate::state::AppState;
use actix_web::{post, web, HttpRequest, HttpResponse};
use anyhow::anyhow;
use common::DocumentUploadResponse;
use intake::limits::DOCUMENT_FIELD;
use intake::UploadSession;
use tracing::info;

/// Handle a single document upload
#[post("/api/uploads/document")]
pub async fn upload_document(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    info!("POST /api/uploads/document - Request received");

    let session = UploadSession::begin(state.janitor.clone());
    let files = receive(&state, &state.document_intake, &session, &req, payload).await?;

    let part = files.first(DOCUMENT_FIELD).ok_or_else(|| {
        ApiError::new(
            UploadError::Internal(anyhow!("validated upload has no document part")),
            state.mode,
        )
    })?;
    let stored = state
        .storage
        .store_upload(DOCUMENTS_CATEGORY, part)
        .await
        .map_err(|e| ApiError::new(UploadError::Internal(e), state.mode))?;

    info!(
        original_name = %part.file_name,
        stored_name = %stored.stored_name,
        size = part.size,
        "POST /api/uploads/document - Document stored"
    );

    let response = HttpResponse::Ok().json(DocumentUploadResponse {
        success: true,
        message: "Document uploaded successfully".to_string(),
        file: part.info(stored.stored_name),
    });
    Ok(session.attach(response))
}
