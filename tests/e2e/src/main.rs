mod filesystem_validator;
mod test_utils;

use anyhow::{Context, Result};
use common::{DocumentUploadResponse, RegistrationUploadResponse};
use reqwest::multipart::Form;
use std::path::PathBuf;
use test_utils::*;

struct Env {
    server_url: String,
    temp_dir: PathBuf,
    data_dir: PathBuf,
    client: reqwest::Client,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("e2e_tests=debug,info")
        .init();

    // Must point at the same directories the server was started with
    let env = Env {
        server_url: std::env::var("SERVER_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string()),
        temp_dir: std::env::var("UPLOAD_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("edu-uploads")),
        data_dir: std::env::var("UPLOAD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads")),
        client: reqwest::Client::new(),
    };

    println!("Server URL: {}", env.server_url);
    println!("Scratch dir: {:?}", env.temp_dir);
    println!("Data dir: {:?}", env.data_dir);

    wait_for_server(&env.server_url).await?;

    println!("\n📤 Document upload (5MB PDF)...");
    document_accepted(&env).await?;

    println!("\n📤 Oversized document (15MB)...");
    document_too_large(&env).await?;

    println!("\n📤 Document with disallowed type...");
    document_invalid_type(&env).await?;

    println!("\n📤 Registration upload...");
    registration_accepted(&env).await?;

    println!("\n📤 Registration missing signature...");
    registration_missing_signature(&env).await?;

    println!("\n📤 Text file posted as photo...");
    registration_text_photo(&env).await?;

    println!("\n✅ All E2E tests passed!");
    Ok(())
}

fn url(env: &Env, path: &str) -> String {
    format!("{}{}", env.server_url, path)
}

async fn document_accepted(env: &Env) -> Result<()> {
    let form = Form::new().part(
        "document",
        file_part("course-outline.pdf", "application/pdf", 5 * MB)?,
    );
    let (status, body) = post_form(&env.client, &url(env, "/api/uploads/document"), form).await?;
    expect_status(status, 200, &body)?;

    let response: DocumentUploadResponse =
        serde_json::from_value(body).context("Unexpected document response shape")?;
    if response.file.size != (5 * MB) as u64 || response.file.mimetype != "application/pdf" {
        anyhow::bail!("Unexpected file info: {:?}", response.file);
    }
    println!("  ✓ Accepted as {}", response.file.stored_name);

    filesystem_validator::validate_stored_file(
        &env.data_dir,
        "documents",
        &response.file.stored_name,
        (5 * MB) as u64,
    )?;
    filesystem_validator::validate_scratch_empty(&env.temp_dir).await
}

async fn document_too_large(env: &Env) -> Result<()> {
    let form = Form::new().part(
        "document",
        file_part("recording.pdf", "application/pdf", 15 * MB)?,
    );
    // The server may close the connection before the whole body is sent
    match post_form(&env.client, &url(env, "/api/uploads/document"), form).await {
        Ok((status, body)) => {
            expect_status(status, 413, &body)?;
            expect_error_code(&body, "LIMIT_FILE_SIZE")?;
            let message = body.get("message").and_then(|v| v.as_str()).unwrap_or_default();
            if !message.contains("10MB") {
                anyhow::bail!("Limit message should mention 10MB: {}", message);
            }
            println!("  ✓ Rejected with 413: {}", message);
        }
        Err(e) if closed_by_server(&e) => {
            println!("  ✓ Connection closed by server: {:#}", e)
        }
        Err(e) => return Err(e.context("Oversized upload failed for an unexpected reason")),
    }
    filesystem_validator::validate_scratch_empty(&env.temp_dir).await
}

async fn document_invalid_type(env: &Env) -> Result<()> {
    let form = Form::new().part("document", file_part("notes.txt", "text/plain", 256)?);
    let (status, body) = post_form(&env.client, &url(env, "/api/uploads/document"), form).await?;
    expect_status(status, 400, &body)?;
    expect_error_code(&body, "VALIDATION_FAILED")?;
    let reason = body
        .pointer("/details/invalidFiles/0/reason")
        .and_then(|v| v.as_str());
    if reason != Some("invalid-type") {
        anyhow::bail!("Expected invalid-type reason: {}", body);
    }
    println!("  ✓ Rejected with invalid-type");
    filesystem_validator::validate_scratch_empty(&env.temp_dir).await
}

async fn registration_accepted(env: &Env) -> Result<()> {
    let form = Form::new()
        .text("studentName", "Grace Hopper")
        .part("photo", file_part("portrait.jpg", "image/jpeg", 200 * 1024)?)
        .part("signature", file_part("signature.png", "image/png", 20 * 1024)?);
    let (status, body) =
        post_form(&env.client, &url(env, "/api/uploads/registration"), form).await?;
    expect_status(status, 200, &body)?;

    let response: RegistrationUploadResponse =
        serde_json::from_value(body).context("Unexpected registration response shape")?;
    for (field, size) in [("photo", 200 * 1024u64), ("signature", 20 * 1024u64)] {
        let info = response
            .files
            .get(field)
            .with_context(|| format!("Response lacks {}", field))?;
        filesystem_validator::validate_stored_file(
            &env.data_dir,
            "registrations",
            &info.stored_name,
            size,
        )?;
    }
    if response.fields.get("studentName").map(String::as_str) != Some("Grace Hopper") {
        anyhow::bail!("Text fields not echoed: {:?}", response.fields);
    }
    filesystem_validator::validate_scratch_empty(&env.temp_dir).await
}

async fn registration_missing_signature(env: &Env) -> Result<()> {
    let form = Form::new().part("photo", file_part("portrait.png", "image/png", 64 * 1024)?);
    let (status, body) =
        post_form(&env.client, &url(env, "/api/uploads/registration"), form).await?;
    expect_status(status, 400, &body)?;
    expect_error_code(&body, "VALIDATION_FAILED")?;
    let missing = body.pointer("/details/missingFiles").cloned();
    if missing != Some(serde_json::json!(["signature"])) {
        anyhow::bail!("Expected missingFiles [\"signature\"]: {}", body);
    }
    println!("  ✓ Rejected, signature reported missing");
    filesystem_validator::validate_scratch_empty(&env.temp_dir).await
}

async fn registration_text_photo(env: &Env) -> Result<()> {
    let form = Form::new().part("photo", file_part("photo.txt", "text/plain", 128)?);
    let (status, body) =
        post_form(&env.client, &url(env, "/api/uploads/registration"), form).await?;
    expect_status(status, 400, &body)?;
    expect_error_code(&body, "INVALID_FILE_TYPE")?;
    let message = body.get("message").and_then(|v| v.as_str()).unwrap_or_default();
    if !message.contains("JPEG and PNG") {
        anyhow::bail!("Unexpected message: {}", message);
    }
    println!("  ✓ Rejected: {}", message);
    filesystem_validator::validate_scratch_empty(&env.temp_dir).await
}
