//! Multipart intake filter
//!
//! Streams a multipart body field by field, writing file parts straight to
//! the scratch directory while enforcing the endpoint's [`UploadLimits`].

use crate::error::IntakeError;
use crate::limits::{LimitPolicy, TypePolicy, UploadLimits};
use crate::part::{RejectedPart, UploadedFiles, UploadedPart};
use crate::session::UploadSession;
use actix_multipart::{Field, Multipart};
use actix_web::error::PayloadError;
use actix_web::http::header::{HeaderMap, CONTENT_TYPE};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::collections::HashMap;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Result of running a request through the intake filter
pub enum Intake<S> {
    /// Not a multipart request: the body is handed back untouched
    Bypassed(S),
    Parsed(UploadedFiles),
}

// Payload streams are rarely Debug, so the body is left out
impl<S> std::fmt::Debug for Intake<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intake::Bypassed(_) => f.write_str("Bypassed(..)"),
            Intake::Parsed(files) => f.debug_tuple("Parsed").field(files).finish(),
        }
    }
}

/// True when the request carries `multipart/form-data`
pub fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("multipart/form-data"))
        .unwrap_or(false)
}

/// Parses multipart requests for one endpoint
#[derive(Debug, Clone)]
pub struct UploadIntake {
    limits: UploadLimits,
}

impl UploadIntake {
    pub fn new(limits: UploadLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Run the filter over a request body.
    ///
    /// On error every temp file written for the request has already been
    /// removed when this returns.
    pub async fn accept<S>(
        &self,
        session: &UploadSession,
        headers: &HeaderMap,
        payload: S,
    ) -> Result<Intake<S>, IntakeError>
    where
        S: Stream<Item = Result<Bytes, PayloadError>> + 'static,
    {
        if !is_multipart(headers) {
            return Ok(Intake::Bypassed(payload));
        }

        let result = match session.janitor().ensure_directory().await {
            Ok(()) => {
                let multipart = Multipart::new(headers, payload);
                let read = self.read_parts(session, multipart);
                match tokio::time::timeout(self.limits.max_duration, read).await {
                    Ok(result) => result,
                    Err(_) => Err(IntakeError::TimedOut(self.limits.max_duration)),
                }
            }
            Err(e) => Err(IntakeError::Io(e)),
        };

        match result {
            Ok(files) => {
                info!(
                    files = files.file_count(),
                    fields = files.field_count(),
                    rejected = files.rejected().len(),
                    "Multipart intake complete"
                );
                Ok(Intake::Parsed(files))
            }
            Err(e) => {
                warn!(code = e.code(), error = %e, "Multipart intake failed");
                session.cleanup_now().await;
                Err(e)
            }
        }
    }

    async fn read_parts(
        &self,
        session: &UploadSession,
        mut multipart: Multipart,
    ) -> Result<UploadedFiles, IntakeError> {
        let mut files = UploadedFiles::new();
        let mut per_field: HashMap<String, usize> = HashMap::new();
        let mut file_count = 0usize;
        let mut field_count = 0usize;

        while let Some(field) = multipart.next().await {
            let field = field?;
            let name = field
                .name()
                .map(str::to_string)
                .ok_or_else(|| IntakeError::Malformed("part without a field name".to_string()))?;
            let file_name = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);

            let Some(file_name) = file_name else {
                field_count += 1;
                if field_count > self.limits.max_fields {
                    return Err(IntakeError::TooManyFields {
                        limit: self.limits.max_fields,
                    });
                }
                let value = self.read_text(&name, field).await?;
                files.insert_field(name, value);
                continue;
            };

            let accepted = self
                .limits
                .file_field(&name)
                .ok_or_else(|| IntakeError::UnexpectedField {
                    field: name.clone(),
                })?;
            let seen = per_field.entry(name.clone()).or_default();
            *seen += 1;
            if *seen > accepted.max_count {
                return Err(IntakeError::UnexpectedField { field: name });
            }

            file_count += 1;
            if file_count > self.limits.max_files {
                return Err(IntakeError::TooManyFiles {
                    limit: self.limits.max_files,
                });
            }

            let content_type = field
                .content_type()
                .map(|m| m.essence_str().to_string())
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

            if !self.limits.is_type_allowed(&content_type) {
                match self.limits.on_invalid_type {
                    TypePolicy::Reject => {
                        return Err(IntakeError::InvalidType {
                            field: name,
                            content_type,
                            message: self.limits.invalid_type_message.clone(),
                        });
                    }
                    TypePolicy::Defer => {
                        debug!(field = %name, content_type = %content_type, "Skipping disallowed file type");
                        drain(field).await?;
                        files.reject(RejectedPart {
                            field_name: name,
                            file_name,
                            content_type,
                        });
                        continue;
                    }
                }
            }

            let part = self
                .write_file(session, name, file_name, content_type, field)
                .await?;
            debug!(
                field = %part.field_name,
                size = part.size,
                truncated = part.truncated,
                "Stored file part"
            );
            files.insert(part);
        }

        Ok(files)
    }

    async fn read_text(&self, name: &str, mut field: Field) -> Result<String, IntakeError> {
        let mut value = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if value.len() + chunk.len() > self.limits.max_field_size {
                return Err(IntakeError::FieldTooLong {
                    field: name.to_string(),
                    limit: self.limits.max_field_size,
                });
            }
            value.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&value).into_owned())
    }

    async fn write_file(
        &self,
        session: &UploadSession,
        field_name: String,
        file_name: String,
        content_type: String,
        mut field: Field,
    ) -> Result<UploadedPart, IntakeError> {
        let path = session.janitor().allocate_path(&file_name);
        session.track(path.clone());

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let max = self.limits.max_file_size;
        let mut size = 0u64;
        let mut truncated = false;

        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if truncated {
                // Keep draining so the next part can be read
                continue;
            }

            let next = size + chunk.len() as u64;
            if next >= max {
                match self.limits.on_limit {
                    LimitPolicy::Abort => {
                        return Err(IntakeError::FileTooLarge {
                            field: field_name,
                            limit: max,
                        });
                    }
                    LimitPolicy::Truncate => {
                        let keep = max.saturating_sub(size).saturating_sub(1) as usize;
                        file.write_all(&chunk[..keep]).await?;
                        size += keep as u64;
                        truncated = true;
                        continue;
                    }
                }
            }

            file.write_all(&chunk).await?;
            size = next;
        }

        file.flush().await?;

        Ok(UploadedPart {
            field_name,
            file_name,
            content_type,
            size,
            path,
            truncated,
        })
    }
}

async fn drain(mut field: Field) -> Result<(), IntakeError> {
    while let Some(chunk) = field.next().await {
        chunk?;
    }
    Ok(())
}
