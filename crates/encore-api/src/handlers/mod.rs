//! Request handlers for the upload and job status endpoints.

pub mod image_upload;
pub mod job_status;
pub mod video_upload;

use std::collections::HashMap;

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::Bytes;
use encore_core::AppError;

use crate::error::HttpAppError;

/// A body that blows the transport limit mid-read must stay a 413, not
/// degrade into a generic parse error.
fn multipart_error(context: &str, err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the upload limit".to_string())
    } else {
        AppError::InvalidInput(format!("{}: {}", context, err))
    }
}

/// The file part of an upload form, as received.
pub(crate) struct FilePart {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Parsed multipart upload: exactly one `file` part plus any number of text
/// fields (compression parameters). Unknown fields are ignored so clients
/// can send extra form data without breaking.
pub(crate) struct UploadForm {
    pub file: FilePart,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    /// Drain a multipart stream into an `UploadForm`. Missing or nameless
    /// file part, missing filename, or a malformed stream all map to 400.
    pub async fn read(mut multipart: Multipart) -> Result<Self, HttpAppError> {
        let mut file: Option<FilePart> = None;
        let mut fields = HashMap::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error("Malformed multipart body", e))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "file" {
                let filename = field
                    .file_name()
                    .map(|f| f.to_string())
                    .filter(|f| !f.is_empty())
                    .ok_or_else(|| {
                        AppError::InvalidInput("File part is missing a filename".to_string())
                    })?;
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error("Failed to read file part", e))?;
                file = Some(FilePart {
                    filename,
                    content_type,
                    data,
                });
            } else if !name.is_empty() {
                let value = field
                    .text()
                    .await
                    .map_err(|e| multipart_error("Failed to read form field", e))?;
                fields.insert(name, value);
            }
        }

        let file = file
            .ok_or_else(|| AppError::InvalidInput("Missing 'file' form field".to_string()))?;

        Ok(Self { file, fields })
    }

    /// Parse an optional numeric field; absent is `Ok(None)`, unparseable
    /// is a 400 naming the field.
    pub fn parse_field<T: std::str::FromStr>(
        &self,
        name: &str,
    ) -> Result<Option<T>, HttpAppError> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
                AppError::InvalidInput(format!("Invalid value for '{}': {}", name, raw)).into()
            }),
        }
    }
}
