use std::collections::HashMap;

use axum::extract::Multipart;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use catalog::{MediaFile, Specifications};

use crate::error::AppError;

/// Text and file fields of a `multipart/form-data` record form.
///
/// Fields outside the form's known names are ignored. A file field with no
/// file name and no content (what a browser sends for an empty file input)
/// counts as absent.
#[derive(Debug, Default)]
pub struct FormParts {
    texts: HashMap<String, String>,
    files: HashMap<String, MediaFile>,
}

impl FormParts {
    /// Drain `multipart`, reading `file_fields` as files of at most
    /// `max_file_size` bytes and everything else as text.
    pub async fn read(
        multipart: &mut Multipart,
        file_fields: &[&str],
        max_file_size: u64,
    ) -> Result<Self, AppError> {
        let mut parts = FormParts::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if file_fields.contains(&name.as_str()) {
                if let Some(file) = read_file(field, &name, max_file_size).await? {
                    parts.files.insert(name, file);
                }
            } else {
                let text = field.text().await.map_err(multipart_error)?;
                parts.texts.insert(name, text);
            }
        }

        Ok(parts)
    }

    /// Raw value of a text field, if the form carried it.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts.get(name).map(String::as_str)
    }

    /// Value of an optional text field: absent is `None`, blank is `Some(None)`.
    pub fn nullable_text(&self, name: &str) -> Option<Option<String>> {
        self.text(name).map(|v| {
            let v = v.trim();
            (!v.is_empty()).then(|| v.to_string())
        })
    }

    pub fn flag(&self, name: &str) -> Result<Option<bool>, AppError> {
        self.text(name).map(|v| parse_bool(name, v)).transpose()
    }

    /// `specifications` as a JSON object of strings; blank is `Some(None)`.
    pub fn specifications(&self, name: &str) -> Result<Option<Option<Specifications>>, AppError> {
        let Some(raw) = self.text(name) else {
            return Ok(None);
        };
        if raw.trim().is_empty() {
            return Ok(Some(None));
        }
        let specs: Specifications = serde_json::from_str(raw).map_err(|_| {
            AppError::Validation(format!("{name} must be a JSON object of string values"))
        })?;
        Ok(Some(Some(specs)))
    }

    pub fn take_file(&mut self, name: &str) -> Option<MediaFile> {
        self.files.remove(name)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        _ => Err(AppError::Validation(format!("{name} must be true or false"))),
    }
}

async fn read_file(
    mut field: Field<'_>,
    name: &str,
    max_size: u64,
) -> Result<Option<MediaFile>, AppError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let declared_type = field
        .content_type()
        .filter(|t| *t != "application/octet-stream")
        .map(str::to_string);

    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if (bytes.len() + chunk.len()) as u64 > max_size {
            return Err(AppError::PayloadTooLarge(format!(
                "{name} exceeds the {max_size} byte upload limit"
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    if file_name.is_empty() && bytes.is_empty() {
        return Ok(None);
    }
    if bytes.is_empty() {
        return Err(AppError::Validation(format!("{name} file is empty")));
    }

    let content_type = declared_type.or_else(|| {
        mime_guess::from_path(&file_name)
            .first()
            .map(|m| m.to_string())
    });

    Ok(Some(MediaFile {
        file_name,
        content_type,
        bytes,
    }))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::Validation(format!("Multipart error: {}", err.body_text()))
    }
}
