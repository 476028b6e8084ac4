use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::{Error, Result};
use crate::services::storage_service::UploadedFile;

/// One file part plus any text fields sent alongside it.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require_file(self) -> Result<UploadedFile> {
        self.file
            .ok_or_else(|| Error::BadRequest("File is required".into()))
    }
}

/// Buffers the part named `file_field`; other named parts are read as text.
pub async fn read_upload(mut multipart: Multipart, file_field: &str) -> Result<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == file_field {
            let original_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await?;
            form.file = Some(UploadedFile {
                original_name,
                content_type,
                data,
            });
        } else {
            let value = field.text().await?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}
