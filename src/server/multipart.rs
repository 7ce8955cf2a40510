//! Reads `multipart/form-data` submissions into the forms the services take.

use crate::applications::ApplicationForm;
use crate::uploads::UploadedFile;
use crate::user::ProfileForm;
use axum::{
    extract::{multipart::MultipartError, Multipart},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

/// Largest request body accepted by the upload routes.
pub const MAX_UPLOAD_REQUEST_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

pub struct MultipartRejection(MultipartError);

impl IntoResponse for MultipartRejection {
    fn into_response(self) -> Response {
        debug!("Malformed multipart body: {}", self.0);
        (
            self.0.status(),
            Json(json!({ "error": self.0.body_text() })),
        )
            .into_response()
    }
}

impl From<MultipartError> for MultipartRejection {
    fn from(err: MultipartError) -> Self {
        Self(err)
    }
}

impl MultipartForm {
    /// Drains the whole body. Parts with a file name are files, unless they
    /// are empty, which is how browsers submit an untouched file input.
    pub async fn read(mut multipart: Multipart) -> Result<Self, MultipartRejection> {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let data = field.bytes().await?;
                    if file_name.is_empty() && data.is_empty() {
                        continue;
                    }
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            data: data.to_vec(),
                        },
                    );
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    pub fn into_profile_form(mut self) -> ProfileForm {
        ProfileForm {
            role: self.text("role"),
            full_name: self.text("full_name"),
            phone: self.text("phone"),
            location: self.text("location"),
            company_name: self.text("company_name"),
            company_website: self.text("company_website"),
            company_description: self.text("company_description"),
            resume: self.take_file("resume"),
            company_logo: self.take_file("company_logo"),
        }
    }

    pub fn into_application_form(mut self) -> ApplicationForm {
        ApplicationForm {
            qualification: self.text("qualification"),
            phone: self.text("phone"),
            experience: self.text("experience"),
            cover_letter: self.text("cover_letter"),
            resume: self.take_file("resume"),
        }
    }
}
