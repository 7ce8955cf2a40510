//! Uploaded files: resumes and company logos, kept under the media directory
//! and referenced by their path relative to it.

use crate::validation::{FieldError, FormErrors};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

const RESUME_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    ProfileResume,
    ApplicationResume,
    CompanyLogo,
}

impl UploadKind {
    pub fn directory(&self) -> &'static str {
        match self {
            UploadKind::ProfileResume => "profiles",
            UploadKind::ApplicationResume => "applications",
            UploadKind::CompanyLogo => "company_logos",
        }
    }

    /// Checks the file is acceptable for this kind and returns the extension
    /// it will be stored with.
    pub fn validate(&self, file: &UploadedFile) -> Result<String, FieldError> {
        match self {
            UploadKind::ProfileResume | UploadKind::ApplicationResume => {
                let extension = Path::new(&file.file_name)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(str::to_ascii_lowercase)
                    .unwrap_or_default();
                if file.data.is_empty() || !RESUME_EXTENSIONS.contains(&extension.as_str()) {
                    return Err(FieldError::UnsupportedFile {
                        allowed: "pdf, doc, docx",
                    });
                }
                Ok(extension)
            }
            UploadKind::CompanyLogo => match infer::get(&file.data) {
                Some(kind) if kind.mime_type().starts_with("image/") => {
                    Ok(kind.extension().to_string())
                }
                _ => Err(FieldError::UnsupportedFile { allowed: "images" }),
            },
        }
    }
}

/// An upload that passed validation and is ready to be stored.
#[derive(Debug)]
pub struct CheckedUpload<'a> {
    kind: UploadKind,
    file: &'a UploadedFile,
    extension: String,
}

impl CheckedUpload<'_> {
    /// Stores the file and returns its relative path.
    pub fn store(&self, storage: &dyn FileStorage) -> Result<String> {
        storage.save(self.kind.directory(), &self.extension, &self.file.data)
    }
}

/// Validates an optional upload, recording a failure under `field`.
pub fn check_upload<'a>(
    errors: &mut FormErrors,
    field: &'static str,
    kind: UploadKind,
    file: Option<&'a UploadedFile>,
) -> Option<CheckedUpload<'a>> {
    let file = file?;
    match kind.validate(file) {
        Ok(extension) => Some(CheckedUpload {
            kind,
            file,
            extension,
        }),
        Err(err) => {
            errors.add(field, err);
            None
        }
    }
}

pub trait FileStorage: Send + Sync {
    /// Stores `data` in `directory` under a fresh name.
    /// Returns the path of the new file, relative to the storage root.
    fn save(&self, directory: &str, extension: &str, data: &[u8]) -> Result<String>;
}

/// Stores files on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create media directory {:?}", root))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileStorage for LocalFileStorage {
    fn save(&self, directory: &str, extension: &str, data: &[u8]) -> Result<String> {
        let dir = self.root.join(directory);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create upload directory {:?}", dir))?;
        let relative = format!("{}/{}.{}", directory, Uuid::new_v4(), extension);
        let path = self.root.join(&relative);
        std::fs::write(&path, data).with_context(|| format!("Failed to write {:?}", path))?;
        debug!("Stored {} bytes at {:?}", data.len(), path);
        Ok(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // Smallest valid PNG header, enough for content sniffing.
    const PNG_BYTES: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48,
        0x44, 0x52,
    ];

    fn file(name: &str, data: &[u8]) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn resumes_are_checked_by_extension() {
        let kind = UploadKind::ApplicationResume;
        assert_eq!(kind.validate(&file("cv.PDF", b"%PDF-1.4")).unwrap(), "pdf");
        assert_eq!(kind.validate(&file("cv.docx", b"PK")).unwrap(), "docx");
        assert!(kind.validate(&file("cv.exe", b"MZ")).is_err());
        assert!(kind.validate(&file("cv", b"%PDF")).is_err());
        assert!(kind.validate(&file("cv.pdf", b"")).is_err());
    }

    #[test]
    fn logos_are_sniffed_by_content() {
        let kind = UploadKind::CompanyLogo;
        assert_eq!(kind.validate(&file("logo.bin", PNG_BYTES)).unwrap(), "png");
        assert_eq!(
            kind.validate(&file("logo.png", b"plain text")),
            Err(FieldError::UnsupportedFile { allowed: "images" })
        );
    }

    #[test]
    fn check_upload_records_errors_by_field() {
        let mut errors = FormErrors::new();
        let good = file("cv.pdf", b"%PDF-1.4");
        let bad = file("logo.png", b"nope");

        assert!(check_upload(&mut errors, "resume", UploadKind::ProfileResume, None).is_none());
        assert!(
            check_upload(&mut errors, "resume", UploadKind::ProfileResume, Some(&good)).is_some()
        );
        assert!(
            check_upload(&mut errors, "company_logo", UploadKind::CompanyLogo, Some(&bad))
                .is_none()
        );
        assert!(errors.get("resume").is_empty());
        assert_eq!(errors.get("company_logo").len(), 1);
    }

    #[test]
    fn local_storage_writes_under_root() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::new(temp_dir.path().join("media")).unwrap();

        let first = storage.save("profiles", "pdf", b"%PDF-1.4").unwrap();
        let second = storage.save("profiles", "pdf", b"%PDF-1.4").unwrap();
        assert!(first.starts_with("profiles/") && first.ends_with(".pdf"));
        assert_ne!(first, second);
        assert_eq!(std::fs::read(storage.root().join(&first)).unwrap(), b"%PDF-1.4");
    }
}
