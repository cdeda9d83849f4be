// File attachments: validation and storage under
// {data_dir}/{document}/uploads[/{subdocument}]/{uuid}.{ext}.
//
// Attachment metadata lives in the collaborative document itself; this
// module only owns the bytes.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use dontpad_common::id::{storage_segment, IdError};
use dontpad_common::types::DocumentFile;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::{now_millis, DataDir};

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

const UPLOADS_DIR: &str = "uploads";

const ALLOWED_MIME_TYPES: &[&str] = &[
    // Microsoft Office
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    // OpenDocument
    "application/vnd.oasis.opendocument.text",
    "application/vnd.oasis.opendocument.spreadsheet",
    "application/vnd.oasis.opendocument.presentation",
    "application/pdf",
    // Text
    "text/plain",
    "text/csv",
    "text/markdown",
    // Images
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    "image/bmp",
    "image/tiff",
    "image/x-icon",
    // Archives
    "application/zip",
    "application/x-zip-compressed",
    "application/x-rar-compressed",
    "application/x-rar",
    // Video
    "video/mp4",
    "video/webm",
    "video/quicktime",
    "video/x-matroska",
    "video/3gpp",
    "video/3gpp2",
    "video/x-msvideo",
    "video/mpeg",
];

const ALLOWED_EXTENSIONS: &[&str] = &[
    "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp", "pdf", "txt", "csv", "md",
    "jpg", "jpeg", "png", "gif", "webp", "svg", "bmp", "tiff", "tif", "ico", "zip", "rar", "mp4",
    "m4v", "webm", "mov", "mkv", "3gp", "3g2", "avi", "mpeg", "mpg",
];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File size exceeds maximum limit of {}MB", .limit / (1024 * 1024))]
    TooLarge { limit: u64 },

    #[error("Tipo de arquivo não permitido. Confira os formatos aceitos.")]
    NotAllowed,

    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    #[error("file not found")]
    NotFound,

    #[error("upload storage failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    data: DataDir,
    max_bytes: u64,
}

impl UploadStore {
    pub fn new(data: DataDir, max_bytes: u64) -> Self {
        Self { data, max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Check size, MIME type and extension. Returns the extension as given
    /// in `original_name` (the text after the last `.`).
    pub fn validate<'a>(
        &self,
        original_name: &'a str,
        mime_type: &str,
        size: u64,
    ) -> Result<&'a str, UploadError> {
        if size > self.max_bytes {
            return Err(UploadError::TooLarge { limit: self.max_bytes });
        }

        let extension = original_name.rsplit('.').next().unwrap_or_default();
        if !ALLOWED_MIME_TYPES.contains(&mime_type) {
            return Err(UploadError::NotAllowed);
        }
        if !ALLOWED_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()) {
            return Err(UploadError::NotAllowed);
        }
        Ok(extension)
    }

    /// Validate and persist an attachment as `{uuid}.{ext}`.
    pub fn save(
        &self,
        document_id: &str,
        subdocument: Option<&str>,
        original_name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<DocumentFile, UploadError> {
        let extension = self.validate(original_name, mime_type, bytes.len() as u64)?;
        let dir = self.data.scoped_dir(document_id, UPLOADS_DIR, subdocument)?;
        fs::create_dir_all(&dir)?;

        let id = Uuid::new_v4().to_string();
        let name = format!("{id}.{extension}");
        fs::write(dir.join(&name), bytes)?;

        info!(document_id, file_id = %id, size = bytes.len(), mime_type, "stored upload");
        Ok(DocumentFile {
            id,
            name,
            original_name: original_name.to_string(),
            mime_type: mime_type.to_string(),
            size: bytes.len() as u64,
            uploaded_at: now_millis(),
        })
    }

    pub fn read(
        &self,
        document_id: &str,
        subdocument: Option<&str>,
        file_name: &str,
    ) -> Result<Vec<u8>, UploadError> {
        let path = self.file_path(document_id, subdocument, file_name)?;
        fs::read(&path).map_err(|error| match error.kind() {
            ErrorKind::NotFound => UploadError::NotFound,
            _ => UploadError::Io(error),
        })
    }

    /// Remove a stored attachment. Returns `false` when it was already gone.
    pub fn delete(
        &self,
        document_id: &str,
        subdocument: Option<&str>,
        file_name: &str,
    ) -> Result<bool, UploadError> {
        let path = self.file_path(document_id, subdocument, file_name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "upload already removed");
                Ok(false)
            }
            Err(error) => Err(error.into()),
        }
    }

    fn file_path(
        &self,
        document_id: &str,
        subdocument: Option<&str>,
        file_name: &str,
    ) -> Result<PathBuf, UploadError> {
        let dir = self.data.scoped_dir(document_id, UPLOADS_DIR, subdocument)?;
        Ok(dir.join(storage_segment(file_name)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(max: u64) -> (tempfile::TempDir, UploadStore) {
        let tmp = tempdir().expect("tempdir should be created");
        let store = UploadStore::new(DataDir::new(tmp.path()), max);
        (tmp, store)
    }

    #[test]
    fn accepts_matching_mime_and_extension() {
        let (_tmp, store) = store(DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(store.validate("ata.PDF", "application/pdf", 10).ok(), Some("PDF"));
        assert_eq!(store.validate("foto.jpeg", "image/jpeg", 10).ok(), Some("jpeg"));
    }

    #[test]
    fn rejects_unknown_mime_or_extension() {
        let (_tmp, store) = store(DEFAULT_MAX_UPLOAD_BYTES);
        assert!(matches!(
            store.validate("script.sh", "application/x-sh", 10),
            Err(UploadError::NotAllowed)
        ));
        assert!(matches!(
            store.validate("virus.exe", "application/pdf", 10),
            Err(UploadError::NotAllowed)
        ));
        assert!(matches!(store.validate("semextensao", "text/plain", 10), Err(UploadError::NotAllowed)));
    }

    #[test]
    fn rejects_oversized_files_with_limit_in_message() {
        let (_tmp, store) = store(2 * 1024 * 1024);
        let error = store
            .validate("grande.pdf", "application/pdf", 2 * 1024 * 1024 + 1)
            .expect_err("oversized file should be rejected");
        assert_eq!(error.to_string(), "File size exceeds maximum limit of 2MB");
    }

    #[test]
    fn save_read_delete_cycle() {
        let (tmp, store) = store(DEFAULT_MAX_UPLOAD_BYTES);
        let file = store
            .save("notas", Some("anexos"), "lista.txt", "text/plain", b"leite\novos")
            .expect("upload should be stored");

        assert_eq!(file.original_name, "lista.txt");
        assert_eq!(file.size, 10);
        assert!(file.name.ends_with(".txt"));
        assert!(tmp.path().join("notas/uploads/anexos").join(&file.name).exists());

        let bytes = store.read("notas", Some("anexos"), &file.name).expect("upload should read");
        assert_eq!(bytes, b"leite\novos");

        assert!(store.delete("notas", Some("anexos"), &file.name).expect("delete should succeed"));
        assert!(!store.delete("notas", Some("anexos"), &file.name).expect("repeat delete is ok"));
        assert!(matches!(store.read("notas", Some("anexos"), &file.name), Err(UploadError::NotFound)));
    }

    #[test]
    fn file_names_cannot_escape_the_uploads_dir() {
        let (_tmp, store) = store(DEFAULT_MAX_UPLOAD_BYTES);
        assert!(matches!(
            store.read("notas", None, "../versions/metadata.json"),
            Err(UploadError::InvalidId(_))
        ));
    }
}
