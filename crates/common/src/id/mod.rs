// Identifier helpers: sanitizing, storage-safe path segments, editor fragment keys.

pub mod fragment;
pub mod sanitize;

use thiserror::Error;

pub use fragment::{editor_keys, EditorKeys, ROOT_FRAGMENT_KEY};
pub use sanitize::sanitize_document_id;

/// Maximum length of a single on-disk path segment, in bytes.
const MAX_SEGMENT_BYTES: usize = 255;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier exceeds maximum length of {MAX_SEGMENT_BYTES} bytes")]
    TooLong,

    #[error("identifier contains null byte")]
    NullByte,

    #[error("identifier contains a path separator")]
    Separator,

    #[error("identifier is a directory traversal component: {0}")]
    Traversal(String),
}

/// Check that `input` can be used as exactly one path segment under the
/// data directory. Returns the input unchanged when it is safe.
pub fn storage_segment(input: &str) -> Result<&str, IdError> {
    if input.is_empty() {
        return Err(IdError::Empty);
    }
    if input.len() > MAX_SEGMENT_BYTES {
        return Err(IdError::TooLong);
    }
    if input.contains('\0') {
        return Err(IdError::NullByte);
    }
    if input.contains('/') || input.contains('\\') {
        return Err(IdError::Separator);
    }
    if input == "." || input == ".." {
        return Err(IdError::Traversal(input.to_string()));
    }
    Ok(input)
}
