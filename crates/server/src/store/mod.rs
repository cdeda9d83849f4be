// Persistence under the data directory.
//
// Layout, one directory per document:
//   {data_dir}/{document}/versions/{id}.yupdate + metadata.json
//   {data_dir}/{document}/uploads[/{subdocument}]/{uuid}.{ext}
//   {data_dir}/{document}/audio-notes[/{subdocument}]/{uuid}.webm

pub mod audio;
pub mod uploads;
pub mod versions;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dontpad_common::id::{storage_segment, IdError};
use tracing::info;

/// Root of all on-disk state.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{data_dir}/{document}`. Fails when `document_id` is not a single
    /// safe path segment.
    pub fn document_dir(&self, document_id: &str) -> Result<PathBuf, IdError> {
        Ok(self.root.join(storage_segment(document_id)?))
    }

    /// `{data_dir}/{document}/{kind}[/{subdocument}]`.
    pub fn scoped_dir(
        &self,
        document_id: &str,
        kind: &str,
        subdocument: Option<&str>,
    ) -> Result<PathBuf, IdError> {
        let dir = self.document_dir(document_id)?.join(kind);
        match subdocument {
            Some(sub) => Ok(dir.join(storage_segment(sub)?)),
            None => Ok(dir),
        }
    }

    /// Remove everything stored for a document. Missing directories are fine.
    pub fn remove_document(&self, document_id: &str) -> Result<bool> {
        let dir = self.document_dir(document_id)?;
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)
            .with_context(|| format!("failed to remove document directory `{}`", dir.display()))?;
        info!(document_id, "removed document data");
        Ok(true)
    }
}

/// Write `contents` to `path` through a sibling temp file and a rename, so
/// readers never see a partially written file.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().context("target path has no parent directory")?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("target path has no file name")?;
    let tmp_path = dir.join(format!(".{file_name}.tmp.{}", uuid::Uuid::new_v4().simple()));

    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create temp file `{}`", tmp_path.display()))?;
    file.write_all(contents)
        .with_context(|| format!("failed to write temp file `{}`", tmp_path.display()))?;
    file.sync_data().context("failed to fsync temp file")?;
    drop(file);

    fs::rename(&tmp_path, path).with_context(|| {
        format!("failed to move `{}` to `{}`", tmp_path.display(), path.display())
    })
}

/// Current time in Unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
