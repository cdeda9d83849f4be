// Recorded audio notes, stored as {data_dir}/{document}/audio-notes[/{subdocument}]/{id}.webm.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use dontpad_common::id::storage_segment;
use dontpad_common::types::AudioNote;
use tracing::info;
use uuid::Uuid;

use super::{now_millis, DataDir};

pub const AUDIO_MIME_TYPE: &str = "audio/webm";

const AUDIO_DIR: &str = "audio-notes";
const AUDIO_EXT: &str = "webm";

#[derive(Debug, Clone)]
pub struct AudioNoteStore {
    data: DataDir,
}

impl AudioNoteStore {
    pub fn new(data: DataDir) -> Self {
        Self { data }
    }

    pub fn save(
        &self,
        document_id: &str,
        subdocument: Option<&str>,
        duration_secs: f64,
        bytes: &[u8],
    ) -> Result<AudioNote> {
        let dir = self.data.scoped_dir(document_id, AUDIO_DIR, subdocument)?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create audio directory `{}`", dir.display()))?;

        let id = Uuid::new_v4().to_string();
        let path = dir.join(format!("{id}.{AUDIO_EXT}"));
        fs::write(&path, bytes)
            .with_context(|| format!("failed to write audio note `{}`", path.display()))?;

        let created_at = now_millis();
        info!(document_id, note_id = %id, size = bytes.len(), "stored audio note");
        Ok(AudioNote {
            id,
            name: note_name(created_at),
            duration: round_duration(duration_secs),
            mime_type: AUDIO_MIME_TYPE.to_string(),
            size: bytes.len() as u64,
            created_at,
        })
    }

    /// Audio bytes, or `None` when the note does not exist.
    pub fn read(
        &self,
        document_id: &str,
        subdocument: Option<&str>,
        note_id: &str,
    ) -> Result<Option<Vec<u8>>> {
        let path = self.note_path(document_id, subdocument, note_id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => {
                Err(error).with_context(|| format!("failed to read audio note `{}`", path.display()))
            }
        }
    }

    /// Delete a note; a missing file counts as deleted.
    pub fn delete(&self, document_id: &str, subdocument: Option<&str>, note_id: &str) -> Result<()> {
        let path = self.note_path(document_id, subdocument, note_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => {
                Err(error).with_context(|| format!("failed to delete audio note `{}`", path.display()))
            }
        }
    }

    fn note_path(
        &self,
        document_id: &str,
        subdocument: Option<&str>,
        note_id: &str,
    ) -> Result<PathBuf> {
        let dir = self.data.scoped_dir(document_id, AUDIO_DIR, subdocument)?;
        Ok(dir.join(format!("{}.{AUDIO_EXT}", storage_segment(note_id)?)))
    }
}

fn round_duration(seconds: f64) -> f64 {
    if !seconds.is_finite() {
        return 0.0;
    }
    (seconds * 10.0).round() / 10.0
}

/// "Nota de Áudio dd/mm/yyyy, HH:MM:SS" in the server's local time.
fn note_name(created_at_ms: i64) -> String {
    let stamp = DateTime::<Utc>::from_timestamp_millis(created_at_ms)
        .unwrap_or_default()
        .with_timezone(&Local);
    format!("Nota de Áudio {}", stamp.format("%d/%m/%Y, %H:%M:%S"))
}
