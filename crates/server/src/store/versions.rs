// Version snapshots: append-only CRDT update blobs plus a JSON index.
//
// {data_dir}/{document}/versions/
//   metadata.json        {"versions": [Version, ...]}  (authoritative list)
//   {id}.yupdate         raw update bytes, one per version
//
// Blob and index writes are not transactional: a crash between the two
// leaves an orphan blob. Read paths never fail; they log and return empty.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use dontpad_common::id::storage_segment;
use dontpad_common::types::{Version, VersionIndex};
use rand::Rng;
use tracing::{debug, info, warn};

use super::{now_millis, write_atomic, DataDir};

/// Retention limit, applied per (document, subdocument) partition.
pub const MAX_VERSIONS_PER_PARTITION: usize = 50;

const VERSIONS_DIR: &str = "versions";
const METADATA_FILE: &str = "metadata.json";
const BLOB_EXT: &str = "yupdate";
const ID_SUFFIX_LEN: usize = 6;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Optional attributes of a new version.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    pub subdocument_name: Option<String>,
    pub label: Option<String>,
    pub created_by: Option<String>,
    /// Version that retention must not drop during this save, such as the
    /// one a restore is about to bring back.
    pub keep: Option<String>,
}

/// File-backed version store. Cheap to clone; clones share the index lock.
#[derive(Debug, Clone)]
pub struct VersionStore {
    data: DataDir,
    // Serializes index read-modify-write within this process.
    index_lock: Arc<Mutex<()>>,
}

impl VersionStore {
    pub fn new(data: DataDir) -> Self {
        Self { data, index_lock: Arc::new(Mutex::new(())) }
    }

    pub fn data_dir(&self) -> &DataDir {
        &self.data
    }

    /// All versions of a document, or only those whose `subdocumentName`
    /// equals `subdocument` when one is given. Order is unspecified.
    pub fn get_versions(&self, document_id: &str, subdocument: Option<&str>) -> Vec<Version> {
        let versions = self.load_versions(document_id);
        match subdocument {
            Some(name) => {
                versions.into_iter().filter(|v| v.subdocument_name.as_deref() == Some(name)).collect()
            }
            None => versions,
        }
    }

    /// Versions of exactly one partition: `None` selects document-root
    /// versions only.
    pub fn get_partition(&self, document_id: &str, subdocument: Option<&str>) -> Vec<Version> {
        self.load_versions(document_id)
            .into_iter()
            .filter(|v| in_partition(v, subdocument))
            .collect()
    }

    /// Store a snapshot and enforce retention on its partition.
    pub fn save_version(
        &self,
        document_id: &str,
        update: &[u8],
        options: SaveOptions,
    ) -> Result<Version> {
        self.save_version_at(document_id, update, options, now_millis())
    }

    /// Like [`save_version`](Self::save_version) with an explicit creation
    /// time, for imports and deterministic tests.
    pub fn save_version_at(
        &self,
        document_id: &str,
        update: &[u8],
        options: SaveOptions,
        timestamp: i64,
    ) -> Result<Version> {
        let dir = self.versions_dir(document_id)?;
        let _guard = self.lock_index();

        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create versions directory `{}`", dir.display()))?;

        let id = unused_version_id(&dir, timestamp);
        let path = blob_path(&dir, &id);
        fs::write(&path, update)
            .with_context(|| format!("failed to write snapshot `{}`", path.display()))?;

        let version = Version {
            id,
            document_id: document_id.to_string(),
            subdocument_name: options.subdocument_name,
            timestamp,
            label: options.label,
            size: update.len() as u64,
            created_by: options.created_by,
        };
        let keep = options.keep;

        let index_path = dir.join(METADATA_FILE);
        let mut index = match read_index(&index_path) {
            Ok(Some(index)) => index,
            Ok(None) => VersionIndex::default(),
            Err(error) => {
                warn!(document_id, error = %format!("{error:#}"), "resetting unreadable version index");
                VersionIndex::default()
            }
        };
        index.versions.push(version.clone());

        let pruned =
            prune_partition(&dir, &mut index, version.subdocument_name.as_deref(), keep.as_deref());
        write_index(&index_path, &index)?;

        info!(
            document_id,
            version_id = %version.id,
            subdocument = version.subdocument_name.as_deref().unwrap_or(""),
            size = version.size,
            pruned,
            "saved version"
        );
        Ok(version)
    }

    /// Raw snapshot bytes, or `None` when the blob is missing.
    pub fn get_version_data(&self, document_id: &str, version_id: &str) -> Option<Vec<u8>> {
        let dir = self.versions_dir(document_id).ok()?;
        let version_id = storage_segment(version_id).ok()?;
        let path = blob_path(&dir, version_id);

        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(error) if error.kind() == ErrorKind::NotFound => None,
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to read snapshot");
                None
            }
        }
    }

    pub fn get_version_metadata(&self, document_id: &str, version_id: &str) -> Option<Version> {
        self.get_versions(document_id, None).into_iter().find(|v| v.id == version_id)
    }

    /// Remove a version's blob and index entry.
    ///
    /// Returns `false` when the index exists but cannot be parsed or
    /// rewritten, or when the ids are not storage-safe. A missing blob or an
    /// unknown id is not an error.
    pub fn delete_version(&self, document_id: &str, version_id: &str) -> bool {
        let Ok(dir) = self.versions_dir(document_id) else {
            return false;
        };
        let Ok(version_id) = storage_segment(version_id) else {
            return false;
        };
        let _guard = self.lock_index();

        let path = blob_path(&dir, version_id);
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed snapshot"),
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => warn!(path = %path.display(), %error, "failed to remove snapshot"),
        }

        let index_path = dir.join(METADATA_FILE);
        let mut index = match read_index(&index_path) {
            Ok(Some(index)) => index,
            Ok(None) => return true,
            Err(error) => {
                warn!(document_id, error = %format!("{error:#}"), "cannot delete from unreadable version index");
                return false;
            }
        };

        index.versions.retain(|v| v.id != version_id);
        match write_index(&index_path, &index) {
            Ok(()) => {
                info!(document_id, version_id, "deleted version");
                true
            }
            Err(error) => {
                warn!(document_id, error = %format!("{error:#}"), "failed to rewrite version index");
                false
            }
        }
    }

    fn versions_dir(&self, document_id: &str) -> Result<PathBuf> {
        Ok(self.data.document_dir(document_id)?.join(VERSIONS_DIR))
    }

    fn load_versions(&self, document_id: &str) -> Vec<Version> {
        let Ok(dir) = self.versions_dir(document_id) else {
            return Vec::new();
        };
        match read_index(&dir.join(METADATA_FILE)) {
            Ok(Some(index)) => index.versions,
            Ok(None) => Vec::new(),
            Err(error) => {
                warn!(document_id, error = %format!("{error:#}"), "ignoring unreadable version index");
                Vec::new()
            }
        }
    }

    fn lock_index(&self) -> MutexGuard<'_, ()> {
        self.index_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn in_partition(version: &Version, subdocument: Option<&str>) -> bool {
    version.subdocument_name.as_deref() == subdocument
}

fn blob_path(dir: &Path, version_id: &str) -> PathBuf {
    dir.join(format!("{version_id}.{BLOB_EXT}"))
}

/// `{timestamp}-{6 base36 chars}`, re-rolled until no blob uses it.
fn unused_version_id(dir: &Path, timestamp: i64) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
            .collect();
        let id = format!("{timestamp}-{suffix}");
        if !blob_path(dir, &id).exists() {
            return id;
        }
    }
}

/// `Ok(None)` when the index file does not exist.
fn read_index(path: &Path) -> Result<Option<VersionIndex>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(error) => {
            return Err(error).with_context(|| format!("failed to read `{}`", path.display()))
        }
    };
    let index = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse `{}`", path.display()))?;
    Ok(Some(index))
}

fn write_index(path: &Path, index: &VersionIndex) -> Result<()> {
    let json = serde_json::to_vec_pretty(index).context("failed to serialize version index")?;
    write_atomic(path, &json)
}

/// Drop the oldest versions of one partition until it holds at most
/// [`MAX_VERSIONS_PER_PARTITION`]. `keep` is never dropped; the next
/// oldest goes instead. Returns how many were removed.
fn prune_partition(
    dir: &Path,
    index: &mut VersionIndex,
    subdocument: Option<&str>,
    keep: Option<&str>,
) -> usize {
    let members: Vec<(i64, usize, bool)> = index
        .versions
        .iter()
        .enumerate()
        .filter(|(_, v)| in_partition(v, subdocument))
        .map(|(position, v)| (v.timestamp, position, Some(v.id.as_str()) == keep))
        .collect();

    if members.len() <= MAX_VERSIONS_PER_PARTITION {
        return 0;
    }
    let excess = members.len() - MAX_VERSIONS_PER_PARTITION;

    // Ties on timestamp fall back to insertion order.
    let mut candidates: Vec<(i64, usize)> = members
        .into_iter()
        .filter(|&(_, _, kept)| !kept)
        .map(|(timestamp, position, _)| (timestamp, position))
        .collect();
    candidates.sort_unstable();
    let doomed: HashSet<String> = candidates[..excess]
        .iter()
        .map(|&(_, position)| index.versions[position].id.clone())
        .collect();

    for id in &doomed {
        let path = blob_path(dir, id);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => warn!(path = %path.display(), %error, "failed to prune snapshot"),
        }
    }
    index.versions.retain(|v| !doomed.contains(&v.id));

    debug!(partition = subdocument.unwrap_or(""), removed = excess, "pruned versions");
    excess
}
