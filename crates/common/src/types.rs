// Wire types shared by the server and the CLI.
//
// Field names follow the JSON the web client already speaks (camelCase,
// absent optionals omitted). Timestamps are Unix milliseconds.

use serde::{Deserialize, Serialize};

/// Metadata of one stored snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    /// `{timestamp}-{suffix}`; also the blob's file stem.
    pub id: String,
    pub document_id: String,
    /// Partition key. `None` means the document root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdocument_name: Option<String>,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Byte length of the snapshot blob.
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// Contents of a document's `metadata.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionIndex {
    #[serde(default)]
    pub versions: Vec<Version>,
}

/// `{ "version": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionEnvelope {
    pub version: Version,
}

/// `{ "versions": [...] }`, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionsEnvelope {
    pub versions: Vec<Version>,
}

/// Which editor's shared type a restore or editor switch targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EditorKind {
    /// Block editor bound to an XmlFragment.
    #[default]
    Rich,
    /// Code editor bound to a Y.Text.
    Code,
}

/// Body of `POST /api/documents/{id}/versions/{versionId}/restore`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRequest {
    #[serde(default)]
    pub editor: EditorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdocument: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// Result of a server-side restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOutcome {
    /// Snapshot of the live state taken right before the restore.
    pub backup: Version,
    /// The version that was restored.
    pub restored: Version,
    /// Size of the update pushed to the collab server.
    pub update_size: u64,
}

/// Body of `POST /api/documents/{id}/editor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorSwitchRequest {
    pub target: EditorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdocument: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorSwitchOutcome {
    pub target: EditorKind,
    pub update_size: u64,
}

/// An uploaded attachment. Stored on disk as `name`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFile {
    pub id: String,
    pub name: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: u64,
    pub uploaded_at: i64,
}

/// A recorded audio note. Stored on disk as `{id}.webm`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AudioNote {
    pub id: String,
    pub name: String,
    /// Seconds, rounded to one decimal.
    pub duration: f64,
    pub mime_type: String,
    pub size: u64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subdocument {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

/// Answer of `GET /api/documents/{id}/security`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecurityStatus {
    pub is_protected: bool,
    pub has_access: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPinRequest {
    #[serde(default)]
    pub pin: Option<String>,
}

/// Answer of `GET /api/collab/health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CollabHealth {
    pub ok: bool,
    pub host: String,
    pub port: u16,
    pub connection_string: String,
}
