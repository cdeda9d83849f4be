// `dontpad versions`: snapshot history of a document.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use clap::{Args, Subcommand, ValueEnum};
use dontpad_common::format::format_bytes;
use dontpad_common::types::{EditorKind, RestoreOutcome, RestoreRequest, Version};
use serde::Serialize;

use crate::client::{ApiClient, SnapshotOptions};
use crate::output::{self, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum VersionsCommand {
    /// List versions, newest first
    Ls(LsArgs),
    /// Show one version's metadata
    Show(VersionRef),
    /// Store a CRDT update file as a new version
    Save(SaveArgs),
    /// Download a version's bytes
    Export(ExportArgs),
    /// Delete a version
    Rm(VersionRef),
    /// Restore a version into the live document (a backup is taken first)
    Restore(RestoreArgs),
}

#[derive(Debug, Args)]
pub struct LsArgs {
    document: String,
    /// Only versions of this subdocument.
    #[arg(long, conflicts_with = "root_only")]
    subdocument: Option<String>,
    /// Only versions of the document root.
    #[arg(long)]
    root_only: bool,
}

#[derive(Debug, Args)]
pub struct VersionRef {
    document: String,
    version: String,
}

#[derive(Debug, Args)]
pub struct SaveArgs {
    document: String,
    /// Update file to store; `-` reads stdin.
    #[arg(long, short)]
    file: PathBuf,
    #[arg(long)]
    label: Option<String>,
    #[arg(long)]
    subdocument: Option<String>,
    #[arg(long)]
    created_by: Option<String>,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    target: VersionRef,
    /// Destination file. Defaults to `{version}.yupdate`.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EditorArg {
    Rich,
    Code,
}

impl From<EditorArg> for EditorKind {
    fn from(editor: EditorArg) -> Self {
        match editor {
            EditorArg::Rich => EditorKind::Rich,
            EditorArg::Code => EditorKind::Code,
        }
    }
}

#[derive(Debug, Args)]
pub struct RestoreArgs {
    #[command(flatten)]
    target: VersionRef,
    /// Editor whose content is replaced.
    #[arg(long, value_enum, default_value_t = EditorArg::Rich)]
    editor: EditorArg,
    /// Subdocument to restore into. Defaults to the version's own.
    #[arg(long)]
    subdocument: Option<String>,
    #[arg(long)]
    created_by: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Exported {
    version_id: String,
    path: PathBuf,
    size: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Deleted {
    version_id: String,
    success: bool,
}

pub async fn run(cmd: VersionsCommand, client: &ApiClient, format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        VersionsCommand::Ls(args) => {
            let mut versions = client
                .list_versions(&args.document, args.subdocument.as_deref(), args.root_only)
                .await?;
            versions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            output::print_output(format, &versions, |v| format_list(v))?;
        }
        VersionsCommand::Show(target) => {
            let version = client.version(&target.document, &target.version).await?;
            output::print_output(format, &version, format_version)?;
        }
        VersionsCommand::Save(args) => {
            let update = read_update(&args.file)?;
            let options = SnapshotOptions {
                label: args.label,
                subdocument: args.subdocument,
                created_by: args.created_by,
            };
            let version = client.save_version(&args.document, update, options).await?;
            output::print_output(format, &version, |v| format!("saved {}", format_version(v)))?;
        }
        VersionsCommand::Export(args) => {
            let bytes = client.version_bytes(&args.target.document, &args.target.version).await?;
            let path = args
                .output
                .unwrap_or_else(|| PathBuf::from(format!("{}.yupdate", args.target.version)));
            std::fs::write(&path, &bytes)
                .with_context(|| format!("failed to write `{}`", path.display()))?;
            let exported = Exported { version_id: args.target.version, path, size: bytes.len() };
            output::print_output(format, &exported, |e| {
                format!("wrote {} ({})", e.path.display(), format_bytes(e.size as u64))
            })?;
        }
        VersionsCommand::Rm(target) => {
            client.delete_version(&target.document, &target.version).await?;
            let deleted = Deleted { version_id: target.version, success: true };
            output::print_output(format, &deleted, |d| format!("deleted {}", d.version_id))?;
        }
        VersionsCommand::Restore(args) => {
            let request = RestoreRequest {
                editor: args.editor.into(),
                subdocument: args.subdocument,
                created_by: args.created_by,
            };
            let outcome =
                client.restore(&args.target.document, &args.target.version, &request).await?;
            output::print_output(format, &outcome, format_restore)?;
        }
    }
    Ok(())
}

fn read_update(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut bytes = Vec::new();
        std::io::stdin().read_to_end(&mut bytes).context("failed to read update from stdin")?;
        return Ok(bytes);
    }
    std::fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))
}

fn format_time(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|time| time.with_timezone(&Local).format("%d/%m/%Y %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn format_version(version: &Version) -> String {
    let mut line = format!(
        "{}  {}  {}",
        version.id,
        format_time(version.timestamp),
        format_bytes(version.size)
    );
    if let Some(subdocument) = &version.subdocument_name {
        line.push_str(&format!("  [{subdocument}]"));
    }
    if let Some(label) = &version.label {
        line.push_str(&format!("  {label}"));
    }
    if let Some(author) = &version.created_by {
        line.push_str(&format!("  by {author}"));
    }
    line
}

fn format_list(versions: &[Version]) -> String {
    if versions.is_empty() {
        return "No versions.".into();
    }
    let mut lines = vec![format!("{} version(s)", versions.len())];
    lines.extend(versions.iter().map(|v| format!("  {}", format_version(v))));
    lines.join("\n")
}

fn format_restore(outcome: &RestoreOutcome) -> String {
    format!(
        "restored {} ({} update)\nbackup saved as {}",
        outcome.restored.id,
        format_bytes(outcome.update_size),
        outcome.backup.id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: VersionsCommand,
    }

    fn version(id: &str, timestamp: i64) -> Version {
        Version {
            id: id.into(),
            document_id: "notas".into(),
            subdocument_name: None,
            timestamp,
            label: None,
            size: 1536,
            created_by: None,
        }
    }

    #[test]
    fn human_list_counts_and_shows_details() {
        let mut labelled = version("2-b", 2);
        labelled.label = Some("antes da reunião".into());
        labelled.subdocument_name = Some("ideias".into());
        labelled.created_by = Some("ana".into());

        let text = format_list(&[labelled, version("1-a", 1)]);
        assert!(text.starts_with("2 version(s)"));
        assert!(text.contains("2-b"));
        assert!(text.contains("1.5 KB"));
        assert!(text.contains("[ideias]"));
        assert!(text.contains("antes da reunião"));
        assert!(text.contains("by ana"));
    }

    #[test]
    fn empty_list_says_so() {
        assert_eq!(format_list(&[]), "No versions.");
    }

    #[test]
    fn restore_defaults_to_rich_editor() {
        let cli = TestCli::try_parse_from(["versions", "restore", "notas", "1-a"])
            .expect("arguments should parse");
        let VersionsCommand::Restore(args) = cli.command else {
            panic!("expected restore");
        };
        assert!(matches!(EditorKind::from(args.editor), EditorKind::Rich));
        assert_eq!(args.target.version, "1-a");
    }

    #[test]
    fn subdocument_and_root_only_conflict() {
        let parsed =
            TestCli::try_parse_from(["versions", "ls", "notas", "--subdocument", "x", "--root-only"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn reads_update_file() {
        let tmp = tempfile::NamedTempFile::new().expect("temp file should be created");
        std::fs::write(tmp.path(), [1u8, 2, 3]).expect("temp file should be written");
        assert_eq!(read_update(tmp.path()).expect("file should read"), vec![1, 2, 3]);
    }
}
