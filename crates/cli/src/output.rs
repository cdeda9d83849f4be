// Output format auto-detection for the CLI.
//
// TTY -> human-readable text. Piped/redirected -> structured JSON.
// `--json` forces JSON output regardless of terminal.

use std::io::{self, IsTerminal, Write};

use serde::Serialize;

use crate::client::ClientError;

const ANSI_RED: &str = "\x1b[31m";
const ANSI_RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    /// JSON if `--json` was passed or stdout is not a TTY.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    write_output(&mut io::stdout().lock(), format, value, human_fn)
}

pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => writeln!(writer, "{}", human_fn(value)),
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

/// Write an error to stderr in the selected format.
pub fn print_error(format: OutputFormat, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line = render_human_error(message, io::stderr().is_terminal());
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({ "error": { "code": code, "message": message } });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Print a mapped, actionable error for a command failure.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let (code, message) = actionable_error(error);
    print_error(format, &code, &message);
}

fn actionable_error(error: &anyhow::Error) -> (String, String) {
    let client_error = error.chain().find_map(|cause| cause.downcast_ref::<ClientError>());
    match client_error {
        Some(ClientError::Unreachable { url, .. }) => (
            "SERVER_NOT_RUNNING".to_string(),
            format!("Server is not reachable at {url}. Start it with: dontpad-server (or pass --server)"),
        ),
        Some(ClientError::InvalidUrl(url)) => (
            "INVALID_SERVER_URL".to_string(),
            format!("`{url}` is not an http(s) URL. Check --server or DONTPAD_SERVER_URL"),
        ),
        Some(ClientError::Api { code, message, .. }) if code == "COLLAB_UNAVAILABLE" => (
            code.clone(),
            format!("{message}. Check the collab server with: dontpad health"),
        ),
        Some(ClientError::Api { code, message, .. }) => (code.clone(), message.clone()),
        Some(ClientError::Http(_)) | None => ("ERROR".to_string(), format!("{error:#}")),
    }
}

fn render_human_error(message: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{ANSI_RED}error:{ANSI_RESET} {message}")
    } else {
        format!("error: {message}")
    }
}
