// Server configuration.
//
// Values come from `DONTPAD_*` environment variables, optionally layered
// over a TOML file named by `DONTPAD_CONFIG`. Environment wins over the
// file; both fall back to development defaults.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::collab::{DEFAULT_DOC_PREFIX, FALLBACK_CONNECTION_STRING};
use crate::store::uploads::DEFAULT_MAX_UPLOAD_BYTES;

const DEV_JWT_SECRET: &str = "dontpad_local_development_jwt_secret_must_be_32_chars";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Core server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Root of versions, uploads and audio notes.
    pub data_dir: PathBuf,
    /// HS256 secret for document access tokens.
    pub jwt_secret: String,
    /// Adds `Secure` to access cookies.
    pub cookie_secure: bool,
    /// `ys://` / `yss://` connection string of the collab server.
    pub collab_url: String,
    pub collab_doc_prefix: String,
    /// Comma-separated CORS origins (or `"*"` for any).
    pub cors_origins: Option<String>,
    pub log_filter: String,
    pub log_format: LogFormat,
    pub max_upload_bytes: u64,
}

/// Optional on-disk layer. Every key mirrors a `DONTPAD_*` variable.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub jwt_secret: Option<String>,
    pub cookie_secure: Option<bool>,
    pub collab_url: Option<String>,
    pub collab_doc_prefix: Option<String>,
    pub cors_origins: Option<String>,
    pub log_filter: Option<String>,
    pub log_format: Option<LogFormat>,
    pub max_upload_bytes: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file `{path}`: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

impl FileConfig {
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }
}

impl ServerConfig {
    /// | Variable | Default |
    /// |---|---|
    /// | `DONTPAD_CONFIG` | *(none)* |
    /// | `DONTPAD_HOST` / `DONTPAD_PORT` | `0.0.0.0` / `3000` |
    /// | `DONTPAD_DATA_DIR` | `./data` |
    /// | `DONTPAD_JWT_SECRET` | dev-only placeholder |
    /// | `DONTPAD_COOKIE_SECURE` | `false` |
    /// | `DONTPAD_COLLAB_URL` | `ys://127.0.0.1:4001` |
    /// | `DONTPAD_COLLAB_DOC_PREFIX` | `doc_` |
    /// | `DONTPAD_CORS_ORIGINS` | *(none, cors.rs uses dev defaults)* |
    /// | `DONTPAD_LOG_FILTER` / `DONTPAD_LOG_FORMAT` | `info` / `text` |
    /// | `DONTPAD_MAX_UPLOAD_BYTES` | 50 MiB |
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = match std::env::var("DONTPAD_CONFIG") {
            Ok(path) if !path.trim().is_empty() => FileConfig::load_from(Path::new(path.trim()))?,
            _ => FileConfig::default(),
        };
        Ok(Self::from_sources(file, |key| std::env::var(key)))
    }

    /// Testable constructor that accepts an environment lookup function.
    pub(crate) fn from_sources<F>(file: FileConfig, env: F) -> Self
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let var = |key: &str| env(key).ok().filter(|value| !value.trim().is_empty());

        let host = var("DONTPAD_HOST").or(file.host).unwrap_or_else(|| "0.0.0.0".into());
        let port = var("DONTPAD_PORT")
            .and_then(|v| v.parse().ok())
            .or(file.port)
            .unwrap_or(3000);
        let listen_addr = format!("{host}:{port}")
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)));

        let data_dir = var("DONTPAD_DATA_DIR")
            .map(PathBuf::from)
            .or(file.data_dir)
            .unwrap_or_else(|| PathBuf::from("./data"));

        let jwt_secret =
            var("DONTPAD_JWT_SECRET").or(file.jwt_secret).unwrap_or_else(|| DEV_JWT_SECRET.into());

        let cookie_secure = var("DONTPAD_COOKIE_SECURE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .or(file.cookie_secure)
            .unwrap_or(false);

        let collab_url = var("DONTPAD_COLLAB_URL")
            .or(file.collab_url)
            .unwrap_or_else(|| FALLBACK_CONNECTION_STRING.into());
        let collab_doc_prefix = env("DONTPAD_COLLAB_DOC_PREFIX")
            .ok()
            .or(file.collab_doc_prefix)
            .unwrap_or_else(|| DEFAULT_DOC_PREFIX.into());

        let cors_origins = var("DONTPAD_CORS_ORIGINS").or(file.cors_origins);
        let log_filter = var("DONTPAD_LOG_FILTER").or(file.log_filter).unwrap_or_else(|| "info".into());
        let log_format = var("DONTPAD_LOG_FORMAT")
            .and_then(|v| LogFormat::parse(&v))
            .or(file.log_format)
            .unwrap_or_default();

        let max_upload_bytes = var("DONTPAD_MAX_UPLOAD_BYTES")
            .and_then(|v| v.parse().ok())
            .or(file.max_upload_bytes)
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Self {
            listen_addr,
            data_dir,
            jwt_secret,
            cookie_secure,
            collab_url,
            collab_doc_prefix,
            cors_origins,
            log_filter,
            log_format,
            max_upload_bytes,
        }
    }

    /// Returns true when using the development-only JWT secret.
    pub fn is_dev_jwt_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}
