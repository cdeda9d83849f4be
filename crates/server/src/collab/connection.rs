use std::fmt;
use std::str::FromStr;

use url::Url;

use super::client::CollabError;

/// A parsed `ys://[token@]host[:port][/prefix]` connection string.
/// `yss://` selects TLS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    raw: String,
    base_url: String,
    host: String,
    port: u16,
    token: Option<String>,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self, CollabError> {
        let invalid = |reason: &str| CollabError::InvalidConnectionString {
            value: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw.trim()).map_err(|error| invalid(&error.to_string()))?;
        let (http_scheme, default_port) = match url.scheme() {
            "ys" => ("http", 80),
            "yss" => ("https", 443),
            other => return Err(invalid(&format!("unsupported scheme `{other}`"))),
        };
        let host = url.host_str().filter(|host| !host.is_empty()).ok_or_else(|| invalid("missing host"))?;
        let port = url.port().unwrap_or(default_port);
        let token = Some(url.username()).filter(|name| !name.is_empty()).map(str::to_string);
        let prefix = url.path().trim_end_matches('/');

        Ok(Self {
            raw: raw.trim().to_string(),
            base_url: format!("{http_scheme}://{host}:{port}{prefix}"),
            host: host.to_string(),
            port,
            token,
        })
    }

    /// HTTP(S) base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for ConnectionString {
    type Err = CollabError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
