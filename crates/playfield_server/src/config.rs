//! # Server Configuration
//!
//! ```toml
//! bind = "0.0.0.0:3000"
//! max_body_bytes = 8388608
//!
//! [lyrics]
//! upstream = "127.0.0.1:8081"
//! path = "/api/get"
//! timeout_ms = 5000
//! ```
//!
//! Lyrics lookups speak plain HTTP only. Lookup is off unless `upstream` is
//! set; a TLS-only service such as the public LRCLIB needs a plain-HTTP
//! proxy in front of it, and an upstream on port 443 is rejected.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use playfield_shared::constants::SERVER_BIND;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Default request body limit; submissions carry base64 images.
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Default request line + headers limit.
pub const DEFAULT_MAX_HEAD_BYTES: usize = 16 * 1024;

/// Lyrics upstream settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LyricsConfig {
    /// `host:port` of an LRCLIB-compatible service reachable over plain
    /// HTTP; `None` (the default) disables lookup.
    pub upstream: Option<String>,
    /// Lookup path on the upstream.
    pub path: String,
    /// Whole-lookup timeout (milliseconds).
    pub timeout_ms: u64,
}

impl LyricsConfig {
    /// Lookup timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            upstream: None,
            path: "/api/get".to_string(),
            timeout_ms: 5_000,
        }
    }
}

/// Complete server configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: SocketAddr,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Largest accepted request head.
    pub max_head_bytes: usize,
    /// Time allowed to receive a full request (milliseconds).
    pub read_timeout_ms: u64,
    /// Lyrics upstream.
    pub lyrics: LyricsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_head_bytes: DEFAULT_MAX_HEAD_BYTES,
            read_timeout_ms: 10_000,
            lyrics: LyricsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::ConfigParse`] or [`ServerError::Config`].
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the file cannot be read, otherwise as
    /// [`ServerConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Request read timeout as a `Duration`.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Checks limits and the upstream address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] naming the first bad value.
    pub fn validate(&self) -> ServerResult<()> {
        if self.max_body_bytes == 0 {
            return Err(ServerError::Config("max_body_bytes must be positive".into()));
        }
        if self.max_head_bytes < 256 {
            return Err(ServerError::Config("max_head_bytes must be at least 256".into()));
        }
        if self.read_timeout_ms == 0 {
            return Err(ServerError::Config("read_timeout_ms must be positive".into()));
        }
        if self.lyrics.timeout_ms == 0 {
            return Err(ServerError::Config("lyrics.timeout_ms must be positive".into()));
        }
        if !self.lyrics.path.starts_with('/') {
            return Err(ServerError::Config("lyrics.path must start with '/'".into()));
        }
        if let Some(upstream) = &self.lyrics.upstream {
            let valid = upstream
                .rsplit_once(':')
                .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
            if !valid {
                return Err(ServerError::Config(format!(
                    "lyrics.upstream '{upstream}' must be host:port"
                )));
            }
            if upstream.ends_with(":443") {
                return Err(ServerError::Config(format!(
                    "lyrics.upstream '{upstream}' is a TLS port; lookups use plain HTTP"
                )));
            }
        }
        Ok(())
    }
}

/// The default bind address as text, for CLI help.
#[must_use]
pub fn default_bind() -> &'static str {
    SERVER_BIND
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind.to_string(), default_bind());
        assert!(config.lyrics.upstream.is_none());
    }

    #[test]
    fn test_partial_toml() {
        let config = ServerConfig::from_toml_str(
            r#"
            bind = "127.0.0.1:8080"

            [lyrics]
            upstream = "lyrics.internal:9000"
            "#,
        )
        .unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.lyrics.upstream.as_deref(), Some("lyrics.internal:9000"));
        assert_eq!(config.lyrics.path, "/api/get");
    }

    #[test]
    fn test_bad_upstream_rejected() {
        let err = ServerConfig::from_toml_str("[lyrics]\nupstream = \"no-port\"\n").unwrap_err();
        assert!(matches!(err, ServerError::Config(msg) if msg.contains("host:port")));
    }

    #[test]
    fn test_tls_upstream_rejected() {
        let err =
            ServerConfig::from_toml_str("[lyrics]\nupstream = \"lrclib.net:443\"\n").unwrap_err();
        assert!(matches!(err, ServerError::Config(msg) if msg.contains("plain HTTP")));
    }
}
