//! Client configuration and access-token resolution.
//!
//! `ClientConfig` is what an embedder writes (in code or in a TOML file).
//! `ResolvedConfig` is what the client runs with: the token has been found,
//! the endpoint checked, and nothing changes after construction.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{TraqError, TraqResult};

/// User-facing client configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Bot access token. Falls back to `TRAQ_ACCESS_TOKEN` when unset.
    #[serde(default)]
    pub token: Option<String>,

    /// Emit advisory diagnostics (malformed frames, event kinds, liveness reconnects).
    #[serde(default)]
    pub debug: bool,

    /// WebSocket endpoint of the bot gateway.
    #[serde(default = "default_url")]
    pub url: String,

    /// Period of the liveness probe in milliseconds.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
}

fn default_url() -> String {
    constants::DEFAULT_WS_URL.to_string()
}

fn default_heartbeat_interval() -> u64 {
    constants::DEFAULT_HEARTBEAT_INTERVAL_MS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: None,
            debug: false,
            url: default_url(),
            heartbeat_interval_ms: default_heartbeat_interval(),
        }
    }
}

impl ClientConfig {
    /// Configuration with an explicit token and everything else defaulted.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Enable or disable diagnostics.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> TraqResult<Self> {
        let config: ClientConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> TraqResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Resolve against the process environment.
    pub fn resolve(self) -> TraqResult<ResolvedConfig> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve with an injected environment lookup.
    ///
    /// The token comes from the explicit field first, then from
    /// `TRAQ_ACCESS_TOKEN` via `lookup`. Blank values count as absent.
    pub fn resolve_with<F>(self, lookup: F) -> TraqResult<ResolvedConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = self
            .token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| lookup(constants::TOKEN_ENV_VAR).filter(|t| !t.trim().is_empty()))
            .ok_or(TraqError::MissingToken(constants::TOKEN_ENV_VAR))?;

        let url = self.url.trim().to_string();
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(TraqError::Config(format!(
                "gateway url must use ws:// or wss://, got {url:?}"
            )));
        }

        if self.heartbeat_interval_ms == 0 {
            return Err(TraqError::Config(
                "heartbeat_interval_ms must be greater than zero".into(),
            ));
        }

        Ok(ResolvedConfig {
            token,
            debug: self.debug,
            url,
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
        })
    }
}

/// Validated, immutable configuration the client runs with.
#[derive(Clone)]
pub struct ResolvedConfig {
    token: String,
    debug: bool,
    url: String,
    heartbeat_interval: Duration,
}

impl ResolvedConfig {
    /// The bearer token sent when opening a connection.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether advisory diagnostics are enabled.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Gateway endpoint.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Period of the liveness probe.
    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("debug", &self.debug)
            .field("url", &self.url)
            .field("heartbeat_interval_ms", &self.heartbeat_interval_ms)
            .finish()
    }
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("token", &"<redacted>")
            .field("debug", &self.debug)
            .field("url", &self.url)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.url, "wss://q.trap.jp/api/v3/bots/ws");
        assert_eq!(config.heartbeat_interval_ms, 1000);
        assert!(!config.debug);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_explicit_token_wins_over_env() {
        let resolved = ClientConfig::with_token("explicit")
            .resolve_with(|_| Some("from-env".into()))
            .unwrap();
        assert_eq!(resolved.token(), "explicit");
    }

    #[test]
    fn test_env_fallback() {
        let resolved = ClientConfig::default()
            .resolve_with(|key| (key == "TRAQ_ACCESS_TOKEN").then(|| "from-env".to_string()))
            .unwrap();
        assert_eq!(resolved.token(), "from-env");
    }

    #[test]
    fn test_missing_token_fails() {
        let err = ClientConfig::default().resolve_with(no_env).unwrap_err();
        assert!(matches!(err, TraqError::MissingToken("TRAQ_ACCESS_TOKEN")));
    }

    #[test]
    fn test_blank_token_counts_as_missing() {
        let err = ClientConfig::with_token("   ")
            .resolve_with(|_| Some(String::new()))
            .unwrap_err();
        assert!(matches!(err, TraqError::MissingToken(_)));
    }

    #[test]
    fn test_rejects_non_websocket_url() {
        let mut config = ClientConfig::with_token("t");
        config.url = "https://q.trap.jp/api/v3/bots/ws".into();
        let err = config.resolve_with(no_env).unwrap_err();
        assert!(matches!(err, TraqError::Config(_)));
    }

    #[test]
    fn test_rejects_zero_heartbeat() {
        let mut config = ClientConfig::with_token("t");
        config.heartbeat_interval_ms = 0;
        assert!(config.resolve_with(no_env).is_err());
    }

    #[test]
    fn test_debug_output_redacts_token() {
        let resolved = ClientConfig::with_token("s3cret").resolve_with(no_env).unwrap();
        let printed = format!("{resolved:?}");
        assert!(!printed.contains("s3cret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_client_config_debug_redacts_token() {
        let printed = format!("{:?}", ClientConfig::with_token("s3cret"));
        assert!(!printed.contains("s3cret"));
        assert!(printed.contains("<redacted>"));

        let printed = format!("{:?}", ClientConfig::default());
        assert!(printed.contains("token: None"));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = ClientConfig::from_toml_str("debug = true\ntoken = \"abc\"\n").unwrap();
        assert!(config.debug);
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.heartbeat_interval_ms, 1000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traq.toml");
        std::fs::write(&path, "url = \"ws://localhost:3000/api/v3/bots/ws\"\n").unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.url, "ws://localhost:3000/api/v3/bots/ws");
    }

    #[test]
    fn test_roundtrip_toml() {
        let config = ClientConfig::with_token("t").debug(true);
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: ClientConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.url, config.url);
        assert!(deserialized.debug);
    }
}
