//! Client-wide constants.

/// Environment variable consulted when no token is configured.
pub const TOKEN_ENV_VAR: &str = "TRAQ_ACCESS_TOKEN";

/// Bot gateway endpoint of the public traQ instance.
pub const DEFAULT_WS_URL: &str = "wss://q.trap.jp/api/v3/bots/ws";

/// Liveness probe period in milliseconds.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 1_000;

/// Log file name prefix used by the rolling file appender.
pub const LOG_FILE_PREFIX: &str = "traq-ws.log";
