//! Error types for the traQ client.
//!
//! Setup failures (configuration, registration) are returned to the caller.
//! Everything that goes wrong after `listen()` starts is logged and absorbed
//! by the connection loop, so those variants only ever travel internally.

use thiserror::Error;

/// Convenience type alias for Results using TraqError.
pub type TraqResult<T> = Result<T, TraqError>;

/// Unified error type for the traQ client.
#[derive(Error, Debug)]
pub enum TraqError {
    // -- Setup errors --
    /// No access token was given and the environment fallback is unset.
    #[error("no access token: pass one explicitly or set {0}")]
    MissingToken(&'static str),

    /// A configuration value is present but unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// A handler is already registered for this event kind.
    #[error("a handler for {0} is already registered")]
    DuplicateHandler(String),

    /// `listen()` was called while another call on the same client runs.
    #[error("client is already listening")]
    AlreadyListening,

    // -- Runtime errors --
    /// An inbound payload could not be turned into an event.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The heartbeat probe failed on an open connection.
    #[error("liveness probe failed: {0}")]
    Liveness(String),

    /// Any other transport-level fault.
    #[error("transport error: {0}")]
    Transport(String),

    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for TraqError {
    fn from(e: toml::de::Error) -> Self {
        TraqError::Config(e.to_string())
    }
}

/// Reasons an inbound frame is rejected by the decoder.
///
/// A decode error drops the offending frame; the connection stays up.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The frame is not valid JSON (or not valid UTF-8 for binary frames).
    #[error("invalid json: {0}")]
    InvalidJson(String),

    /// The payload parsed, but is not a JSON object.
    #[error("payload is not a json object")]
    NotAnObject,

    /// The payload has no string `type` field.
    #[error("payload has no `type` discriminant")]
    MissingType,

    /// The `type` field names an event kind this client does not know.
    #[error("unknown event type: {0}")]
    UnknownType(String),

    /// The payload has no `body` field.
    #[error("payload for {0} has no `body`")]
    MissingBody(String),

    /// The body does not have the shape its event kind requires.
    #[error("body of {kind} has the wrong shape: {reason}")]
    BodyShape {
        /// Wire name of the event kind.
        kind: String,
        /// What the shape check tripped on.
        reason: String,
    },
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError::InvalidJson(e.to_string())
    }
}
