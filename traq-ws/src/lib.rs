//! traQ WebSocket - bot gateway client for real-time event streaming.
//!
//! This crate provides:
//! - Typed event kinds and body views for the traQ bot gateway
//! - A handler registry with one callback per event kind
//! - Frame decoding and dispatch that never takes the connection down
//! - A connection manager with a fixed-period liveness probe and
//!   immediate, unbounded reconnection

pub mod decoder;
pub mod events;
pub mod manager;
pub mod registry;
pub mod transport;

// Re-export key types
pub use decoder::{decode, decode_and_dispatch, decode_frame};
pub use events::{
    ChannelPayload, ConnectionState, ErrorPayload, Event, EventKind, MessageDeletedPayload,
    MessagePayload, PingPayload,
};
pub use manager::{Client, OpenCallback};
pub use registry::{Handler, HandlerRegistry};
pub use transport::{Connector, Frame, Transport, WsConnector};

pub use traq_core::{ClientConfig, DecodeError, TraqError, TraqResult};
