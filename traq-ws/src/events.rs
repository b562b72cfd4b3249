//! Bot gateway event kinds, the decoded event value, and typed body views.
//!
//! The gateway sends one JSON object per frame: `{"type": KIND, "body": {...}}`.
//! `EventKind` is the closed set of kinds this client understands. Bodies
//! are kept verbatim as JSON so nothing the server sends is lost; the
//! payload structs below are optional typed views over them.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use traq_core::DecodeError;

/// All event kinds emitted by the traQ bot gateway.
///
/// Wire names are the SCREAMING_SNAKE_CASE form of the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Liveness check from the server (`PING`).
    Ping,
    /// The bot joined a channel (`JOINED`).
    Joined,
    /// The bot left a channel (`LEFT`).
    Left,
    /// A message was posted in a channel the bot watches (`MESSAGE_CREATED`).
    MessageCreated,
    /// A message was deleted (`MESSAGE_DELETED`).
    MessageDeleted,
    /// A message was edited (`MESSAGE_UPDATED`).
    MessageUpdated,
    /// Stamps on one of the bot's messages changed (`BOT_MESSAGE_STAMPS_UPDATED`).
    BotMessageStampsUpdated,
    /// A direct message was sent to the bot (`DIRECT_MESSAGE_CREATED`).
    DirectMessageCreated,
    /// A direct message was deleted (`DIRECT_MESSAGE_DELETED`).
    DirectMessageDeleted,
    /// A direct message was edited (`DIRECT_MESSAGE_UPDATED`).
    DirectMessageUpdated,
    /// A channel was created (`CHANNEL_CREATED`).
    ChannelCreated,
    /// A channel topic changed (`CHANNEL_TOPIC_CHANGED`).
    ChannelTopicChanged,
    /// A user account was created (`USER_CREATED`).
    UserCreated,
    /// A user account was reactivated (`USER_ACTIVATED`).
    UserActivated,
    /// A stamp was created (`STAMP_CREATED`).
    StampCreated,
    /// A tag was added to the bot (`TAG_ADDED`).
    TagAdded,
    /// A tag was removed from the bot (`TAG_REMOVED`).
    TagRemoved,
    /// A user group was created (`USER_GROUP_CREATED`).
    UserGroupCreated,
    /// A user group was updated (`USER_GROUP_UPDATED`).
    UserGroupUpdated,
    /// A user group was deleted (`USER_GROUP_DELETED`).
    UserGroupDeleted,
    /// A member joined a user group (`USER_GROUP_MEMBER_ADDED`).
    UserGroupMemberAdded,
    /// A group member's role changed (`USER_GROUP_MEMBER_UPDATED`).
    UserGroupMemberUpdated,
    /// A member left a user group (`USER_GROUP_MEMBER_REMOVED`).
    UserGroupMemberRemoved,
    /// An admin was added to a user group (`USER_GROUP_ADMIN_ADDED`).
    UserGroupAdminAdded,
    /// An admin was removed from a user group (`USER_GROUP_ADMIN_REMOVED`).
    UserGroupAdminRemoved,
    /// The gateway reported an error (`ERROR`).
    Error,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 26] = [
        Self::Ping,
        Self::Joined,
        Self::Left,
        Self::MessageCreated,
        Self::MessageDeleted,
        Self::MessageUpdated,
        Self::BotMessageStampsUpdated,
        Self::DirectMessageCreated,
        Self::DirectMessageDeleted,
        Self::DirectMessageUpdated,
        Self::ChannelCreated,
        Self::ChannelTopicChanged,
        Self::UserCreated,
        Self::UserActivated,
        Self::StampCreated,
        Self::TagAdded,
        Self::TagRemoved,
        Self::UserGroupCreated,
        Self::UserGroupUpdated,
        Self::UserGroupDeleted,
        Self::UserGroupMemberAdded,
        Self::UserGroupMemberUpdated,
        Self::UserGroupMemberRemoved,
        Self::UserGroupAdminAdded,
        Self::UserGroupAdminRemoved,
        Self::Error,
    ];

    /// Look up a kind by its wire name.
    pub fn parse(s: &str) -> Option<Self> {
        let kind = match s {
            "PING" => Self::Ping,
            "JOINED" => Self::Joined,
            "LEFT" => Self::Left,
            "MESSAGE_CREATED" => Self::MessageCreated,
            "MESSAGE_DELETED" => Self::MessageDeleted,
            "MESSAGE_UPDATED" => Self::MessageUpdated,
            "BOT_MESSAGE_STAMPS_UPDATED" => Self::BotMessageStampsUpdated,
            "DIRECT_MESSAGE_CREATED" => Self::DirectMessageCreated,
            "DIRECT_MESSAGE_DELETED" => Self::DirectMessageDeleted,
            "DIRECT_MESSAGE_UPDATED" => Self::DirectMessageUpdated,
            "CHANNEL_CREATED" => Self::ChannelCreated,
            "CHANNEL_TOPIC_CHANGED" => Self::ChannelTopicChanged,
            "USER_CREATED" => Self::UserCreated,
            "USER_ACTIVATED" => Self::UserActivated,
            "STAMP_CREATED" => Self::StampCreated,
            "TAG_ADDED" => Self::TagAdded,
            "TAG_REMOVED" => Self::TagRemoved,
            "USER_GROUP_CREATED" => Self::UserGroupCreated,
            "USER_GROUP_UPDATED" => Self::UserGroupUpdated,
            "USER_GROUP_DELETED" => Self::UserGroupDeleted,
            "USER_GROUP_MEMBER_ADDED" => Self::UserGroupMemberAdded,
            "USER_GROUP_MEMBER_UPDATED" => Self::UserGroupMemberUpdated,
            "USER_GROUP_MEMBER_REMOVED" => Self::UserGroupMemberRemoved,
            "USER_GROUP_ADMIN_ADDED" => Self::UserGroupAdminAdded,
            "USER_GROUP_ADMIN_REMOVED" => Self::UserGroupAdminRemoved,
            "ERROR" => Self::Error,
            _ => return None,
        };
        Some(kind)
    }

    /// The wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ping => "PING",
            Self::Joined => "JOINED",
            Self::Left => "LEFT",
            Self::MessageCreated => "MESSAGE_CREATED",
            Self::MessageDeleted => "MESSAGE_DELETED",
            Self::MessageUpdated => "MESSAGE_UPDATED",
            Self::BotMessageStampsUpdated => "BOT_MESSAGE_STAMPS_UPDATED",
            Self::DirectMessageCreated => "DIRECT_MESSAGE_CREATED",
            Self::DirectMessageDeleted => "DIRECT_MESSAGE_DELETED",
            Self::DirectMessageUpdated => "DIRECT_MESSAGE_UPDATED",
            Self::ChannelCreated => "CHANNEL_CREATED",
            Self::ChannelTopicChanged => "CHANNEL_TOPIC_CHANGED",
            Self::UserCreated => "USER_CREATED",
            Self::UserActivated => "USER_ACTIVATED",
            Self::StampCreated => "STAMP_CREATED",
            Self::TagAdded => "TAG_ADDED",
            Self::TagRemoved => "TAG_REMOVED",
            Self::UserGroupCreated => "USER_GROUP_CREATED",
            Self::UserGroupUpdated => "USER_GROUP_UPDATED",
            Self::UserGroupDeleted => "USER_GROUP_DELETED",
            Self::UserGroupMemberAdded => "USER_GROUP_MEMBER_ADDED",
            Self::UserGroupMemberUpdated => "USER_GROUP_MEMBER_UPDATED",
            Self::UserGroupMemberRemoved => "USER_GROUP_MEMBER_REMOVED",
            Self::UserGroupAdminAdded => "USER_GROUP_ADMIN_ADDED",
            Self::UserGroupAdminRemoved => "USER_GROUP_ADMIN_REMOVED",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| DecodeError::UnknownType(s.to_string()))
    }
}

/// A decoded gateway event.
///
/// Built fresh for every inbound frame and handed to at most one handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// The event discriminant.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// The body exactly as the server sent it.
    pub body: serde_json::Value,
}

impl Event {
    /// Deserialize the body into a typed payload.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        parse_body(self.kind, self.body.clone())
    }
}

/// Deserialize a body into a typed payload, tagging failures with the kind.
pub(crate) fn parse_body<T: DeserializeOwned>(
    kind: EventKind,
    body: serde_json::Value,
) -> Result<T, DecodeError> {
    serde_json::from_value(body).map_err(|e| DecodeError::BodyShape {
        kind: kind.as_str().to_string(),
        reason: e.to_string(),
    })
}

/// Body of `PING`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingPayload {
    /// When the server emitted the event (RFC 3339).
    pub event_time: String,
}

/// Body of `ERROR`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable error description.
    pub message: String,
}

/// A traQ user as embedded in event bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub icon_id: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

/// A traQ channel as embedded in event bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub name: String,
    /// Full path, e.g. `#general/random`.
    pub path: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub creator: Option<User>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Body of `JOINED`, `LEFT` and `CHANNEL_CREATED`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPayload {
    pub event_time: String,
    pub channel: Channel,
}

/// An embedded reference (mention, channel link) inside a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedded {
    pub raw: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

/// A message as embedded in message event bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub user: User,
    pub channel_id: String,
    /// Raw text including embed markup.
    pub text: String,
    /// Text with embeds rendered as plain strings.
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub embedded: Vec<Embedded>,
    pub created_at: String,
    pub updated_at: String,
}

/// Body of the created/updated message and direct message kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub event_time: String,
    pub message: Message,
}

/// The message reference carried by deletion events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedMessage {
    pub id: String,
    pub channel_id: String,
    /// Present for direct messages only.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Body of `MESSAGE_DELETED` and `DIRECT_MESSAGE_DELETED`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeletedPayload {
    pub event_time: String,
    pub message: DeletedMessage,
}

/// Connection state of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport is open and none is being opened.
    Idle,
    /// A transport is being opened.
    Connecting,
    /// The transport is open and events are flowing.
    Open,
    /// The transport closed; its handle is being released.
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
        }
    }
}
