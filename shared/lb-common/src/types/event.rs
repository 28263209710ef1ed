//! Inbound Webhook Types
//!
//! The subset of the LINE webhook payload the bot reacts to. Unknown event
//! and message kinds deserialize into catch-all variants instead of failing
//! the whole request.

use serde::{Deserialize, Serialize};

/// Body of a webhook callback request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookBody {
    /// Bot user ID that should receive the events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Events in delivery order.
    pub events: Vec<Event>,
}

/// Kind of a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Message,
    Follow,
    Unfollow,
    Join,
    Leave,
    Postback,
    /// Any event type this bot does not handle.
    #[serde(other)]
    Other,
}

/// A single webhook event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event kind (`type` on the wire).
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// One-time token for replying to this event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_token: Option<String>,
    /// Where the event came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<EventSource>,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub timestamp: i64,
    /// Message content, present for `message` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

impl Event {
    /// Whether this is a `message` event.
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.kind == EventKind::Message
    }

    /// User ID of the sender, if the source carries one.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.source.as_ref().and_then(EventSource::user_id)
    }
}

/// Origin of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventSource {
    #[serde(rename_all = "camelCase")]
    User {
        #[serde(default)]
        user_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Group {
        #[serde(default)]
        group_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Room {
        #[serde(default)]
        room_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl EventSource {
    /// User ID of the sender, if known.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        let user_id = match self {
            Self::User { user_id } => Some(user_id.as_str()),
            Self::Group { user_id, .. } | Self::Room { user_id, .. } => user_id.as_deref(),
            Self::Unknown => None,
        };
        user_id.filter(|id| !id.is_empty())
    }
}

/// Message content of a `message` event.
///
/// Closed over the kinds the bot answers; every other kind lands in
/// [`Message::Unsupported`]. Absent string fields read as empty so one sparse
/// event does not reject its whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Text {
        #[serde(default)]
        id: String,
        #[serde(default)]
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Sticker {
        #[serde(default)]
        id: String,
        #[serde(default)]
        package_id: String,
        #[serde(default)]
        sticker_id: String,
        #[serde(default)]
        sticker_resource_type: String,
    },
    #[serde(other)]
    Unsupported,
}
