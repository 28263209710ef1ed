//! Webhook Callback Handler
//!
//! Verifies the platform signature, parses the event batch and answers
//! message events in request order.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use lb_common::{Event, Message, SendMessage, WebhookBody};
use thiserror::Error;
use tracing::{info, warn};

use super::client::ChatClient;
use super::signing::{verify_signature, SIGNATURE_HEADER};
use crate::api::AppState;
use crate::error::error_response;

/// Errors returned to the platform by the callback endpoint.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// Signature header missing or not matching the body.
    #[error("invalid signature")]
    InvalidSignature,

    /// Body is not a webhook document.
    #[error("malformed webhook body: {0}")]
    MalformedRequest(#[from] serde_json::Error),
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidSignature => StatusCode::BAD_REQUEST,
            Self::MalformedRequest(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, self.to_string())
    }
}

/// Receive webhook events from the LINE platform.
///
/// POST /callback
#[utoipa::path(
    post,
    path = "/callback",
    tag = "webhook",
    request_body(content = String, content_type = "application/json"),
    params(("X-Line-Signature" = String, Header, description = "Base64 HMAC-SHA256 of the body")),
    responses(
        (status = 200, description = "Events accepted"),
        (status = 400, body = crate::error::ErrorResponse, description = "Invalid signature"),
        (status = 500, body = crate::error::ErrorResponse, description = "Malformed body"),
    ),
)]
#[tracing::instrument(skip(state, headers, body), fields(body_len = body.len()))]
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, CallbackError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(CallbackError::InvalidSignature)?;

    if !verify_signature(&state.config.channel_secret, &body, signature) {
        warn!("Rejected webhook with invalid signature");
        return Err(CallbackError::InvalidSignature);
    }

    let webhook: WebhookBody = serde_json::from_slice(&body)?;
    dispatch_events(state.chat.as_ref(), &webhook.events).await;

    Ok(StatusCode::OK)
}

/// Build the reply for a message, if the bot answers that kind.
pub fn reply_for(message: &Message) -> Option<SendMessage> {
    match message {
        Message::Text { text, .. } => Some(SendMessage::text(text.clone())),
        Message::Sticker {
            sticker_id,
            sticker_resource_type,
            ..
        } => Some(SendMessage::text(format!(
            "sticker id is {sticker_id}, stickerResourceType is {sticker_resource_type}"
        ))),
        Message::Unsupported => None,
    }
}

/// Reply to every message event. Delivery failures are logged and skipped.
pub async fn dispatch_events(chat: &dyn ChatClient, events: &[Event]) {
    for event in events {
        info!(user_id = event.user_id().unwrap_or_default(), kind = ?event.kind, "Webhook event");

        if !event.is_message() {
            continue;
        }
        let Some(reply) = event.message.as_ref().and_then(reply_for) else {
            continue;
        };
        let Some(reply_token) = event.reply_token.as_deref() else {
            warn!("Message event without reply token, skipping");
            continue;
        };

        if let Err(e) = chat.reply(reply_token, vec![reply]).await {
            warn!(error = %e, "Failed to deliver reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_echoed() {
        let reply = reply_for(&Message::Text {
            id: "1".into(),
            text: "こんにちは".into(),
        });
        assert_eq!(reply, Some(SendMessage::text("こんにちは")));
    }

    #[test]
    fn sticker_reply_format() {
        let reply = reply_for(&Message::Sticker {
            id: "1".into(),
            package_id: "446".into(),
            sticker_id: "1988".into(),
            sticker_resource_type: "STATIC".into(),
        });
        assert_eq!(
            reply,
            Some(SendMessage::text(
                "sticker id is 1988, stickerResourceType is STATIC"
            ))
        );
    }

    #[test]
    fn unsupported_message_has_no_reply() {
        assert_eq!(reply_for(&Message::Unsupported), None);
    }
}
