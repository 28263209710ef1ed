//! Messaging API Client
//!
//! Outbound reply and broadcast calls to the LINE platform.

use async_trait::async_trait;
use lb_common::{ApiErrorBody, BroadcastRequest, ReplyRequest, SendMessage};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

/// Messaging API errors.
#[derive(Debug, Error)]
pub enum LineError {
    /// Transport-level failure.
    #[error("LINE API request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success response from the platform.
    #[error("LINE API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message reported by the platform.
        message: String,
    },
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Answer a single event. A reply token is accepted at most once by the
    /// platform.
    async fn reply(&self, reply_token: &str, messages: Vec<SendMessage>) -> Result<(), LineError>;

    /// Send messages to every subscriber of the bot channel.
    async fn broadcast(&self, messages: Vec<SendMessage>) -> Result<(), LineError>;
}

/// HTTP client for the LINE Messaging API.
#[derive(Clone)]
pub struct LineClient {
    http: reqwest::Client,
    base_url: String,
    channel_token: String,
}

impl LineClient {
    /// Create a client from configuration.
    pub fn new(config: &Config) -> Result<Self, LineError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("lb-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_http(
            http,
            &config.line_api_base_url,
            &config.channel_token,
        ))
    }

    /// Create a client around an existing HTTP client.
    pub fn with_http(http: reqwest::Client, base_url: &str, channel_token: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            channel_token: channel_token.to_string(),
        }
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<(), LineError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.channel_token)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            debug!(path, status = status.as_u16(), "LINE API call succeeded");
            return Ok(());
        }

        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .map(|b| b.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or(text);

        Err(LineError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ChatClient for LineClient {
    async fn reply(&self, reply_token: &str, messages: Vec<SendMessage>) -> Result<(), LineError> {
        let body = ReplyRequest {
            reply_token: reply_token.to_string(),
            messages,
        };
        self.post("/v2/bot/message/reply", &body).await
    }

    async fn broadcast(&self, messages: Vec<SendMessage>) -> Result<(), LineError> {
        let body = BroadcastRequest { messages };
        self.post("/v2/bot/message/broadcast", &body).await
    }
}
