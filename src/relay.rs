//! Chat relay client.
//!
//! The pipeline only ever talks to the relay through the [`ChatRelay`] trait
//! so tests can inject a mock. The production implementation is a thin
//! Discord-style REST client: snowflake message ids, bot-token auth, bounded
//! request timeout, and bounded retry on the idempotent history fetches.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config;
use crate::error::ParseError;
use crate::retry::{retry_async, RetryPolicy};
use crate::types::ChatMessage;

/// Message primitives the core needs from the chat platform.
#[async_trait]
pub trait ChatRelay: Send + Sync {
    /// Post a new message; returns the new message id.
    async fn post_message(&self, channel_id: &str, content: &str) -> Result<String>;

    /// Edit an existing message in place; returns the message id.
    async fn edit_message(&self, channel_id: &str, message_id: &str, content: &str)
        -> Result<String>;

    /// Delete a message. Returns false when it was already gone.
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<bool>;

    /// Fetch up to `limit` messages strictly after `after` (or the most
    /// recent ones when `after` is None). Page order is relay-defined;
    /// callers must re-sort.
    async fn fetch_messages(
        &self,
        channel_id: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>>;

    /// Fetch a single message, or None when it no longer exists.
    async fn fetch_message(&self, channel_id: &str, message_id: &str)
        -> Result<Option<ChatMessage>>;
}

/// True when the error is a relay 404 (message gone upstream).
pub fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ParseError>(),
        Some(ParseError::RelayHttp { status: 404, .. })
    )
}

/// Discord-style REST implementation.
pub struct DiscordRelay {
    client: reqwest::Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
}

impl DiscordRelay {
    pub fn new(token: String) -> Result<Self> {
        Self::with_base_url(token, config::RELAY_API_BASE.to_string())
    }

    pub fn with_base_url(token: String, base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config::http_timeout_secs()))
            .build()
            .context("building relay HTTP client")?;
        Ok(Self {
            client,
            base_url,
            token,
            retry: RetryPolicy::from_env(),
        })
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(ParseError::RelayHttp {
            status: status.as_u16(),
            message,
        }
        .into())
    }
}

#[async_trait]
impl ChatRelay for DiscordRelay {
    async fn post_message(&self, channel_id: &str, content: &str) -> Result<String> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&json!({ "content": content }))
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        let msg: ChatMessage = resp.json().await.context("decoding posted message")?;
        debug!("posted message {} to channel {}", msg.id, channel_id);
        Ok(msg.id)
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<String> {
        let url = format!(
            "{}/channels/{}/messages/{}",
            self.base_url, channel_id, message_id
        );
        let resp = self
            .client
            .patch(&url)
            .header("Authorization", self.auth_header())
            .json(&json!({ "content": content }))
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        let msg: ChatMessage = resp.json().await.context("decoding edited message")?;
        Ok(msg.id)
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<bool> {
        let url = format!(
            "{}/channels/{}/messages/{}",
            self.base_url, channel_id, message_id
        );
        let resp = self
            .client
            .delete(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        if resp.status().as_u16() == 404 {
            return Ok(false);
        }
        Self::check_status(resp).await?;
        Ok(true)
    }

    async fn fetch_messages(
        &self,
        channel_id: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>> {
        let mut url = format!(
            "{}/channels/{}/messages?limit={}",
            self.base_url, channel_id, limit
        );
        if let Some(after_id) = after {
            url.push_str(&format!("&after={}", after_id));
        }

        retry_async(&self.retry, "fetch_messages", || {
            let url = url.clone();
            async move {
                let resp = self
                    .client
                    .get(&url)
                    .header("Authorization", self.auth_header())
                    .send()
                    .await?;
                let resp = Self::check_status(resp).await?;
                let messages: Vec<ChatMessage> =
                    resp.json().await.context("decoding message page")?;
                Ok(messages)
            }
        })
        .await
    }

    async fn fetch_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<Option<ChatMessage>> {
        let url = format!(
            "{}/channels/{}/messages/{}",
            self.base_url, channel_id, message_id
        );
        let resp = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        let resp = Self::check_status(resp).await?;
        let msg: ChatMessage = resp.json().await.context("decoding fetched message")?;
        Ok(Some(msg))
    }
}
