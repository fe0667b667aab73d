//! Shared mock relay for integration tests.
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

use league_schedule_bot::error::ParseError;
use league_schedule_bot::relay::ChatRelay;
use league_schedule_bot::types::ChatMessage;

/// A posted/edited board message as the mock saw it.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub channel: String,
    pub id: String,
    pub content: String,
}

/// Mock chat relay: serves a fixed channel history and records everything
/// the bot sends.
pub struct MockRelay {
    history: Vec<ChatMessage>,
    posted: Mutex<Vec<SentMessage>>,
    edits: Mutex<Vec<SentMessage>>,
    deleted: Mutex<Vec<String>>,
    /// Message ids that 404 on edit, simulating out-of-band deletion.
    vanished: Mutex<Vec<String>>,
    /// Remaining posts allowed before post_message starts returning 500s.
    post_budget: AtomicI64,
    next_id: AtomicU64,
}

impl MockRelay {
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
            posted: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            vanished: Mutex::new(Vec::new()),
            post_budget: AtomicI64::new(i64::MAX),
            next_id: AtomicU64::new(900_000),
        }
    }

    pub fn with_history(mut self, messages: Vec<ChatMessage>) -> Self {
        self.history = messages;
        self
    }

    /// Make a future edit of `message_id` fail with a 404.
    pub fn vanish(&self, message_id: &str) {
        self.vanished.lock().unwrap().push(message_id.to_string());
    }

    /// Allow `n` more successful posts; every post after that fails with
    /// a 500, simulating a relay outage mid-publish.
    pub fn fail_posts_after(&self, n: i64) {
        self.post_budget.store(n, Ordering::SeqCst);
    }

    pub fn posted(&self) -> Vec<SentMessage> {
        self.posted.lock().unwrap().clone()
    }

    pub fn posted_to(&self, channel: &str) -> Vec<SentMessage> {
        self.posted()
            .into_iter()
            .filter(|m| m.channel == channel)
            .collect()
    }

    pub fn edits(&self) -> Vec<SentMessage> {
        self.edits.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatRelay for MockRelay {
    async fn post_message(&self, channel_id: &str, content: &str) -> Result<String> {
        if self.post_budget.fetch_sub(1, Ordering::SeqCst) <= 0 {
            return Err(ParseError::RelayHttp {
                status: 500,
                message: "Internal Server Error".to_string(),
            }
            .into());
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        self.posted.lock().unwrap().push(SentMessage {
            channel: channel_id.to_string(),
            id: id.clone(),
            content: content.to_string(),
        });
        Ok(id)
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<String> {
        if self.vanished.lock().unwrap().iter().any(|v| v == message_id) {
            return Err(ParseError::RelayHttp {
                status: 404,
                message: "Unknown Message".to_string(),
            }
            .into());
        }
        self.edits.lock().unwrap().push(SentMessage {
            channel: channel_id.to_string(),
            id: message_id.to_string(),
            content: content.to_string(),
        });
        Ok(message_id.to_string())
    }

    async fn delete_message(&self, _channel_id: &str, message_id: &str) -> Result<bool> {
        self.deleted.lock().unwrap().push(message_id.to_string());
        Ok(true)
    }

    async fn fetch_messages(
        &self,
        _channel_id: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>> {
        let after_id: u64 = after.and_then(|a| a.parse().ok()).unwrap_or(0);
        let mut page: Vec<ChatMessage> = self
            .history
            .iter()
            .filter(|m| m.snowflake() > after_id)
            .cloned()
            .collect();
        // The page is the oldest messages above the cursor, but handed back
        // newest-first; callers must re-sort.
        page.sort_by_key(ChatMessage::snowflake);
        page.truncate(limit);
        page.reverse();
        Ok(page)
    }

    async fn fetch_message(
        &self,
        _channel_id: &str,
        message_id: &str,
    ) -> Result<Option<ChatMessage>> {
        Ok(self.history.iter().find(|m| m.id == message_id).cloned())
    }
}

/// Chat message fixture with a fixed timestamp.
pub fn chat_msg(id: &str, content: &str, day: u32) -> ChatMessage {
    ChatMessage {
        id: id.to_string(),
        content: content.to_string(),
        author: "captain".to_string(),
        timestamp: Utc.with_ymd_and_hms(2025, 9, day, 16, 0, 0).unwrap(),
    }
}
