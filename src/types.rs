//! Core types for the schedule pipeline and publication engine.
//!
//! These structs capture the league roster, the weekly grid, the per-message
//! update pairs produced by the interpretation pipeline, and the two pieces of
//! state the bot itself owns: the per-week schedule store and the published
//! message bookkeeping.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cell text marking a slot that has no opponent this week.
pub const BYE_MARKER: &str = "BYE";

/// Competitive tier. Rank order is Gold < Silver < Bronze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Division {
    Gold,
    Silver,
    Bronze,
}

impl Division {
    pub const ALL: [Division; 3] = [Division::Gold, Division::Silver, Division::Bronze];

    /// Display name used in headings and log notices.
    pub fn name(self) -> &'static str {
        match self {
            Division::Gold => "Gold",
            Division::Silver => "Silver",
            Division::Bronze => "Bronze",
        }
    }

    /// Single-letter code accepted in hints (`[B]`, `B:`).
    pub fn code(self) -> char {
        match self {
            Division::Gold => 'G',
            Division::Silver => 'S',
            Division::Bronze => 'B',
        }
    }

    /// Parse a hint token (full name or single-letter code), case-insensitive.
    pub fn from_token(token: &str) -> Option<Division> {
        let t = token.trim().to_ascii_lowercase();
        match t.as_str() {
            "gold" | "g" => Some(Division::Gold),
            "silver" | "s" => Some(Division::Silver),
            "bronze" | "b" => Some(Division::Bronze),
            _ => None,
        }
    }
}

impl std::fmt::Display for Division {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One team in the roster. Canonical names are uppercase and unique within a
/// division; aliases are learned incrementally and never dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub division: Division,
    pub aliases: Vec<String>,
}

/// Recorded result for a played match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub score_home: u32,
    pub score_away: u32,
}

/// One row inside a week block. A slot with an empty side or the bye marker
/// on either side is not schedulable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSlot {
    pub row_index: usize,
    pub home: String,
    pub away: String,
    pub result: Option<MatchResult>,
}

impl MatchSlot {
    /// True when both sides name real teams (non-empty, not a bye).
    pub fn is_schedulable(&self) -> bool {
        let side_ok = |s: &str| {
            let t = s.trim();
            !t.is_empty() && !t.eq_ignore_ascii_case(BYE_MARKER)
        };
        side_ok(&self.home) && side_ok(&self.away)
    }

    /// Directionless pair test against two canonical names.
    pub fn pairs_with(&self, a: &str, b: &str) -> bool {
        let h = self.home.trim();
        let w = self.away.trim();
        (h.eq_ignore_ascii_case(a) && w.eq_ignore_ascii_case(b))
            || (h.eq_ignore_ascii_case(b) && w.eq_ignore_ascii_case(a))
    }
}

/// One week's worth of scheduled matches for one division, identified by a
/// map and a date. `index` is the position in the division's chronological
/// block sequence (fixed stride in the backing grid).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekBlock {
    pub division: Division,
    pub index: usize,
    pub map: String,
    pub date: NaiveDate,
    pub rows: Vec<MatchSlot>,
}

impl WeekBlock {
    /// Stable partition key shared across divisions scheduled on the same
    /// date and map: `{iso-date}|{map}`.
    pub fn week_key(&self) -> String {
        format!("{}|{}", self.date.format("%Y-%m-%d"), self.map)
    }

    /// Find the slot for an undirected team pair, if present.
    pub fn slot_for_pair(&self, a: &str, b: &str) -> Option<&MatchSlot> {
        self.rows.iter().find(|s| s.pairs_with(a, b))
    }
}

/// Structured output of the interpretation pipeline for one message (or one
/// line of one message). Ephemeral: consumed immediately by the applier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePair {
    pub division: Division,
    pub home: String,
    pub away: String,
    pub when_text: String,
    pub epoch_seconds: Option<i64>,
    /// True when the kickoff time came from the default-hour heuristic
    /// rather than an explicit time token.
    pub time_defaulted: bool,
    pub week_key: String,
    /// Index of the chosen block in its division's week list.
    pub week_index: usize,
}

/// One scheduled entry inside a [`WeekStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEntry {
    pub when_text: String,
    pub epoch_seconds: Option<i64>,
    pub home: String,
    pub away: String,
}

/// Persisted per-week schedule state, keyed by row (`row{n}`). Written by the
/// applier, read by the renderer. Created on first write, never expired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekStore {
    pub schedule: BTreeMap<String, ScheduledEntry>,
}

impl WeekStore {
    pub fn row_key(row_index: usize) -> String {
        format!("row{}", row_index)
    }

    pub fn entry_for_row(&self, row_index: usize) -> Option<&ScheduledEntry> {
        self.schedule.get(&Self::row_key(row_index))
    }
}

/// Message role on the published board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardRole {
    Header,
    Table,
    Rematch,
}

impl BoardRole {
    pub const ALL: [BoardRole; 3] = [BoardRole::Header, BoardRole::Table, BoardRole::Rematch];

    pub fn as_str(self) -> &'static str {
        match self {
            BoardRole::Header => "header",
            BoardRole::Table => "table",
            BoardRole::Rematch => "rematch",
        }
    }
}

/// Persisted bookkeeping for the messages published for one week key. IDs
/// are cleared when the corresponding message is deleted; hashes are kept
/// for audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedMessageSet {
    pub header_message_id: Option<String>,
    pub table_message_id: Option<String>,
    pub rematch_message_id: Option<String>,
    pub header_hash: Option<String>,
    pub table_hash: Option<String>,
    pub rematch_hash: Option<String>,
}

impl PublishedMessageSet {
    pub fn message_id(&self, role: BoardRole) -> Option<&str> {
        match role {
            BoardRole::Header => self.header_message_id.as_deref(),
            BoardRole::Table => self.table_message_id.as_deref(),
            BoardRole::Rematch => self.rematch_message_id.as_deref(),
        }
    }

    pub fn set_message_id(&mut self, role: BoardRole, id: Option<String>) {
        match role {
            BoardRole::Header => self.header_message_id = id,
            BoardRole::Table => self.table_message_id = id,
            BoardRole::Rematch => self.rematch_message_id = id,
        }
    }

    pub fn hash(&self, role: BoardRole) -> Option<&str> {
        match role {
            BoardRole::Header => self.header_hash.as_deref(),
            BoardRole::Table => self.table_hash.as_deref(),
            BoardRole::Rematch => self.rematch_hash.as_deref(),
        }
    }

    pub fn set_hash(&mut self, role: BoardRole, hash: Option<String>) {
        match role {
            BoardRole::Header => self.header_hash = hash,
            BoardRole::Table => self.table_hash = hash,
            BoardRole::Rematch => self.rematch_hash = hash,
        }
    }

    /// Number of roles with a live message id.
    pub fn live_message_count(&self) -> usize {
        [
            &self.header_message_id,
            &self.table_message_id,
            &self.rematch_message_id,
        ]
        .iter()
        .filter(|id| id.is_some())
        .count()
    }
}

/// A chat message as returned by the relay. `id` is a numeric-string
/// snowflake and sorts chronologically when compared numerically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Numeric value of the snowflake for chronological ordering.
    pub fn snowflake(&self) -> u64 {
        self.id.parse().unwrap_or(0)
    }
}
