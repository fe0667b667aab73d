//! League Schedule Board Bot
//!
//! Watches a chat channel for free-text scheduling messages ("Bronze:
//! Falcons vs Wolves 9/28 9pm"), resolves them against the league's
//! spreadsheet grid, and keeps a published schedule board up to date.
//!
//! ## Architecture
//!
//! - **Interpretation pipeline** turning chat messages into structured
//!   update pairs: normalization, fuzzy team resolution, flexible
//!   date/time parsing, and week-block selection
//! - **Update applier** writing matched rows into a persisted per-week
//!   schedule store
//! - **Board renderer** producing header/table/rematch message bodies as
//!   pure text
//! - **Publication reconciler** with hash-based idempotence: at most one
//!   live message per role per week, created/edited/deleted as content
//!   changes
//! - **Budgeted poller** that checkpoints its cursor and stops cleanly
//!   before the host's wall-clock ceiling

pub mod apply;
pub mod config;
pub mod error;
pub mod interpret;
pub mod logging;
pub mod metrics;
pub mod poller;
pub mod props;
pub mod publish;
pub mod relay;
pub mod render;
pub mod retry;
pub mod sheet;
pub mod types;
