//! System configuration and environment variable parsing.
//!
//! All tunables read from environment variables with validated fallbacks and
//! are cached after first use. `.env` is loaded by `main` before anything in
//! here runs.

use std::sync::OnceLock;
use tracing::warn;

/// Chat relay REST base URL.
pub const RELAY_API_BASE: &str = "https://discord.com/api/v10";

/// Sheets values API base URL.
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Fixed height of one week block's match-row window in the grid.
pub const ROWS_PER_BLOCK: usize = 8;

/// Default kickoff hour (21:00 = 9 PM Eastern) when a message carries a date
/// but no recognizable time token.
pub const DEFAULT_KICKOFF_HOUR: u32 = 21;

/// Canonical map ids carry this prefix in the grid; the alias catalog
/// generates variants both with and without it.
pub const MAP_ID_PREFIX: &str = "de_";

/// Default page size for relay history fetches.
pub const FETCH_PAGE_SIZE: usize = 100;

/// Default per-batch message budget.
const DEFAULT_POLL_MAX_MESSAGES: usize = 200;

/// Default per-batch wall-clock budget in seconds. The host environment
/// imposes a hard ceiling, so the poller stops well short of it.
const DEFAULT_POLL_MAX_ELAPSED_SECS: u64 = 240;

/// Default relay/sheet request timeout in seconds.
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Bot token for the chat relay.
pub fn relay_token() -> String {
    static CACHED: OnceLock<String> = OnceLock::new();
    CACHED
        .get_or_init(|| std::env::var("RELAY_BOT_TOKEN").unwrap_or_default())
        .clone()
}

/// Channel the schedule board is published to (and scheduling messages are
/// read from).
pub fn board_channel_id() -> String {
    static CACHED: OnceLock<String> = OnceLock::new();
    CACHED
        .get_or_init(|| std::env::var("BOARD_CHANNEL_ID").unwrap_or_default())
        .clone()
}

/// Operational log channel for publish notices and batch summaries.
/// Falls back to the board channel when unset.
pub fn ops_log_channel_id() -> String {
    static CACHED: OnceLock<String> = OnceLock::new();
    CACHED
        .get_or_init(|| {
            std::env::var("OPS_LOG_CHANNEL_ID")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(board_channel_id)
        })
        .clone()
}

/// Spreadsheet id backing the roster/alias/grid store.
pub fn sheet_id() -> String {
    static CACHED: OnceLock<String> = OnceLock::new();
    CACHED
        .get_or_init(|| std::env::var("SHEET_ID").unwrap_or_default())
        .clone()
}

/// API key for the sheets values endpoint.
pub fn sheet_api_key() -> String {
    static CACHED: OnceLock<String> = OnceLock::new();
    CACHED
        .get_or_init(|| std::env::var("SHEET_API_KEY").unwrap_or_default())
        .clone()
}

/// Max messages processed per poll run.
pub fn poll_max_messages() -> usize {
    static CACHED: OnceLock<usize> = OnceLock::new();
    *CACHED.get_or_init(|| {
        if let Ok(val_str) = std::env::var("POLL_MAX_MESSAGES") {
            if let Ok(n) = val_str.parse::<usize>() {
                if n > 0 {
                    return n;
                }
            }
            warn!(
                "Invalid POLL_MAX_MESSAGES='{}', using default {}",
                val_str, DEFAULT_POLL_MAX_MESSAGES
            );
        }
        DEFAULT_POLL_MAX_MESSAGES
    })
}

/// Max wall-clock seconds per poll run.
pub fn poll_max_elapsed_secs() -> u64 {
    static CACHED: OnceLock<u64> = OnceLock::new();
    *CACHED.get_or_init(|| {
        if let Ok(val_str) = std::env::var("POLL_MAX_ELAPSED_SECS") {
            if let Ok(n) = val_str.parse::<u64>() {
                if n > 0 {
                    return n;
                }
            }
            warn!(
                "Invalid POLL_MAX_ELAPSED_SECS='{}', using default {}",
                val_str, DEFAULT_POLL_MAX_ELAPSED_SECS
            );
        }
        DEFAULT_POLL_MAX_ELAPSED_SECS
    })
}

/// Outbound HTTP timeout in seconds for relay and sheet calls.
pub fn http_timeout_secs() -> u64 {
    static CACHED: OnceLock<u64> = OnceLock::new();
    *CACHED.get_or_init(|| {
        if let Ok(val_str) = std::env::var("HTTP_TIMEOUT_SECS") {
            if let Ok(n) = val_str.parse::<u64>() {
                if n > 0 {
                    return n;
                }
            }
            warn!(
                "Invalid HTTP_TIMEOUT_SECS='{}', using default {}",
                val_str, DEFAULT_HTTP_TIMEOUT_SECS
            );
        }
        DEFAULT_HTTP_TIMEOUT_SECS
    })
}

/// Path of the JSON file backing the properties store.
pub fn props_path() -> String {
    static CACHED: OnceLock<String> = OnceLock::new();
    CACHED
        .get_or_init(|| {
            std::env::var("PROPS_PATH").unwrap_or_else(|_| "./bot_props.json".to_string())
        })
        .clone()
}

/// Dry-run mode: render and diff, but log relay mutations instead of
/// performing them. Defaults to off.
pub fn dry_run() -> bool {
    static CACHED: OnceLock<bool> = OnceLock::new();
    *CACHED.get_or_init(|| {
        std::env::var("DRY_RUN")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
