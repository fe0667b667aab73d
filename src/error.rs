//! Per-message error taxonomy.
//!
//! Parse and apply failures are recovered at the per-message boundary: the
//! poller logs the reason code and moves on, never aborting the batch for a
//! single bad message. Infrastructure failures use `anyhow` at the
//! application boundary instead.

use thiserror::Error;

use crate::types::Division;

/// Everything that can go wrong while interpreting or applying one message.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// The side splitter found no versus-delimiter.
    #[error("no versus-delimiter found")]
    NoVs,

    /// One side could not be resolved to a known team.
    #[error("no team matched '{side}'")]
    TeamNotFound { side: String },

    /// The two sides resolved to teams in different divisions.
    #[error("teams are in different divisions: {home} ({home_division}) vs {away} ({away_division})")]
    CrossDivision {
        home: String,
        home_division: Division,
        away: String,
        away_division: Division,
    },

    /// No week block could be chosen for the pair.
    #[error("no week block found for {home} vs {away} in {division}")]
    WeekNotFound {
        division: Division,
        home: String,
        away: String,
    },

    /// The grid reader could not locate the block's row window.
    #[error("block top not found for {division} week {week_index}")]
    BlockTopNotFound {
        division: Division,
        week_index: usize,
    },

    /// No row (exact or unique-fuzzy) matched the pair inside the block.
    /// `ambiguous_rows` lists fuzzy candidates when more than one tied.
    #[error("no row found for {home} vs {away} in {division} week {week_index}")]
    RowNotFound {
        division: Division,
        week_index: usize,
        home: String,
        away: String,
        ambiguous_rows: Vec<usize>,
    },

    /// Non-2xx from the chat relay.
    #[error("relay returned HTTP {status}: {message}")]
    RelayHttp { status: u16, message: String },

    /// The batch budget ran out before this message could be processed.
    #[error("budget exhausted before message could be processed")]
    TimeoutPrevention,
}

impl ParseError {
    /// Stable reason code for structured logs and batch summaries.
    pub fn reason_code(&self) -> &'static str {
        match self {
            ParseError::NoVs => "no_vs",
            ParseError::TeamNotFound { .. } => "team_not_found",
            ParseError::CrossDivision { .. } => "cross_division",
            ParseError::WeekNotFound { .. } => "week_not_found",
            ParseError::BlockTopNotFound { .. } => "block_top_not_found",
            ParseError::RowNotFound { .. } => "row_not_found",
            ParseError::RelayHttp { .. } => "relay_http_error",
            ParseError::TimeoutPrevention => "timeout_prevention",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes() {
        assert_eq!(ParseError::NoVs.reason_code(), "no_vs");
        assert_eq!(
            ParseError::TeamNotFound {
                side: "emo".to_string()
            }
            .reason_code(),
            "team_not_found"
        );
        assert_eq!(
            ParseError::RelayHttp {
                status: 502,
                message: "bad gateway".to_string()
            }
            .reason_code(),
            "relay_http_error"
        );
    }

    #[test]
    fn test_cross_division_message_names_both() {
        let err = ParseError::CrossDivision {
            home: "FALCONS".to_string(),
            home_division: Division::Bronze,
            away: "RAVENS".to_string(),
            away_division: Division::Silver,
        };
        let msg = err.to_string();
        assert!(msg.contains("FALCONS"));
        assert!(msg.contains("Silver"));
    }
}
