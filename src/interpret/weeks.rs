//! Week-block selection for a resolved matchup.
//!
//! A message usually names two teams and maybe a date; which grid week it
//! belongs to is inferred. Strategies run in order and the first hit wins;
//! team pairs are undirected throughout.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::error::ParseError;
use crate::interpret::temporal::{WhenResult, EASTERN};
use crate::types::{Division, WeekBlock};

fn makeup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:make\s*-?\s*up|makeup|rematch|replay|redo|postponed)\b").unwrap()
    })
}

/// Instant a block's date represents for distance comparisons: midnight
/// Eastern on the block date.
fn block_instant(block: &WeekBlock) -> i64 {
    let naive = block.date.and_time(chrono::NaiveTime::MIN);
    EASTERN
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| naive.and_utc().timestamp())
}

fn distance(block: &WeekBlock, instant: i64) -> i64 {
    (block_instant(block) - instant).abs()
}

fn contains_pair(block: &WeekBlock, home: &str, away: &str) -> bool {
    block.slot_for_pair(home, away).is_some()
}

/// Exact map-hint match.
fn by_map_hint<'a>(
    weeks: &'a [WeekBlock],
    map_hint: Option<&str>,
    home: &str,
    away: &str,
) -> Option<&'a WeekBlock> {
    let hint = map_hint?;
    weeks
        .iter()
        .find(|b| b.map.eq_ignore_ascii_case(hint) && contains_pair(b, home, away))
}

/// Smallest absolute distance between the block date and the parsed kickoff.
fn by_parsed_date<'a>(
    weeks: &'a [WeekBlock],
    when: &WhenResult,
    home: &str,
    away: &str,
) -> Option<&'a WeekBlock> {
    let instant = when.epoch_seconds?;
    weeks
        .iter()
        .filter(|b| contains_pair(b, home, away))
        .min_by_key(|b| distance(b, instant))
}

/// Earliest block for the pair with no recorded result, when the text talks
/// about make-ups or rematches.
fn by_makeup_language<'a>(
    weeks: &'a [WeekBlock],
    text: &str,
    home: &str,
    away: &str,
) -> Option<&'a WeekBlock> {
    if !makeup_re().is_match(text) {
        return None;
    }
    weeks
        .iter()
        .filter(|b| {
            b.slot_for_pair(home, away)
                .map(|slot| slot.result.is_none())
                .unwrap_or(false)
        })
        .min_by_key(|b| b.date)
}

/// Nearest block to the message's own timestamp. Lets dateless messages in
/// a historical replay still land in the right week.
fn by_message_time<'a>(
    weeks: &'a [WeekBlock],
    message_ts: DateTime<Utc>,
    home: &str,
    away: &str,
) -> Option<&'a WeekBlock> {
    let instant = message_ts.timestamp();
    weeks
        .iter()
        .filter(|b| contains_pair(b, home, away))
        .min_by_key(|b| distance(b, instant))
}

/// The division's soonest-upcoming block, or the last block when the whole
/// season is in the past.
fn currently_active<'a>(
    weeks: &'a [WeekBlock],
    message_ts: DateTime<Utc>,
) -> Option<&'a WeekBlock> {
    let today = message_ts.with_timezone(&EASTERN).date_naive();
    weeks
        .iter()
        .filter(|b| b.date >= today - Duration::days(1))
        .min_by_key(|b| b.date)
        .or_else(|| weeks.iter().max_by_key(|b| b.date))
}

/// Pick the week block an update belongs to.
pub fn resolve_week<'a>(
    division: Division,
    home: &str,
    away: &str,
    map_hint: Option<&str>,
    text: &str,
    when: &WhenResult,
    message_ts: DateTime<Utc>,
    weeks: &'a [WeekBlock],
) -> Result<&'a WeekBlock, ParseError> {
    by_map_hint(weeks, map_hint, home, away)
        .or_else(|| by_parsed_date(weeks, when, home, away))
        .or_else(|| by_makeup_language(weeks, text, home, away))
        .or_else(|| by_message_time(weeks, message_ts, home, away))
        .or_else(|| currently_active(weeks, message_ts))
        .ok_or_else(|| ParseError::WeekNotFound {
            division,
            home: home.to_string(),
            away: away.to_string(),
        })
}

/// Default date for a division's current week, used when a message has no
/// date of its own.
pub fn default_week_date(weeks: &[WeekBlock], reference: DateTime<Utc>) -> Option<NaiveDate> {
    currently_active(weeks, reference).map(|b| b.date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchResult, MatchSlot, WeekBlock};

    fn slot(row: usize, home: &str, away: &str, resulted: bool) -> MatchSlot {
        MatchSlot {
            row_index: row,
            home: home.to_string(),
            away: away.to_string(),
            result: resulted.then(|| MatchResult {
                score_home: 16,
                score_away: 10,
            }),
        }
    }

    fn block(index: usize, map: &str, date: (i32, u32, u32), rows: Vec<MatchSlot>) -> WeekBlock {
        WeekBlock {
            division: Division::Bronze,
            index,
            map: map.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            rows,
        }
    }

    fn season() -> Vec<WeekBlock> {
        vec![
            block(
                0,
                "harbor",
                (2025, 9, 21),
                vec![slot(0, "FALCONS", "WOLVES", true)],
            ),
            block(
                1,
                "depot",
                (2025, 9, 28),
                vec![slot(0, "WOLVES", "FALCONS", false)],
            ),
            block(
                2,
                "citadel",
                (2025, 10, 5),
                vec![slot(0, "FALCONS", "BADGERS", false)],
            ),
        ]
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 16, 0, 0).unwrap()
    }

    fn when_at(epoch: i64) -> WhenResult {
        WhenResult {
            when_text: "9:00 PM ET 9/28".to_string(),
            epoch_seconds: Some(epoch),
            time_defaulted: false,
        }
    }

    #[test]
    fn test_map_hint_wins() {
        let weeks = season();
        let b = resolve_week(
            Division::Bronze,
            "FALCONS",
            "WOLVES",
            Some("harbor"),
            "falcons vs wolves on harbor",
            &WhenResult::tbd(),
            at(2025, 9, 30),
            &weeks,
        )
        .unwrap();
        assert_eq!(b.index, 0);
    }

    #[test]
    fn test_parsed_date_picks_closest_block() {
        let weeks = season();
        // 9/27 21:00 EDT sits nearest the 9/28 block even though the date
        // differs from the block header.
        let epoch = EASTERN
            .with_ymd_and_hms(2025, 9, 27, 21, 0, 0)
            .unwrap()
            .timestamp();
        let b = resolve_week(
            Division::Bronze,
            "WOLVES",
            "FALCONS",
            None,
            "wolves vs falcons 9/27 9pm",
            &when_at(epoch),
            at(2025, 9, 20),
            &weeks,
        )
        .unwrap();
        assert_eq!(b.index, 1);
    }

    #[test]
    fn test_pair_is_undirected() {
        let weeks = season();
        let epoch = EASTERN
            .with_ymd_and_hms(2025, 9, 21, 21, 0, 0)
            .unwrap()
            .timestamp();
        // Grid row is FALCONS/WOLVES; query the other way round.
        let b = resolve_week(
            Division::Bronze,
            "WOLVES",
            "FALCONS",
            None,
            "",
            &when_at(epoch),
            at(2025, 9, 20),
            &weeks,
        )
        .unwrap();
        assert_eq!(b.index, 0);
    }

    #[test]
    fn test_makeup_language_finds_earliest_unresulted() {
        let weeks = season();
        // Week 0 already has a result; the make-up lands in week 1.
        let b = resolve_week(
            Division::Bronze,
            "FALCONS",
            "WOLVES",
            None,
            "falcons vs wolves makeup match",
            &WhenResult::tbd(),
            at(2025, 10, 20),
            &weeks,
        )
        .unwrap();
        assert_eq!(b.index, 1);
    }

    #[test]
    fn test_dateless_message_uses_message_timestamp() {
        let weeks = season();
        let b = resolve_week(
            Division::Bronze,
            "FALCONS",
            "WOLVES",
            None,
            "falcons vs wolves tonight",
            &WhenResult::tbd(),
            at(2025, 9, 22),
            &weeks,
        )
        .unwrap();
        assert_eq!(b.index, 0);
    }

    #[test]
    fn test_unknown_pair_falls_back_to_active_week() {
        let weeks = season();
        let b = resolve_week(
            Division::Bronze,
            "EAGLES",
            "OTTERS",
            None,
            "eagles vs otters",
            &WhenResult::tbd(),
            at(2025, 9, 26),
            &weeks,
        )
        .unwrap();
        assert_eq!(b.index, 1);
    }

    #[test]
    fn test_empty_week_list_fails() {
        let err = resolve_week(
            Division::Bronze,
            "FALCONS",
            "WOLVES",
            None,
            "",
            &WhenResult::tbd(),
            at(2025, 9, 26),
            &[],
        )
        .unwrap_err();
        assert_eq!(err.reason_code(), "week_not_found");
    }

    #[test]
    fn test_default_week_date() {
        let weeks = season();
        assert_eq!(
            default_week_date(&weeks, at(2025, 9, 24)),
            NaiveDate::from_ymd_opt(2025, 9, 28)
        );
        assert_eq!(
            default_week_date(&weeks, at(2025, 11, 1)),
            NaiveDate::from_ymd_opt(2025, 10, 5)
        );
    }
}
