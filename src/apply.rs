//! Applies one interpreted update to the persisted week schedule.
//!
//! The grid rows are re-read at apply time rather than trusted from the
//! batch cache, since a captain may have been moved between rows since the
//! cache was loaded. Row matching is directionless; a fuzzy fallback only
//! fires when exactly one row could match.

use anyhow::Result;
use tracing::{info, warn};

use crate::error::ParseError;
use crate::interpret::teams::normalize_name;
use crate::props::{PropsStore, PropsStoreExt};
use crate::sheet::ScheduleSheet;
use crate::types::{MatchSlot, ScheduledEntry, UpdatePair, WeekStore};

fn exact_pair(slot: &MatchSlot, home: &str, away: &str) -> bool {
    let (h, a) = (normalize_name(&slot.home), normalize_name(&slot.away));
    let (ph, pa) = (normalize_name(home), normalize_name(away));
    (h == ph && a == pa) || (h == pa && a == ph)
}

fn side_overlaps(row_side: &str, name: &str) -> bool {
    let r = normalize_name(row_side);
    let n = normalize_name(name);
    !r.is_empty() && !n.is_empty() && (r.contains(&n) || n.contains(&r))
}

fn fuzzy_pair(slot: &MatchSlot, home: &str, away: &str) -> bool {
    (side_overlaps(&slot.home, home) && side_overlaps(&slot.away, away))
        || (side_overlaps(&slot.home, away) && side_overlaps(&slot.away, home))
}

/// Find the grid row an update belongs to.
fn locate_row<'a>(
    rows: &'a [MatchSlot],
    pair: &UpdatePair,
) -> Result<&'a MatchSlot, ParseError> {
    if let Some(slot) = rows
        .iter()
        .filter(|s| s.is_schedulable())
        .find(|s| exact_pair(s, &pair.home, &pair.away))
    {
        return Ok(slot);
    }

    let fuzzy: Vec<&MatchSlot> = rows
        .iter()
        .filter(|s| s.is_schedulable())
        .filter(|s| fuzzy_pair(s, &pair.home, &pair.away))
        .collect();
    match fuzzy.as_slice() {
        [slot] => Ok(slot),
        _ => Err(ParseError::RowNotFound {
            division: pair.division,
            week_index: pair.week_index,
            home: pair.home.clone(),
            away: pair.away.clone(),
            ambiguous_rows: fuzzy.iter().map(|s| s.row_index).collect(),
        }),
    }
}

/// Write one update into its week's persisted schedule.
///
/// Returns the matched row index. Misses come back as [`ParseError`] values
/// with a reason code so the poller can record them without aborting the
/// batch.
pub async fn apply_pair(
    pair: &UpdatePair,
    sheet: &dyn ScheduleSheet,
    props: &dyn PropsStore,
) -> Result<usize> {
    let rows = sheet
        .block_rows(pair.division, pair.week_index)
        .await?
        .ok_or(ParseError::BlockTopNotFound {
            division: pair.division,
            week_index: pair.week_index,
        })?;

    let slot = match locate_row(&rows, pair) {
        Ok(slot) => slot,
        Err(err) => {
            if let ParseError::RowNotFound { ambiguous_rows, .. } = &err {
                if !ambiguous_rows.is_empty() {
                    warn!(
                        week_key = %pair.week_key,
                        rows = ?ambiguous_rows,
                        "ambiguous fuzzy row match, treating as miss"
                    );
                }
            }
            return Err(err.into());
        }
    };

    let mut store = props.get_week_store(&pair.week_key);
    store.schedule.insert(
        WeekStore::row_key(slot.row_index),
        ScheduledEntry {
            when_text: pair.when_text.clone(),
            epoch_seconds: pair.epoch_seconds,
            home: pair.home.clone(),
            away: pair.away.clone(),
        },
    );
    props.put_week_store(&pair.week_key, &store)?;

    info!(
        week_key = %pair.week_key,
        row = slot.row_index,
        home = %pair.home,
        away = %pair.away,
        when = %pair.when_text,
        time_defaulted = pair.time_defaulted,
        "schedule row updated"
    );
    Ok(slot.row_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::MemoryProps;
    use crate::sheet::StaticSheet;
    use crate::types::{Division, WeekBlock};
    use chrono::NaiveDate;

    fn slot(row: usize, home: &str, away: &str) -> MatchSlot {
        MatchSlot {
            row_index: row,
            home: home.to_string(),
            away: away.to_string(),
            result: None,
        }
    }

    fn sheet_with_rows(rows: Vec<MatchSlot>) -> StaticSheet {
        StaticSheet::new().with_block(WeekBlock {
            division: Division::Bronze,
            index: 0,
            map: "de_harbor".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 9, 28).unwrap(),
            rows,
        })
    }

    fn pair(home: &str, away: &str) -> UpdatePair {
        UpdatePair {
            division: Division::Bronze,
            home: home.to_string(),
            away: away.to_string(),
            when_text: "9:00 PM ET 9/28".to_string(),
            epoch_seconds: Some(1_759_107_600),
            time_defaulted: false,
            week_key: "2025-09-28|de_harbor".to_string(),
            week_index: 0,
        }
    }

    #[tokio::test]
    async fn test_exact_row_match_directionless() {
        let sheet = sheet_with_rows(vec![
            slot(0, "FALCONS", "WOLVES"),
            slot(1, "EMONAUTS", "BADGERS"),
        ]);
        let props = MemoryProps::new();

        // Reversed orientation still lands on row 0.
        let row = apply_pair(&pair("WOLVES", "FALCONS"), &sheet, &props)
            .await
            .unwrap();
        assert_eq!(row, 0);

        let store = props.get_week_store("2025-09-28|de_harbor");
        let entry = store.entry_for_row(0).unwrap();
        assert_eq!(entry.when_text, "9:00 PM ET 9/28");
        assert_eq!(entry.home, "WOLVES");
    }

    #[tokio::test]
    async fn test_fuzzy_match_unique() {
        let sheet = sheet_with_rows(vec![
            slot(0, "THE FALCONS", "NIGHT WOLVES"),
            slot(1, "EMONAUTS", "BADGERS"),
        ]);
        let props = MemoryProps::new();
        let row = apply_pair(&pair("FALCONS", "WOLVES"), &sheet, &props)
            .await
            .unwrap();
        assert_eq!(row, 0);
    }

    #[tokio::test]
    async fn test_fuzzy_ambiguity_is_a_miss() {
        // Two rows both overlap the pair; neither may be chosen.
        let sheet = sheet_with_rows(vec![
            slot(0, "FALCONS RED", "WOLVES NORTH"),
            slot(1, "FALCONS BLUE", "WOLVES SOUTH"),
        ]);
        let props = MemoryProps::new();
        let err = apply_pair(&pair("FALCONS", "WOLVES"), &sheet, &props)
            .await
            .unwrap_err();
        let parse = err.downcast_ref::<ParseError>().unwrap();
        match parse {
            ParseError::RowNotFound { ambiguous_rows, .. } => {
                assert_eq!(ambiguous_rows, &vec![0, 1]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(props.get_week_store("2025-09-28|de_harbor").schedule.is_empty());
    }

    #[tokio::test]
    async fn test_bye_rows_skipped() {
        let sheet = sheet_with_rows(vec![
            slot(0, "FALCONS", "BYE"),
            slot(1, "FALCONS", "WOLVES"),
        ]);
        let props = MemoryProps::new();
        let row = apply_pair(&pair("FALCONS", "WOLVES"), &sheet, &props)
            .await
            .unwrap();
        assert_eq!(row, 1);
    }

    #[tokio::test]
    async fn test_missing_block_top() {
        let sheet = StaticSheet::new();
        let props = MemoryProps::new();
        let err = apply_pair(&pair("FALCONS", "WOLVES"), &sheet, &props)
            .await
            .unwrap_err();
        let parse = err.downcast_ref::<ParseError>().unwrap();
        assert_eq!(parse.reason_code(), "block_top_not_found");
    }
}
