//! Board rendering.
//!
//! Pure text assembly: week data in, three message bodies out. Nothing here
//! touches the network or the props store, which keeps the publish step
//! trivially testable.

use chrono::{NaiveDate, TimeZone};

use crate::config::DEFAULT_KICKOFF_HOUR;
use crate::interpret::temporal::EASTERN;
use crate::types::{BoardRole, Division, WeekBlock, WeekStore};

/// Rendered message bodies for one week's board. Empty strings mean the
/// role has nothing to show and its message should not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBoard {
    pub header: String,
    pub table: String,
    pub rematch: String,
}

impl RenderedBoard {
    pub fn content_for(&self, role: BoardRole) -> &str {
        match role {
            BoardRole::Header => &self.header,
            BoardRole::Table => &self.table,
            BoardRole::Rematch => &self.rematch,
        }
    }
}

/// Default kickoff instant for a block: the block date at the league's
/// standard hour, Eastern.
fn default_kickoff_epoch(block: &WeekBlock) -> Option<i64> {
    let naive = block.date.and_hms_opt(DEFAULT_KICKOFF_HOUR, 0, 0)?;
    EASTERN
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
}

fn render_header(block: &WeekBlock, store: &WeekStore) -> String {
    let countdown = store
        .schedule
        .values()
        .filter_map(|e| e.epoch_seconds)
        .min()
        .or_else(|| default_kickoff_epoch(block));

    let mut out = format!(
        "**{} — Week {}: {} ({})**",
        block.division.name(),
        block.index + 1,
        block.map,
        block.date.format("%Y-%m-%d"),
    );
    if let Some(epoch) = countdown {
        out.push_str(&format!("\nFirst kickoff <t:{}:R>.", epoch));
    }
    out
}

fn render_table(block: &WeekBlock, store: &WeekStore) -> String {
    let rows: Vec<_> = block.rows.iter().filter(|s| s.is_schedulable()).collect();
    if rows.is_empty() {
        return String::new();
    }

    let home_w = rows.iter().map(|s| s.home.len()).max().unwrap_or(0).max(4);
    let away_w = rows.iter().map(|s| s.away.len()).max().unwrap_or(0).max(4);

    let mut out = String::from("```\n");
    out.push_str(&format!(
        "{:<home_w$}  {:<away_w$}  TIME\n",
        "HOME", "AWAY"
    ));
    for slot in rows {
        let time = store
            .entry_for_row(slot.row_index)
            .map(|e| e.when_text.as_str())
            .unwrap_or("TBD");
        out.push_str(&format!(
            "{:<home_w$}  {:<away_w$}  {}\n",
            slot.home, slot.away, time
        ));
    }
    out.push_str("```");
    out
}

/// Unplayed matches from weeks strictly before `today`, across all
/// divisions, one section per map, ordered by division rank then home name.
fn render_rematch(all_blocks: &[WeekBlock], today: NaiveDate) -> String {
    struct Pending<'a> {
        map: &'a str,
        division: Division,
        home: &'a str,
        away: &'a str,
    }

    let mut pending: Vec<Pending> = Vec::new();
    for block in all_blocks.iter().filter(|b| b.date < today) {
        for slot in block.rows.iter().filter(|s| s.is_schedulable()) {
            if slot.result.is_none() {
                pending.push(Pending {
                    map: &block.map,
                    division: block.division,
                    home: &slot.home,
                    away: &slot.away,
                });
            }
        }
    }
    if pending.is_empty() {
        return String::new();
    }

    pending.sort_by(|a, b| {
        a.map
            .cmp(b.map)
            .then(a.division.cmp(&b.division))
            .then(a.home.cmp(b.home))
            .then(a.away.cmp(b.away))
    });

    let mut out = String::from("**Pending make-up matches**");
    let mut current_map: Option<&str> = None;
    for p in &pending {
        if current_map != Some(p.map) {
            out.push_str(&format!("\n\n__{}__", p.map));
            current_map = Some(p.map);
        }
        out.push_str(&format!(
            "\n[{}] {} vs {}",
            p.division.code(),
            p.home,
            p.away
        ));
    }
    out
}

/// Render all three message bodies for one week.
///
/// `all_blocks` carries every division's blocks so the rematch section can
/// aggregate across the league; `today` anchors the strictly-in-the-past
/// filter.
pub fn render_week(
    block: &WeekBlock,
    store: &WeekStore,
    all_blocks: &[WeekBlock],
    today: NaiveDate,
) -> RenderedBoard {
    RenderedBoard {
        header: render_header(block, store),
        table: render_table(block, store),
        rematch: render_rematch(all_blocks, today),
    }
}
