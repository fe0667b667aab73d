//! Spreadsheet-backed schedule store.
//!
//! The grid holds, per division: the team roster, and the weekly schedule
//! grid (one map/date header row per week block followed by a fixed-height
//! window of match rows with score cells). A shared alias tab maps learned
//! alias strings to canonical team names.
//!
//! The core only consumes this through [`ScheduleSheet`]; the REST
//! implementation is a thin values-range reader.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::{self, ROWS_PER_BLOCK};
use crate::retry::{retry_async, RetryPolicy};
use crate::types::{Division, MatchResult, MatchSlot, Team, WeekBlock};

/// Read access to the roster, alias table, and weekly grid.
#[async_trait]
pub trait ScheduleSheet: Send + Sync {
    /// Team roster for one division.
    async fn roster(&self, division: Division) -> Result<Vec<Team>>;

    /// Learned alias rows: (alias, canonical name).
    async fn alias_table(&self) -> Result<Vec<(String, String)>>;

    /// All week blocks for one division, in chronological grid order.
    async fn week_blocks(&self, division: Division) -> Result<Vec<WeekBlock>>;

    /// Fresh read of one block's match-row window. `None` when the block's
    /// top row cannot be located in the grid.
    async fn block_rows(&self, division: Division, week_index: usize)
        -> Result<Option<Vec<MatchSlot>>>;
}

/// Parse a grid date cell: ISO (`2025-09-28`) or `M/D/YYYY`.
pub fn parse_grid_date(cell: &str) -> Option<NaiveDate> {
    let t = cell.trim();
    if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return Some(d);
    }
    NaiveDate::parse_from_str(t, "%m/%d/%Y").ok()
}

/// Decode one division's grid rows into week blocks.
///
/// Layout per block: one header row `[map, date]` followed by exactly
/// `ROWS_PER_BLOCK` match rows `[home, away, score_home, score_away]`.
/// Decoding stops at the first header row with no parseable date.
pub fn decode_week_blocks(division: Division, rows: &[Vec<String>]) -> Vec<WeekBlock> {
    let stride = ROWS_PER_BLOCK + 1;
    let mut blocks = Vec::new();

    for (index, chunk) in rows.chunks(stride).enumerate() {
        let header = match chunk.first() {
            Some(h) => h,
            None => break,
        };
        let map = header.first().map(|s| s.trim().to_string()).unwrap_or_default();
        let date = match header.get(1).and_then(|c| parse_grid_date(c)) {
            Some(d) => d,
            None => break,
        };
        if map.is_empty() {
            break;
        }

        let slots = decode_match_rows(&chunk[1..]);
        blocks.push(WeekBlock {
            division,
            index,
            map,
            date,
            rows: slots,
        });
    }

    blocks
}

/// Decode a match-row window into slots. Rows beyond the window are ignored;
/// short rows pad with empty cells.
pub fn decode_match_rows(rows: &[Vec<String>]) -> Vec<MatchSlot> {
    rows.iter()
        .take(ROWS_PER_BLOCK)
        .enumerate()
        .map(|(row_index, cells)| {
            let cell = |i: usize| cells.get(i).map(|s| s.trim().to_string()).unwrap_or_default();
            let score = |i: usize| cells.get(i).and_then(|s| s.trim().parse::<u32>().ok());
            let result = match (score(2), score(3)) {
                (Some(score_home), Some(score_away)) => Some(MatchResult {
                    score_home,
                    score_away,
                }),
                _ => None,
            };
            MatchSlot {
                row_index,
                home: cell(0),
                away: cell(1),
                result,
            }
        })
        .collect()
}

/// Decode roster rows `[name, comma-separated-aliases]`.
pub fn decode_roster(division: Division, rows: &[Vec<String>]) -> Vec<Team> {
    rows.iter()
        .filter_map(|cells| {
            let name = cells.first()?.trim().to_uppercase();
            if name.is_empty() {
                return None;
            }
            let aliases = cells
                .get(1)
                .map(|s| {
                    s.split(',')
                        .map(|a| a.trim().to_string())
                        .filter(|a| !a.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            Some(Team {
                name,
                division,
                aliases,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Sheets-values REST reader.
pub struct SheetsClient {
    client: reqwest::Client,
    base_url: String,
    sheet_id: String,
    api_key: String,
    retry: RetryPolicy,
}

impl SheetsClient {
    pub fn new(sheet_id: String, api_key: String) -> Result<Self> {
        Self::with_base_url(sheet_id, api_key, config::SHEETS_API_BASE.to_string())
    }

    pub fn with_base_url(sheet_id: String, api_key: String, base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config::http_timeout_secs()))
            .build()
            .context("building sheet HTTP client")?;
        Ok(Self {
            client,
            base_url,
            sheet_id,
            api_key,
            retry: RetryPolicy::from_env(),
        })
    }

    async fn fetch_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = format!(
            "{}/{}/values/{}?key={}",
            self.base_url,
            self.sheet_id,
            urlencode(range),
            self.api_key
        );
        retry_async(&self.retry, "fetch_range", || {
            let url = url.clone();
            async move {
                let resp = self.client.get(&url).send().await?;
                let resp = resp.error_for_status()?;
                let body: ValuesResponse = resp.json().await.context("decoding values range")?;
                Ok(body.values)
            }
        })
        .await
    }

    fn grid_range(division: Division) -> String {
        format!("{} Grid!A1:D500", division.name())
    }

    fn roster_range(division: Division) -> String {
        format!("{} Teams!A2:B200", division.name())
    }
}

fn urlencode(s: &str) -> String {
    s.replace(' ', "%20").replace('!', "%21")
}

#[async_trait]
impl ScheduleSheet for SheetsClient {
    async fn roster(&self, division: Division) -> Result<Vec<Team>> {
        let rows = self.fetch_range(&Self::roster_range(division)).await?;
        Ok(decode_roster(division, &rows))
    }

    async fn alias_table(&self) -> Result<Vec<(String, String)>> {
        let rows = self.fetch_range("Aliases!A2:B1000").await?;
        Ok(rows
            .into_iter()
            .filter_map(|cells| {
                let alias = cells.first()?.trim().to_string();
                let canonical = cells.get(1)?.trim().to_uppercase();
                if alias.is_empty() || canonical.is_empty() {
                    None
                } else {
                    Some((alias, canonical))
                }
            })
            .collect())
    }

    async fn week_blocks(&self, division: Division) -> Result<Vec<WeekBlock>> {
        let rows = self.fetch_range(&Self::grid_range(division)).await?;
        Ok(decode_week_blocks(division, &rows))
    }

    async fn block_rows(
        &self,
        division: Division,
        week_index: usize,
    ) -> Result<Option<Vec<MatchSlot>>> {
        // Re-read only this block's window so applies see fresh cells.
        let stride = ROWS_PER_BLOCK + 1;
        let top = week_index * stride + 1; // 1-based sheet rows
        let range = format!(
            "{} Grid!A{}:D{}",
            division.name(),
            top + 1,
            top + ROWS_PER_BLOCK
        );
        let header_range = format!("{} Grid!A{}:D{}", division.name(), top, top);

        let header = self.fetch_range(&header_range).await?;
        let has_block = header
            .first()
            .and_then(|cells| cells.get(1))
            .and_then(|c| parse_grid_date(c))
            .is_some();
        if !has_block {
            return Ok(None);
        }

        let rows = self.fetch_range(&range).await?;
        Ok(Some(decode_match_rows(&rows)))
    }
}

/// In-memory sheet for tests and fixtures.
#[derive(Debug, Default, Clone)]
pub struct StaticSheet {
    pub teams: Vec<Team>,
    pub aliases: Vec<(String, String)>,
    pub blocks: HashMap<Division, Vec<WeekBlock>>,
}

impl StaticSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_team(mut self, name: &str, division: Division, aliases: &[&str]) -> Self {
        self.teams.push(Team {
            name: name.to_uppercase(),
            division,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        });
        self
    }

    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.aliases
            .push((alias.to_string(), canonical.to_uppercase()));
        self
    }

    pub fn with_block(mut self, block: WeekBlock) -> Self {
        self.blocks.entry(block.division).or_default().push(block);
        self
    }
}

#[async_trait]
impl ScheduleSheet for StaticSheet {
    async fn roster(&self, division: Division) -> Result<Vec<Team>> {
        Ok(self
            .teams
            .iter()
            .filter(|t| t.division == division)
            .cloned()
            .collect())
    }

    async fn alias_table(&self) -> Result<Vec<(String, String)>> {
        Ok(self.aliases.clone())
    }

    async fn week_blocks(&self, division: Division) -> Result<Vec<WeekBlock>> {
        Ok(self.blocks.get(&division).cloned().unwrap_or_default())
    }

    async fn block_rows(
        &self,
        division: Division,
        week_index: usize,
    ) -> Result<Option<Vec<MatchSlot>>> {
        Ok(self
            .blocks
            .get(&division)
            .and_then(|blocks| blocks.iter().find(|b| b.index == week_index))
            .map(|b| b.rows.clone()))
    }
}
