//! Message interpretation pipeline.
//!
//! Turns one free-text chat message into zero or more structured schedule
//! updates: normalize, split into sides, resolve teams, resolve the kickoff
//! time, then pick the grid week the update belongs to.

pub mod normalize;
pub mod teams;
pub mod temporal;
pub mod weeks;

use anyhow::Result;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::ParseError;
use crate::sheet::ScheduleSheet;
use crate::types::{ChatMessage, Division, Team, UpdatePair, WeekBlock};

use normalize::MapCatalog;

/// Read-mostly lookup state for one poll batch.
///
/// Rosters, aliases, and week lists are expensive to pull from the backing
/// sheet, so they are loaded once per batch and discarded afterwards; a new
/// batch always starts from a fresh load.
pub struct BatchCache {
    teams: Vec<Team>,
    aliases: BTreeMap<String, String>,
    weeks: BTreeMap<Division, Vec<WeekBlock>>,
    maps: MapCatalog,
}

impl BatchCache {
    pub async fn load(sheet: &dyn ScheduleSheet) -> Result<Self> {
        let mut teams = Vec::new();
        let mut weeks = BTreeMap::new();
        for division in Division::ALL {
            teams.extend(sheet.roster(division).await?);
            weeks.insert(division, sheet.week_blocks(division).await?);
        }

        let mut aliases = BTreeMap::new();
        for (alias, canonical) in sheet.alias_table().await? {
            aliases.insert(teams::normalize_name(&alias), canonical);
        }

        let mut map_names: Vec<String> = weeks
            .values()
            .flatten()
            .map(|b| b.map.clone())
            .collect();
        map_names.sort();
        map_names.dedup();
        let maps = MapCatalog::build(&map_names);

        debug!(
            teams = teams.len(),
            aliases = aliases.len(),
            maps = map_names.len(),
            "batch cache loaded"
        );
        Ok(Self {
            teams,
            aliases,
            weeks,
            maps,
        })
    }

    pub fn weeks(&self, division: Division) -> &[WeekBlock] {
        self.weeks.get(&division).map(Vec::as_slice).unwrap_or(&[])
    }

    #[cfg(test)]
    pub fn for_tests(
        teams: Vec<Team>,
        aliases: BTreeMap<String, String>,
        weeks: BTreeMap<Division, Vec<WeekBlock>>,
    ) -> Self {
        let mut map_names: Vec<String> =
            weeks.values().flatten().map(|b| b.map.clone()).collect();
        map_names.sort();
        map_names.dedup();
        let maps = MapCatalog::build(&map_names);
        Self {
            teams,
            aliases,
            weeks,
            maps,
        }
    }
}

/// Interpret one line of a cleaned message.
fn interpret_line(
    line: &str,
    msg: &ChatMessage,
    cache: &BatchCache,
) -> Result<UpdatePair, ParseError> {
    let division_hint = normalize::extract_division_hint(line);
    let map_hint = cache.maps.lookup(line);

    let (left, right) = normalize::split_sides(line).ok_or(ParseError::NoVs)?;

    let home = teams::resolve_team(&left, &cache.teams, &cache.aliases, division_hint, "home")?;
    let away = teams::resolve_team(&right, &cache.teams, &cache.aliases, division_hint, "away")?;
    if home.division != away.division {
        return Err(ParseError::CrossDivision {
            home: home.name,
            home_division: home.division,
            away: away.name,
            away_division: away.division,
        });
    }
    let division = home.division;

    let division_weeks = cache.weeks(division);
    let fallback_date = weeks::default_week_date(division_weeks, msg.timestamp);
    let when = temporal::resolve_when(line, msg.timestamp, fallback_date);

    let block = weeks::resolve_week(
        division,
        &home.name,
        &away.name,
        map_hint.as_deref(),
        line,
        &when,
        msg.timestamp,
        division_weeks,
    )?;

    Ok(UpdatePair {
        division,
        home: home.name,
        away: away.name,
        when_text: when.when_text,
        epoch_seconds: when.epoch_seconds,
        time_defaulted: when.time_defaulted,
        week_key: block.week_key(),
        week_index: block.index,
    })
}

/// Run the full pipeline over one message.
///
/// Each line of the cleaned message is interpreted independently, so one
/// post can carry several matchups. Returns the pairs that resolved; when
/// nothing resolved, the most specific failure is returned (a line that got
/// past the versus-split beats one that never had a matchup in it).
pub fn run_pipeline(msg: &ChatMessage, cache: &BatchCache) -> Result<Vec<UpdatePair>, ParseError> {
    let cleaned = normalize::clean_message(&msg.content);

    let mut pairs = Vec::new();
    let mut first_error: Option<ParseError> = None;
    for line in cleaned.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match interpret_line(line, msg, cache) {
            Ok(pair) => pairs.push(pair),
            Err(err) => {
                let keep = match (&first_error, &err) {
                    (None, _) => true,
                    (Some(ParseError::NoVs), e) if !matches!(e, ParseError::NoVs) => true,
                    _ => false,
                };
                if keep {
                    first_error = Some(err);
                }
            }
        }
    }

    if pairs.is_empty() {
        return Err(first_error.unwrap_or(ParseError::NoVs));
    }
    Ok(pairs)
}
