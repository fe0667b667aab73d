//! Fuzzy team-name resolution.
//!
//! People rarely type a roster name exactly: abbreviations, partial names,
//! and community nicknames all have to land on the right team. Resolution
//! first rewrites known aliases to canonical names, then scores every
//! roster candidate and keeps the best match above a floor.

use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::types::{Division, Team};

/// Lowercase, strip everything but letters/digits/spaces, collapse runs.
pub fn normalize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_space = true;
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Rewrite community aliases to canonical names. The whole normalized string
/// is tried first; failing that, each word is substituted independently.
fn apply_aliases(normalized: &str, aliases: &BTreeMap<String, String>) -> String {
    if let Some(canonical) = aliases.get(normalized) {
        return normalize_name(canonical);
    }
    let words: Vec<String> = normalized
        .split(' ')
        .map(|w| match aliases.get(w) {
            Some(canonical) => normalize_name(canonical),
            None => w.to_string(),
        })
        .collect();
    words.join(" ")
}

/// Similarity of a query against one candidate name. Exact beats
/// containment beats token overlap; short fragments score by their own
/// length so a two-letter scrap cannot outrank a real name.
fn match_score(query: &str, candidate: &str) -> u32 {
    if query.is_empty() || candidate.is_empty() {
        return 0;
    }
    if query == candidate {
        return 10;
    }
    let (shorter, longer) = if query.len() <= candidate.len() {
        (query, candidate)
    } else {
        (candidate, query)
    };
    if longer.contains(shorter) {
        return (shorter.len() as u32).min(8);
    }

    let candidate_tokens: Vec<&str> = candidate.split(' ').collect();
    let mut overlap = 0u32;
    for qt in query.split(' ') {
        if candidate_tokens
            .iter()
            .any(|ct| *ct == qt || ct.starts_with(qt) || qt.starts_with(ct))
        {
            overlap += 1;
        }
    }
    overlap
}

/// Best score for a team across its canonical name and every roster alias.
fn team_score(query: &str, team: &Team) -> u32 {
    let mut best = match_score(query, &normalize_name(&team.name));
    for alias in &team.aliases {
        best = best.max(match_score(query, &normalize_name(alias)));
    }
    best
}

/// Resolve one side of a matchup to a roster team.
///
/// `forced` restricts candidates to a single division when the message
/// carried a division hint. `side` labels the failure ("home"/"away").
pub fn resolve_team(
    raw: &str,
    teams: &[Team],
    aliases: &BTreeMap<String, String>,
    forced: Option<Division>,
    side: &str,
) -> Result<Team, ParseError> {
    let normalized = normalize_name(raw);
    let query = apply_aliases(&normalized, aliases);

    let mut best: Option<(&Team, u32)> = None;
    for team in teams {
        if let Some(division) = forced {
            if team.division != division {
                continue;
            }
        }
        let score = team_score(&query, team);
        match best {
            Some((_, top)) if score <= top => {}
            _ if score > 0 => best = Some((team, score)),
            _ => {}
        }
    }

    match best {
        Some((team, score)) if score >= 2 => Ok(team.clone()),
        _ => Err(ParseError::TeamNotFound {
            side: format!("{} ({})", side, raw.trim()),
        }),
    }
}
