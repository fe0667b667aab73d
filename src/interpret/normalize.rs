//! Message normalization and hint extraction.
//!
//! Everything here is pure text processing: stripping chat-platform markup,
//! pulling a division hint, matching map aliases, and splitting a message
//! into its two team sides around a versus-delimiter.

use regex::Regex;
use std::sync::OnceLock;

use crate::config::MAP_ID_PREFIX;
use crate::types::Division;

fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // User (<@123>, <@!123>), role (<@&123>) and channel (<#123>) references.
    RE.get_or_init(|| Regex::new(r"<[@#][!&]?\d+>").unwrap())
}

fn custom_emoji_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<a?:\w+:\d+>").unwrap())
}

fn shortcode_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":[a-zA-Z0-9_+\-]+:").unwrap())
}

/// Strip platform markup and collapse whitespace. Pure and total; never
/// fails. Line structure is preserved so multi-line messages can be
/// interpreted line by line.
pub fn clean_message(raw: &str) -> String {
    let stripped = mention_re().replace_all(raw, " ");
    let stripped = custom_emoji_re().replace_all(&stripped, " ");
    let stripped = shortcode_re().replace_all(&stripped, " ");

    stripped
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}

/// First division token found in the text, if any: matched as a bare word,
/// bracketed (`[B]`), or prefix (`B:` / `Bronze:`) form.
pub fn extract_division_hint(text: &str) -> Option<Division> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)(?:\[\s*(gold|silver|bronze|g|s|b)\s*\]|\b(gold|silver|bronze)\b|\b(gold|silver|bronze|g|s|b):)")
            .unwrap()
    });
    let caps = re.captures(text)?;
    let token = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?;
    Division::from_token(token.as_str())
}

/// Strip a leading division token (`Bronze:`, `[B]`, `B:`) from one side
/// string. Applied after splitting, since captains often prefix each side.
pub fn strip_leading_division(side: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:\[\s*(?:gold|silver|bronze|g|s|b)\s*\]|(?:gold|silver|bronze|g|s|b)\s*:)\s*")
            .unwrap()
    });
    re.replace(side, "").trim().to_string()
}

/// Map alias catalog. Built once per batch from the canonical map list;
/// aliases are tried longest-first so short ids cannot shadow longer ones.
#[derive(Debug, Clone)]
pub struct MapCatalog {
    /// (compiled boundary-safe pattern, canonical id), longest alias first
    entries: Vec<(Regex, String)>,
}

impl MapCatalog {
    pub fn build(canonical_maps: &[String]) -> Self {
        let mut aliases: Vec<(String, String)> = Vec::new();
        for canonical in canonical_maps {
            for variant in alias_variants(canonical) {
                aliases.push((variant, canonical.clone()));
            }
        }
        // Longest alias first to avoid short collisions.
        aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(&b.0)));
        aliases.dedup_by(|a, b| a.0 == b.0);

        let entries = aliases
            .into_iter()
            .filter_map(|(alias, canonical)| {
                boundary_pattern(&alias).map(|re| (re, canonical))
            })
            .collect();

        Self { entries }
    }

    /// Canonical id of the first (longest) alias found in the text.
    pub fn lookup(&self, text: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, canonical)| canonical.clone())
    }
}

/// Variants generated for one canonical map id: with and without the fixed
/// prefix, with a trailing version suffix stripped, and each of those with
/// underscores as spaces (space/underscore equivalence is handled by the
/// pattern itself, so only the textual bases are enumerated here).
fn alias_variants(canonical: &str) -> Vec<String> {
    static VERSION_RE: OnceLock<Regex> = OnceLock::new();
    let version_re =
        VERSION_RE.get_or_init(|| Regex::new(r"_(?:v|b)?\d+$").unwrap());

    let mut bases = vec![canonical.to_lowercase()];
    if let Some(unprefixed) = canonical.to_lowercase().strip_prefix(MAP_ID_PREFIX) {
        bases.push(unprefixed.to_string());
    }
    let mut variants = Vec::new();
    for base in bases {
        let stripped = version_re.replace(&base, "").to_string();
        variants.push(base);
        if !variants.contains(&stripped) {
            variants.push(stripped);
        }
    }
    variants.retain(|v| v.len() >= 3);
    variants
}

/// Boundary-safe case-insensitive pattern for one alias, treating spaces and
/// underscores interchangeably.
fn boundary_pattern(alias: &str) -> Option<Regex> {
    let body = alias
        .chars()
        .map(|c| match c {
            ' ' | '_' => "[ _]".to_string(),
            c => regex::escape(&c.to_string()),
        })
        .collect::<String>();
    Regex::new(&format!(r"(?i)(?:^|[^a-z0-9]){}(?:[^a-z0-9]|$)", body)).ok()
}

fn vs_delimiter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // The literal word vs/vs./v., a double slash, a spaced hyphen, or a
        // semicolon.
        Regex::new(r"(?i)(?:\bvs\.?\s|\bvs\.?$|\bv\.\s|//|\s-\s|;)").unwrap()
    })
}

fn between_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bbetween\s+(.+?)\s+and\s+(.+)").unwrap())
}

/// Tokens that start the scheduling tail captains append after the second
/// team name. The side is cut at the first such token.
fn tail_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)\b(?:
                mon(?:day)?|tue(?:s|sday)?|wed(?:nesday)?|thu(?:rs|rsday)?|fri(?:day)?|sat(?:urday)?|sun(?:day)?
                |jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?
                |aug(?:ust)?|sep(?:t|tember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?
                |tbd|postponed|next\s+week|default|usual|tonight|today|tomorrow
                |at\s+\d
                |on
                |\d{1,2}/\d{1,2}
                |\d{1,4}(?::\d{2})?\s*(?:am|pm|est|edt|et|eastern)
            )\b",
        )
        .unwrap()
    })
}

/// Split a message line into its two side strings.
///
/// Returns `None` when no versus-delimiter is present. The second side is
/// trimmed of trailing date/time fragments and filler words, since captains
/// usually append the scheduling info there.
pub fn split_sides(text: &str) -> Option<(String, String)> {
    let (left, right) = if let Some(caps) = between_re().captures(text) {
        (caps[1].to_string(), caps[2].to_string())
    } else {
        let m = vs_delimiter_re().find(text)?;
        (
            text[..m.start()].to_string(),
            text[m.end()..].to_string(),
        )
    };

    let left = strip_leading_division(&left);
    let mut right = strip_leading_division(&right);

    if let Some(m) = tail_re().find(&right) {
        let head = right[..m.start()].trim().to_string();
        if !head.is_empty() {
            right = head;
        }
    }
    let right = right
        .trim()
        .trim_end_matches(|c: char| c == ',' || c == '.' || c == '-')
        .trim()
        .to_string();

    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some((left, right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_message_strips_markup() {
        let raw = "<@123456> Falcons   vs\tWolves <:pog:9876>  9/28 :wave:";
        assert_eq!(clean_message(raw), "Falcons vs Wolves 9/28");
    }

    #[test]
    fn test_clean_message_keeps_lines() {
        let raw = "  Falcons vs Wolves 9/28 \n\n  Ravens vs Otters sunday  ";
        let cleaned = clean_message(raw);
        let lines: Vec<&str> = cleaned.lines().collect();
        assert_eq!(lines, vec!["Falcons vs Wolves 9/28", "", "Ravens vs Otters sunday"]);
    }

    #[test]
    fn test_division_hint_forms() {
        assert_eq!(
            extract_division_hint("Bronze: Falcons vs Wolves"),
            Some(Division::Bronze)
        );
        assert_eq!(
            extract_division_hint("[S] ravens vs otters"),
            Some(Division::Silver)
        );
        assert_eq!(
            extract_division_hint("falcons vs wolves in gold"),
            Some(Division::Gold)
        );
        assert_eq!(extract_division_hint("falcons vs wolves"), None);
    }

    #[test]
    fn test_division_hint_ignores_plain_letters() {
        // A bare "b" word with no colon/bracket is not a hint.
        assert_eq!(extract_division_hint("team b vs wolves"), None);
    }

    #[test]
    fn test_map_catalog_variants() {
        let catalog = MapCatalog::build(&[
            "de_harbor_v2".to_string(),
            "de_depot".to_string(),
        ]);
        assert_eq!(
            catalog.lookup("playing on harbor sunday"),
            Some("de_harbor_v2".to_string())
        );
        assert_eq!(
            catalog.lookup("de_harbor_v2 rescheduled"),
            Some("de_harbor_v2".to_string())
        );
        assert_eq!(catalog.lookup("depot week"), Some("de_depot".to_string()));
        assert_eq!(catalog.lookup("no map here"), None);
    }

    #[test]
    fn test_map_catalog_longest_first() {
        // "de_harbor_b2" must not be shadowed by a shorter id sharing a stem.
        let catalog =
            MapCatalog::build(&["de_harbor_b2".to_string(), "de_har".to_string()]);
        assert_eq!(
            catalog.lookup("see you on harbor_b2"),
            Some("de_harbor_b2".to_string())
        );
    }

    #[test]
    fn test_map_catalog_boundary_safe() {
        let catalog = MapCatalog::build(&["de_depot".to_string()]);
        // Embedded occurrences do not match.
        assert_eq!(catalog.lookup("depothead vs wolves"), None);
    }

    #[test]
    fn test_split_sides_vs_forms() {
        for text in [
            "Falcons vs Wolves",
            "Falcons vs. Wolves",
            "Falcons v. Wolves",
            "Falcons // Wolves",
            "Falcons - Wolves",
            "Falcons; Wolves",
        ] {
            let (a, b) = split_sides(text).unwrap_or_else(|| panic!("failed: {}", text));
            assert_eq!(a, "Falcons", "input: {}", text);
            assert_eq!(b, "Wolves", "input: {}", text);
        }
    }

    #[test]
    fn test_split_sides_between_phrase() {
        let (a, b) = split_sides("match between Falcons and Wolves").unwrap();
        assert_eq!(a, "Falcons");
        assert_eq!(b, "Wolves");
    }

    #[test]
    fn test_split_sides_trims_scheduling_tail() {
        let (a, b) = split_sides("Falcons vs Wolves 9/28 9pm").unwrap();
        assert_eq!(a, "Falcons");
        assert_eq!(b, "Wolves");

        let (_, b) = split_sides("Falcons vs Wolves sunday 930 est").unwrap();
        assert_eq!(b, "Wolves");

        let (_, b) = split_sides("Falcons vs Wolves default").unwrap();
        assert_eq!(b, "Wolves");
    }

    #[test]
    fn test_split_sides_strips_division_prefixes() {
        let (a, b) = split_sides("Bronze: Falcons vs Wolves 9/28").unwrap();
        assert_eq!(a, "Falcons");
        assert_eq!(b, "Wolves");

        let (a, _) = split_sides("[B] Falcons vs [B] Wolves").unwrap();
        assert_eq!(a, "Falcons");
    }

    #[test]
    fn test_split_sides_no_delimiter() {
        assert_eq!(split_sides("no match info here"), None);
        assert_eq!(split_sides("vs Wolves"), None);
    }
}
