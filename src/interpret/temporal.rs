//! Flexible date/time resolution for scheduling messages.
//!
//! Resolution order, first hit wins: explicit TBD keywords, numeric dates,
//! textual month+day, weekday names (optionally with a day-of-month), then
//! the division's default upcoming week date. Hours require an am/pm or
//! Eastern-time marker so a bare number is never mistaken for a time; a
//! missing time defaults to 9 PM Eastern and is flagged as defaulted.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::America::New_York;
use chrono_tz::Tz;
use regex::Regex;
use std::sync::OnceLock;

use crate::config::DEFAULT_KICKOFF_HOUR;

/// Fixed reference timezone for all kickoff times.
pub const EASTERN: Tz = New_York;

/// Outcome of temporal resolution for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhenResult {
    /// Display string: `h:mm AM/PM ET M/D`, or `TBD`.
    pub when_text: String,
    /// Absolute kickoff instant; None for TBD.
    pub epoch_seconds: Option<i64>,
    /// True when the hour came from the 9 PM default rather than a token.
    pub time_defaulted: bool,
}

impl WhenResult {
    pub fn tbd() -> Self {
        Self {
            when_text: "TBD".to_string(),
            epoch_seconds: None,
            time_defaulted: false,
        }
    }

    pub fn is_tbd(&self) -> bool {
        self.epoch_seconds.is_none()
    }
}

fn tbd_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:tbd|postponed|next\s+week)\b").unwrap())
}

fn numeric_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?\b").unwrap())
}

fn month_day_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?|aug(?:ust)?|sep(?:t|tember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b\.?\s+(\d{1,2})(?:st|nd|rd|th)?(?:,?\s*(\d{4}))?",
        )
        .unwrap()
    })
}

fn weekday_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(mon(?:day)?|tue(?:s|sday)?|wed(?:nesday)?|thu(?:r|rs|rsday)?|fri(?:day)?|sat(?:urday)?|sun(?:day)?)\b",
        )
        .unwrap()
    })
}

fn ordinal_dom_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").unwrap())
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The marker is mandatory: a bare number is a day-of-month, not a time.
    // Dotted meridiems end on a non-word character, so they take no \b.
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,4})(?::(\d{2}))?\s*([ap]\.m\.|(?:[ap]m|est|edt|et|eastern)\b)")
            .unwrap()
    })
}

fn month_number(token: &str) -> Option<u32> {
    let t = token.to_ascii_lowercase();
    let n = match &t[..3.min(t.len())] {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}

fn weekday_from_token(token: &str) -> Option<Weekday> {
    let t = token.to_ascii_lowercase();
    match &t[..3.min(t.len())] {
        "mon" => Some(Weekday::Mon),
        "tue" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Promote a missing/short year: 2-digit years land in the 2000s; a missing
/// year is the reference year, rolled forward when the resulting date would
/// sit more than ~6 months in the past (retroactive replays near New Year).
fn resolve_year(explicit: Option<i32>, month: u32, day: u32, reference: NaiveDate) -> i32 {
    match explicit {
        Some(y) if y < 100 => y + 2000,
        Some(y) => y,
        None => {
            let year = reference.year();
            match NaiveDate::from_ymd_opt(year, month, day) {
                Some(date) if (reference - date).num_days() > 180 => year + 1,
                _ => year,
            }
        }
    }
}

/// Parsed time-of-day with its confidence markers.
struct TimeOfDay {
    hour: u32,
    minute: u32,
    defaulted: bool,
}

fn parse_time(text: &str) -> TimeOfDay {
    let caps = match time_re().captures(text) {
        Some(c) => c,
        None => {
            return TimeOfDay {
                hour: DEFAULT_KICKOFF_HOUR,
                minute: 0,
                defaulted: true,
            }
        }
    };

    let digits = &caps[1];
    let colon_minute: Option<u32> = caps.get(2).and_then(|m| m.as_str().parse().ok());
    let marker = caps[3].to_ascii_lowercase();

    // "930 est" packs hour and minute into one number.
    let (mut hour, minute) = if colon_minute.is_none() && digits.len() >= 3 {
        let n: u32 = digits.parse().unwrap_or(0);
        (n / 100, n % 100)
    } else {
        (digits.parse().unwrap_or(0), colon_minute.unwrap_or(0))
    };

    let is_am = marker.starts_with('a');
    if hour <= 12 {
        if is_am {
            if hour == 12 {
                hour = 0;
            }
        } else {
            // Explicit PM, or a timezone-only marker: ambiguity defaults to PM.
            if hour != 12 {
                hour += 12;
            }
        }
    }
    // Hours 13..=23 are taken as 24-hour clock regardless of marker.

    if hour > 23 || minute > 59 {
        return TimeOfDay {
            hour: DEFAULT_KICKOFF_HOUR,
            minute: 0,
            defaulted: true,
        };
    }

    TimeOfDay {
        hour,
        minute,
        defaulted: false,
    }
}

/// First calendar date resolvable from the text, if any.
fn parse_date(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    if let Some(caps) = numeric_date_re().captures(text) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year_token: Option<i32> = caps.get(3).and_then(|m| m.as_str().parse().ok());
        let year = resolve_year(year_token, month, day, reference);
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = month_day_re().captures(text) {
        let month = month_number(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        let year_token: Option<i32> = caps.get(3).and_then(|m| m.as_str().parse().ok());
        let year = resolve_year(year_token, month, day, reference);
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = weekday_re().captures(text) {
        let weekday = weekday_from_token(&caps[1])?;
        let dom: Option<u32> = ordinal_dom_re()
            .captures(text)
            .and_then(|c| c[1].parse().ok());
        return Some(resolve_weekday(weekday, dom, reference));
    }

    None
}

/// Next occurrence of `weekday` on/after `reference`; with a day-of-month,
/// the occurrence of that weekday landing on that day in the current or
/// next month and not earlier than the reference.
fn resolve_weekday(weekday: Weekday, dom: Option<u32>, reference: NaiveDate) -> NaiveDate {
    if let Some(dom) = dom {
        let next_month = (reference.month() % 12) + 1;
        for offset in 0..62 {
            let date = reference + Duration::days(offset);
            if date.weekday() == weekday
                && date.day() == dom
                && (date.month() == reference.month() || date.month() == next_month)
            {
                return date;
            }
        }
        // No consistent weekday+dom combination; fall through to weekday-only.
    }

    let days_ahead = (weekday.num_days_from_monday() + 7
        - reference.weekday().num_days_from_monday())
        % 7;
    reference + Duration::days(days_ahead as i64)
}

/// Combine a calendar date with a time-of-day in the Eastern reference zone,
/// applying the correct standard/daylight offset for that date.
fn eastern_instant(date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Tz>> {
    let naive = date.and_hms_opt(hour, minute, 0)?;
    EASTERN
        .from_local_datetime(&naive)
        .earliest()
        // Spring-forward gap: shift into the next valid hour.
        .or_else(|| {
            EASTERN
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()
        })
}

/// Display form: `h:mm AM/PM ET M/D`.
fn format_when(dt: &DateTime<Tz>) -> String {
    let (is_pm, hour12) = dt.hour12();
    format!(
        "{}:{:02} {} ET {}/{}",
        hour12,
        dt.minute(),
        if is_pm { "PM" } else { "AM" },
        dt.month(),
        dt.day()
    )
}

/// Resolve the kickoff expression in `text`.
///
/// `reference` anchors relative expressions; batch replays pass the source
/// message's creation instant so retroactive parsing lands correctly.
/// `fallback_date` is the hinted division's default upcoming week date, used
/// when the text carries no date at all.
pub fn resolve_when(
    text: &str,
    reference: DateTime<Utc>,
    fallback_date: Option<NaiveDate>,
) -> WhenResult {
    if tbd_re().is_match(text) {
        return WhenResult::tbd();
    }

    let reference_et = reference.with_timezone(&EASTERN);
    let reference_date = reference_et.date_naive();

    let date = parse_date(text, reference_date)
        .or(fallback_date)
        .unwrap_or(reference_date);

    let time = parse_time(text);
    match eastern_instant(date, time.hour, time.minute) {
        Some(dt) => WhenResult {
            when_text: format_when(&dt),
            epoch_seconds: Some(dt.timestamp()),
            time_defaulted: time.defaulted,
        },
        None => WhenResult::tbd(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_tbd_keywords() {
        for text in ["time tbd", "match POSTPONED", "pushing to next week"] {
            let r = resolve_when(text, utc(2025, 9, 23, 12, 0), None);
            assert!(r.is_tbd(), "input: {}", text);
            assert_eq!(r.when_text, "TBD");
        }
    }

    #[test]
    fn test_numeric_date_with_time() {
        // 2025-09-28 21:00 Eastern is EDT (UTC-4).
        let r = resolve_when("9/28 9pm", utc(2025, 9, 23, 12, 0), None);
        assert_eq!(r.when_text, "9:00 PM ET 9/28");
        assert_eq!(r.epoch_seconds, Some(1_759_107_600));
        assert!(!r.time_defaulted);
    }

    #[test]
    fn test_two_digit_year_promoted() {
        let r = resolve_when("1/5/26 8pm", utc(2025, 12, 20, 12, 0), None);
        let expected = EASTERN
            .with_ymd_and_hms(2026, 1, 5, 20, 0, 0)
            .unwrap()
            .timestamp();
        assert_eq!(r.epoch_seconds, Some(expected));
    }

    #[test]
    fn test_missing_year_rolls_forward_near_boundary() {
        // Reference late December, date in early January: next year.
        let r = resolve_when("1/5 8pm", utc(2025, 12, 20, 12, 0), None);
        let expected = EASTERN
            .with_ymd_and_hms(2026, 1, 5, 20, 0, 0)
            .unwrap()
            .timestamp();
        assert_eq!(r.epoch_seconds, Some(expected));
    }

    #[test]
    fn test_month_name_forms() {
        for text in ["sept 28th 9pm", "September 28, 2025 9pm", "Sep. 28 9pm"] {
            let r = resolve_when(text, utc(2025, 9, 23, 12, 0), None);
            assert_eq!(r.epoch_seconds, Some(1_759_107_600), "input: {}", text);
        }
    }

    #[test]
    fn test_weekday_resolves_to_next_occurrence() {
        // Reference is Tuesday 2025-09-23; upcoming Sunday is 9/28.
        let r = resolve_when("emo vs wolves sunday 930 est", utc(2025, 9, 23, 12, 0), None);
        assert_eq!(r.when_text, "9:30 PM ET 9/28");
        assert_eq!(r.epoch_seconds, Some(1_759_109_400));
        assert!(!r.time_defaulted);
    }

    #[test]
    fn test_weekday_on_reference_day_is_today() {
        // Reference is Sunday; "sunday" means today.
        let r = resolve_when("sunday 9pm", utc(2025, 9, 28, 12, 0), None);
        assert_eq!(r.epoch_seconds, Some(1_759_107_600));
    }

    #[test]
    fn test_weekday_with_ordinal_day_of_month() {
        // Friday the 10th from reference 2025-09-23: October 10, 2025 is a
        // Friday in the next month.
        let r = resolve_when("friday the 10th 9pm", utc(2025, 9, 23, 12, 0), None);
        let expected = EASTERN
            .with_ymd_and_hms(2025, 10, 10, 21, 0, 0)
            .unwrap()
            .timestamp();
        assert_eq!(r.epoch_seconds, Some(expected));
    }

    #[test]
    fn test_hour_requires_marker() {
        // "28" and a bare "9" must not be read as times.
        let r = resolve_when("9/28", utc(2025, 9, 23, 12, 0), None);
        assert_eq!(r.when_text, "9:00 PM ET 9/28");
        assert!(r.time_defaulted);
    }

    #[test]
    fn test_ambiguous_meridiem_defaults_pm() {
        let r = resolve_when("9/28 9 et", utc(2025, 9, 23, 12, 0), None);
        assert_eq!(r.when_text, "9:00 PM ET 9/28");
        assert!(!r.time_defaulted);
    }

    #[test]
    fn test_explicit_am() {
        let r = resolve_when("9/28 11am", utc(2025, 9, 23, 12, 0), None);
        assert_eq!(r.when_text, "11:00 AM ET 9/28");
    }

    #[test]
    fn test_dotted_meridiem_forms() {
        let r = resolve_when("9/28 7 p.m.", utc(2025, 9, 23, 12, 0), None);
        assert_eq!(r.when_text, "7:00 PM ET 9/28");
        assert!(!r.time_defaulted);

        let r = resolve_when("9/28 11 a.m.", utc(2025, 9, 23, 12, 0), None);
        assert_eq!(r.when_text, "11:00 AM ET 9/28");
        assert!(!r.time_defaulted);
    }

    #[test]
    fn test_24_hour_clock_with_tz_marker() {
        let r = resolve_when("9/28 21:30 et", utc(2025, 9, 23, 12, 0), None);
        assert_eq!(r.when_text, "9:30 PM ET 9/28");
    }

    #[test]
    fn test_fallback_date_used_when_no_date() {
        let fallback = NaiveDate::from_ymd_opt(2025, 9, 28).unwrap();
        let r = resolve_when("9pm works", utc(2025, 9, 23, 12, 0), Some(fallback));
        assert_eq!(r.when_text, "9:00 PM ET 9/28");
        assert!(!r.time_defaulted);
    }

    #[test]
    fn test_dst_offset_winter_vs_summer() {
        // January is EST (UTC-5), July is EDT (UTC-4).
        let winter = resolve_when("1/10 9pm", utc(2025, 1, 2, 12, 0), None);
        let summer = resolve_when("7/10 9pm", utc(2025, 7, 2, 12, 0), None);
        let winter_utc = Utc
            .timestamp_opt(winter.epoch_seconds.unwrap(), 0)
            .unwrap();
        let summer_utc = Utc
            .timestamp_opt(summer.epoch_seconds.unwrap(), 0)
            .unwrap();
        assert_eq!(winter_utc.hour(), 2); // 21 + 5 = 02:00 next day
        assert_eq!(summer_utc.hour(), 1); // 21 + 4 = 01:00 next day
    }
}
