//! Free-text date parsing into canonical UTC timestamps.
//!
//! Dates without an explicit year are rejected. Dates carry no time of day
//! and resolve to midnight UTC.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

/// Regex fragment matching one date in any accepted shape. Month names are
/// case-insensitive; everything else is literal.
pub const DATE_TOKEN: &str = r"(?:(?i:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|June?|July?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)\.?\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4}|\d{1,2}[/-]\d{1,2}[/-](?:\d{4}|\d{2})\b|\d{4}-\d{1,2}-\d{1,2})";

/// Window searched around a date keyword in the repair pass.
pub const REPAIR_WINDOW: usize = 120;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(DATE_TOKEN).unwrap());

static ORDINAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d{1,2})(?:st|nd|rd|th)\b").unwrap());

static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,4})[/-](\d{1,2})[/-](\d{1,4})$").unwrap());

/// Labelled last-seen dates, most specific first.
static REPAIR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let keywords = r"(?i:Missing\s+Since|Last\s+Seen|Date\s+of\s+Last\s+Contact|Disappearance|disappeared|vanished)";
    [
        format!(r"(?i:Missing\s+Since)\s*:?\s*({DATE_TOKEN})"),
        format!(r"(?i:Date\s+Last\s+Seen|Missing\s+Date|Date\s+of\s+Last\s+Contact)\s*:?\s*({DATE_TOKEN})"),
        format!(r"(?i:Last\s+seen)[^0-9A-Za-z]{{0,5}}({DATE_TOKEN})"),
        format!(r"(?s){keywords}.{{0,{REPAIR_WINDOW}}}?({DATE_TOKEN})"),
        format!(r"(?s)({DATE_TOKEN}).{{0,{REPAIR_WINDOW}}}?{keywords}"),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Labels whose dates are never the last-seen date: record bookkeeping and
/// birth dates. Matched against the text right before a candidate.
static OTHER_DATE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:Case\s+Created|Date\s+(?:Created|Entered|Reported|Modified|of\s+Birth)|Last\s+(?:Updated|Modified)|Created|Modified|DOB|Born(?:\s+on)?)\s*:?\s*$",
    )
    .unwrap()
});

/// Parse the first recognizable date in `raw`.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.with_timezone(&Utc));
    }
    parse_date_only(trimmed).and_then(midnight_utc)
}

/// Date portion only, for fields such as date of birth.
pub fn parse_date_only(raw: &str) -> Option<NaiveDate> {
    let token = TOKEN.find(raw)?.as_str();
    parse_token(token)
}

pub fn midnight_utc(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

fn parse_token(token: &str) -> Option<NaiveDate> {
    if let Some(caps) = NUMERIC.captures(token) {
        let a: u32 = caps[1].parse().ok()?;
        let b: u32 = caps[2].parse().ok()?;
        let c: u32 = caps[3].parse().ok()?;
        // 2023-01-10, otherwise US month-first.
        if caps[1].len() == 4 {
            return NaiveDate::from_ymd_opt(a as i32, b, c);
        }
        let year = match caps[3].len() {
            4 => c as i32,
            2 => expand_two_digit_year(c),
            _ => return None,
        };
        return NaiveDate::from_ymd_opt(year, a, b);
    }

    let cleaned = ORDINAL.replace_all(token, "$1");
    let cleaned = cleaned.replace(['.', ','], " ");
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let [month, day, year] = words.as_slice() else {
        return None;
    };
    let month = if month.eq_ignore_ascii_case("sept") { "Sep" } else { month };
    let normalized = format!("{month} {day} {year}");
    ["%B %d %Y", "%b %d %Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&normalized, fmt).ok())
}

/// Two-digit years: 00-69 are 2000s, 70-99 are 1900s.
fn expand_two_digit_year(yy: u32) -> i32 {
    if yy < 70 {
        2000 + yy as i32
    } else {
        1900 + yy as i32
    }
}

/// Recover a last-seen date from prose when no labelled field exists.
/// The narrative is searched before the full text.
pub fn repair_last_seen(narrative: Option<&str>, full_text: &str) -> Option<DateTime<Utc>> {
    narrative
        .into_iter()
        .chain(std::iter::once(full_text))
        .find_map(|haystack| {
            REPAIR_PATTERNS.iter().find_map(|re| {
                re.captures_iter(haystack).find_map(|caps| {
                    let date = caps.get(1)?;
                    if OTHER_DATE_LABEL.is_match(&haystack[..date.start()]) {
                        return None;
                    }
                    parse_date(date.as_str())
                })
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        midnight_utc(NaiveDate::from_ymd_opt(y, m, d).unwrap()).unwrap()
    }

    #[test]
    fn month_name_formats() {
        assert_eq!(parse_date("January 10, 2023"), Some(ymd(2023, 1, 10)));
        assert_eq!(parse_date("Jan 10, 2023"), Some(ymd(2023, 1, 10)));
        assert_eq!(parse_date("Jan. 10 2023"), Some(ymd(2023, 1, 10)));
        assert_eq!(parse_date("Sept 8, 2025"), Some(ymd(2025, 9, 8)));
        assert_eq!(parse_date("March 22nd, 2019"), Some(ymd(2019, 3, 22)));
    }

    #[test]
    fn numeric_formats() {
        assert_eq!(parse_date("01/10/2023"), Some(ymd(2023, 1, 10)));
        assert_eq!(parse_date("1-10-2023"), Some(ymd(2023, 1, 10)));
        assert_eq!(parse_date("01/10/23"), Some(ymd(2023, 1, 10)));
        assert_eq!(parse_date("03/03/98"), Some(ymd(1998, 3, 3)));
        assert_eq!(parse_date("2023-01-10"), Some(ymd(2023, 1, 10)));
    }

    #[test]
    fn rfc3339_is_normalized_to_utc() {
        assert_eq!(parse_date("2023-01-10T05:00:00-05:00").unwrap().to_rfc3339(), "2023-01-10T10:00:00+00:00");
    }

    #[test]
    fn date_inside_surrounding_text() {
        assert_eq!(parse_date("Date of Last Contact January 10, 2023 NamUs"), Some(ymd(2023, 1, 10)));
    }

    #[test]
    fn dates_without_year_are_rejected() {
        assert_eq!(parse_date("January 10"), None);
        assert_eq!(parse_date("Tuesday"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn impossible_dates_are_rejected() {
        assert_eq!(parse_date("13/40/2023"), None);
        assert_eq!(parse_date("February 30, 2023"), None);
    }

    #[test]
    fn repair_prefers_narrative() {
        let narrative = "She was last seen on March 3, 2021 leaving school.";
        let text = "Missing Since: May 1, 2020";
        assert_eq!(repair_last_seen(Some(narrative), text), Some(ymd(2021, 3, 3)));
    }

    #[test]
    fn repair_falls_back_to_full_text() {
        let text = "Jane Doe\nMissing Since\n05/01/2020\nRichmond, VA";
        assert_eq!(repair_last_seen(None, text), Some(ymd(2020, 5, 1)));
    }

    #[test]
    fn repair_accepts_date_before_keyword() {
        let text = "On June 4, 2018 the family reported her disappearance to police.";
        assert_eq!(repair_last_seen(None, text), Some(ymd(2018, 6, 4)));
    }

    #[test]
    fn repair_without_keyword_finds_nothing() {
        assert_eq!(repair_last_seen(Some("Her birthday is June 4, 2018."), ""), None);
    }

    #[test]
    fn case_created_date_is_not_a_last_seen_date() {
        let text = "NamUs MP12345\nCase Created 02/01/2023\nCircumstances of Disappearance\nShe left her residence on foot.";
        assert_eq!(repair_last_seen(None, text), None);
    }

    #[test]
    fn date_of_last_contact_wins_over_bookkeeping_dates() {
        let text = "NamUs MP12345\nCase Created 02/01/2023\nDate of Last Contact 01/10/2023\n\
Circumstances of Disappearance\nShe left her residence on foot.";
        assert_eq!(repair_last_seen(None, text), Some(ymd(2023, 1, 10)));
    }

    #[test]
    fn birth_date_near_keyword_is_skipped() {
        assert_eq!(repair_last_seen(None, "Last seen wearing a red coat. DOB: 03/03/2008."), None);
        let narrative = "DOB: 03/03/2008. She disappeared on 04/02/2021 after school.";
        assert_eq!(repair_last_seen(Some(narrative), ""), Some(ymd(2021, 4, 2)));
    }
}
