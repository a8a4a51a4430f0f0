//! NCMEC missing-child poster layout.

use std::sync::LazyLock;

use regex::Regex;

use super::filters;
use super::names::*;
use super::{FieldRule, RawFieldMap, RuleSet};

/// How far after "Missing Since" the poster prints the city and state.
const CITY_STATE_WINDOW: usize = 250;

static MISSING_SINCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Missing\s+Since\s*:?").unwrap());

static CITY_STATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Z][A-Za-z.'\-]*(?: [A-Z][A-Za-z.'\-]*)*), *([A-Z]{2})\b").unwrap()
});

static FORM_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:Age\s+Now|Sex|Race|Hair\s+Colou?r|Eye\s+Colou?r|Height|Weight|Missing\s+Since|Missing\s+From|DOB)\s*:").unwrap()
});

/// Prose only: a capture that still carries poster labels is the form, not a story.
fn valid_poster_narrative(value: &str) -> bool {
    filters::valid_narrative(value) && !FORM_LABEL.is_match(value) && !value.starts_with("MISSING CHILD")
}

fn valid_poster_name(value: &str) -> bool {
    filters::valid_name(value) && value.split_whitespace().count() >= 2
}

pub(super) static RULES: LazyLock<RuleSet> = LazyLock::new(|| {
    RuleSet::new(
        "ncmec",
        vec![
            // Structured name line, then the caps line above the case data.
            FieldRule::new(NAME, r"(?m)^(?i:Name)\s*:\s*(.+)$")
                .transform(filters::clean_name)
                .validate(valid_poster_name),
            FieldRule::new(NAME, r"(?m)^([A-Z][A-Z' \-]+)\n\s*(?i:Missing\s+Since)")
                .transform(filters::clean_name)
                .validate(valid_poster_name),
            FieldRule::new(NAME, r"(?m)^([A-Z][A-Z' \-]+)\n\s*(?i:How\s+you\s+can\s+help)")
                .transform(filters::clean_name)
                .validate(valid_poster_name),
            // Title line last: it is where truncated and boilerplate names come from.
            FieldRule::new(NAME, r"MISSING\s+CHILD[ ]*\n?[ ]*([A-Z][A-Z' \-]+)")
                .transform(filters::clean_name)
                .validate(valid_poster_name),
            FieldRule::new(LAST_SEEN, r"(?i:Missing\s+Since)\s*[:\-]?\s*([A-Za-z0-9 ,/\-]{6,40})")
                .validate(filters::has_year),
            FieldRule::new(CITY, r"(?i:Missing\s+From)\s*:?\s*([A-Z][A-Za-z .'\-]*[A-Za-z]),\s*([A-Z]{2})\b")
                .validate(filters::valid_place)
                .companion(STATE, 2, filters::clean_value, filters::valid_state_code),
            FieldRule::new(AGE, r"(?i:Age\s*Now)\s*:\s*(\d{1,3})\b").validate(filters::valid_age),
            FieldRule::new(SEX, r"(?i:\bSex)\s*[:\-]?\s*((?i:Female|Male))\b")
                .transform(filters::lowercase)
                .validate(filters::any_value),
            FieldRule::new(SEX, r"\b((?i:Female|Male))\b")
                .transform(filters::lowercase)
                .validate(filters::any_value),
            FieldRule::new(CASE_NUMBER, r"(?i:\bNCMEC)\s*(?:#|(?i:Case\s+Number))?\s*:\s*([A-Za-z0-9\-]+)")
                .transform(filters::uppercase)
                .validate(filters::has_digit),
            FieldRule::new(PHONE, r"\b(\d{3}[-.]\d{3}[-.]\d{4})\b")
                .transform(filters::clean_phone)
                .validate(filters::valid_agency_phone),
            FieldRule::new(
                AGENCY,
                r"([A-Z][A-Z .'&]*(?:POLICE|SHERIFF'?S?|DEPARTMENT|OFFICE)(?: DEPARTMENT| OFFICE)?)\s*(?:\(?[A-Za-z]+\)?\s*)?1?-?\(?\d{3}\)?[-. ]\d{3}[-.]\d{4}",
            )
            .transform(filters::clean_name)
            .validate(filters::valid_agency),
            FieldRule::new(
                NARRATIVE,
                r"(?s)(?i:\bNCMEC)\s*:\s*[A-Za-z0-9\-]+\s*\n\s*([A-Z][^.]*\.(?:\s+[A-Z][^.]*\.)*)",
            )
            .transform(filters::clean_narrative)
            .validate(valid_poster_narrative),
            FieldRule::new(
                NARRATIVE,
                r"(?s)\b(?i:Female|Male)\s*\n\s*([A-Z][^.]*\.(?:\s+[A-Z][^.]*\.)*)",
            )
            .transform(filters::clean_narrative)
            .validate(valid_poster_narrative),
            FieldRule::new(
                NARRATIVE,
                r"(?s)([A-Z][A-Z ]+\s+(?:WAS LAST SEEN|MAY STAY|MAY BE|WAS|IS|HAS)\b[^.]*\.(?:\s+[A-Z][^.]*\.)*)",
            )
            .transform(filters::clean_narrative)
            .validate(valid_poster_narrative),
            FieldRule::new(NARRATIVE, r"((?i:last\s+seen\s+wearing)[^.\n]*\.?)")
                .transform(filters::clean_narrative)
                .validate(valid_poster_narrative),
        ],
    )
});

/// City and state printed just under the missing-since date.
pub(super) fn post_process(map: &mut RawFieldMap, text: &str) {
    if !map.has(CITY) {
        if let Some(m) = MISSING_SINCE.find(text) {
            let tail = &text[m.end()..];
            let end = tail
                .char_indices()
                .nth(CITY_STATE_WINDOW)
                .map(|(i, _)| i)
                .unwrap_or(tail.len());
            let found = CITY_STATE
                .captures_iter(&tail[..end])
                .find(|c| filters::valid_state_code(&c[2]) && filters::valid_place(&c[1]));
            if let Some(caps) = found {
                map.set(CITY, caps[1].trim().to_string());
                map.set_if_absent(STATE, caps[2].to_string());
            }
        }
    }

    if !map.has(LOCATION) {
        if let (Some(city), Some(state)) = (map.get(CITY), map.get(STATE)) {
            let location = format!("{city}, {state}");
            map.set(LOCATION, location);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceTag;
    use crate::pipeline::fields::extract_fields;

    const POSTER: &str = "MISSING CHILD\n\
Have you seen this child?\n\
JANE DOE\n\
Missing Since: Jan 10, 2023\n\
Missing From: Richmond, VA\n\
DOB: Mar 3, 2008\n\
Age Now: 15\n\
Sex: Female\n\
Race: White\n\
Hair Color: Brown\n\
Eye Color: Blue\n\
Height: 5'2\"\n\
Weight: 110 lbs\n\
NCMEC: 1234567\n\
Jane was last seen on January 10, 2023. She may be in the company of an adult male.\n\
ANYONE HAVING INFORMATION SHOULD CONTACT\n\
RICHMOND POLICE DEPARTMENT 804-646-5100\n\
1-800-THE-LOST (1-800-843-5678)\n\
Scan, View, & Share";

    #[test]
    fn caps_line_above_missing_since_is_the_name() {
        let map = extract_fields(SourceTag::Ncmec, POSTER);
        assert_eq!(map.get(NAME), Some("Jane Doe"));
    }

    #[test]
    fn poster_fields_are_captured() {
        let map = extract_fields(SourceTag::Ncmec, POSTER);
        assert_eq!(map.get(LAST_SEEN), Some("Jan 10, 2023"));
        assert_eq!(map.get(CITY), Some("Richmond"));
        assert_eq!(map.get(STATE), Some("VA"));
        assert_eq!(map.get(LOCATION), Some("Richmond, VA"));
        assert_eq!(map.get(AGE), Some("15"));
        assert_eq!(map.get(SEX), Some("female"));
        assert_eq!(map.get(CASE_NUMBER), Some("1234567"));
    }

    #[test]
    fn hotline_is_not_the_agency_phone() {
        let map = extract_fields(SourceTag::Ncmec, POSTER);
        assert_eq!(map.get(PHONE), Some("(804) 646-5100"));
        assert_eq!(map.get(AGENCY), Some("Richmond Police Department"));
    }

    #[test]
    fn narrative_after_case_number() {
        let map = extract_fields(SourceTag::Ncmec, POSTER);
        assert_eq!(
            map.get(NARRATIVE),
            Some("Jane was last seen on January 10, 2023. She may be in the company of an adult male.")
        );
    }

    #[test]
    fn title_only_poster_has_name_but_no_narrative() {
        let map = extract_fields(SourceTag::Ncmec, "MISSING CHILD JANE DOE\nScan, View, & Share");
        assert_eq!(map.get(NAME), Some("Jane Doe"));
        assert!(!map.has(NARRATIVE));
    }

    #[test]
    fn city_found_under_missing_since() {
        let text = "JOHN ROE\nMissing Since: May 1, 2021\nNorfolk, VA\nAge Now: 12";
        let map = extract_fields(SourceTag::Ncmec, text);
        assert_eq!(map.get(CITY), Some("Norfolk"));
        assert_eq!(map.get(STATE), Some("VA"));
    }
}
