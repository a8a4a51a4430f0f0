//! Transforms and validators shared by the layout rule lists.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::extraction::collapse_spaces;
use crate::pipeline::geocode::states::{is_state_code, resolve_state};

/// Longest accepted entry in a list-valued field.
pub const MAX_LIST_ENTRY_LEN: usize = 200;

/// Poster and web-page chrome that is never case content.
pub const DENY_LIST: &[&str] = &[
    "scan, view",
    "scan view",
    "view, & share",
    "& share",
    "share this case",
    "share this poster",
    "how you can help",
    "report sighting",
    "report a sighting",
    "download poster",
    "print poster",
    "click here",
    "call 911",
    "1-800-the-lost",
    "1-800-843-5678",
    "have you seen this child",
    "if you have any information concerning",
];

/// Starts of text that mark a call to action rather than a narrative.
const BOILERPLATE_PREFIXES: &[&str] = &["scan", "how you can help", "report sighting", "call", "911", "share"];

static DEMOGRAPHIC_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:biological|sex|gender|current|age|years?|middle|name|legal|last|height|weight|race|ethnicity|male|female|dob)\b").unwrap()
});

static TRAILING_BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(?:How you can help|Scan,? View|Report (?:a )?Sighting|Share this|Anyone having information|If you have any information|1-800-THE-LOST|(?-i:\bCALL\b)|\b911\b|(?-i:\bNCMEC\b)).*$").unwrap()
});

static DEMOGRAPHIC_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:Biological|Sex|Height|Weight|Race|Age|Legal|Middle|Current|Date)\b.*$").unwrap()
});

static NEXT_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\b(?:Legal|Middle\s+Name|Height|Weight|Race|Ethnicity|Biological|Sex|Hair|Eye|Tribal|Date\s+of|Missing\s+(?:Age|Since|From)|Last\s+Known|Classification|Distinguishing)\b.*$").unwrap()
});

static FEATURE_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:Clothing|Item|Description|Accessories)\b.*$").unwrap());

/// Words that show a capture is a header or label rather than a person's name.
const NAME_STOP_WORDS: &[&str] = &[
    "missing", "child", "children", "person", "endangered", "runaway", "kidnapping", "abduction",
    "fbi", "federal", "bureau", "investigation", "ncmec", "namus", "charley", "project", "details",
    "disappearance", "additional", "information", "field", "office", "police", "sheriff",
    "department", "agency", "since", "from", "date", "contact", "case", "call", "have", "you",
    "seen", "this", "help", "scan", "view", "share", "report", "sighting", "age", "sex", "race",
    "height", "weight", "eyes", "hair", "classification", "identifying", "unknown", "male",
    "female", "circumstances", "location", "wanted", "reward", "vicap", "alert",
];

pub const HAIR_COLORS: &[&str] = &[
    "black", "brown", "blonde", "blond", "red", "gray", "grey", "white", "auburn", "strawberry",
    "chestnut", "sandy", "bald",
];

pub const RACE_WORDS: &[&str] = &[
    "white", "black", "hispanic", "latina", "latino", "asian", "caucasian", "biracial",
    "multiracial", "native", "indian", "pacific", "islander", "african", "american", "arab",
];

pub const EYE_COLORS: &[&str] = &["blue", "brown", "green", "hazel", "gray", "grey", "black", "amber"];

/// Case-insensitive substring check against [`DENY_LIST`].
pub fn contains_denied_fragment(value: &str) -> bool {
    let lower = value.to_lowercase();
    DENY_LIST.iter().any(|d| lower.contains(d))
}

pub fn starts_with_boilerplate(value: &str) -> bool {
    let lower = value.trim_start().to_lowercase();
    BOILERPLATE_PREFIXES.iter().any(|p| {
        lower
            .strip_prefix(p)
            .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric()))
    })
}

pub fn has_demographic_contamination(value: &str) -> bool {
    DEMOGRAPHIC_KEYWORDS.is_match(value)
}

// ═══════════════════════════════════════════
// Transforms
// ═══════════════════════════════════════════

pub fn clean_value(raw: &str) -> Option<String> {
    let v = collapse_spaces(raw);
    let v = v.trim_matches(|c: char| c == ',' || c == ';' || c == ':' || c == '-' || c.is_whitespace());
    if v.is_empty() || v == "--" {
        None
    } else {
        Some(v.to_string())
    }
}

/// "JANE  DOE" -> "Jane Doe"; mixed-case input keeps its casing.
pub fn clean_name(raw: &str) -> Option<String> {
    let v = clean_value(raw)?;
    let has_lower = v.chars().any(|c| c.is_lowercase());
    if has_lower {
        return Some(v);
    }
    Some(v.split(' ').map(title_word).collect::<Vec<_>>().join(" "))
}

/// "WHITE" / "white" -> "White".
pub fn capitalize(raw: &str) -> Option<String> {
    clean_value(raw).map(|v| title_word(&v))
}

fn title_word(word: &str) -> String {
    // Capitalize after apostrophes and hyphens: O'BRIEN -> O'Brien
    let mut out = String::with_capacity(word.len());
    let mut upper_next = true;
    for c in word.chars() {
        if upper_next {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        upper_next = c == '\'' || c == '-';
    }
    out
}

/// Collapse whitespace and cut trailing poster chrome.
pub fn clean_narrative(raw: &str) -> Option<String> {
    let v = collapse_spaces(raw);
    let v = TRAILING_BOILERPLATE.replace(&v, "");
    clean_value(&v)
}

/// Cut an alias capture at the first demographic label that follows it.
pub fn clean_alias(raw: &str) -> Option<String> {
    let v = collapse_spaces(raw);
    let v = DEMOGRAPHIC_TAIL.replace(&v, "");
    clean_value(&v).map(|s| s.trim_matches(|c| c == '"' || c == '\'').to_string())
}

/// Cut a capture where the next form label on the same line begins.
pub fn until_next_label(raw: &str) -> Option<String> {
    let v = collapse_spaces(raw);
    let v = NEXT_LABEL.replace(&v, "");
    clean_value(&v)
}

/// [`until_next_label`] followed by [`clean_name`].
pub fn name_until_next_label(raw: &str) -> Option<String> {
    clean_name(&until_next_label(raw)?)
}

pub fn clean_feature(raw: &str) -> Option<String> {
    let v = collapse_spaces(raw);
    let v = FEATURE_TAIL.replace(&v, "");
    let v = v
        .strip_prefix("Scar/mark")
        .or_else(|| v.strip_prefix("Scar/Mark"))
        .unwrap_or(v.as_ref());
    clean_value(v)
}

pub fn clean_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 10 {
        return None;
    }
    Some(format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]))
}

pub fn lowercase(raw: &str) -> Option<String> {
    clean_value(raw).map(|v| v.to_lowercase())
}

pub fn uppercase(raw: &str) -> Option<String> {
    clean_value(raw).map(|v| v.to_uppercase())
}

/// Duplicate leading article: "the the Richmond PD" -> "the Richmond PD".
pub fn collapse_duplicate_article(name: &str) -> String {
    static DOUBLE_THE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b(the)\s+the\b").unwrap());
    let collapsed = collapse_spaces(name);
    let mut out = collapsed.clone();
    while DOUBLE_THE.is_match(&out) {
        out = DOUBLE_THE.replace(&out, "$1").into_owned();
    }
    out
}

/// Agency name cleanup: duplicated article collapsed, and a leading article
/// dropped when the remainder is already a proper noun phrase.
pub fn clean_agency_name(name: &str) -> String {
    let collapsed = collapse_duplicate_article(name);
    let mut words = collapsed.splitn(2, ' ');
    let first = words.next().unwrap_or("");
    match words.next() {
        Some(rest)
            if first.eq_ignore_ascii_case("the")
                && rest.chars().next().is_some_and(|c| c.is_uppercase()) =>
        {
            rest.to_string()
        }
        _ => collapsed,
    }
}

// ═══════════════════════════════════════════
// Validators
// ═══════════════════════════════════════════

pub fn any_value(_value: &str) -> bool {
    true
}

pub fn not_boilerplate(value: &str) -> bool {
    !contains_denied_fragment(value) && !starts_with_boilerplate(value)
}

pub fn valid_name(value: &str) -> bool {
    let words: Vec<&str> = value.split_whitespace().collect();
    if words.is_empty() || words.len() > 5 || value.len() > 60 {
        return false;
    }
    if !value
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '\'' || c == '-' || c == '.')
    {
        return false;
    }
    let stop = words.iter().any(|w| {
        let w = w.trim_matches(|c: char| !c.is_alphabetic()).to_lowercase();
        NAME_STOP_WORDS.contains(&w.as_str())
    });
    !stop && not_boilerplate(value)
}

/// Single name part (first, middle, last).
pub fn valid_name_part(value: &str) -> bool {
    value.split_whitespace().count() <= 3
        && value.chars().any(|c| c.is_alphabetic())
        && !has_demographic_contamination(value)
        && valid_name(value)
}

pub fn valid_alias(value: &str) -> bool {
    (2..=40).contains(&value.len())
        && value.split_whitespace().count() <= 4
        && !has_demographic_contamination(value)
        && not_boilerplate(value)
}

pub fn valid_narrative(value: &str) -> bool {
    value.len() > 10 && not_boilerplate(value)
}

pub fn valid_list_entry(value: &str) -> bool {
    (3..=MAX_LIST_ENTRY_LEN).contains(&value.len()) && not_boilerplate(value)
}

pub fn valid_feature(value: &str) -> bool {
    static NOT_FEATURE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)\b(?:clothing|accessories|item|description|physical features)\b").unwrap()
    });
    value.len() > 5 && value.len() < MAX_LIST_ENTRY_LEN && !NOT_FEATURE.is_match(value) && not_boilerplate(value)
}

pub fn valid_place(value: &str) -> bool {
    (2..=60).contains(&value.len())
        && value.chars().next().is_some_and(|c| c.is_alphabetic())
        && !value.chars().any(|c| c.is_ascii_digit())
        && not_boilerplate(value)
}

pub fn valid_state_code(value: &str) -> bool {
    is_state_code(value)
}

/// Any spelling of a US state: full name or USPS code.
pub fn valid_state_name(value: &str) -> bool {
    resolve_state(value).is_some()
}

pub fn has_digit(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
}

/// Candidate carries a year (four digits or a two-digit slash year).
pub fn has_year(value: &str) -> bool {
    static YEAR: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\b(?:1[89]\d{2}|20\d{2})\b|\b\d{1,2}[/-]\d{1,2}[/-]\d{2}\b").unwrap()
    });
    YEAR.is_match(value)
}

pub fn valid_age(value: &str) -> bool {
    value.parse::<u32>().is_ok_and(|a| a <= 120)
}

pub fn valid_hair_color(value: &str) -> bool {
    HAIR_COLORS.contains(&value.to_lowercase().as_str())
}

pub fn valid_race_word(value: &str) -> bool {
    RACE_WORDS.contains(&value.to_lowercase().as_str())
}

pub fn valid_eye_color(value: &str) -> bool {
    EYE_COLORS.contains(&value.to_lowercase().as_str())
}

pub fn valid_agency(value: &str) -> bool {
    static NOT_AGENCY: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)\b(?:NamUs|Case|Created|Last|Known|Location|Missing|From)\b").unwrap()
    });
    (4..100).contains(&value.len()) && !NOT_AGENCY.is_match(value) && not_boilerplate(value)
}

/// Rejects the NCMEC hotline, which is printed on every poster.
pub fn valid_agency_phone(value: &str) -> bool {
    value != "(800) 843-5678"
}

/// Case-insensitive dedup preserving first-seen order.
pub fn dedupe_case_insensitive<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.to_lowercase()))
        .collect()
}
