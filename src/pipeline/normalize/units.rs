//! Height and weight coercion. Ranges resolve to their midpoint.

use std::sync::LazyLock;

use regex::Regex;

static FEET_INCHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d)\s*'\s*(\d{1,2})").unwrap());

static FEET_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\d)\s*(?:ft|feet|foot)\.?(?:\s*,?\s*(\d{1,2})\s*(?:in\b|inches|"))?"#).unwrap()
});

static FEET_ONLY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d)\s*'").unwrap());

static INCHES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{2,3}(?:\.\d+)?)\s*(?:-\s*(\d{2,3}(?:\.\d+)?)\s*)?(?:in\b|inches)").unwrap()
});

static POUNDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,3}(?:\.\d+)?)\s*(?:-\s*(\d{1,3}(?:\.\d+)?)\s*)?(?:lbs?\b|pounds)").unwrap()
});

static BARE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(\d{1,3}(?:\.\d+)?)\s*$").unwrap());

fn midpoint(a: f64, b: Option<f64>) -> f64 {
    match b {
        Some(b) => (a + b) / 2.0,
        None => a,
    }
}

fn number(caps: &regex::Captures<'_>, group: usize) -> Option<f64> {
    caps.get(group).and_then(|m| m.as_str().parse().ok())
}

/// Height in inches. `5' 2" - 5' 4"` gives 63.
pub fn to_inches(raw: &str) -> Option<f64> {
    let feet_inches: Vec<f64> = FEET_INCHES
        .captures_iter(raw)
        .filter_map(|c| Some(number(&c, 1)? * 12.0 + number(&c, 2)?))
        .take(2)
        .collect();
    if let Some(&first) = feet_inches.first() {
        return Some(midpoint(first, feet_inches.get(1).copied()));
    }

    if let Some(caps) = FEET_WORDS.captures(raw) {
        let feet = number(&caps, 1)?;
        return Some(feet * 12.0 + number(&caps, 2).unwrap_or(0.0));
    }

    if let Some(caps) = INCHES.captures(raw) {
        return Some(midpoint(number(&caps, 1)?, number(&caps, 2)));
    }

    if let Some(caps) = FEET_ONLY.captures(raw) {
        return Some(number(&caps, 1)? * 12.0);
    }

    BARE_NUMBER.captures(raw).and_then(|c| number(&c, 1))
}

/// Weight in pounds.
pub fn to_pounds(raw: &str) -> Option<f64> {
    if let Some(caps) = POUNDS.captures(raw) {
        return Some(midpoint(number(&caps, 1)?, number(&caps, 2)));
    }
    BARE_NUMBER.captures(raw).and_then(|c| number(&c, 1))
}
