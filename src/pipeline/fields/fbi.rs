//! FBI missing-person poster layout. Mostly prose with embedded facts.

use std::sync::LazyLock;

use regex::Regex;

use super::filters;
use super::names::*;
use super::{FieldRule, RawFieldMap, RuleSet};
use crate::pipeline::classify::FIELD_OFFICE_MARKER;
use crate::pipeline::geocode::states::state_name_alternation;
use crate::pipeline::normalize::dates::DATE_TOKEN;

static LEADING_PREPOSITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:In|Near|From|Of|At|The)\s+").unwrap());

fn valid_title_name(value: &str) -> bool {
    (2..=5).contains(&value.split_whitespace().count()) && filters::valid_name(value)
}

fn city_name(raw: &str) -> Option<String> {
    let v = filters::clean_value(raw)?;
    filters::clean_value(&LEADING_PREPOSITION.replace(&v, ""))
}

pub(super) static RULES: LazyLock<RuleSet> = LazyLock::new(|| {
    let states = state_name_alternation();
    RuleSet::new(
        "fbi",
        vec![
            FieldRule::new(NAME, r"(?m)^([A-Z][A-Z'\- ]*[A-Z])[ ]*$")
                .transform(filters::clean_name)
                .validate(valid_title_name),
            // Dates next to a last-seen phrase outrank the first date on the page.
            FieldRule::new(
                LAST_SEEN,
                &format!(
                    r"(?i:last\s+seen|disappeared|went\s+missing|reported\s+missing|missing\s+since)\b[^.\n]{{0,80}}?\b({DATE_TOKEN})"
                ),
            )
            .validate(filters::has_year),
            FieldRule::new(LAST_SEEN, &format!(r"\b({DATE_TOKEN})")).validate(filters::has_year),
            FieldRule::new(CITY, &format!(r"\b([A-Z][a-z]+(?: [A-Z][a-z]+)*), *({states})\b"))
                .transform(city_name)
                .validate(filters::valid_place)
                .companion(STATE, 2, filters::clean_value, filters::any_value),
            FieldRule::new(
                RACE,
                r"(?i)\b([a-z]+)\s+(?:male|female),?\s+with\s+([a-z]+)\s+eyes\s+and\s+([a-z]+)\s+hair",
            )
            .transform(filters::capitalize)
            .validate(filters::valid_race_word)
            .companion(EYES, 2, filters::lowercase, filters::valid_eye_color)
            .companion(HAIR, 3, filters::lowercase, filters::valid_hair_color),
            FieldRule::new(
                RACE,
                r"(?i)\b([a-z]+)\s+(?:male|female),?\s+(?:with\s+)?([a-z]+)\s+eyes,?\s+(?:and\s+)?([a-z]+)\s+hair",
            )
            .transform(filters::capitalize)
            .validate(filters::valid_race_word)
            .companion(EYES, 2, filters::lowercase, filters::valid_eye_color)
            .companion(HAIR, 3, filters::lowercase, filters::valid_hair_color),
            FieldRule::new(
                RACE,
                r"(?i)\b([a-z]+)\s+(?:male|female),?\s+(?:with\s+)?([a-z]+)\s+hair,?\s+(?:and\s+)?([a-z]+)\s+eyes",
            )
            .transform(filters::capitalize)
            .validate(filters::valid_race_word)
            .companion(HAIR, 2, filters::lowercase, filters::valid_hair_color)
            .companion(EYES, 3, filters::lowercase, filters::valid_eye_color),
            FieldRule::new(SEX, r"\b((?i:female))\b")
                .transform(filters::lowercase)
                .validate(filters::any_value),
            FieldRule::new(SEX, r"\b((?i:male))\b")
                .transform(filters::lowercase)
                .validate(filters::any_value),
            FieldRule::new(HEIGHT, r#"(\d'\s*\d{1,2}"?)\s*(?i:tall)"#).validate(filters::has_digit),
            FieldRule::new(HEIGHT, r"(?i)\b(\d\s*(?:ft|feet)(?:\s*,?\s*\d{1,2}\s*(?:in|inches))?)\b")
                .validate(filters::has_digit),
            FieldRule::new(
                WEIGHT,
                r"(?i)\bweigh(?:ed|s)?\s+(?:approximately\s+|about\s+)?(\d{2,3}\s*(?:pounds|lbs))",
            )
            .validate(filters::has_digit),
            FieldRule::new(
                AGE,
                r"(?i)\b(?:was|is)\s+(\d{1,3})(?:\s+years?\s+old|\s+and\b|\s+at\s+the\s+time)",
            )
            .validate(filters::valid_age),
            FieldRule::new(DOB, &format!(r"(?i:born\s+on)\s+({DATE_TOKEN})")).validate(filters::has_year),
            FieldRule::new(
                NARRATIVE,
                r"(?s)(?i:\bDETAILS)\s*:?[ ]*\n(.*?)(?:\n\s*(?i:ADDITIONAL\s+INFORMATION|Anyone\s+with\s+information|If\s+you\s+have\s+any\s+information|Field\s+Office\s*:)|\z)",
            )
            .transform(filters::clean_narrative)
            .validate(filters::valid_narrative),
            FieldRule::new(PHONE, r"(\(\d{3}\)\s*\d{3}-\d{4})").transform(filters::clean_phone),
            FieldRule::new(FIELD_OFFICE, r"\bFBI\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\s+Field\s+Office\b"),
            FieldRule::new(
                AGENCY,
                r"(?i:jointly\s+with\s+the)\s+((?:the\s+)?[A-Za-z ]+?(?:Police(?:\s+Department)?|Sheriff'?s?(?:\s+Office)?|Department))",
            )
            .validate(filters::valid_agency),
            FieldRule::new(
                AGENCY,
                r"(?i:contact\s+(?:the\s+)?)((?:the\s+)?[A-Za-z ]+?(?:Police|Sheriff|Department))\s+(?i:at)\s+\(?\d{3}",
            )
            .validate(filters::valid_agency),
            FieldRule::new(
                AGENCY,
                r"(?i:with\s+the)\s+([A-Za-z ]+?(?:Police(?:\s+Department)?|Sheriff'?s?(?:\s+Office)?|Department))",
            )
            .validate(filters::valid_agency),
        ],
    )
});

/// The field office, when named, is the investigating agency.
pub(super) fn post_process(map: &mut RawFieldMap, text: &str) {
    if !map.has(FIELD_OFFICE) {
        if let Some(caps) = FIELD_OFFICE_MARKER.captures(text) {
            if let Some(office) = filters::clean_value(&caps[1]) {
                map.set(FIELD_OFFICE, office);
            }
        }
    }
    if let Some(office) = map.get(FIELD_OFFICE) {
        let agency = format!("FBI {office} Field Office");
        map.set(AGENCY, agency);
    }

    if !map.has(LOCATION) {
        if let (Some(city), Some(state)) = (map.get(CITY), map.get(STATE)) {
            let location = format!("{city}, {state}");
            map.set(LOCATION, location);
        }
    }
}
