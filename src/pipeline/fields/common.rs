//! Source-agnostic enrichment. Runs after the layout rules and only fills
//! fields the layout left empty.

use std::sync::LazyLock;

use regex::Regex;

use super::filters::{self, clean_value};
use super::names::*;
use super::{FieldRule, RawFieldMap, RuleSet};
use crate::pipeline::geocode::states::{state_code_alternation, state_name_alternation};
use crate::pipeline::normalize::dates::DATE_TOKEN;

/// Hosts of the issuing organizations; links to them are not media coverage.
const ISSUER_HOSTS: &[&str] = &["fbi.gov", "missingkids.org", "namus.nij.ojp.gov", "namus.gov", "charleyproject.org"];

static ALIAS_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\s*(?:,|;|/|\bor\b|\band\b)\s*"#).unwrap());

static TRAILING_COUNTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\b(?:USA|U\.S\.A\.?|US|United\s+States)\s*$").unwrap());

static POSTAL_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\b(\d{5}(?:-\d{4})?)\s*$").unwrap());

fn valid_latitude(value: &str) -> bool {
    value.parse::<f64>().is_ok_and(|v| (-90.0..=90.0).contains(&v))
}

fn valid_longitude(value: &str) -> bool {
    value.parse::<f64>().is_ok_and(|v| (-180.0..=180.0).contains(&v))
}

fn valid_media_url(value: &str) -> bool {
    let lower = value.to_lowercase();
    !ISSUER_HOSTS.iter().any(|h| lower.contains(h))
}

fn url(raw: &str) -> Option<String> {
    let v = raw.trim_end_matches(['.', ',', ';', ')']);
    (v.len() > 10).then(|| v.to_string())
}

fn case_number(raw: &str) -> Option<String> {
    clean_value(raw).map(|v| v.to_uppercase())
}

pub(super) static RULES: LazyLock<RuleSet> = LazyLock::new(|| {
    let state_names = state_name_alternation();
    let state_codes = state_code_alternation();
    RuleSet::gap_fill(
        "common",
        vec![
            // Demographics
            FieldRule::new(SEX, r"(?i:\b(?:Sex|Gender))\s*[:\-]?\s*((?i:Female|Male))\b")
                .transform(filters::lowercase)
                .validate(filters::any_value),
            FieldRule::new(
                AGE,
                r"(?i:\bAge(?:\s+at\s+(?:time\s+of\s+disappearance|missing))?)\s*[:\-]?\s*(\d{1,3})\b",
            )
            .validate(filters::valid_age),
            FieldRule::new(
                HEIGHT,
                r#"(?i:\bHeight)\s*[:\-]?\s*(\d\s*'\s*\d{1,2}"?(?:\s*-\s*\d\s*'\s*\d{1,2}"?)?|\d{2,3}\s*(?i:in|inches)\b)"#,
            )
            .validate(filters::has_digit),
            FieldRule::new(WEIGHT, r"(?i:\bWeight)\s*[:\-]?\s*(\d{2,3}(?:\s*-\s*\d{2,3})?\s*(?i:lbs?|pounds))")
                .validate(filters::has_digit),
            FieldRule::new(HAIR, r"(?i:\bHair(?:\s+Colou?r)?)\s*:?\s*([A-Za-z]+)")
                .transform(filters::lowercase)
                .validate(filters::valid_hair_color),
            FieldRule::new(HAIR, r"(?i)\b([a-z]+)\s+hair\b")
                .transform(filters::lowercase)
                .validate(filters::valid_hair_color),
            FieldRule::new(EYES, r"(?i:\bEyes?(?:\s+Colou?r)?)\s*:?\s*([A-Za-z]+)")
                .transform(filters::lowercase)
                .validate(filters::valid_eye_color),
            FieldRule::new(EYES, r"(?i)\b([a-z]+)\s+eyes\b")
                .transform(filters::lowercase)
                .validate(filters::valid_eye_color),
            FieldRule::new(
                DOB,
                &format!(r"(?i:\b(?:DOB|Date\s+of\s+Birth|Birth\s+Date|born\s+on))\s*[:\-]?\s*({DATE_TOKEN})"),
            )
            .validate(filters::has_year),
            FieldRule::new(
                ALIASES,
                r"(?i:\b(?:Alias(?:es)?|AKA|a\.k\.a\.?|Nicknames?))\s*[:\-]?\s*([^\n;]+)",
            )
            .transform(filters::clean_alias)
            .validate(filters::valid_list_entry),
            FieldRule::new(
                FEATURES,
                r"(?i)\b((?:scar|tattoo|birthmark|piercing|mole)s?(?:/mark)?\b[^.\n;]{3,150})",
            )
            .transform(filters::clean_feature)
            .validate(filters::valid_feature),
            FieldRule::new(
                RISK_FACTORS,
                r"(?i)\b((?:endangered|at\s+risk|suicidal|medical\s+condition|requires\s+medication|autis(?:m|tic)|dementia|alzheimer'?s)[^.\n;]{0,100})",
            )
            .validate(filters::valid_list_entry),
            // Location
            FieldRule::new(
                CITY,
                r"(?i:\b(?:Missing\s+From|Location|Last\s+Seen\s+(?:in|at)))\s*[:\-]?\s*([A-Z][A-Za-z .'\-]*[A-Za-z]),\s*([A-Z]{2})\b",
            )
            .validate(filters::valid_place)
            .companion(STATE, 2, clean_value, filters::valid_state_code),
            FieldRule::new(CITY, &format!(r"\b([A-Z][a-z]+(?: [A-Z][a-z]+)*), ({state_codes})\b"))
                .validate(filters::valid_place)
                .companion(STATE, 2, clean_value, filters::valid_state_code),
            FieldRule::new(CITY, &format!(r"\b([A-Z][a-z]+(?: [A-Z][a-z]+)*), *({state_names})\b"))
                .validate(filters::valid_place)
                .companion(STATE, 2, clean_value, filters::any_value),
            FieldRule::new(
                POSTAL_CODE,
                &format!(r"(?:\b(?:{state_codes})|{state_names}),?\s+(\d{{5}}(?:-\d{{4}})?)\b"),
            )
            .validate(filters::has_digit),
            FieldRule::new(COUNTY, r"(?i:\bCounty)\s*:\s*([A-Z][A-Za-z .'\-]*[A-Za-z])")
                .validate(filters::valid_place),
            FieldRule::new(COUNTY, r"\b([A-Z][a-z]+(?: [A-Z][a-z]+)?)\s+(?:County|Parish)\b")
                .validate(filters::valid_place),
            FieldRule::new(LATITUDE, r"(-?\d{1,2}\.\d{2,}),\s*(-?\d{1,3}\.\d{2,})")
                .validate(valid_latitude)
                .companion(LONGITUDE, 2, clean_value, valid_longitude),
            FieldRule::new(
                NEARBY,
                r"\b(?i:near|in\s+the\s+vicinity\s+of|close\s+to|behind)\s+(?:the\s+)?([A-Z][A-Za-z'&\-]*(?: (?:of |the |and )?[A-Z][A-Za-z'&\-]*)*)",
            )
            .validate(filters::valid_list_entry),
            // Dates
            FieldRule::new(
                LAST_SEEN,
                &format!(
                    r"(?i:Last\s+seen|Date\s+Last\s+Seen|Date\s+Missing|Missing\s+Since|Date\s+of\s+Last\s+Contact)\s*(?:on\s+)?[:\-]?\s*({DATE_TOKEN})"
                ),
            )
            .validate(filters::has_year),
            FieldRule::new(
                REPORTED,
                &format!(
                    r"(?i:Reported\s+Missing|Case\s+Created|Report\s+Date|Date\s+Reported)\s*(?:on\s+)?[:\-]?\s*({DATE_TOKEN})"
                ),
            )
            .validate(filters::has_year),
            FieldRule::new(
                SIGHTINGS,
                &format!(
                    r"(?i:(?:possible\s+)?sighting|was\s+(?:also\s+)?(?:seen|spotted))\b[^.\n]{{0,60}}?\b({DATE_TOKEN})"
                ),
            )
            .validate(filters::has_year),
            // Agency and contact
            FieldRule::new(
                CASE_NUMBER,
                r"(?i:\b(?:Case|NamUs|NCMEC|Agency\s+Case)\s*(?:ID|#|No\.?|Number))\s*[:\-]?\s*([A-Za-z0-9][A-Za-z0-9\-]*)",
            )
            .transform(case_number)
            .validate(filters::has_digit),
            FieldRule::new(CASE_NUMBER, r"\b((?:MP|UP)\d{3,})\b").validate(filters::has_digit),
            FieldRule::new(AGENCY, r"(?i:\b(?:Investigating\s+Agenc(?:y|ies)|Agency\s+Name|Agency))\s*:\s*([^\n]+)")
                .validate(filters::valid_agency),
            FieldRule::new(
                AGENCY,
                r"\b((?:the\s+)?(?:[A-Z][a-z]+ )+(?:Police Department|Sheriff's Office|Sheriffs Office|Sheriff's Department|Police|PD))\b",
            )
            .validate(filters::valid_agency),
            FieldRule::new(PHONE, r"(\(?\b\d{3}\)?[-. ]?\d{3}[-.]\d{4})\b")
                .transform(filters::clean_phone)
                .validate(filters::valid_agency_phone),
            // Narrative extras
            FieldRule::new(
                WITNESSES,
                r"(?i)\b((?:a\s+|one\s+)?witness(?:es)?\s+(?:said|reported|told|stated|saw|described|observed)[^.\n]{5,180})",
            )
            .validate(filters::valid_list_entry),
            FieldRule::new(
                WITNESSES,
                r"(?i)\b((?:a\s+)?(?:neighbou?rs?|friends?|classmates?|co-?workers?)\s+(?:said|reported|told|stated|saw)[^.\n]{5,180})",
            )
            .validate(filters::valid_list_entry),
            FieldRule::new(MEDIA, r#"(https?://[^\s)>\]"]+)"#)
                .transform(url)
                .validate(valid_media_url),
            FieldRule::new(
                MEDIA,
                r"(?i:\b(?:as\s+reported\s+(?:by|in)|reported\s+by|aired\s+on|published\s+(?:by|in)))\s+(?:the\s+)?([A-Z][A-Za-z0-9&.']*(?: [A-Z][A-Za-z0-9&.']*){0,4})",
            )
            .validate(filters::valid_list_entry),
            FieldRule::new(
                PERSONS_OF_INTEREST,
                r"(?i:\b(?:person\s+of\s+interest|suspect|may\s+be\s+(?:traveling\s+)?(?:with|in\s+the\s+company\s+of)))\s*[:,]?\s*(?:is\s+)?(?:named\s+)?([A-Z][a-z]+(?: [A-Z][a-z'\-]+){1,3})",
            )
            .validate(filters::valid_name),
            // Outcome
            FieldRule::new(
                STATUS,
                r"(?m)^(?i:(?:Case\s+)?Status)\s*[:\-]?\s*((?i:open|active|ongoing|missing|recovered|located|found|resolved|closed|deceased))\b",
            )
            .transform(filters::lowercase)
            .validate(filters::any_value),
            FieldRule::new(STATUS, r"(?m)^(RECOVERED|LOCATED|FOUND SAFE|FOUND DECEASED|DECEASED|RESOLVED)\b")
                .transform(filters::lowercase)
                .validate(filters::any_value),
            FieldRule::new(
                STATUS,
                r"\b(?:She|He|They|[A-Z][a-z]+)\s+(?:was|were|has\s+been|have\s+been)\s+((?i:located|recovered|found\s+(?:safe|alive|deceased|dead)))\b",
            )
            .transform(filters::lowercase)
            .validate(filters::any_value),
            FieldRule::new(STATUS, r"(?i)\b(?:her|his|their)\s+(remains)\s+(?:were|was)\s+(?:found|identified|recovered)\b")
                .transform(filters::lowercase)
                .validate(filters::any_value),
            FieldRule::new(
                RECOVERY,
                r"((?:She|He|They|[A-Z][a-z]+)\s+(?:was|were|has\s+been|have\s+been)\s+(?:located|recovered|found)\b[^.\n]*\.?)",
            )
            .transform(filters::clean_narrative)
            .validate(filters::valid_narrative),
        ],
    )
});

/// City and state from a "City, State ZIP" location line. The state is the
/// whole last component, so compound names survive.
fn split_location(map: &mut RawFieldMap) {
    let Some(location) = map.get(LOCATION).map(str::to_string) else {
        return;
    };
    let parts: Vec<&str> = location.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
    if parts.len() < 2 {
        return;
    }

    let mut last = TRAILING_COUNTRY.replace(parts[parts.len() - 1], "").into_owned();
    if last.is_empty() && parts.len() > 2 {
        last = parts[parts.len() - 2].to_string();
    }
    if let Some(caps) = POSTAL_SUFFIX.captures(&last) {
        map.set_if_absent(POSTAL_CODE, caps[1].to_string());
    }
    let state = POSTAL_SUFFIX.replace(&last, "").trim().to_string();

    if !map.has(CITY) && filters::valid_place(parts[0]) {
        map.set(CITY, parts[0].to_string());
    }
    if !map.has(STATE) && filters::valid_state_name(&state) {
        map.set(STATE, state);
    }
}

fn split_aliases(map: &mut RawFieldMap) {
    let Some(raw) = map.remove(ALIASES) else {
        return;
    };
    for entry in raw {
        for alias in ALIAS_SEPARATOR.split(&entry) {
            if let Some(alias) = filters::clean_alias(alias) {
                if filters::valid_alias(&alias) {
                    map.push_unique(ALIASES, alias);
                }
            }
        }
    }
}

pub(super) fn enrich(map: &mut RawFieldMap, text: &str) {
    split_location(map);
    RULES.apply(text, map);
    split_aliases(map);

    if let Some(agency) = map.get(AGENCY) {
        let cleaned = filters::clean_agency_name(agency);
        map.set(AGENCY, cleaned);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enriched(text: &str) -> RawFieldMap {
        let mut map = RawFieldMap::default();
        enrich(&mut map, text);
        map
    }

    #[test]
    fn labeled_demographics() {
        let map = enriched("Sex: Male\nAge: 17\nHeight: 5'10\"\nWeight: 150 lbs\nHair: Black\nEyes: Brown");
        assert_eq!(map.get(SEX), Some("male"));
        assert_eq!(map.get(AGE), Some("17"));
        assert_eq!(map.get(HEIGHT), Some("5'10\""));
        assert_eq!(map.get(WEIGHT), Some("150 lbs"));
        assert_eq!(map.get(HAIR), Some("black"));
        assert_eq!(map.get(EYES), Some("brown"));
    }

    #[test]
    fn aliases_are_split_and_filtered() {
        let map = enriched("Aliases: JJ, Jess or Jessie\nAlias: Legal Name Unknown");
        assert_eq!(map.get_all(ALIASES), ["JJ", "Jess", "Jessie"]);
    }

    #[test]
    fn features_are_deduplicated() {
        let map = enriched("She has a tattoo of a rose on her wrist. TATTOO OF A ROSE ON HER WRIST. A scar on her chin.");
        let features = map.get_all(FEATURES);
        assert_eq!(features.len(), 2);
        assert!(features[0].starts_with("tattoo of a rose"));
    }

    #[test]
    fn embedded_coordinates_are_captured() {
        let map = enriched("Map: https://maps.example.com/?q=37.5407,-77.4360");
        assert_eq!(map.get(LATITUDE), Some("37.5407"));
        assert_eq!(map.get(LONGITUDE), Some("-77.4360"));
    }

    #[test]
    fn location_line_split_keeps_compound_state() {
        let mut map = RawFieldMap::default();
        map.set(LOCATION, "Wheeling, West Virginia 26003, USA".to_string());
        enrich(&mut map, "");
        assert_eq!(map.get(CITY), Some("Wheeling"));
        assert_eq!(map.get(STATE), Some("West Virginia"));
        assert_eq!(map.get(POSTAL_CODE), Some("26003"));
    }

    #[test]
    fn city_with_state_code() {
        let map = enriched("She was last seen in Norfolk, VA 23510 near the Elizabeth River.");
        assert_eq!(map.get(CITY), Some("Norfolk"));
        assert_eq!(map.get(STATE), Some("VA"));
        assert_eq!(map.get(POSTAL_CODE), Some("23510"));
        assert_eq!(map.get_all(NEARBY), ["Elizabeth River"]);
    }

    #[test]
    fn issuer_links_are_not_media() {
        let map = enriched("See https://www.fbi.gov/wanted/kidnap/jane-doe and https://news.example.com/story/123");
        assert_eq!(map.get_all(MEDIA), ["https://news.example.com/story/123"]);
    }

    #[test]
    fn recovery_sets_status_and_details() {
        let map = enriched("Jane was located safe in Norfolk on March 2, 2023.");
        assert_eq!(map.get(STATUS), Some("located"));
        assert_eq!(map.get(RECOVERY), Some("Jane was located safe in Norfolk on March 2, 2023."));
    }

    #[test]
    fn agency_article_is_cleaned() {
        let map = enriched("Investigating Agency: the the Richmond Police Department");
        assert_eq!(map.get(AGENCY), Some("Richmond Police Department"));
    }

    #[test]
    fn hotline_skipped_for_phone() {
        let map = enriched("Call 1-800-843-5678 or (804) 646-5100.");
        assert_eq!(map.get(PHONE), Some("(804) 646-5100"));
    }

    #[test]
    fn sighting_dates_collected() {
        let map = enriched("She was seen on March 3, 2023 at a bus stop. A possible sighting on April 9, 2023 was reported.");
        assert_eq!(map.get_all(SIGHTINGS), ["March 3, 2023", "April 9, 2023"]);
    }
}
