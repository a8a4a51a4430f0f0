//! Charley Project case page layout. Also the generic fallback layout.

use std::sync::LazyLock;

use super::filters;
use super::names::*;
use super::{FieldRule, RawFieldMap, RuleSet};
use crate::pipeline::normalize::dates::DATE_TOKEN;

pub(super) static RULES: LazyLock<RuleSet> = LazyLock::new(|| {
    RuleSet::new(
        "charley",
        vec![
            FieldRule::new(NAME, r"(?m)^([A-Z][a-z'\-]+(?: +(?:[A-Z]\.|[A-Z][a-z'\-]+)){1,3}) *$")
                .validate(filters::valid_name),
            FieldRule::new(LAST_SEEN, r"(?i:Missing\s+Since)\s*[:\-]?\s*([A-Za-z0-9 ,/\-]{6,40})")
                .validate(filters::has_year),
            // State may be several words ("West Virginia"); never cut at the first.
            FieldRule::new(
                CITY,
                r"(?i:Missing\s+From)\s*[:\-]?\s*([A-Z][A-Za-z .'\-]*[A-Za-z]), *([A-Z][A-Za-z .'\-]*[A-Za-z])",
            )
            .validate(filters::valid_place)
            .companion(STATE, 2, filters::clean_value, filters::valid_state_name),
            FieldRule::new(SEX, r"(?i:\bSex)\s*[:\-]?\s*((?i:Female|Male))\b")
                .transform(filters::lowercase)
                .validate(filters::any_value),
            FieldRule::new(RACE, r"(?m)^(?i:Race)\s*[:\-]?\s*([A-Za-z][A-Za-z /\-]*)$"),
            FieldRule::new(AGE, r"(?i:\bAge)\s*[:\-]?\s*(\d{1,3})\b").validate(filters::valid_age),
            FieldRule::new(DOB, &format!(r"(?i:Date\s+of\s+Birth)\s*[:\-]?\s*({DATE_TOKEN})"))
                .validate(filters::has_year),
            FieldRule::new(HEIGHT, r"(?i:Height\s+and\s+Weight)\s*[:\-]?\s*([^\n]+)")
                .validate(filters::has_digit)
                .companion(WEIGHT, 1, filters::clean_value, filters::has_digit),
            FieldRule::new(
                RISK_FACTORS,
                r"(?i:\bClassification)\s*[:\-]?\s*((?i:Endangered|Non-Family\s+Abduction|Family\s+Abduction|Stranger\s+Abduction|Lost|Runaway)[A-Za-z /\-]*)",
            )
            .validate(filters::valid_list_entry),
            FieldRule::new(FEATURES, r"(?i:Distinguishing\s+Characteristics)\s*[:\-]?\s*([^\n]+)")
                .transform(filters::clean_feature)
                .validate(filters::valid_feature),
            FieldRule::new(
                NARRATIVE,
                r"(?s)(?i:Details\s+of\s+Disappearance)\s*:?[ ]*\n(.*?)(?:\n\s*(?i:Investigating\s+Agenc|Source\s+Information)|\z)",
            )
            .transform(filters::clean_narrative)
            .validate(filters::valid_narrative),
            FieldRule::new(AGENCY, r"(?i:Investigating\s+Agenc(?:y|ies))\s*[:\-]?\s*([^\n]+)")
                .validate(filters::valid_agency),
        ],
    )
});

pub(super) fn post_process(map: &mut RawFieldMap, _text: &str) {
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

    const PAGE: &str = "The Charley Project\n\
Jane Doe\n\
Missing Since 01/10/2023\n\
Missing From Charleston, West Virginia\n\
Classification Endangered Missing\n\
Sex Female\n\
Race White\n\
Date of Birth 03/03/2008 (15)\n\
Age 15 years old\n\
Height and Weight 5'2, 110 pounds\n\
Distinguishing Characteristics Brown hair, blue eyes. Doe has a scar on her chin.\n\
Details of Disappearance\n\
Doe was last seen at her home in Charleston on January 10, 2023.\n\
Her case remains unsolved.\n\
Investigating Agency\n\
Charleston Police Department\n\
304-348-6400\n\
Source Information";

    #[test]
    fn page_fields_are_captured() {
        let map = extract_fields(SourceTag::Charley, PAGE);
        assert_eq!(map.get(NAME), Some("Jane Doe"));
        assert_eq!(map.get(LAST_SEEN), Some("01/10/2023"));
        assert_eq!(map.get(SEX), Some("female"));
        assert_eq!(map.get(RACE), Some("White"));
        assert_eq!(map.get(AGE), Some("15"));
        assert_eq!(map.get(DOB), Some("03/03/2008"));
        assert_eq!(map.get(HEIGHT), Some("5'2, 110 pounds"));
        assert_eq!(map.get(WEIGHT), Some("5'2, 110 pounds"));
        assert_eq!(map.get_all(RISK_FACTORS), ["Endangered Missing"]);
    }

    #[test]
    fn multi_word_state_is_not_truncated() {
        let map = extract_fields(SourceTag::Charley, PAGE);
        assert_eq!(map.get(CITY), Some("Charleston"));
        assert_eq!(map.get(STATE), Some("West Virginia"));
        assert_eq!(map.get(LOCATION), Some("Charleston, West Virginia"));
    }

    #[test]
    fn details_and_agency() {
        let map = extract_fields(SourceTag::Charley, PAGE);
        assert_eq!(
            map.get(NARRATIVE),
            Some("Doe was last seen at her home in Charleston on January 10, 2023. Her case remains unsolved.")
        );
        assert_eq!(map.get(AGENCY), Some("Charleston Police Department"));
        assert_eq!(map.get(PHONE), Some("(304) 348-6400"));
    }

    #[test]
    fn characteristics_feed_features_and_colors() {
        let map = extract_fields(SourceTag::Charley, PAGE);
        assert!(!map.get_all(FEATURES).is_empty());
        assert_eq!(map.get(HAIR), Some("brown"));
        assert_eq!(map.get(EYES), Some("blue"));
    }
}
