//! NamUs case export layout.

use std::sync::LazyLock;

use super::filters::{self, clean_value};
use super::names::*;
use super::{FieldRule, RawFieldMap, RuleSet};

/// Capitalized words that start the narrative but are not names.
const NARRATIVE_NON_NAMES: &[&str] = &[
    "The", "She", "He", "They", "It", "Her", "His", "Juvenile", "Adult", "Person", "Victim",
    "Missing", "Police", "Officer", "Family", "Subject", "Witnesses",
];

fn valid_narrative_first_name(value: &str) -> bool {
    !NARRATIVE_NON_NAMES.contains(&value) && filters::valid_name_part(value)
}

fn valid_location(value: &str) -> bool {
    value.contains(',') && value.len() <= 120 && filters::not_boilerplate(value)
}

fn county_name(raw: &str) -> Option<String> {
    let v = clean_value(raw)?;
    let v = v
        .strip_suffix(" County")
        .or_else(|| v.strip_suffix(" Parish"))
        .unwrap_or(v.as_str());
    clean_value(v)
}

fn namus_case_number(raw: &str) -> Option<String> {
    let v: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase();
    (v.len() > 2).then_some(v)
}

pub(super) static RULES: LazyLock<RuleSet> = LazyLock::new(|| {
    RuleSet::new(
        "namus",
        vec![
            FieldRule::new(FIRST_NAME, r"(?i:Legal\s+First\s+Name)\s*:?\s*([^\n]*)")
                .transform(filters::name_until_next_label)
                .validate(filters::valid_name_part),
            FieldRule::new(MIDDLE_NAME, r"(?i:\bMiddle\s+Name)\s*:?\s*([^\n]*)")
                .transform(filters::name_until_next_label)
                .validate(filters::valid_name_part),
            FieldRule::new(LAST_NAME, r"(?i:Legal\s+Last\s+Name)\s*:?\s*([^\n]*)")
                .transform(filters::name_until_next_label)
                .validate(filters::valid_name_part),
            // First name recovered from the narrative when the form is blank.
            FieldRule::new(
                FIRST_NAME,
                r"\b([A-Z][a-z]{2,})\s+(?:is\s+believed|arrived|was\s+last\s+seen|left|went|expressed|traveled)\b",
            )
            .validate(valid_narrative_first_name),
            FieldRule::new(SEX, r"(?i:Biological\s+Sex|\bSex)\s*[:\-]?\s*((?i:Male|Female))\b")
                .transform(filters::lowercase)
                .validate(filters::any_value),
            FieldRule::new(AGE, r"(?i:Missing\s+Age)[:\s]*(\d{1,3})\b").validate(filters::valid_age),
            FieldRule::new(HEIGHT, r"(?i:\bHeight)[:\s]*([^\n]+)")
                .transform(filters::until_next_label)
                .validate(filters::has_digit),
            FieldRule::new(WEIGHT, r"(?i:\bWeight)[:\s]*([^\n]+)")
                .transform(filters::until_next_label)
                .validate(filters::has_digit),
            FieldRule::new(RACE, r"(?i:Race\s*/\s*Ethnicity)[:\s]*([^\n]+)")
                .transform(filters::until_next_label),
            FieldRule::new(HAIR, r"(?i:Hair\s+Colou?r)[:\s]*([A-Za-z]+)")
                .transform(filters::lowercase)
                .validate(filters::valid_hair_color),
            FieldRule::new(EYES, r"(?i:(?:Left\s+)?Eye\s+Colou?r)[:\s]*([A-Za-z]+)")
                .transform(filters::lowercase)
                .validate(filters::valid_eye_color),
            FieldRule::new(LAST_SEEN, r"(?i:Date\s+(?:of\s+)?Last\s+Contact)\s*[:\-]?\s*([A-Za-z0-9 ,/\-]{6,40})")
                .validate(filters::has_year),
            FieldRule::new(REPORTED, r"(?i:NamUs\s+Case\s+Created)[:\s]*([^\n]+)").validate(filters::has_year),
            FieldRule::new(LOCATION, r"(?i:Last\s+Known\s+Location)\s*:\s*([^\n]+)").validate(valid_location),
            FieldRule::new(LOCATION, r"(?i:Last\s+Known\s+Location)[\s\S]*?(?i:\bLocation)[:\s]*([^\n]+)")
                .validate(valid_location),
            FieldRule::new(COUNTY, r"(?i:\bCounty)[:\s]+([A-Z][A-Za-z .'\-]*[A-Za-z])")
                .transform(county_name)
                .validate(filters::valid_place),
            FieldRule::new(CASE_NUMBER, r"(?i:\bNamUs\s+(?:Case\s+)?)((?i:MP|UP)\s*#?\s*\d+)")
                .transform(namus_case_number)
                .validate(filters::any_value),
            FieldRule::new(
                AGENCY,
                r"(?i:Investigating\s+Agenc(?:y|ies))[:\s]*(?:(?i:Agency\s+Name)[:\s]*)?([^\n]+)",
            )
            .validate(filters::valid_agency),
            FieldRule::new(
                NARRATIVE,
                r"(?s)(?i:Circumstances\s+of\s+Disappearance)\s*:?\s*(.*?)(?:\n\s*(?i:Physical\s+Description|Clothing\s+and\s+Accessories|ADDITIONAL\s+CASE\s+INFO|Transportation|CASE\s+INFORMATION|Investigating\s+Agenc)|\z)",
            )
            .transform(filters::clean_narrative)
            .validate(filters::valid_narrative),
        ],
    )
});

/// Assemble the full name from its form parts.
pub(super) fn post_process(map: &mut RawFieldMap, _text: &str) {
    if map.has(NAME) {
        return;
    }
    let parts: Vec<String> = [FIRST_NAME, MIDDLE_NAME, LAST_NAME]
        .iter()
        .filter_map(|f| map.get(f).map(str::to_string))
        .collect();
    if !parts.is_empty() {
        map.set(NAME, parts.join(" "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceTag;
    use crate::pipeline::fields::extract_fields;

    const EXPORT: &str = "NamUs MP # 98765\n\
Legal First Name Jane\n\
Middle Name --\n\
Legal Last Name Doe\n\
Biological Sex Female\n\
Missing Age 15 Years\n\
Race / Ethnicity White / Caucasian\n\
Height 5' 2\" - 5' 4\" (62 - 64 Inches)\n\
Weight 110 - 120 lbs\n\
Hair Color Brown\n\
Left Eye Color Blue\n\
Date of Last Contact January 10, 2023\n\
NamUs Case Created January 15, 2023\n\
Last Known Location\n\
Location\n\
Charleston, West Virginia 25301\n\
County\n\
Kanawha County\n\
Circumstances of Disappearance\n\
Jane was last seen leaving her home on foot.\n\
She was carrying a blue backpack.\n\
Physical Description\n\
Scar/mark Appendectomy scar on abdomen";

    #[test]
    fn form_fields_are_captured() {
        let map = extract_fields(SourceTag::NamUs, EXPORT);
        assert_eq!(map.get(NAME), Some("Jane Doe"));
        assert!(!map.has(MIDDLE_NAME));
        assert_eq!(map.get(SEX), Some("female"));
        assert_eq!(map.get(AGE), Some("15"));
        assert_eq!(map.get(RACE), Some("White / Caucasian"));
        assert_eq!(map.get(HAIR), Some("brown"));
        assert_eq!(map.get(EYES), Some("blue"));
        assert_eq!(map.get(CASE_NUMBER), Some("MP98765"));
        assert!(map.get(HEIGHT).unwrap().contains("62 - 64"));
        assert_eq!(map.get(WEIGHT), Some("110 - 120 lbs"));
    }

    #[test]
    fn dates_are_captured_raw() {
        let map = extract_fields(SourceTag::NamUs, EXPORT);
        assert_eq!(map.get(LAST_SEEN), Some("January 10, 2023"));
        assert_eq!(map.get(REPORTED), Some("January 15, 2023"));
    }

    #[test]
    fn compound_state_kept_whole() {
        let map = extract_fields(SourceTag::NamUs, EXPORT);
        assert_eq!(map.get(LOCATION), Some("Charleston, West Virginia 25301"));
        assert_eq!(map.get(CITY), Some("Charleston"));
        assert_eq!(map.get(STATE), Some("West Virginia"));
        assert_eq!(map.get(COUNTY), Some("Kanawha"));
    }

    #[test]
    fn circumstances_block_becomes_narrative() {
        let map = extract_fields(SourceTag::NamUs, EXPORT);
        assert_eq!(
            map.get(NARRATIVE),
            Some("Jane was last seen leaving her home on foot. She was carrying a blue backpack.")
        );
    }

    #[test]
    fn single_line_form_is_split_at_labels() {
        let text = "Legal First Name JANE Middle Name ANN Legal Last Name DOE Height 5'4\"";
        let map = extract_fields(SourceTag::NamUs, text);
        assert_eq!(map.get(NAME), Some("Jane Ann Doe"));
    }

    #[test]
    fn first_name_recovered_from_narrative() {
        let text = "Circumstances of Disappearance\nGriselda is believed to have left with a friend.";
        let map = extract_fields(SourceTag::NamUs, text);
        assert_eq!(map.get(NAME), Some("Griselda"));
    }
}
