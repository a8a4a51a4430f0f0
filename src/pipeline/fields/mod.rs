//! Layout-specific field extraction.
//!
//! Each source has an ordered rule list plus a small post-process. A shared
//! gap-fill rule list runs afterwards for fields every layout may carry.

pub mod filters;
pub mod rules;

mod charley;
mod common;
mod fbi;
mod namus;
mod ncmec;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::models::SourceTag;

pub use rules::{FieldRule, RuleSet};

/// Raw field names shared by extractors and the normalizer.
pub mod names {
    pub const NAME: &str = "name";
    pub const FIRST_NAME: &str = "first_name";
    pub const MIDDLE_NAME: &str = "middle_name";
    pub const LAST_NAME: &str = "last_name";
    pub const ALIASES: &str = "aliases";
    pub const SEX: &str = "sex";
    pub const AGE: &str = "age";
    pub const RACE: &str = "race";
    pub const HEIGHT: &str = "height";
    pub const WEIGHT: &str = "weight";
    pub const HAIR: &str = "hair";
    pub const EYES: &str = "eyes";
    pub const DOB: &str = "dob";
    pub const FEATURES: &str = "features";
    pub const RISK_FACTORS: &str = "risk_factors";
    pub const LOCATION: &str = "location";
    pub const CITY: &str = "city";
    pub const COUNTY: &str = "county";
    pub const STATE: &str = "state";
    pub const POSTAL_CODE: &str = "postal_code";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const NEARBY: &str = "nearby";
    pub const LAST_SEEN: &str = "last_seen";
    pub const REPORTED: &str = "reported";
    pub const SIGHTINGS: &str = "sightings";
    pub const STATUS: &str = "status";
    pub const RECOVERY: &str = "recovery";
    pub const NARRATIVE: &str = "narrative";
    pub const WITNESSES: &str = "witnesses";
    pub const MEDIA: &str = "media";
    pub const PERSONS_OF_INTEREST: &str = "persons_of_interest";
    pub const AGENCY: &str = "agency";
    pub const PHONE: &str = "phone";
    pub const CASE_NUMBER: &str = "case_number";
    pub const FIELD_OFFICE: &str = "field_office";
}

/// Fields that may hold several values.
pub const LIST_FIELDS: &[&str] = &[
    names::ALIASES,
    names::FEATURES,
    names::RISK_FACTORS,
    names::NEARBY,
    names::SIGHTINGS,
    names::WITNESSES,
    names::MEDIA,
    names::PERSONS_OF_INTEREST,
];

pub fn is_list_field(field: &str) -> bool {
    LIST_FIELDS.contains(&field)
}

/// Raw extraction result: field name -> captured values in capture order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFieldMap {
    fields: BTreeMap<String, Vec<String>>,
    rejected: usize,
}

impl RawFieldMap {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.get(field).is_some_and(|v| !v.is_empty())
    }

    /// Replace whatever `field` holds with a single value.
    pub fn set(&mut self, field: &str, value: String) {
        self.fields.insert(field.to_string(), vec![value]);
    }

    pub fn set_if_absent(&mut self, field: &str, value: String) -> bool {
        if self.has(field) {
            return false;
        }
        self.set(field, value);
        true
    }

    /// Append unless an equal value (ignoring case) is already present.
    pub fn push_unique(&mut self, field: &str, value: String) -> bool {
        let values = self.fields.entry(field.to_string()).or_default();
        let lower = value.to_lowercase();
        if values.iter().any(|v| v.to_lowercase() == lower) {
            return false;
        }
        values.push(value);
        true
    }

    pub fn remove(&mut self, field: &str) -> Option<Vec<String>> {
        self.fields.remove(field)
    }

    pub fn note_rejection(&mut self) {
        self.rejected += 1;
    }

    /// Candidates dropped by validators while building this map.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn len(&self) -> usize {
        self.fields.values().filter(|v| !v.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Turns sanitized document text into a [`RawFieldMap`].
pub trait FieldExtractor {
    fn source(&self) -> SourceTag;
    fn extract(&self, text: &str) -> RawFieldMap;
}

/// Rule list plus post-process for one source layout.
pub struct LayoutExtractor {
    source: SourceTag,
    rules: &'static LazyLock<RuleSet>,
    post_process: fn(&mut RawFieldMap, &str),
}

impl LayoutExtractor {
    pub fn for_source(source: SourceTag) -> Self {
        let (rules, post_process): (&'static LazyLock<RuleSet>, fn(&mut RawFieldMap, &str)) = match source {
            SourceTag::NamUs => (&namus::RULES, namus::post_process),
            SourceTag::Ncmec => (&ncmec::RULES, ncmec::post_process),
            SourceTag::Fbi => (&fbi::RULES, fbi::post_process),
            SourceTag::Charley => (&charley::RULES, charley::post_process),
        };
        Self {
            source,
            rules,
            post_process,
        }
    }
}

impl FieldExtractor for LayoutExtractor {
    fn source(&self) -> SourceTag {
        self.source
    }

    fn extract(&self, text: &str) -> RawFieldMap {
        let mut map = RawFieldMap::default();
        self.rules.apply(text, &mut map);
        (self.post_process)(&mut map, text);

        common::enrich(&mut map, text);

        tracing::debug!(
            source = %self.source,
            ruleset = self.rules.name(),
            fields = map.len(),
            rejected = map.rejected(),
            "Fields extracted"
        );
        map
    }
}

/// Run the layout extractor for `source` over `text`.
pub fn extract_fields(source: SourceTag, text: &str) -> RawFieldMap {
    LayoutExtractor::for_source(source).extract(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_unique_ignores_case() {
        let mut map = RawFieldMap::default();
        assert!(map.push_unique(names::ALIASES, "JJ".into()));
        assert!(!map.push_unique(names::ALIASES, "jj".into()));
        assert_eq!(map.get_all(names::ALIASES).len(), 1);
    }

    #[test]
    fn set_if_absent_keeps_first_value() {
        let mut map = RawFieldMap::default();
        assert!(map.set_if_absent(names::CITY, "Richmond".into()));
        assert!(!map.set_if_absent(names::CITY, "Norfolk".into()));
        assert_eq!(map.get(names::CITY), Some("Richmond"));
    }

    #[test]
    fn empty_lists_do_not_count_as_present() {
        let mut map = RawFieldMap::default();
        map.push_unique(names::MEDIA, "x".into());
        map.remove(names::MEDIA);
        assert!(!map.has(names::MEDIA));
        assert!(map.is_empty());
    }

    #[test]
    fn every_layout_has_rules() {
        for source in SourceTag::PRIORITY {
            let extractor = LayoutExtractor::for_source(source);
            assert_eq!(extractor.source(), source);
            assert!(!extractor.rules.is_empty());
        }
    }

    #[test]
    fn title_only_poster_yields_no_narrative() {
        let text = "MISSING CHILD JANE DOE\nScan, View, & Share";
        for source in SourceTag::PRIORITY {
            let map = extract_fields(source, text);
            assert!(!map.has(names::NARRATIVE), "{source} produced a narrative");
        }
    }
}
