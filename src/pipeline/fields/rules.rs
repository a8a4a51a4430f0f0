//! Declarative extraction rules.
//!
//! A [`RuleSet`] is an ordered list of [`FieldRule`]s. Rules run in order
//! against the full text. For a single-valued field the first candidate that
//! survives its transform and validator wins, and later rules for the same
//! field are skipped. List-valued fields collect every surviving candidate.

use regex::Regex;

use super::filters;
use super::{is_list_field, RawFieldMap};

/// Raw capture -> cleaned value, `None` when nothing usable remains.
pub type Transform = fn(&str) -> Option<String>;

/// Acceptance check applied to the transformed value.
pub type Validator = fn(&str) -> bool;

/// A secondary capture group filled alongside an accepted primary value.
struct Companion {
    field: &'static str,
    group: usize,
    transform: Transform,
    validator: Validator,
}

pub struct FieldRule {
    field: &'static str,
    regex: Regex,
    group: usize,
    transform: Transform,
    validator: Validator,
    companions: Vec<Companion>,
}

impl FieldRule {
    /// Rule capturing group 1, cleaned with [`filters::clean_value`] and
    /// rejected when it is poster boilerplate.
    pub fn new(field: &'static str, pattern: &str) -> Self {
        Self {
            field,
            regex: Regex::new(pattern).unwrap(),
            group: 1,
            transform: filters::clean_value,
            validator: filters::not_boilerplate,
            companions: Vec::new(),
        }
    }

    pub fn group(mut self, group: usize) -> Self {
        self.group = group;
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Also fill `field` from `group` when this rule's value is accepted.
    pub fn companion(
        mut self,
        field: &'static str,
        group: usize,
        transform: Transform,
        validator: Validator,
    ) -> Self {
        self.companions.push(Companion {
            field,
            group,
            transform,
            validator,
        });
        self
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    fn candidate(&self, caps: &regex::Captures<'_>, group: usize, transform: Transform, validator: Validator) -> Candidate {
        let Some(raw) = caps.get(group) else {
            return Candidate::Missing;
        };
        match transform(raw.as_str()) {
            Some(value) if validator(&value) => Candidate::Accepted(value),
            Some(value) => Candidate::Rejected(value),
            None => Candidate::Rejected(raw.as_str().to_string()),
        }
    }

    /// Apply to `text`, returning whether anything was recorded.
    fn apply(&self, text: &str, map: &mut RawFieldMap, ruleset: &str) -> bool {
        let list = is_list_field(self.field);
        let mut recorded = false;

        for caps in self.regex.captures_iter(text) {
            match self.candidate(&caps, self.group, self.transform, self.validator) {
                Candidate::Accepted(value) => {
                    for c in &self.companions {
                        if let Candidate::Accepted(v) = self.candidate(&caps, c.group, c.transform, c.validator) {
                            map.set_if_absent(c.field, v);
                        }
                    }
                    if list {
                        map.push_unique(self.field, value);
                        recorded = true;
                    } else {
                        map.set(self.field, value);
                        return true;
                    }
                }
                Candidate::Rejected(value) => {
                    tracing::trace!(
                        ruleset,
                        field = self.field,
                        value = %value,
                        "FieldValidationRejected"
                    );
                    map.note_rejection();
                }
                Candidate::Missing => {}
            }
        }
        recorded
    }
}

enum Candidate {
    Accepted(String),
    Rejected(String),
    Missing,
}

/// Named, ordered list of rules for one layout.
pub struct RuleSet {
    name: &'static str,
    rules: Vec<FieldRule>,
    fill_only: bool,
}

impl RuleSet {
    pub fn new(name: &'static str, rules: Vec<FieldRule>) -> Self {
        Self {
            name,
            rules,
            fill_only: false,
        }
    }

    /// Rule list that never touches a field that already holds a value,
    /// list fields included.
    pub fn gap_fill(name: &'static str, rules: Vec<FieldRule>) -> Self {
        Self {
            name,
            rules,
            fill_only: true,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn apply(&self, text: &str, map: &mut RawFieldMap) {
        // Fields that were already populated before this pass started.
        let preexisting: Vec<&'static str> = if self.fill_only {
            self.rules
                .iter()
                .map(FieldRule::field)
                .filter(|f| map.has(f))
                .collect()
        } else {
            Vec::new()
        };

        for rule in &self.rules {
            if preexisting.contains(&rule.field) {
                continue;
            }
            if !is_list_field(rule.field) && map.has(rule.field) {
                continue;
            }
            rule.apply(text, map, self.name);
        }
    }
}
