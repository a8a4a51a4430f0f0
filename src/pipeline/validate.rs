//! Output schema for case records, checked over the serialized JSON form.
//!
//! The validator never mutates a record. Violations route the record to the
//! side channel; they never stop emission.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::CaseRecord;
use crate::pipeline::normalize::limits;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted path, e.g. `demographic.name`.
    pub path: String,
    pub message: String,
}

impl Violation {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text,
    Id,
    OneOf(&'static [&'static str]),
    Integer { min: i64, max: i64 },
    Number { min: f64, max: f64 },
    /// `YYYY-MM-DDTHH:MM:SSZ`
    Timestamp,
    /// `YYYY-MM-DD`
    Date,
    TextList,
    TimestampList,
    Section,
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaField {
    pub path: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

const fn field(path: &'static str, kind: FieldKind) -> SchemaField {
    SchemaField {
        path,
        required: false,
        kind,
    }
}

const fn required(path: &'static str, kind: FieldKind) -> SchemaField {
    SchemaField {
        path,
        required: true,
        kind,
    }
}

const SOURCES: &[&str] = &["namus", "ncmec", "fbi", "charley"];
const GENDERS: &[&str] = &["male", "female"];
const STATUSES: &[&str] = &["open", "recovered", "deceased", "unknown"];

use FieldKind::*;

/// The record schema. Order is the tabular column order.
pub const SCHEMA: &[SchemaField] = &[
    required("case_id", Id),
    required("source", OneOf(SOURCES)),
    required("source_file", Text),
    required("demographic", Section),
    required("demographic.name", Text),
    field("demographic.aliases", TextList),
    field("demographic.age_years", Integer { min: 0, max: 120 }),
    field("demographic.gender", OneOf(GENDERS)),
    field("demographic.race", Text),
    field(
        "demographic.height_in",
        Number {
            min: *limits::HEIGHT_IN.start(),
            max: *limits::HEIGHT_IN.end(),
        },
    ),
    field(
        "demographic.weight_lbs",
        Number {
            min: *limits::WEIGHT_LBS.start(),
            max: *limits::WEIGHT_LBS.end(),
        },
    ),
    field("demographic.hair_color", Text),
    field("demographic.eye_color", Text),
    field("demographic.date_of_birth", Date),
    field("demographic.distinguishing_features", TextList),
    field("demographic.risk_factors", TextList),
    required("spatial", Section),
    field("spatial.city", Text),
    field("spatial.county", Text),
    field("spatial.state", Text),
    field("spatial.postal_code", Text),
    field("spatial.location_text", Text),
    field("spatial.latitude", Number { min: -90.0, max: 90.0 }),
    field("spatial.longitude", Number { min: -180.0, max: 180.0 }),
    field("spatial.geocode_locality", Text),
    field("spatial.nearby_features", TextList),
    required("temporal", Section),
    required("temporal.last_seen_ts", Timestamp),
    field("temporal.reported_ts", Timestamp),
    field("temporal.sighting_ts", TimestampList),
    required("outcome", Section),
    required("outcome.case_status", OneOf(STATUSES)),
    field("outcome.recovery_details", Text),
    required("narrative_osint", Section),
    field("narrative_osint.incident_summary", Text),
    field("narrative_osint.witness_notes", TextList),
    field("narrative_osint.media_references", TextList),
    field("narrative_osint.persons_of_interest", TextList),
    field("narrative_osint.agency", Section),
    field("narrative_osint.agency.name", Text),
    field("narrative_osint.agency.phone", Text),
    field("narrative_osint.agency.case_number", Text),
];

/// Scalar and list leaves, in schema order.
pub fn leaf_fields() -> impl Iterator<Item = &'static SchemaField> {
    SCHEMA.iter().filter(|f| f.kind != Section)
}

pub fn validate_record(record: &CaseRecord) -> Vec<Violation> {
    match serde_json::to_value(record) {
        Ok(value) => validate_value(&value),
        Err(e) => vec![Violation::new("", format!("record does not serialize: {e}"))],
    }
}

pub fn validate_value(value: &Value) -> Vec<Violation> {
    let mut violations = Vec::new();
    let Some(root) = value.as_object() else {
        violations.push(Violation::new("", "record is not an object"));
        return violations;
    };

    check_unknown_keys(root, "", &mut violations);

    for entry in SCHEMA {
        match lookup(value, entry.path) {
            None | Some(Value::Null) => {
                if entry.required {
                    violations.push(Violation::new(entry.path, "required field missing"));
                }
            }
            Some(v) => {
                if let Err(message) = check_kind(entry.kind, v) {
                    violations.push(Violation::new(entry.path, message));
                }
            }
        }
    }

    let lat = lookup(value, "spatial.latitude").filter(|v| !v.is_null());
    let lon = lookup(value, "spatial.longitude").filter(|v| !v.is_null());
    match (lat, lon) {
        (Some(_), None) => violations.push(Violation::new("spatial.longitude", "latitude present without longitude")),
        (None, Some(_)) => violations.push(Violation::new("spatial.latitude", "longitude present without latitude")),
        _ => {}
    }

    violations
}

pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |v, segment| v.get(segment))
}

/// Keys must be declared in the schema at every object level.
fn check_unknown_keys(object: &Map<String, Value>, prefix: &str, violations: &mut Vec<Violation>) {
    for (key, child) in object {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match SCHEMA.iter().find(|f| f.path == path) {
            None => violations.push(Violation::new(&path, "unknown field")),
            Some(entry) if entry.kind == Section => {
                if let Some(inner) = child.as_object() {
                    check_unknown_keys(inner, &path, violations);
                }
            }
            Some(_) => {}
        }
    }
}

fn check_kind(kind: FieldKind, value: &Value) -> Result<(), String> {
    match kind {
        Text => value.as_str().map(|_| ()).ok_or_else(|| "expected string".to_string()),
        Id => {
            let s = value.as_str().ok_or("expected UUID string")?;
            uuid::Uuid::parse_str(s).map(|_| ()).map_err(|_| format!("invalid UUID: {s}"))
        }
        OneOf(allowed) => {
            let s = value.as_str().ok_or("expected string")?;
            if allowed.contains(&s) {
                Ok(())
            } else {
                Err(format!("'{s}' is not one of {}", allowed.join(", ")))
            }
        }
        Integer { min, max } => {
            let n = value.as_i64().ok_or("expected integer")?;
            if (min..=max).contains(&n) {
                Ok(())
            } else {
                Err(format!("{n} outside {min}..={max}"))
            }
        }
        Number { min, max } => {
            let n = value.as_f64().ok_or("expected number")?;
            if (min..=max).contains(&n) {
                Ok(())
            } else {
                Err(format!("{n} outside {min}..={max}"))
            }
        }
        Timestamp => check_timestamp(value),
        Date => {
            let s = value.as_str().ok_or("expected date string")?;
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|_| ())
                .map_err(|_| format!("'{s}' is not YYYY-MM-DD"))
        }
        TextList => {
            let items = value.as_array().ok_or("expected array")?;
            match items.iter().position(|i| !i.is_string()) {
                Some(index) => Err(format!("item {index} is not a string")),
                None => Ok(()),
            }
        }
        TimestampList => {
            let items = value.as_array().ok_or("expected array")?;
            items
                .iter()
                .enumerate()
                .try_for_each(|(index, item)| check_timestamp(item).map_err(|e| format!("item {index}: {e}")))
        }
        Section => value.as_object().map(|_| ()).ok_or_else(|| "expected object".to_string()),
    }
}

fn check_timestamp(value: &Value) -> Result<(), String> {
    let s = value.as_str().ok_or("expected timestamp string")?;
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ")
        .map(|_| ())
        .map_err(|_| format!("'{s}' is not YYYY-MM-DDTHH:MM:SSZ"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordKey, SourceTag};
    use serde_json::json;

    fn complete() -> CaseRecord {
        let mut r = CaseRecord::empty(&RecordKey::new(SourceTag::Ncmec, "jane.pdf"));
        r.demographic.name = Some("Jane Doe".into());
        r.temporal.last_seen_ts = NaiveDate::from_ymd_opt(2023, 1, 10)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc());
        r.outcome.case_status = crate::models::CaseStatus::Open;
        r
    }

    fn paths(violations: &[Violation]) -> Vec<&str> {
        violations.iter().map(|v| v.path.as_str()).collect()
    }

    #[test]
    fn complete_record_is_valid() {
        assert!(validate_record(&complete()).is_empty());
    }

    #[test]
    fn missing_name_is_reported_by_path() {
        let mut r = complete();
        r.demographic.name = None;
        assert_eq!(paths(&validate_record(&r)), ["demographic.name"]);
    }

    #[test]
    fn missing_last_seen_is_reported() {
        let mut r = complete();
        r.temporal.last_seen_ts = None;
        let v = validate_record(&r);
        assert_eq!(v[0].path, "temporal.last_seen_ts");
        assert_eq!(v[0].message, "required field missing");
    }

    #[test]
    fn half_a_coordinate_pair_is_a_violation() {
        let mut r = complete();
        r.spatial.latitude = Some(37.5);
        assert_eq!(paths(&validate_record(&r)), ["spatial.longitude"]);
    }

    #[test]
    fn unknown_keys_are_violations() {
        let mut value = serde_json::to_value(complete()).unwrap();
        value["demographic"]["shoe_size"] = json!(9);
        value["extra_section"] = json!({});
        let v = validate_value(&value);
        let p = paths(&v);
        assert!(p.contains(&"demographic.shoe_size"));
        assert!(p.contains(&"extra_section"));
    }

    #[test]
    fn wrong_types_and_ranges() {
        let mut value = serde_json::to_value(complete()).unwrap();
        value["demographic"]["age_years"] = json!(130);
        value["demographic"]["gender"] = json!("other");
        value["temporal"]["sighting_ts"] = json!(["2023-01-10T00:00:00Z", "January 11"]);
        value["outcome"]["case_status"] = json!(5);
        let v = validate_value(&value);
        assert_eq!(
            paths(&v),
            [
                "demographic.age_years",
                "demographic.gender",
                "temporal.sighting_ts",
                "outcome.case_status"
            ]
        );
    }

    #[test]
    fn sections_must_be_objects() {
        let mut value = serde_json::to_value(complete()).unwrap();
        value["spatial"] = json!("Richmond");
        let v = validate_value(&value);
        assert_eq!(v[0].path, "spatial");
        assert_eq!(v[0].message, "expected object");
    }

    #[test]
    fn nested_agency_keys_are_checked() {
        let mut value = serde_json::to_value(complete()).unwrap();
        value["narrative_osint"]["agency"] = json!({"name": "Richmond PD", "fax": "x"});
        assert_eq!(paths(&validate_value(&value)), ["narrative_osint.agency.fax"]);
    }

    #[test]
    fn leaves_exclude_sections() {
        assert!(leaf_fields().all(|f| f.kind != Section));
        assert_eq!(leaf_fields().next().unwrap().path, "case_id");
    }
}
