//! RawFieldMap -> CaseRecord.
//!
//! Best effort: a value that cannot be parsed or falls outside its plausible
//! range is left absent. Nothing here fails.

pub mod dates;
pub mod units;

use std::ops::RangeInclusive;

use crate::models::{AgencyContact, CaseRecord, CaseStatus, Gender, RecordKey};
use crate::pipeline::extraction::collapse_spaces;
use crate::pipeline::fields::filters::dedupe_case_insensitive;
use crate::pipeline::fields::names::*;
use crate::pipeline::fields::RawFieldMap;

/// Plausible ranges; values outside are dropped, not clamped.
pub mod limits {
    use std::ops::RangeInclusive;

    pub const AGE_YEARS: RangeInclusive<u32> = 0..=120;
    pub const HEIGHT_IN: RangeInclusive<f64> = 12.0..=96.0;
    pub const WEIGHT_LBS: RangeInclusive<f64> = 2.0..=700.0;
    pub const LATITUDE: RangeInclusive<f64> = -90.0..=90.0;
    pub const LONGITUDE: RangeInclusive<f64> = -180.0..=180.0;
}

/// Control characters removed, whitespace collapsed. Empty becomes absent.
pub fn clean_text(raw: &str) -> Option<String> {
    let stripped: String = raw
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let collapsed = collapse_spaces(&stripped);
    (!collapsed.is_empty()).then_some(collapsed)
}

fn clean_list(values: &[String]) -> Vec<String> {
    dedupe_case_insensitive(values.iter().filter_map(|v| clean_text(v)))
}

fn within<T: PartialOrd>(field: &str, value: T, range: &RangeInclusive<T>) -> Option<T>
where
    T: std::fmt::Debug,
{
    if range.contains(&value) {
        Some(value)
    } else {
        tracing::debug!(field, value = ?value, "Out-of-range value dropped");
        None
    }
}

pub fn parse_gender(raw: &str) -> Option<Gender> {
    match raw.trim().to_lowercase().as_str() {
        "m" | "male" | "man" | "boy" => Some(Gender::Male),
        "f" | "female" | "woman" | "girl" => Some(Gender::Female),
        _ => None,
    }
}

/// Status words as printed on the documents.
pub fn parse_status(raw: &str) -> Option<CaseStatus> {
    let lowered = raw.trim().to_lowercase();
    let words = collapse_spaces(&lowered);
    match words.as_str() {
        "located" | "recovered" | "found" | "found safe" | "found alive" | "resolved" | "closed" => {
            Some(CaseStatus::Recovered)
        }
        "deceased" | "found deceased" | "found dead" | "remains" | "remains found" => Some(CaseStatus::Deceased),
        "open" | "active" | "ongoing" | "missing" | "unsolved" => Some(CaseStatus::Open),
        _ => None,
    }
}

fn parse_coordinates(fields: &RawFieldMap) -> Option<(f64, f64)> {
    let lat: f64 = fields.get(LATITUDE)?.trim().parse().ok()?;
    let lon: f64 = fields.get(LONGITUDE)?.trim().parse().ok()?;
    (limits::LATITUDE.contains(&lat) && limits::LONGITUDE.contains(&lon)).then_some((lat, lon))
}

/// Build the canonical record for one document. `text` is the full
/// sanitized document text, used by the last-seen repair pass.
pub fn normalize(fields: &RawFieldMap, text: &str, key: &RecordKey) -> CaseRecord {
    let mut record = CaseRecord::empty(key);
    let get = |field: &str| fields.get(field).and_then(clean_text);

    // ═══ demographic ═══
    let d = &mut record.demographic;
    d.name = get(NAME);
    d.aliases = clean_list(fields.get_all(ALIASES));
    d.age_years = fields
        .get(AGE)
        .and_then(|a| a.trim().parse::<u32>().ok())
        .and_then(|a| within(AGE, a, &limits::AGE_YEARS));
    d.gender = fields.get(SEX).and_then(parse_gender);
    d.race = get(RACE);
    d.height_in = fields
        .get(HEIGHT)
        .and_then(units::to_inches)
        .and_then(|h| within(HEIGHT, h, &limits::HEIGHT_IN));
    d.weight_lbs = fields
        .get(WEIGHT)
        .and_then(units::to_pounds)
        .and_then(|w| within(WEIGHT, w, &limits::WEIGHT_LBS));
    d.hair_color = get(HAIR).map(|h| h.to_lowercase());
    d.eye_color = get(EYES).map(|e| e.to_lowercase());
    d.date_of_birth = fields.get(DOB).and_then(dates::parse_date_only);
    d.distinguishing_features = clean_list(fields.get_all(FEATURES));
    d.risk_factors = clean_list(fields.get_all(RISK_FACTORS));

    // ═══ spatial ═══
    let s = &mut record.spatial;
    s.city = get(CITY);
    s.county = get(COUNTY);
    s.state = get(STATE);
    s.postal_code = get(POSTAL_CODE);
    s.location_text = get(LOCATION);
    if let Some((lat, lon)) = parse_coordinates(fields) {
        s.latitude = Some(lat);
        s.longitude = Some(lon);
    }
    s.nearby_features = clean_list(fields.get_all(NEARBY));

    // ═══ narrative ═══
    let n = &mut record.narrative_osint;
    n.incident_summary = get(NARRATIVE);
    n.witness_notes = clean_list(fields.get_all(WITNESSES));
    n.media_references = clean_list(fields.get_all(MEDIA));
    n.persons_of_interest = clean_list(fields.get_all(PERSONS_OF_INTEREST));
    let agency = AgencyContact {
        name: get(AGENCY),
        phone: get(PHONE),
        case_number: get(CASE_NUMBER),
    };
    n.agency = (!agency.is_empty()).then_some(agency);

    // ═══ temporal ═══
    let t = &mut record.temporal;
    t.last_seen_ts = fields.get(LAST_SEEN).and_then(dates::parse_date);
    if t.last_seen_ts.is_none() {
        t.last_seen_ts = dates::repair_last_seen(record.narrative_osint.incident_summary.as_deref(), text);
        if let Some(ts) = t.last_seen_ts {
            tracing::info!(filename = %key.filename, last_seen = %ts, "Last-seen date recovered from text");
        }
    }
    t.reported_ts = fields.get(REPORTED).and_then(dates::parse_date);
    let mut sightings: Vec<_> = fields
        .get_all(SIGHTINGS)
        .iter()
        .filter_map(|s| dates::parse_date(s))
        .collect();
    sightings.sort();
    sightings.dedup();
    t.sighting_ts = sightings;

    // ═══ outcome ═══
    let o = &mut record.outcome;
    o.case_status = fields
        .get(STATUS)
        .and_then(parse_status)
        .unwrap_or(CaseStatus::Open);
    o.recovery_details = get(RECOVERY);
    if o.recovery_details.is_some() && o.case_status == CaseStatus::Open {
        o.case_status = CaseStatus::Recovered;
    }

    tracing::debug!(
        filename = %key.filename,
        fields = fields.len(),
        rejected = fields.rejected(),
        "Record normalized"
    );
    record
}
