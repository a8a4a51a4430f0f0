use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{CaseStatus, Gender, SourceTag};

/// Namespace for deterministic case ids.
const CASE_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_93c2_4b7e_5d08_b1c4_2e9a_7f30_d5e6);

/// Identity of a case record: reprocessing the same (source, filename)
/// always yields the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub source: SourceTag,
    pub filename: String,
}

impl RecordKey {
    pub fn new(source: SourceTag, filename: impl Into<String>) -> Self {
        Self {
            source,
            filename: filename.into(),
        }
    }

    pub fn case_id(&self) -> Uuid {
        let name = format!("{}/{}", self.source.as_str(), self.filename);
        Uuid::new_v5(&CASE_ID_NAMESPACE, name.as_bytes())
    }
}

/// Canonical output unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub case_id: Uuid,
    pub source: SourceTag,
    pub source_file: String,
    pub demographic: Demographic,
    pub spatial: Spatial,
    pub temporal: Temporal,
    pub outcome: Outcome,
    pub narrative_osint: NarrativeOsint,
}

impl CaseRecord {
    pub fn empty(key: &RecordKey) -> Self {
        Self {
            case_id: key.case_id(),
            source: key.source,
            source_file: key.filename.clone(),
            demographic: Demographic::default(),
            spatial: Spatial::default(),
            temporal: Temporal::default(),
            outcome: Outcome::default(),
            narrative_osint: NarrativeOsint::default(),
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.source, self.source_file.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_years: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub race: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_in: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_lbs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hair_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eye_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub distinguishing_features: Vec<String>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spatial {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Free-text location as written in the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Locality the coordinates belong to (differs from city/state after an override).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geocode_locality: Option<String>,
    #[serde(default)]
    pub nearby_features: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Temporal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_ts: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_ts: Option<DateTime<Utc>>,
    /// Chronological, deduplicated.
    #[serde(default)]
    pub sighting_ts: Vec<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub case_status: CaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_details: Option<String>,
}

impl Default for Outcome {
    fn default() -> Self {
        Self {
            case_status: CaseStatus::Unknown,
            recovery_details: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NarrativeOsint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_summary: Option<String>,
    #[serde(default)]
    pub witness_notes: Vec<String>,
    #[serde(default)]
    pub media_references: Vec<String>,
    #[serde(default)]
    pub persons_of_interest: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency: Option<AgencyContact>,
}

/// Investigating body named on the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgencyContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_number: Option<String>,
}

impl AgencyContact {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.case_number.is_none()
    }
}
