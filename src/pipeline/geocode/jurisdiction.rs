use serde::{Deserialize, Serialize};

use super::states::{resolve_state, UsState};

/// Latitude/longitude box of the serving jurisdiction and the locality
/// substituted for anything outside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JurisdictionConfig {
    /// USPS code of the in-jurisdiction state.
    pub state_code: String,
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
    pub default_city: String,
    pub default_state: String,
    pub default_latitude: f64,
    pub default_longitude: f64,
}

impl Default for JurisdictionConfig {
    fn default() -> Self {
        Self {
            state_code: "VA".into(),
            min_latitude: 36.5,
            max_latitude: 39.5,
            min_longitude: -83.7,
            max_longitude: -75.2,
            default_city: "Richmond".into(),
            default_state: "Virginia".into(),
            default_latitude: 37.5407,
            default_longitude: -77.4360,
        }
    }
}

impl JurisdictionConfig {
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&latitude)
            && (self.min_longitude..=self.max_longitude).contains(&longitude)
    }

    pub fn is_default_point(&self, latitude: f64, longitude: f64) -> bool {
        latitude == self.default_latitude && longitude == self.default_longitude
    }

    /// True when coordinates satisfy the jurisdiction invariant.
    pub fn accepts(&self, latitude: f64, longitude: f64) -> bool {
        self.contains(latitude, longitude) || self.is_default_point(latitude, longitude)
    }

    pub fn default_locality(&self) -> String {
        format!("{}, {}", self.default_city, self.default_state)
    }

    pub fn home_state(&self) -> Option<&'static UsState> {
        resolve_state(&self.state_code)
    }

    /// The text names a known state that is not the home state. Matching is on
    /// whole-token state identity, so "West Virginia" is foreign to VA.
    pub fn is_foreign_state(&self, state_text: &str) -> bool {
        match (resolve_state(state_text), self.home_state()) {
            (Some(state), Some(home)) => state.code != home.code,
            _ => false,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.min_latitude >= self.max_latitude {
            return Err(format!(
                "jurisdiction min_latitude {} must be below max_latitude {}",
                self.min_latitude, self.max_latitude
            ));
        }
        if self.min_longitude >= self.max_longitude {
            return Err(format!(
                "jurisdiction min_longitude {} must be below max_longitude {}",
                self.min_longitude, self.max_longitude
            ));
        }
        if !(-90.0..=90.0).contains(&self.min_latitude) || !(-90.0..=90.0).contains(&self.max_latitude) {
            return Err("jurisdiction latitudes must lie within -90..=90".into());
        }
        if !(-180.0..=180.0).contains(&self.min_longitude) || !(-180.0..=180.0).contains(&self.max_longitude) {
            return Err("jurisdiction longitudes must lie within -180..=180".into());
        }
        if !self.contains(self.default_latitude, self.default_longitude) {
            return Err(format!(
                "default locality {} ({}, {}) lies outside the jurisdiction box",
                self.default_locality(),
                self.default_latitude,
                self.default_longitude
            ));
        }
        if self.home_state().is_none() {
            return Err(format!("unknown jurisdiction state code: {}", self.state_code));
        }
        Ok(())
    }
}
