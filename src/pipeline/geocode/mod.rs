//! Locality geocoding with a persistent cache and a jurisdiction override.
//!
//! Every coordinate this module hands out lies inside the configured
//! jurisdiction box or equals the jurisdiction's default locality.

pub mod cache;
pub mod jurisdiction;
pub mod nominatim;
pub mod states;

pub use cache::{cache_key, CacheEntry, GeocodeCache};
pub use jurisdiction::JurisdictionConfig;
pub use nominatim::{GeocodeHit, GeocodingService, MockGeocodingService, NominatimClient};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::CaseRecord;

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Geocoding service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Geocoding service returned HTTP {status}")]
    Http { status: u16 },

    #[error("Geocoding response parsing failed: {0}")]
    ResponseParsing(String),

    #[error("Geocode cache at {path} is corrupt: {reason}")]
    CacheCorrupt { path: PathBuf, reason: String },

    #[error("Geocode cache serialization failed: {0}")]
    Serialization(String),

    #[error("Geocode cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodeMode {
    #[default]
    Online,
    /// Misses stay unresolved; the network is never used.
    CacheOnly,
    Disabled,
}

/// Where a coordinate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Cached,
    Resolved,
    /// Coordinates printed in the document itself.
    Embedded,
    /// Out of jurisdiction; default locality substituted.
    Overridden,
    /// Service failed; default locality substituted.
    Degraded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeOutcome {
    pub latitude: f64,
    pub longitude: f64,
    pub locality: String,
    pub resolution: Resolution,
}

pub struct Geocoder {
    mode: GeocodeMode,
    jurisdiction: JurisdictionConfig,
    cache: GeocodeCache,
    service: Option<Box<dyn GeocodingService + Send + Sync>>,
}

impl Geocoder {
    pub fn new(mode: GeocodeMode, jurisdiction: JurisdictionConfig, cache: GeocodeCache) -> Self {
        Self {
            mode,
            jurisdiction,
            cache,
            service: None,
        }
    }

    pub fn with_service(mut self, service: Box<dyn GeocodingService + Send + Sync>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn mode(&self) -> GeocodeMode {
        self.mode
    }

    pub fn cache(&self) -> &GeocodeCache {
        &self.cache
    }

    pub fn jurisdiction(&self) -> &JurisdictionConfig {
        &self.jurisdiction
    }

    /// Resolve a city/state pair. `None` when nothing could be resolved and
    /// no fallback applies (cache-only miss, empty input, service found nothing).
    pub fn geocode(&mut self, city: &str, state: &str, extra: Option<&str>) -> Option<GeocodeOutcome> {
        if self.mode == GeocodeMode::Disabled || (city.trim().is_empty() && state.trim().is_empty()) {
            return None;
        }

        if self.jurisdiction.is_foreign_state(state) {
            tracing::debug!(city, state, "Out-of-jurisdiction state, using default locality");
            return Some(self.override_outcome(extra, Resolution::Overridden));
        }

        let key = cache_key(city, state, extra);
        if let Some(entry) = self.cache.get(&key) {
            if self.jurisdiction.accepts(entry.latitude, entry.longitude) {
                return Some(GeocodeOutcome {
                    latitude: entry.latitude,
                    longitude: entry.longitude,
                    locality: entry.locality.unwrap_or_else(|| locality_label(city, state)),
                    resolution: Resolution::Cached,
                });
            }
            tracing::warn!(key = %key, "Cached coordinates outside jurisdiction, overriding");
            return Some(self.override_outcome(extra, Resolution::Overridden));
        }

        if self.mode == GeocodeMode::CacheOnly {
            tracing::debug!(key = %key, "Cache miss in cache-only mode");
            return None;
        }

        let query = [city.trim(), state.trim(), "USA"]
            .iter()
            .filter(|p| !p.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        let searched = match &self.service {
            Some(service) => service.search(&query),
            None => Err(GeocodeError::ServiceUnavailable("no geocoding service configured".into())),
        };

        match searched {
            Ok(Some(hit)) if self.jurisdiction.contains(hit.latitude, hit.longitude) => {
                let locality = if hit.display_name.is_empty() {
                    locality_label(city, state)
                } else {
                    hit.display_name
                };
                self.remember(
                    key,
                    CacheEntry {
                        latitude: hit.latitude,
                        longitude: hit.longitude,
                        locality: Some(locality.clone()),
                    },
                );
                Some(GeocodeOutcome {
                    latitude: hit.latitude,
                    longitude: hit.longitude,
                    locality,
                    resolution: Resolution::Resolved,
                })
            }
            Ok(Some(hit)) => {
                tracing::info!(
                    query = %query,
                    latitude = hit.latitude,
                    longitude = hit.longitude,
                    "Resolved outside jurisdiction, using default locality"
                );
                let outcome = self.override_outcome(extra, Resolution::Overridden);
                // Repeat lookups of this input resolve from cache to the override.
                self.remember(key, self.default_entry());
                Some(outcome)
            }
            Ok(None) => {
                tracing::debug!(query = %query, "Geocoding service found nothing");
                None
            }
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Geocoding service unavailable, degrading to default locality");
                Some(self.default_outcome(Resolution::Degraded))
            }
        }
    }

    /// Check coordinates printed in a document against the jurisdiction.
    pub fn check_embedded(&mut self, latitude: f64, longitude: f64, locality: String) -> GeocodeOutcome {
        if self.jurisdiction.contains(latitude, longitude) {
            GeocodeOutcome {
                latitude,
                longitude,
                locality,
                resolution: Resolution::Embedded,
            }
        } else {
            tracing::info!(latitude, longitude, "Embedded coordinates outside jurisdiction, using default locality");
            self.override_outcome(None, Resolution::Overridden)
        }
    }

    /// Fill the spatial coordinates of `record`. City and state text are
    /// never modified.
    pub fn apply(&mut self, record: &mut CaseRecord) -> Option<Resolution> {
        let spatial = &record.spatial;
        let city = spatial.city.clone().unwrap_or_default();
        let state = spatial.state.clone().unwrap_or_default();
        let embedded = spatial.latitude.zip(spatial.longitude);

        if self.mode == GeocodeMode::Disabled {
            record.spatial.latitude = None;
            record.spatial.longitude = None;
            record.spatial.geocode_locality = None;
            return None;
        }

        let outcome = match embedded {
            Some((lat, lon)) => Some(self.check_embedded(lat, lon, locality_label(&city, &state))),
            None => self.geocode(&city, &state, None),
        };

        let spatial = &mut record.spatial;
        match outcome {
            Some(o) => {
                spatial.latitude = Some(o.latitude);
                spatial.longitude = Some(o.longitude);
                spatial.geocode_locality = Some(o.locality);
                Some(o.resolution)
            }
            None => {
                spatial.latitude = None;
                spatial.longitude = None;
                spatial.geocode_locality = None;
                None
            }
        }
    }

    /// Write the cache to disk (no-op for an in-memory cache).
    pub fn persist(&self) -> Result<(), GeocodeError> {
        self.cache.save()
    }

    fn default_entry(&self) -> CacheEntry {
        CacheEntry {
            latitude: self.jurisdiction.default_latitude,
            longitude: self.jurisdiction.default_longitude,
            locality: Some(self.jurisdiction.default_locality()),
        }
    }

    fn default_outcome(&self, resolution: Resolution) -> GeocodeOutcome {
        GeocodeOutcome {
            latitude: self.jurisdiction.default_latitude,
            longitude: self.jurisdiction.default_longitude,
            locality: self.jurisdiction.default_locality(),
            resolution,
        }
    }

    /// Default locality, served from (and recorded under) its own cache key.
    fn override_outcome(&mut self, extra: Option<&str>, resolution: Resolution) -> GeocodeOutcome {
        let key = cache_key(&self.jurisdiction.default_city, &self.jurisdiction.default_state, extra);
        match self.cache.get(&key) {
            Some(entry) if self.jurisdiction.accepts(entry.latitude, entry.longitude) => GeocodeOutcome {
                latitude: entry.latitude,
                longitude: entry.longitude,
                locality: entry.locality.unwrap_or_else(|| self.jurisdiction.default_locality()),
                resolution,
            },
            _ => {
                self.remember(key, self.default_entry());
                self.default_outcome(resolution)
            }
        }
    }

    /// Cache write failures never fail the document; the batch saves again at the end.
    fn remember(&mut self, key: String, entry: CacheEntry) {
        if let Err(e) = self.cache.insert(key, entry) {
            tracing::warn!(error = %e, "Failed to persist geocode cache entry");
        }
    }
}

fn locality_label(city: &str, state: &str) -> String {
    [city.trim(), state.trim()]
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordKey, SourceTag};
    use std::sync::atomic::Ordering;

    fn geocoder(service: MockGeocodingService) -> Geocoder {
        Geocoder::new(GeocodeMode::Online, JurisdictionConfig::default(), GeocodeCache::in_memory())
            .with_service(Box::new(service))
    }

    fn record(city: &str, state: &str) -> CaseRecord {
        let mut r = CaseRecord::empty(&RecordKey::new(SourceTag::Charley, "case.txt"));
        r.spatial.city = Some(city.into());
        r.spatial.state = Some(state.into());
        r
    }

    #[test]
    fn in_jurisdiction_hit_is_resolved_then_cached() {
        let mock = MockGeocodingService::new().with_hit("Norfolk, VA, USA", 36.8508, -76.2859, "Norfolk, Virginia");
        let calls = mock.call_counter();
        let mut g = geocoder(mock);

        let first = g.geocode("Norfolk", "VA", None).unwrap();
        assert_eq!(first.resolution, Resolution::Resolved);
        assert_eq!((first.latitude, first.longitude), (36.8508, -76.2859));

        let second = g.geocode("norfolk", " va ", None).unwrap();
        assert_eq!(second.resolution, Resolution::Cached);
        assert_eq!(second.locality, "Norfolk, Virginia");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn atlanta_georgia_is_overridden_but_text_kept() {
        let mock = MockGeocodingService::new().with_hit("Atlanta, Georgia, USA", 33.749, -84.388, "Atlanta");
        let calls = mock.call_counter();
        let mut g = geocoder(mock);
        let mut r = record("Atlanta", "Georgia");

        assert_eq!(g.apply(&mut r), Some(Resolution::Overridden));
        assert_eq!(r.spatial.latitude, Some(37.5407));
        assert_eq!(r.spatial.longitude, Some(-77.4360));
        assert_eq!(r.spatial.geocode_locality.as_deref(), Some("Richmond, Virginia"));
        assert_eq!(r.spatial.city.as_deref(), Some("Atlanta"));
        assert_eq!(r.spatial.state.as_deref(), Some("Georgia"));
        // Decided from state identity, before any network call.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(g.cache().get("richmond|virginia").is_some());
    }

    #[test]
    fn west_virginia_is_not_mistaken_for_virginia() {
        let mock = MockGeocodingService::new().with_hit("Charleston, West Virginia, USA", 38.35, -81.63, "Charleston");
        let mut g = geocoder(mock);
        let out = g.geocode("Charleston", "West Virginia", None).unwrap();
        assert_eq!(out.resolution, Resolution::Overridden);
        assert_eq!((out.latitude, out.longitude), (37.5407, -77.4360));
    }

    #[test]
    fn out_of_box_hit_without_state_is_overridden_and_cached() {
        let mock = MockGeocodingService::new().with_hit("Springfield, USA", 39.78, -89.65, "Springfield, Illinois");
        let calls = mock.call_counter();
        let mut g = geocoder(mock);

        let out = g.geocode("Springfield", "", None).unwrap();
        assert_eq!(out.resolution, Resolution::Overridden);
        let again = g.geocode("Springfield", "", None).unwrap();
        assert_eq!(again.resolution, Resolution::Cached);
        assert_eq!((again.latitude, again.longitude), (37.5407, -77.4360));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn service_failure_degrades_to_default() {
        let mut g = geocoder(MockGeocodingService::unavailable());
        let out = g.geocode("Roanoke", "VA", None).unwrap();
        assert_eq!(out.resolution, Resolution::Degraded);
        assert_eq!((out.latitude, out.longitude), (37.5407, -77.4360));
        assert!(g.cache().get("roanoke|va").is_none());
    }

    #[test]
    fn service_miss_leaves_coordinates_absent() {
        let mut g = geocoder(MockGeocodingService::new());
        assert!(g.geocode("Nowhere", "VA", None).is_none());
    }

    #[test]
    fn cache_only_mode_never_calls_service() {
        let mock = MockGeocodingService::new().with_hit("Norfolk, VA, USA", 36.85, -76.29, "Norfolk");
        let calls = mock.call_counter();
        let mut g = Geocoder::new(GeocodeMode::CacheOnly, JurisdictionConfig::default(), GeocodeCache::in_memory())
            .with_service(Box::new(mock));
        assert!(g.geocode("Norfolk", "VA", None).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn disabled_mode_clears_coordinates() {
        let mut g = Geocoder::new(GeocodeMode::Disabled, JurisdictionConfig::default(), GeocodeCache::in_memory());
        let mut r = record("Norfolk", "VA");
        r.spatial.latitude = Some(36.85);
        r.spatial.longitude = Some(-76.29);
        assert_eq!(g.apply(&mut r), None);
        assert_eq!(r.spatial.latitude, None);
    }

    #[test]
    fn embedded_coordinates_skip_network() {
        let mock = MockGeocodingService::new();
        let calls = mock.call_counter();
        let mut g = geocoder(mock);
        let mut r = record("Richmond", "VA");
        r.spatial.latitude = Some(37.50);
        r.spatial.longitude = Some(-77.53);
        assert_eq!(g.apply(&mut r), Some(Resolution::Embedded));
        assert_eq!(r.spatial.latitude, Some(37.50));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn embedded_coordinates_outside_box_are_overridden() {
        let mut g = geocoder(MockGeocodingService::new());
        let mut r = record("Miami", "");
        r.spatial.latitude = Some(25.76);
        r.spatial.longitude = Some(-80.19);
        assert_eq!(g.apply(&mut r), Some(Resolution::Overridden));
        assert_eq!(r.spatial.latitude, Some(37.5407));
    }

    #[test]
    fn stale_out_of_box_cache_entry_is_not_served() {
        let mut cache = GeocodeCache::in_memory();
        cache
            .insert(
                "norfolk|va".into(),
                CacheEntry {
                    latitude: 10.0,
                    longitude: 10.0,
                    locality: None,
                },
            )
            .unwrap();
        let mut g = Geocoder::new(GeocodeMode::Online, JurisdictionConfig::default(), cache);
        let out = g.geocode("Norfolk", "VA", None).unwrap();
        assert_eq!(out.resolution, Resolution::Overridden);
        assert!(g.jurisdiction().accepts(out.latitude, out.longitude));
    }

    #[test]
    fn every_outcome_satisfies_the_jurisdiction_invariant() {
        let mock = MockGeocodingService::new()
            .with_hit("Norfolk, VA, USA", 36.85, -76.29, "Norfolk")
            .with_hit("Paris, USA", 48.85, 2.35, "Paris");
        let mut g = geocoder(mock);
        let inputs = [
            ("Norfolk", "VA"),
            ("Paris", ""),
            ("Atlanta", "Georgia"),
            ("Kansas City", "Kansas"),
            ("Arlington", "Virginia"),
            ("Wheeling", "WV"),
        ];
        for (city, state) in inputs {
            if let Some(out) = g.geocode(city, state, None) {
                assert!(
                    g.jurisdiction().accepts(out.latitude, out.longitude),
                    "{city}, {state} escaped the jurisdiction"
                );
            }
        }
    }

    #[test]
    fn persisted_overrides_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geocode_cache.json");
        {
            let mut g = Geocoder::new(GeocodeMode::Online, JurisdictionConfig::default(), GeocodeCache::load(&path).unwrap());
            g.geocode("Atlanta", "Georgia", None).unwrap();
            g.persist().unwrap();
        }
        let cache = GeocodeCache::load(&path).unwrap();
        let entry = cache.get("richmond|virginia").unwrap();
        assert_eq!((entry.latitude, entry.longitude), (37.5407, -77.4360));
    }
}
