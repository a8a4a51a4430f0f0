use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Deserialize;

use super::GeocodeError;

/// Best match for a free-text query.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeHit {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

/// External geocoding capability (allows mocking for tests).
pub trait GeocodingService {
    /// `Ok(None)` when the service answered but found nothing.
    fn search(&self, query: &str) -> Result<Option<GeocodeHit>, GeocodeError>;
}

/// The public Nominatim usage policy allows one request per second.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Nominatim-compatible HTTP search client. Requests are spaced at least
/// `min_interval` apart.
pub struct NominatimClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

/// How long to wait before the next request.
fn pacing_delay(last: Option<Instant>, now: Instant, min_interval: Duration) -> Duration {
    last.map(|at| min_interval.saturating_sub(now.saturating_duration_since(at)))
        .unwrap_or(Duration::ZERO)
}

impl NominatimClient {
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, GeocodeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(|e| GeocodeError::ServiceUnavailable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
            min_interval: DEFAULT_MIN_INTERVAL,
            last_request: Mutex::new(None),
        })
    }

    /// Self-hosted instances can lift the policy limit.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Sleep out the remainder of the interval, then stamp this request.
    fn pace(&self) {
        let mut last = self.last_request.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let delay = pacing_delay(*last, Instant::now(), self.min_interval);
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Pacing geocoding request");
            std::thread::sleep(delay);
        }
        *last = Some(Instant::now());
    }
}

/// One element of the /search response array. Coordinates arrive as strings.
#[derive(Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

impl GeocodingService for NominatimClient {
    fn search(&self, query: &str) -> Result<Option<GeocodeHit>, GeocodeError> {
        self.pace();
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("format", "json"), ("limit", "1"), ("addressdetails", "1")])
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    GeocodeError::ServiceUnavailable(format!("request timed out after {}s", self.timeout_secs))
                } else {
                    GeocodeError::ServiceUnavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Http {
                status: status.as_u16(),
            });
        }

        let results: Vec<SearchResult> = response
            .json()
            .map_err(|e| GeocodeError::ResponseParsing(e.to_string()))?;

        let Some(first) = results.into_iter().next() else {
            return Ok(None);
        };
        let latitude = first
            .lat
            .parse()
            .map_err(|_| GeocodeError::ResponseParsing(format!("bad latitude {:?}", first.lat)))?;
        let longitude = first
            .lon
            .parse()
            .map_err(|_| GeocodeError::ResponseParsing(format!("bad longitude {:?}", first.lon)))?;
        Ok(Some(GeocodeHit {
            latitude,
            longitude,
            display_name: first.display_name,
        }))
    }
}

/// Canned responses keyed by query; unknown queries find nothing.
pub struct MockGeocodingService {
    responses: HashMap<String, GeocodeHit>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockGeocodingService {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every call fails as if the network were down.
    pub fn unavailable() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_hit(mut self, query: &str, latitude: f64, longitude: f64, display_name: &str) -> Self {
        self.responses.insert(
            query.to_string(),
            GeocodeHit {
                latitude,
                longitude,
                display_name: display_name.to_string(),
            },
        );
        self
    }

    /// Shared counter of `search` calls, readable after the mock is boxed.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Default for MockGeocodingService {
    fn default() -> Self {
        Self::new()
    }
}

impl GeocodingService for MockGeocodingService {
    fn search(&self, query: &str) -> Result<Option<GeocodeHit>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GeocodeError::ServiceUnavailable("mock service offline".into()));
        }
        Ok(self.responses.get(query).cloned())
    }
}
