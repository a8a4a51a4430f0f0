//! Persistent locality -> coordinate cache.
//!
//! The file is a JSON object keyed by `city|state[|extra]`. Entries this
//! process cannot parse, or keys it never touched, are carried through saves
//! unchanged so other jobs sharing the file lose nothing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::GeocodeError;
use crate::pipeline::atomic::write_atomic;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon")]
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
}

/// Lowercased, whitespace-collapsed, pipe-joined. An empty disambiguator
/// adds nothing to the key.
pub fn cache_key(city: &str, state: &str, extra: Option<&str>) -> String {
    let norm = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let mut key = format!("{}|{}", norm(city), norm(state));
    if let Some(extra) = extra.map(norm).filter(|e| !e.is_empty()) {
        key.push('|');
        key.push_str(&extra);
    }
    key
}

#[derive(Debug, Default)]
pub struct GeocodeCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, Value>,
}

impl GeocodeCache {
    /// Cache that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from `path`. A missing file is an empty cache; an unreadable or
    /// non-object file is fatal.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, GeocodeError> {
        let path = path.into();
        let entries = read_entries(&path)?.unwrap_or_default();
        tracing::info!(path = %path.display(), entries = entries.len(), "Geocode cache loaded");
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for `key`, also trying the legacy trailing-pipe form
    /// (`city|state|`) older caches were written with.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let legacy = format!("{key}|");
        [key, legacy.as_str()]
            .iter()
            .filter_map(|k| self.entries.get(*k))
            .find_map(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Insert and persist immediately when file-backed.
    pub fn insert(&mut self, key: String, entry: CacheEntry) -> Result<(), GeocodeError> {
        let value = serde_json::to_value(&entry).map_err(|e| GeocodeError::Serialization(e.to_string()))?;
        if self.entries.get(&key) == Some(&value) {
            return Ok(());
        }
        self.entries.insert(key, value);
        self.save()
    }

    /// Merge with what is on disk now (ours win on conflict), then replace
    /// the file atomically.
    pub fn save(&self) -> Result<(), GeocodeError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut merged = match read_entries(path) {
            Ok(on_disk) => on_disk.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "On-disk cache unreadable at save, overwriting");
                BTreeMap::new()
            }
        };
        merged.extend(self.entries.iter().map(|(k, v)| (k.clone(), v.clone())));

        let json = serde_json::to_vec_pretty(&merged).map_err(|e| GeocodeError::Serialization(e.to_string()))?;
        write_atomic(path, &json)?;
        tracing::debug!(path = %path.display(), entries = merged.len(), "Geocode cache saved");
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<Option<BTreeMap<String, Value>>, GeocodeError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if content.trim().is_empty() {
        return Ok(Some(BTreeMap::new()));
    }
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| GeocodeError::CacheCorrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(lat: f64, lon: f64) -> CacheEntry {
        CacheEntry {
            latitude: lat,
            longitude: lon,
            locality: Some("Norfolk, Virginia".into()),
        }
    }

    #[test]
    fn key_is_normalized() {
        assert_eq!(cache_key(" Norfolk ", "VA", None), "norfolk|va");
        assert_eq!(cache_key("Virginia  Beach", "Virginia", Some("")), "virginia beach|virginia");
        assert_eq!(cache_key("Richmond", "Virginia", Some("ncmec")), "richmond|virginia|ncmec");
    }

    #[test]
    fn missing_file_is_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = GeocodeCache::load(dir.path().join("cache.json")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn corrupt_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = GeocodeCache::load(&path).unwrap_err();
        assert!(matches!(err, GeocodeError::CacheCorrupt { .. }));
    }

    #[test]
    fn legacy_entries_are_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"{"norfolk|va|": {"lat": 36.85, "lon": -76.29}}"#).unwrap();
        let cache = GeocodeCache::load(&path).unwrap();
        let hit = cache.get("norfolk|va").unwrap();
        assert_eq!((hit.latitude, hit.longitude, hit.locality), (36.85, -76.29, None));
    }

    #[test]
    fn insert_persists_and_preserves_foreign_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"{"other|job": {"custom": true}, "bad|entry": "text"}"#).unwrap();

        let mut cache = GeocodeCache::load(&path).unwrap();
        assert!(cache.get("bad|entry").is_none());
        cache.insert("norfolk|va".into(), entry(36.85, -76.29)).unwrap();

        let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["other|job"]["custom"], true);
        assert_eq!(on_disk["bad|entry"], "text");
        assert_eq!(on_disk["norfolk|va"]["latitude"], 36.85);
        assert_eq!(on_disk["norfolk|va"]["locality"], "Norfolk, Virginia");
    }

    #[test]
    fn save_merges_entries_written_by_others() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut cache = GeocodeCache::load(&path).unwrap();
        cache.insert("norfolk|va".into(), entry(36.85, -76.29)).unwrap();

        // Another job adds a key after we loaded.
        let mut other = GeocodeCache::load(&path).unwrap();
        other.insert("roanoke|va".into(), entry(37.27, -79.94)).unwrap();

        cache.insert("richmond|va".into(), entry(37.54, -77.43)).unwrap();
        let reloaded = GeocodeCache::load(&path).unwrap();
        assert_eq!(reloaded.len(), 3);
        assert!(reloaded.get("roanoke|va").is_some());
    }

    #[test]
    fn in_memory_cache_never_writes() {
        let mut cache = GeocodeCache::in_memory();
        cache.insert("norfolk|va".into(), entry(36.85, -76.29)).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.path().is_none());
    }
}
