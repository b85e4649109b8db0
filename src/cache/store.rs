//! Cache store for persisting weather payloads to disk
//!
//! Provides a `CacheStore` that keeps one timestamped JSON record per city key
//! and classifies reads as absent, fresh or stale against a fixed TTL.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use super::CacheKey;

/// Errors raised inside the store; they are logged and never returned to callers
#[derive(Debug, Error)]
enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid cache record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timestamp {0} is out of range")]
    Timestamp(f64),
}

/// On-disk record layout
#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    /// Seconds since the Unix epoch, with sub-second precision
    #[serde(default)]
    timestamp: f64,
    /// The provider payload, stored verbatim
    data: Value,
}

/// A cached payload together with the time it was stored
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub stored_at: DateTime<Utc>,
    pub payload: Value,
}

/// Result of looking up a key
#[derive(Debug, Clone, PartialEq)]
pub enum CacheRead {
    /// Nothing usable is stored for the key
    Absent,
    /// Entry is within its TTL
    Fresh(CacheEntry),
    /// Entry is older than the TTL; only usable as a fallback
    Stale(CacheEntry),
}

/// Reads and writes cached payloads as JSON files
///
/// Every failure is treated as a cache miss on read and dropped on write, so a
/// broken cache directory degrades to "always fetch" rather than an error.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
    /// Age after which an entry is stale
    ttl: Duration,
}

impl CacheStore {
    /// Creates a store rooted at `cache_dir`
    pub fn new(cache_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ttl,
        }
    }

    /// Returns the XDG cache directory for this application, if one can be determined
    ///
    /// Uses `~/.cache/cityweather/` on Linux, or the platform equivalent.
    pub fn default_dir() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "cityweather")?;
        Some(project_dirs.cache_dir().to_path_buf())
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to the cache file for the given key
    fn cache_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    /// Reads the entry for `key`, judging freshness against the current time
    pub fn read(&self, key: &CacheKey) -> CacheRead {
        self.read_at(key, Utc::now())
    }

    /// Reads the entry for `key`, judging freshness against `now`
    ///
    /// A missing file is `Absent`. An unreadable or malformed file is logged
    /// and also reported as `Absent`.
    pub fn read_at(&self, key: &CacheKey, now: DateTime<Utc>) -> CacheRead {
        let path = self.cache_path(key);
        if !path.exists() {
            return CacheRead::Absent;
        }

        let entry = match self.load(key, &path) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, path = %path.display(), error = %e, "failed reading cache entry");
                return CacheRead::Absent;
            }
        };

        if self.is_stale(entry.stored_at, now) {
            debug!(key = %key, stored_at = %entry.stored_at, "cache entry is stale");
            CacheRead::Stale(entry)
        } else {
            CacheRead::Fresh(entry)
        }
    }

    /// Whether an entry stored at `stored_at` has outlived the TTL at `now`
    fn is_stale(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match (now - stored_at).to_std() {
            Ok(age) => age > self.ttl,
            // Stored in the future (clock moved backwards): not older than the TTL
            Err(_) => false,
        }
    }

    fn load(&self, key: &CacheKey, path: &Path) -> Result<CacheEntry, CacheError> {
        let content = fs::read_to_string(path)?;
        let record: CacheRecord = serde_json::from_str(&content)?;
        let stored_at = timestamp_to_datetime(record.timestamp)?;

        Ok(CacheEntry {
            key: key.clone(),
            stored_at,
            payload: record.data,
        })
    }

    /// Stores `payload` for `key`, stamped with the current time
    pub fn write(&self, key: &CacheKey, payload: &Value) {
        self.write_at(key, payload, Utc::now());
    }

    /// Stores `payload` for `key`, stamped with `stored_at`
    ///
    /// Replaces any previous entry. Failures are logged and swallowed.
    pub fn write_at(&self, key: &CacheKey, payload: &Value, stored_at: DateTime<Utc>) {
        match self.persist(key, payload, stored_at) {
            Ok(()) => debug!(key = %key, "cache entry written"),
            Err(e) => warn!(key = %key, error = %e, "failed writing cache entry"),
        }
    }

    /// Writes the record to a temporary file in the cache directory, then
    /// renames it over the target so readers only ever see whole records.
    fn persist(
        &self,
        key: &CacheKey,
        payload: &Value,
        stored_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        fs::create_dir_all(&self.cache_dir)?;

        let record = CacheRecord {
            timestamp: datetime_to_timestamp(stored_at),
            data: payload.clone(),
        };
        let json = serde_json::to_string_pretty(&record)?;

        let mut tmp = NamedTempFile::new_in(&self.cache_dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.cache_path(key)).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Converts a UTC time to fractional epoch seconds
fn datetime_to_timestamp(at: DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}

/// Converts fractional epoch seconds back to a UTC time
fn timestamp_to_datetime(timestamp: f64) -> Result<DateTime<Utc>, CacheError> {
    if !timestamp.is_finite() {
        return Err(CacheError::Timestamp(timestamp));
    }
    let micros = (timestamp * 1_000_000.0).round();
    if micros.abs() >= i64::MAX as f64 {
        return Err(CacheError::Timestamp(timestamp));
    }
    DateTime::from_timestamp_micros(micros as i64).ok_or(CacheError::Timestamp(timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::derive_key;
    use chrono::Duration as ChronoDuration;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    const TTL: Duration = Duration::from_secs(1800);

    fn create_test_store() -> (CacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = CacheStore::new(temp_dir.path(), TTL);
        (store, temp_dir)
    }

    fn sample_payload() -> Value {
        json!({
            "name": "Paris",
            "main": { "temp": 18, "humidity": 61 },
            "weather": [{ "description": "clear sky" }]
        })
    }

    #[test]
    fn test_read_returns_absent_for_missing_key() {
        let (store, _temp_dir) = create_test_store();
        assert_eq!(store.read(&derive_key("nowhere")), CacheRead::Absent);
    }

    #[test]
    fn test_write_then_read_is_fresh_with_same_payload() {
        let (store, _temp_dir) = create_test_store();
        let key = derive_key("Paris");

        store.write(&key, &sample_payload());

        match store.read(&key) {
            CacheRead::Fresh(entry) => {
                assert_eq!(entry.payload, sample_payload());
                assert_eq!(entry.key, key);
            }
            other => panic!("Expected fresh entry, got {:?}", other),
        }
    }

    #[test]
    fn test_long_wide_character_name_can_be_cached() {
        let (store, _temp_dir) = create_test_store();
        let key = derive_key(&"\u{20000}".repeat(60));

        store.write(&key, &sample_payload());

        assert!(matches!(store.read(&key), CacheRead::Fresh(_)));
    }

    #[test]
    fn test_write_creates_file_with_timestamp_and_data() {
        let (store, temp_dir) = create_test_store();
        let key = derive_key("Paris");

        store.write(&key, &sample_payload());

        let path = temp_dir.path().join(format!("{}.json", key));
        assert!(path.exists(), "Cache file should exist");

        let content = fs::read_to_string(&path).expect("Should read file");
        let raw: Value = serde_json::from_str(&content).expect("Should be JSON");
        assert!(raw["timestamp"].is_f64());
        assert_eq!(raw["data"], sample_payload());
    }

    #[test]
    fn test_ttl_boundary() {
        let (store, _temp_dir) = create_test_store();
        let key = derive_key("Paris");
        // Whole seconds so the stored timestamp is exact
        let stored_at = DateTime::from_timestamp(Utc::now().timestamp() - 86_400, 0).unwrap();

        store.write_at(&key, &sample_payload(), stored_at);

        let ttl = ChronoDuration::from_std(TTL).unwrap();
        let epsilon = ChronoDuration::seconds(1);

        assert!(matches!(
            store.read_at(&key, stored_at + ttl - epsilon),
            CacheRead::Fresh(_)
        ));
        assert!(matches!(
            store.read_at(&key, stored_at + ttl),
            CacheRead::Fresh(_)
        ));
        assert!(matches!(
            store.read_at(&key, stored_at + ttl + epsilon),
            CacheRead::Stale(_)
        ));
    }

    #[test]
    fn test_stale_entry_keeps_payload_and_timestamp() {
        let (store, _temp_dir) = create_test_store();
        let key = derive_key("Paris");
        let stored_at = Utc::now() - ChronoDuration::hours(3);

        store.write_at(&key, &sample_payload(), stored_at);

        match store.read(&key) {
            CacheRead::Stale(entry) => {
                assert_eq!(entry.payload, sample_payload());
                let drift = (entry.stored_at - stored_at).num_microseconds().unwrap().abs();
                assert!(drift <= 1, "timestamp should survive storage, drift {}", drift);
            }
            other => panic!("Expected stale entry, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_file_reads_as_absent() {
        let (store, temp_dir) = create_test_store();
        let key = derive_key("Paris");
        fs::write(temp_dir.path().join(format!("{}.json", key)), "{ not json").unwrap();

        assert_eq!(store.read(&key), CacheRead::Absent);
    }

    #[test]
    fn test_missing_timestamp_reads_as_stale() {
        let (store, temp_dir) = create_test_store();
        let key = derive_key("Paris");
        fs::write(
            temp_dir.path().join(format!("{}.json", key)),
            r#"{ "data": { "name": "Paris" } }"#,
        )
        .unwrap();

        assert!(matches!(store.read(&key), CacheRead::Stale(_)));
    }

    #[test]
    fn test_overwrite_existing_entry() {
        let (store, _temp_dir) = create_test_store();
        let key = derive_key("Paris");

        store.write(&key, &json!({ "v": 1 }));
        store.write(&key, &json!({ "v": 2 }));

        match store.read(&key) {
            CacheRead::Fresh(entry) => assert_eq!(entry.payload, json!({ "v": 2 })),
            other => panic!("Expected fresh entry, got {:?}", other),
        }
    }

    #[test]
    fn test_write_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("nested").join("cache");
        let store = CacheStore::new(&nested, TTL);
        let key = derive_key("Paris");

        store.write(&key, &sample_payload());

        assert!(nested.join(format!("{}.json", key)).exists());
    }

    #[test]
    fn test_write_leaves_no_temporary_files() {
        let (store, temp_dir) = create_test_store();
        store.write(&derive_key("Paris"), &sample_payload());
        store.write(&derive_key("Paris"), &sample_payload());

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1, "Only the cache file should remain: {:?}", names);
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        // A regular file where the cache directory should be
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let store = CacheStore::new(&blocker, TTL);
        let key = derive_key("Paris");

        store.write(&key, &sample_payload());

        assert_eq!(store.read(&key), CacheRead::Absent);
    }

    #[test]
    fn test_entry_from_the_future_is_fresh() {
        let (store, _temp_dir) = create_test_store();
        let key = derive_key("Paris");
        store.write_at(&key, &sample_payload(), Utc::now() + ChronoDuration::hours(1));

        assert!(matches!(store.read(&key), CacheRead::Fresh(_)));
    }

    #[test]
    fn test_default_dir_is_xdg_compliant() {
        if let Some(dir) = CacheStore::default_dir() {
            assert!(dir.to_string_lossy().contains("cityweather"));
        }
        // Passes when no home directory is available (e.g. CI)
    }

    #[test]
    fn test_timestamp_conversion_rejects_nonsense() {
        assert!(timestamp_to_datetime(f64::NAN).is_err());
        assert!(timestamp_to_datetime(f64::INFINITY).is_err());
        assert!(timestamp_to_datetime(1e300).is_err());
        assert!(timestamp_to_datetime(0.0).is_ok());
    }
}
