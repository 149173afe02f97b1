//! On-disk snapshot cache.
//!
//! One JSON file holds every tracked symbol as `{ "AAPL": { "Date": [...], "Close": [...] } }`.
//! There is no timestamp field: the file's mtime is the snapshot's creation time, so a
//! snapshot is valid while `now - mtime < max_age`.

use crate::error::CacheError;
use crate::models::{PriceSeries, Snapshot, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(6 * 60 * 60); // 6 hours

#[derive(Serialize, Deserialize)]
struct StoredSeries {
    #[serde(rename = "Date")]
    date: Vec<String>,
    #[serde(rename = "Close")]
    close: Vec<f64>,
}

/// `age < max_age`, strictly. An age of exactly `max_age` is expired.
pub fn is_fresh(age: Duration, max_age: Duration) -> bool {
    age < max_age
}

#[derive(Clone, Debug)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Time since the file was last written. `None` if there is no file, or its mtime
    /// is in the future.
    pub fn age(&self) -> Option<Duration> {
        let modified = fs::metadata(&self.path).ok()?.modified().ok()?;
        SystemTime::now().duration_since(modified).ok()
    }

    pub fn is_valid(&self, max_age: Duration) -> bool {
        self.age().map(|age| is_fresh(age, max_age)).unwrap_or(false)
    }

    pub fn load(&self) -> Result<Snapshot, CacheError> {
        let content = fs::read_to_string(&self.path)?;
        let stored: BTreeMap<String, StoredSeries> =
            serde_json::from_str(&content).map_err(|e| self.corrupt(e.to_string()))?;

        let mut snapshot = Snapshot::new();
        for (raw_symbol, columns) in stored {
            let symbol = Symbol::parse(&raw_symbol).map_err(|e| self.corrupt(e.to_string()))?;
            let series = PriceSeries::try_from_columns(&columns.date, &columns.close)
                .map_err(|e| self.corrupt(format!("{}: {}", symbol, e)))?;
            snapshot.insert(symbol, series);
        }

        debug!(path = %self.path.display(), symbols = snapshot.len(), "loaded cached snapshot");
        Ok(snapshot)
    }

    /// Replaces the whole file. Written to a sibling temp file and renamed into place,
    /// so a concurrent reader sees either the old snapshot or the new one.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), CacheError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let stored: BTreeMap<&str, StoredSeries> = snapshot
            .iter()
            .map(|(symbol, series)| {
                let (date, close) = series.to_columns();
                (symbol.as_str(), StoredSeries { date, close })
            })
            .collect();
        let json = serde_json::to_vec(&stored).map_err(std::io::Error::from)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| CacheError::from(e.error))?;

        debug!(path = %self.path.display(), symbols = snapshot.len(), "saved snapshot");
        Ok(())
    }

    fn corrupt(&self, reason: String) -> CacheError {
        warn!(path = %self.path.display(), %reason, "cache file is corrupt");
        CacheError::Corrupt {
            path: self.path.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PricePoint;
    use chrono::NaiveDate;
    use std::fs::File;
    use tempfile::tempdir;

    fn aapl_snapshot() -> Snapshot {
        let series = PriceSeries::from_points((4..=8).map(|day| PricePoint {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            close: 170.0 + day as f64,
        }));
        vec![(Symbol::parse("AAPL").unwrap(), series)].into_iter().collect()
    }

    fn set_age(path: &Path, age: Duration) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn freshness_boundary_is_exclusive() {
        let six_hours = Duration::from_secs(6 * 3600);
        assert!(is_fresh(Duration::ZERO, six_hours));
        assert!(is_fresh(six_hours - Duration::from_secs(1), six_hours));
        assert!(!is_fresh(six_hours, six_hours));
        assert!(!is_fresh(six_hours + Duration::from_secs(1), six_hours));
    }

    #[test]
    fn missing_file_is_never_valid() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("snapshot.json"));
        assert!(!store.exists());
        assert_eq!(store.age(), None);
        assert!(!store.is_valid(DEFAULT_MAX_AGE));
    }

    #[test]
    fn validity_follows_file_mtime() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("snapshot.json"));
        store.save(&aapl_snapshot()).unwrap();
        assert!(store.is_valid(DEFAULT_MAX_AGE));

        set_age(store.path(), Duration::from_secs(3 * 3600));
        assert!(store.is_valid(DEFAULT_MAX_AGE));

        set_age(store.path(), Duration::from_secs(10 * 3600));
        assert!(!store.is_valid(DEFAULT_MAX_AGE));
    }

    #[test]
    fn future_mtime_is_not_valid() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("snapshot.json"));
        store.save(&aapl_snapshot()).unwrap();

        let file = File::options().write(true).open(store.path()).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(3600)).unwrap();

        assert!(store.exists());
        assert_eq!(store.age(), None);
        assert!(!store.is_valid(DEFAULT_MAX_AGE));
    }

    #[test]
    fn save_then_load_returns_the_same_snapshot() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("nested/dir/snapshot.json"));
        let snapshot = aapl_snapshot();
        store.save(&snapshot).unwrap();
        assert_eq!(store.load().unwrap(), snapshot);
    }

    #[test]
    fn save_overwrites_and_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("snapshot.json"));
        store.save(&aapl_snapshot()).unwrap();
        store.save(&Snapshot::new()).unwrap();

        assert!(store.load().unwrap().is_empty());
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn stored_form_uses_date_and_close_columns() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("snapshot.json"));
        store.save(&aapl_snapshot()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["AAPL"]["Date"][0], "2024-03-04");
        assert_eq!(raw["AAPL"]["Close"][4], 178.0);
    }

    #[test]
    fn unparsable_file_is_reported_as_corrupt() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("snapshot.json"));

        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(CacheError::Corrupt { .. })));

        fs::write(store.path(), r#"{"AAPL": {"Date": ["2024-03-04"], "Close": []}}"#).unwrap();
        assert!(matches!(store.load(), Err(CacheError::Corrupt { .. })));
    }

    #[test]
    fn loading_a_missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("snapshot.json"));
        assert!(matches!(store.load(), Err(CacheError::Io { .. })));
    }
}
