//! Durable snapshot cache - the offline fallback source
//!
//! The cache is a JSON serialization of the current `Snapshot`, replaced
//! atomically (write temp file, then rename) so a crash mid-write can never
//! leave a corrupt file behind the next cold start. A corrupt or missing
//! file is a cold start, not a fatal error.

use crate::domain::Snapshot;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache file not found")]
    NotFound,

    #[error("cache file is corrupt: {0}")]
    Corrupt(String),

    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub struct SnapshotCache {
    path: PathBuf,
}

impl SnapshotCache {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        info!(path = %path.display(), "cache_initialized");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a snapshot, replacing the previous file atomically.
    ///
    /// The temp file lives next to the target so the rename never crosses
    /// a filesystem boundary.
    pub fn persist(&self, snapshot: &Snapshot) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string(snapshot)
            .map_err(|e| CacheError::Corrupt(e.to_string()))?;

        let tmp = self.tmp_path();
        fs::write(&tmp, json.as_bytes())?;
        fs::rename(&tmp, &self.path)?;

        debug!(
            path = %self.path.display(),
            bytes = json.len(),
            parks = snapshot.parks.len(),
            attractions = snapshot.attractions.len(),
            "cache_persisted"
        );
        Ok(())
    }

    /// Load the last persisted snapshot. `NotFound` and `Corrupt` both mean
    /// cold start to callers; only unexpected I/O errors carry through.
    pub fn load(&self) -> Result<Snapshot, CacheError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(CacheError::NotFound),
            Err(e) => return Err(CacheError::Io(e)),
        };

        match serde_json::from_str::<Snapshot>(&content) {
            Ok(snapshot) => {
                info!(
                    path = %self.path.display(),
                    parks = snapshot.parks.len(),
                    attractions = snapshot.attractions.len(),
                    "cache_loaded"
                );
                Ok(snapshot)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cache_corrupt");
                Err(CacheError::Corrupt(e.to_string()))
            }
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Attraction, AttractionStatus, Destination, EntityId, LiveStatus, Park, Snapshot,
    };
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn sample_snapshot() -> Snapshot {
        let mut snap = Snapshot::default();
        let dest_id = EntityId::from("dest-1");
        let park_id = EntityId::from("park-1");
        let attr_id = EntityId::from("attr-1");

        snap.destinations.insert(
            dest_id.clone(),
            Destination {
                id: dest_id.clone(),
                name: "Walt Disney World".to_string(),
                park_ids: vec![park_id.clone()],
            },
        );
        snap.parks.insert(
            park_id.clone(),
            Park {
                id: park_id.clone(),
                name: "Magic Kingdom".to_string(),
                timezone: Some("America/New_York".to_string()),
                destination_id: dest_id,
                attraction_ids: vec![attr_id.clone()],
                last_synced: Some(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()),
                active: true,
            },
        );
        snap.attractions.insert(
            attr_id.clone(),
            Attraction {
                id: attr_id,
                name: "Space Mountain".to_string(),
                park_id,
                live: LiveStatus::new(
                    AttractionStatus::Operating,
                    Some(35),
                    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
                ),
                active: true,
            },
        );
        snap
    }

    #[test]
    fn test_persist_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path().join("parkpulse.json"));

        let snapshot = sample_snapshot();
        cache.persist(&snapshot).unwrap();

        let loaded = cache.load().unwrap();
        assert_eq!(loaded.parks.len(), 1);
        assert_eq!(loaded.attractions.len(), 1);

        let attr = loaded.attraction(&EntityId::from("attr-1")).unwrap();
        assert_eq!(attr.live.status, AttractionStatus::Operating);
        assert_eq!(attr.live.wait_minutes, Some(35));
        // Timestamps survive the round trip so staleness is computed
        // identically before and after
        let original = snapshot.attraction(&EntityId::from("attr-1")).unwrap();
        assert_eq!(attr.live.last_updated, original.live.last_updated);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path().join("missing.json"));
        assert!(matches!(cache.load(), Err(CacheError::NotFound)));
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("parkpulse.json");
        fs::write(&path, "{ this is not json").unwrap();

        let cache = SnapshotCache::new(&path);
        assert!(matches!(cache.load(), Err(CacheError::Corrupt(_))));
    }

    #[test]
    fn test_persist_replaces_previous_file() {
        let dir = tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path().join("parkpulse.json"));

        cache.persist(&sample_snapshot()).unwrap();

        let mut second = sample_snapshot();
        second
            .attractions
            .get_mut(&EntityId::from("attr-1"))
            .unwrap()
            .live
            .wait_minutes = Some(60);
        cache.persist(&second).unwrap();

        let loaded = cache.load().unwrap();
        assert_eq!(
            loaded.attraction(&EntityId::from("attr-1")).unwrap().live.wait_minutes,
            Some(60)
        );
        // No temp file left behind
        assert!(!cache.tmp_path().exists());
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested").join("cache").join("parkpulse.json");
        let cache = SnapshotCache::new(&nested);

        cache.persist(&sample_snapshot()).unwrap();
        assert!(nested.exists());
    }
}
