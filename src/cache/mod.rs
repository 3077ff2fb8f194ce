//! Last-known-good job snapshot
//!
//! A single JSON file holding the most recent successfully assembled job
//! list and its timestamp. It is served immediately on load while a live
//! refresh runs in the background. A failed refresh never touches it, and
//! a corrupt file reads as a miss rather than an error. An empty refresh
//! result is deliberately not persisted either: an empty list is more often
//! a keyword-configuration mistake than an empty pipeline, and keeping the
//! previous snapshot is the safer failure mode.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::job::Job;

/// Schema version for snapshot.json
pub const SCHEMA_VERSION: u32 = 1;

/// Persisted snapshot payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    pub jobs: Vec<Job>,
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// File-backed snapshot store
pub struct SnapshotCache {
    path: PathBuf,
}

impl SnapshotCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the user's data directory
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home).join(".local/share/fleetmap/snapshot.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last snapshot. Missing file, unreadable file, parse failure
    /// and schema mismatch are all cache misses, never errors.
    pub fn load(&self) -> Option<Snapshot> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<Snapshot>(&raw) {
            Ok(snapshot) if snapshot.schema_version == SCHEMA_VERSION => Some(snapshot),
            Ok(snapshot) => {
                warn!(
                    path = %self.path.display(),
                    found = snapshot.schema_version,
                    expected = SCHEMA_VERSION,
                    "snapshot schema mismatch, treating as miss"
                );
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt snapshot, treating as miss");
                None
            }
        }
    }

    /// Load just the job list
    pub fn load_jobs(&self) -> Option<Vec<Job>> {
        self.load().map(|s| s.jobs)
    }

    /// Atomically overwrite the snapshot. Written to a temp file and
    /// renamed so a crash mid-write cannot corrupt the previous snapshot.
    pub fn replace(&self, jobs: &[Job]) -> Result<(), CacheError> {
        let snapshot = Snapshot {
            schema_version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            jobs: jobs.to_vec(),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&snapshot)?)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), jobs = jobs.len(), "snapshot replaced");
        Ok(())
    }

    /// Remove one job from the snapshot if present. Called right after a
    /// successful stage advance so a reload does not resurrect the job
    /// before the next full fetch.
    pub fn evict(&self, id: u64) -> Result<(), CacheError> {
        let Some(snapshot) = self.load() else {
            return Ok(());
        };

        let mut jobs = snapshot.jobs;
        let before = jobs.len();
        jobs.retain(|j| j.id != id);
        if jobs.len() == before {
            return Ok(());
        }

        debug!(id, "evicted job from snapshot");
        self.replace(&jobs)
    }

    /// Patch one job in place in the snapshot (after a manual address
    /// correction), leaving everything else untouched
    pub fn patch(&self, job: &Job) -> Result<(), CacheError> {
        let Some(snapshot) = self.load() else {
            return Ok(());
        };

        let mut jobs = snapshot.jobs;
        let mut changed = false;
        for entry in jobs.iter_mut() {
            if entry.id == job.id {
                *entry = job.clone();
                changed = true;
            }
        }
        if !changed {
            return Ok(());
        }

        self.replace(&jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobStatus, JobType};
    use tempfile::TempDir;

    fn job(id: u64) -> Job {
        Job {
            id,
            title: format!("Machine {id}"),
            client_name: "Jan Kowalski".to_string(),
            address: "Mława, Warszawska 1".to_string(),
            coordinates: None,
            status: JobStatus::GeocodingError,
            phase_name: "Transport".to_string(),
            phone: None,
            person_id: None,
            job_type: JobType::Transport,
        }
    }

    fn cache_in(dir: &TempDir) -> SnapshotCache {
        SnapshotCache::new(dir.path().join("snapshot.json"))
    }

    #[test]
    fn missing_file_is_a_miss() {
        let dir = TempDir::new().unwrap();
        assert!(cache_in(&dir).load().is_none());
    }

    #[test]
    fn corrupt_file_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        fs::write(cache.path(), "{not json").unwrap();
        assert!(cache.load().is_none());
    }

    #[test]
    fn schema_mismatch_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        fs::write(
            cache.path(),
            r#"{"schema_version": 99, "saved_at": "2026-01-01T00:00:00Z", "jobs": []}"#,
        )
        .unwrap();
        assert!(cache.load().is_none());
    }

    #[test]
    fn replace_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.replace(&[job(1), job(2)]).unwrap();

        let loaded = cache.load_jobs().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, 1);
        assert_eq!(loaded[1].id, 2);
    }

    #[test]
    fn replace_overwrites_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.replace(&[job(1), job(2), job(3)]).unwrap();
        cache.replace(&[job(9)]).unwrap();

        let loaded = cache.load_jobs().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, 9);
    }

    #[test]
    fn evict_removes_only_that_job() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.replace(&[job(1), job(2)]).unwrap();
        cache.evict(1).unwrap();

        let loaded = cache.load_jobs().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, 2);
    }

    #[test]
    fn evict_unknown_id_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.replace(&[job(1)]).unwrap();

        let before = fs::read(cache.path()).unwrap();
        cache.evict(42).unwrap();
        let after = fs::read(cache.path()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn evict_with_no_snapshot_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        cache_in(&dir).evict(1).unwrap();
    }

    #[test]
    fn patch_updates_matching_entry() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.replace(&[job(1), job(2)]).unwrap();

        let mut corrected = job(2);
        corrected.address = "Szamotuły, Dworcowa 10".to_string();
        corrected.status = JobStatus::Open;
        cache.patch(&corrected).unwrap();

        let loaded = cache.load_jobs().unwrap();
        assert_eq!(loaded[0].address, "Mława, Warszawska 1");
        assert_eq!(loaded[1].address, "Szamotuły, Dworcowa 10");
        assert_eq!(loaded[1].status, JobStatus::Open);
    }
}
