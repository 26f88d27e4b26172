//! Logged wait observations and their CSV store.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use tracing::{debug, warn};

use crate::corridor::{Direction, Tunnel};

/// Source tag for observations entered by hand.
pub const MANUAL_SOURCE: &str = "Manual";

/// One wait figure observed at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitObservation {
    pub tunnel: Tunnel,
    pub direction: Direction,
    pub minutes: f64,
    pub noted_at: DateTime<Utc>,
    pub source: String,
}

impl WaitObservation {
    /// `minutes` must be finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.minutes.is_finite() && self.minutes >= 0.0
    }
}

/// Read/append access to logged observations.
pub trait ObservationStore {
    /// Observations with `since <= noted_at < until`; open bounds are `None`.
    fn load(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<WaitObservation>>;

    fn append(&self, observation: &WaitObservation) -> Result<()>;

    /// Appends a manually submitted observation, rejecting negative or
    /// non-finite minutes.
    fn record(&self, observation: &WaitObservation) -> Result<()> {
        if !observation.is_valid() {
            bail!("invalid wait of {} minutes", observation.minutes);
        }
        self.append(observation)
    }
}

/// Observations kept as rows of a single CSV file.
pub struct CsvObservationStore {
    path: String,
}

impl CsvObservationStore {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl ObservationStore for CsvObservationStore {
    fn load(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<WaitObservation>> {
        let path = Path::new(&self.path);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(path).with_context(|| format!("failed to open {}", self.path))?;
        let mut rdr = csv::Reader::from_reader(file);
        let mut rows = Vec::new();
        let mut skipped = 0usize;

        for result in rdr.deserialize() {
            let record: WaitObservation = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!(path = %self.path, error = %e, "Skipping bad observation row");
                    skipped += 1;
                    continue;
                }
            };
            if since.is_some_and(|s| record.noted_at < s) || until.is_some_and(|u| record.noted_at >= u) {
                continue;
            }
            rows.push(record);
        }

        if skipped > 0 {
            warn!(path = %self.path, skipped, "Bad observation rows skipped");
        }
        debug!(path = %self.path, rows = rows.len(), "Observations loaded");
        Ok(rows)
    }

    /// Appends one row, writing the header when the file is missing or empty.
    fn append(&self, observation: &WaitObservation) -> Result<()> {
        let needs_header = fs::metadata(&self.path).map_or(true, |m| m.len() == 0);
        debug!(path = %self.path, needs_header, "Appending observation");

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path))?;

        let mut writer = WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);

        writer.serialize(observation)?;
        writer.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn observation(minutes: f64, hour: u32) -> WaitObservation {
        WaitObservation {
            tunnel: Tunnel::Gotthard,
            direction: Direction::S,
            minutes,
            noted_at: Utc.with_ymd_and_hms(2025, 7, 14, hour, 0, 0).unwrap(),
            source: "Manual".to_string(),
        }
    }

    #[test]
    fn test_is_valid() {
        assert!(observation(0.0, 8).is_valid());
        assert!(!observation(-1.0, 8).is_valid());
        assert!(!observation(f64::NAN, 8).is_valid());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let store = CsvObservationStore::new(temp_path("tunnel_wait_test_missing.csv"));
        assert!(store.load(None, None).unwrap().is_empty());
    }

    #[test]
    fn test_append_writes_header_once() {
        let path = temp_path("tunnel_wait_test_header.csv");
        let _ = fs::remove_file(&path);
        let store = CsvObservationStore::new(&path);

        store.append(&observation(10.0, 8)).unwrap();
        store.append(&observation(20.0, 9)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("noted_at")).count();
        assert_eq!(header_count, 1);
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_filters_range() {
        let path = temp_path("tunnel_wait_test_range.csv");
        let _ = fs::remove_file(&path);
        let store = CsvObservationStore::new(&path);

        for hour in [6, 8, 10] {
            store.append(&observation(hour as f64, hour)).unwrap();
        }

        let since = Utc.with_ymd_and_hms(2025, 7, 14, 8, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2025, 7, 14, 10, 0, 0).unwrap();
        let rows = store.load(Some(since), Some(until)).unwrap();

        assert_eq!(rows, vec![observation(8.0, 8)]);
        assert_eq!(store.load(None, None).unwrap().len(), 3);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_to_empty_file_writes_header() {
        let path = temp_path("tunnel_wait_test_empty.csv");
        fs::write(&path, "").unwrap();
        let store = CsvObservationStore::new(&path);

        store.append(&observation(10.0, 8)).unwrap();
        store.append(&observation(20.0, 9)).unwrap();
        let rows = store.load(None, None).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(rows, vec![observation(10.0, 8), observation(20.0, 9)]);
    }

    #[test]
    fn test_load_accepts_legacy_ids_and_skips_bad_rows() {
        let path = temp_path("tunnel_wait_test_legacy.csv");
        fs::write(
            &path,
            "tunnel,direction,minutes,noted_at,source\n\
             gotthard,S,10,2025-07-14T08:00:00Z,Manual\n\
             gottardo,N2S,12,2025-07-14T09:00:00Z,Manual\n\
             tunnel?,sideways,x,yesterday,Manual\n\
             brennero,northbound,30,2025-07-14T10:00:00Z,Manual\n",
        )
        .unwrap();

        let rows = CsvObservationStore::new(&path).load(None, None).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].tunnel, Tunnel::Gotthard);
        assert_eq!(rows[1].direction, Direction::S);
        assert_eq!(rows[1].minutes, 12.0);
        assert_eq!(rows[2].tunnel, Tunnel::Brenner);
        assert_eq!(rows[2].direction, Direction::N);
    }

    #[test]
    fn test_record_rejects_negative_wait() {
        let path = temp_path("tunnel_wait_test_record.csv");
        let _ = fs::remove_file(&path);
        let store = CsvObservationStore::new(&path);

        assert!(store.record(&observation(-5.0, 8)).is_err());
        assert!(!Path::new(&path).exists());

        store.record(&observation(15.0, 8)).unwrap();
        let rows = store.load(None, None).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(rows, vec![observation(15.0, 8)]);
        assert_eq!(rows[0].source, MANUAL_SOURCE);
    }
}
