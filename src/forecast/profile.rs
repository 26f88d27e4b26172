//! Per-bin historical wait profiles.

use crate::corridor::{Direction, Tunnel};
use crate::forecast::bins::{BINS_PER_DAY, bin_index, weekday};
use crate::observations::WaitObservation;
use chrono::TimeZone;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Weekday (Sunday = 0) or the all-days aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DayKey {
    Weekday(u8),
    All,
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayKey::Weekday(d) => write!(f, "{d}"),
            DayKey::All => f.write_str("all"),
        }
    }
}

impl Serialize for DayKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProfileKey {
    pub tunnel: Tunnel,
    pub direction: Direction,
    pub day: DayKey,
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.tunnel, self.direction, self.day)
    }
}

/// Median and sample count for each of the 96 bins of a day. A bin with no
/// samples has `median[i] == None` and `count[i] == 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayProfile {
    pub median: Vec<Option<f64>>,
    pub count: Vec<usize>,
}

impl DayProfile {
    fn from_buckets(buckets: Vec<Vec<f64>>) -> Self {
        let count = buckets.iter().map(Vec::len).collect();
        let median = buckets.into_iter().map(median).collect();
        Self { median, count }
    }
}

/// All profiles built from one observation set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profiles {
    profiles: BTreeMap<ProfileKey, DayProfile>,
}

impl Profiles {
    pub fn get(&self, tunnel: Tunnel, direction: Direction, day: DayKey) -> Option<&DayProfile> {
        self.profiles.get(&ProfileKey {
            tunnel,
            direction,
            day,
        })
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Standard median; the mean of the two middle values for even counts.
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Builds weekday and all-days profiles for every tunnel direction present
/// in `observations`. Weekday and bin come from `noted_at` seen in `tz`.
/// Observations with negative or non-finite minutes are ignored.
pub fn build_profiles<Tz: TimeZone>(observations: &[WaitObservation], tz: &Tz) -> Profiles {
    let mut buckets: BTreeMap<ProfileKey, Vec<Vec<f64>>> = BTreeMap::new();
    let mut skipped = 0usize;

    for obs in observations {
        if !obs.is_valid() {
            skipped += 1;
            continue;
        }
        let local = obs.noted_at.with_timezone(tz);
        let bin = bin_index(&local);

        for day in [DayKey::Weekday(weekday(&local)), DayKey::All] {
            let key = ProfileKey {
                tunnel: obs.tunnel,
                direction: obs.direction,
                day,
            };
            buckets
                .entry(key)
                .or_insert_with(|| vec![Vec::new(); BINS_PER_DAY])[bin]
                .push(obs.minutes);
        }
    }

    if skipped > 0 {
        debug!(skipped, "Ignored invalid observations");
    }

    Profiles {
        profiles: buckets
            .into_iter()
            .map(|(key, bins)| (key, DayProfile::from_buckets(bins)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, Utc};

    fn obs(tunnel: Tunnel, direction: Direction, minutes: f64, at: &str) -> WaitObservation {
        WaitObservation {
            tunnel,
            direction,
            minutes,
            noted_at: DateTime::parse_from_rfc3339(at).unwrap().with_timezone(&Utc),
            source: "Manual".to_string(),
        }
    }

    #[test]
    fn test_median() {
        assert_eq!(median(vec![]), None);
        assert_eq!(median(vec![30.0, 10.0, 20.0]), Some(20.0));
        assert_eq!(median(vec![40.0, 10.0, 20.0, 30.0]), Some(25.0));
    }

    #[test]
    fn test_monday_bin_median() {
        // 2025-07-14 is a Monday; 10:00-10:14 is bin 40
        let items = vec![
            obs(Tunnel::Gotthard, Direction::S, 10.0, "2025-07-14T10:01:00Z"),
            obs(Tunnel::Gotthard, Direction::S, 30.0, "2025-07-21T10:05:00Z"),
            obs(Tunnel::Gotthard, Direction::S, 20.0, "2025-07-28T10:14:00Z"),
        ];
        let profiles = build_profiles(&items, &Utc);
        let monday = profiles
            .get(Tunnel::Gotthard, Direction::S, DayKey::Weekday(1))
            .unwrap();

        assert_eq!(monday.median[40], Some(20.0));
        assert_eq!(monday.count[40], 3);
        assert_eq!(monday.count[41], 0);
        assert_eq!(monday.median[41], None);

        let all = profiles.get(Tunnel::Gotthard, Direction::S, DayKey::All).unwrap();
        assert_eq!(all.count[40], 3);
        assert!(profiles.get(Tunnel::Gotthard, Direction::S, DayKey::Weekday(2)).is_none());
    }

    #[test]
    fn test_profiles_use_local_clock() {
        // 23:30 UTC Sunday is 01:30 Monday at UTC+2
        let items = vec![obs(Tunnel::Brenner, Direction::N, 15.0, "2025-07-13T23:30:00Z")];
        let cest = FixedOffset::east_opt(2 * 3600).unwrap();
        let profiles = build_profiles(&items, &cest);

        let monday = profiles
            .get(Tunnel::Brenner, Direction::N, DayKey::Weekday(1))
            .unwrap();
        assert_eq!(monday.count[6], 1);
    }

    #[test]
    fn test_keys_separate_directions_and_skip_invalid() {
        let items = vec![
            obs(Tunnel::Frejus, Direction::E, 5.0, "2025-07-14T08:00:00Z"),
            obs(Tunnel::Frejus, Direction::W, 7.0, "2025-07-14T08:00:00Z"),
            obs(Tunnel::Frejus, Direction::W, -3.0, "2025-07-14T08:00:00Z"),
        ];
        let profiles = build_profiles(&items, &Utc);

        assert_eq!(profiles.len(), 4);
        let west = profiles.get(Tunnel::Frejus, Direction::W, DayKey::All).unwrap();
        assert_eq!(west.count[32], 1);
        assert_eq!(west.median[32], Some(7.0));
    }

    #[test]
    fn test_build_is_deterministic() {
        let items = vec![
            obs(Tunnel::Gotthard, Direction::N, 12.0, "2025-07-18T16:00:00Z"),
            obs(Tunnel::Gotthard, Direction::N, 18.0, "2025-07-18T16:10:00Z"),
            obs(Tunnel::MonteBianco, Direction::E, 4.0, "2025-07-19T09:00:00Z"),
        ];
        assert_eq!(build_profiles(&items, &Utc), build_profiles(&items, &Utc));
    }

    #[test]
    fn test_empty_observations() {
        assert!(build_profiles(&[], &Utc).is_empty());
    }

    #[test]
    fn test_profile_key_display() {
        let key = ProfileKey {
            tunnel: Tunnel::MonteBianco,
            direction: Direction::W,
            day: DayKey::All,
        };
        assert_eq!(key.to_string(), "monte_bianco|W|all");
    }
}
