//! Time-of-week wait prediction with neighbour and all-days fallback.

use crate::corridor::{Direction, Tunnel};
use crate::forecast::bins::{BINS_PER_DAY, bin_index, weekday};
use crate::forecast::profile::{DayKey, DayProfile, Profiles};
use chrono::{DateTime, TimeZone};
use serde::Serialize;

/// Minimum samples for a bin to be used directly or by the radius search.
pub const MIN_SAMPLES: usize = 3;
/// How many bins either side the neighbour search looks.
pub const SEARCH_RADIUS: usize = 4;

/// Coarse reliability of a prediction.
///
/// | Samples | Confidence |
/// |---------|------------|
/// | >= 12   | high       |
/// | >= 6    | medium     |
/// | < 6     | low        |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn from_count(count: usize) -> Self {
        match count {
            c if c >= 12 => Confidence::High,
            c if c >= 6 => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub minutes: i64,
    pub bin_used: usize,
    pub count: usize,
    pub confidence: Confidence,
    /// Profile the bin was taken from.
    pub day: DayKey,
}

fn is_reliable(profile: &DayProfile, bin: usize) -> bool {
    profile.count[bin] >= MIN_SAMPLES && profile.median[bin].is_some()
}

/// Picks the bin of `profile` to answer for `bin`: the bin itself, then the
/// nearest reliable bin within [`SEARCH_RADIUS`] (earlier side first,
/// wrapping), then the bin with the most samples anywhere in the day.
fn usable_bin(profile: &DayProfile, bin: usize) -> Option<usize> {
    if is_reliable(profile, bin) {
        return Some(bin);
    }

    for r in 1..=SEARCH_RADIUS {
        for candidate in [bin + BINS_PER_DAY - r, bin + r] {
            let i = candidate % BINS_PER_DAY;
            if is_reliable(profile, i) {
                return Some(i);
            }
        }
    }

    let mut best = None;
    let mut best_count = 0;
    for i in 0..BINS_PER_DAY {
        if profile.count[i] > best_count && profile.median[i].is_some() {
            best = Some(i);
            best_count = profile.count[i];
        }
    }
    best
}

/// Predicts the wait at `at`, which should be expressed in the same time
/// zone the profiles were built with. Returns `None` when neither the
/// weekday profile nor the all-days profile has any usable bin.
pub fn predict_wait<Tz: TimeZone>(
    profiles: &Profiles,
    tunnel: Tunnel,
    direction: Direction,
    at: &DateTime<Tz>,
) -> Option<Prediction> {
    let bin = bin_index(at);

    [DayKey::Weekday(weekday(at)), DayKey::All]
        .into_iter()
        .find_map(|day| {
            let profile = profiles.get(tunnel, direction, day)?;
            let used = usable_bin(profile, bin)?;
            let median = profile.median[used]?;
            let count = profile.count[used];
            Some(Prediction {
                minutes: median.round() as i64,
                bin_used: used,
                count,
                confidence: Confidence::from_count(count),
                day,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::profile::build_profiles;
    use crate::observations::WaitObservation;
    use chrono::{Duration, Utc};

    // 2025-07-14 is a Monday
    fn monday_at(bin: usize) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 14, 0, 0, 0).unwrap() + Duration::minutes(bin as i64 * 15)
    }

    fn samples(bin: usize, minutes: &[f64], weeks_from: i64) -> Vec<WaitObservation> {
        minutes
            .iter()
            .enumerate()
            .map(|(k, m)| WaitObservation {
                tunnel: Tunnel::Gotthard,
                direction: Direction::S,
                minutes: *m,
                noted_at: monday_at(bin) + Duration::weeks(weeks_from + k as i64),
                source: "test".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_confidence_boundaries() {
        assert_eq!(Confidence::from_count(12), Confidence::High);
        assert_eq!(Confidence::from_count(11), Confidence::Medium);
        assert_eq!(Confidence::from_count(6), Confidence::Medium);
        assert_eq!(Confidence::from_count(5), Confidence::Low);
        assert_eq!(Confidence::from_count(0), Confidence::Low);
    }

    #[test]
    fn test_exact_bin_preferred() {
        let mut items = samples(40, &[10.0, 20.0, 30.0, 40.0, 50.0], 0);
        items.extend(samples(41, &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0], 0));
        let profiles = build_profiles(&items, &Utc);

        let p = predict_wait(&profiles, Tunnel::Gotthard, Direction::S, &monday_at(40)).unwrap();
        assert_eq!(p.bin_used, 40);
        assert_eq!(p.minutes, 30);
        assert_eq!(p.count, 5);
        assert_eq!(p.confidence, Confidence::Low);
        assert_eq!(p.day, DayKey::Weekday(1));
    }

    #[test]
    fn test_radius_fallback() {
        let items = samples(42, &[8.0, 9.0, 10.0, 11.0], 0);
        let profiles = build_profiles(&items, &Utc);

        let p = predict_wait(&profiles, Tunnel::Gotthard, Direction::S, &monday_at(40)).unwrap();
        assert_eq!(p.bin_used, 42);
        assert_eq!(p.minutes, 10);
        assert_eq!(p.count, 4);
    }

    #[test]
    fn test_radius_prefers_earlier_side_on_tie() {
        let mut items = samples(38, &[5.0, 5.0, 5.0], 0);
        items.extend(samples(42, &[50.0, 50.0, 50.0], 0));
        let profiles = build_profiles(&items, &Utc);

        let p = predict_wait(&profiles, Tunnel::Gotthard, Direction::S, &monday_at(40)).unwrap();
        assert_eq!(p.bin_used, 38);
    }

    #[test]
    fn test_radius_wraps_midnight() {
        let items = samples(94, &[3.0, 3.0, 3.0], 0);
        let profiles = build_profiles(&items, &Utc);

        let p = predict_wait(&profiles, Tunnel::Gotthard, Direction::S, &monday_at(1)).unwrap();
        assert_eq!(p.bin_used, 94);
    }

    #[test]
    fn test_sparse_day_uses_best_count_bin() {
        // Neither bin is reliable or within radius of 40
        let mut items = samples(10, &[4.0], 0);
        items.extend(samples(70, &[6.0, 8.0], 0));
        let profiles = build_profiles(&items, &Utc);

        let p = predict_wait(&profiles, Tunnel::Gotthard, Direction::S, &monday_at(40)).unwrap();
        assert_eq!(p.bin_used, 70);
        assert_eq!(p.minutes, 7);
        assert_eq!(p.count, 2);
        assert_eq!(p.confidence, Confidence::Low);
    }

    #[test]
    fn test_falls_back_to_all_days_profile() {
        // Only Tuesday data; a Monday query goes to the all-days profile
        let items: Vec<_> = samples(40, &[12.0, 14.0, 16.0], 0)
            .into_iter()
            .map(|mut o| {
                o.noted_at += Duration::days(1);
                o
            })
            .collect();
        let profiles = build_profiles(&items, &Utc);

        let p = predict_wait(&profiles, Tunnel::Gotthard, Direction::S, &monday_at(40)).unwrap();
        assert_eq!(p.day, DayKey::All);
        assert_eq!(p.minutes, 14);
        assert_eq!(p.bin_used, 40);
    }

    #[test]
    fn test_no_history_is_none() {
        let profiles = build_profiles(&[], &Utc);
        assert!(predict_wait(&profiles, Tunnel::Gotthard, Direction::S, &monday_at(40)).is_none());

        let other = build_profiles(&samples(40, &[10.0, 10.0, 10.0], 0), &Utc);
        assert!(predict_wait(&other, Tunnel::Gotthard, Direction::N, &monday_at(40)).is_none());
    }

    #[test]
    fn test_high_confidence() {
        let minutes = vec![20.0; 12];
        let profiles = build_profiles(&samples(40, &minutes, 0), &Utc);
        let p = predict_wait(&profiles, Tunnel::Gotthard, Direction::S, &monday_at(40)).unwrap();
        assert_eq!(p.confidence, Confidence::High);
    }
}
