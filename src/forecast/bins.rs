//! Fifteen-minute time-of-day bins.

use chrono::{Datelike, NaiveTime, Timelike};

pub const BINS_PER_DAY: usize = 96;
pub const BIN_MINUTES: u32 = 15;

/// Bin index `0..96` of a local time of day.
pub fn bin_index<T: Timelike>(t: &T) -> usize {
    ((t.hour() * 60 + t.minute()) / BIN_MINUTES) as usize
}

/// Day of week with Sunday = 0 through Saturday = 6.
pub fn weekday<T: Datelike>(t: &T) -> u8 {
    t.weekday().num_days_from_sunday() as u8
}

/// Local time at which `bin` starts. Indices wrap modulo 96.
pub fn bin_start(bin: usize) -> NaiveTime {
    let minutes = (bin % BINS_PER_DAY) as u32 * BIN_MINUTES;
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap_or(NaiveTime::MIN)
}

/// `"HH:MM"` label of a bin's start.
pub fn bin_label(bin: usize) -> String {
    bin_start(bin).format("%H:%M").to_string()
}

/// Bin containing an `"HH:MM"` time of day.
pub fn parse_bin_label(label: &str) -> Option<usize> {
    NaiveTime::parse_from_str(label.trim(), "%H:%M")
        .ok()
        .map(|t| bin_index(&t))
}

/// Bins from `start` to `end` inclusive, walking forward and wrapping past
/// midnight when `end < start`.
pub fn window_bins(start: usize, end: usize) -> Vec<usize> {
    let start = start % BINS_PER_DAY;
    let end = end % BINS_PER_DAY;
    let len = (end + BINS_PER_DAY - start) % BINS_PER_DAY + 1;
    (0..len).map(|k| (start + k) % BINS_PER_DAY).collect()
}
