use crate::corridor::{Direction, Tunnel};
use crate::forecast::bins::{bin_start, window_bins};
use crate::forecast::predict::{Prediction, predict_wait};
use crate::forecast::profile::Profiles;
use chrono::{NaiveDate, TimeZone};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowBest {
    pub best_bin: usize,
    pub result: Prediction,
}

/// Finds the bin with the lowest predicted wait in `[start_bin, end_bin]`
/// (inclusive, wrapping past midnight) on `date`.
///
/// Every bin is evaluated at its start time on `date` in `tz`, so bins after
/// midnight in a wrapping window still use `date`'s weekday. Bins without a
/// prediction, or whose local time does not exist, are skipped. Ties keep
/// the earliest bin in window order.
pub fn find_min_in_window<Tz: TimeZone>(
    profiles: &Profiles,
    tunnel: Tunnel,
    direction: Direction,
    date: NaiveDate,
    start_bin: usize,
    end_bin: usize,
    tz: &Tz,
) -> Option<WindowBest> {
    let mut best: Option<WindowBest> = None;

    for bin in window_bins(start_bin, end_bin) {
        let Some(at) = tz.from_local_datetime(&date.and_time(bin_start(bin))).earliest() else {
            continue;
        };
        let Some(result) = predict_wait(profiles, tunnel, direction, &at) else {
            continue;
        };
        if best.as_ref().is_none_or(|b| result.minutes < b.result.minutes) {
            best = Some(WindowBest {
                best_bin: bin,
                result,
            });
        }
    }

    best
}
