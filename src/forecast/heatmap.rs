use crate::corridor::Tunnel;
use crate::observations::WaitObservation;
use chrono::{Datelike, TimeZone, Timelike};
use serde::Serialize;

/// Mean wait per weekday (Monday first) and hour of day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    pub wait: [[f64; 24]; 7],
    pub count: [[usize; 24]; 7],
    /// Largest cell mean, used as the colour-scale divisor. Falls back to 1
    /// when no cell has a positive mean so `wait / max` stays finite.
    pub max: f64,
}

/// Builds the weekly heatmap from valid observations, optionally limited
/// to one tunnel. Cells without samples hold 0.
pub fn weekly_heatmap<Tz: TimeZone>(
    observations: &[WaitObservation],
    tunnel: Option<Tunnel>,
    tz: &Tz,
) -> Heatmap {
    let mut sum = [[0.0f64; 24]; 7];
    let mut count = [[0usize; 24]; 7];

    for obs in observations
        .iter()
        .filter(|o| o.is_valid() && tunnel.is_none_or(|t| o.tunnel == t))
    {
        let local = obs.noted_at.with_timezone(tz);
        let day = local.weekday().num_days_from_monday() as usize;
        let hour = local.hour() as usize;
        sum[day][hour] += obs.minutes;
        count[day][hour] += 1;
    }

    let mut wait = [[0.0f64; 24]; 7];
    let mut max = 0.0f64;
    for day in 0..7 {
        for hour in 0..24 {
            if count[day][hour] > 0 {
                wait[day][hour] = sum[day][hour] / count[day][hour] as f64;
                max = max.max(wait[day][hour]);
            }
        }
    }

    Heatmap {
        wait,
        count,
        max: if max > 0.0 { max } else { 1.0 },
    }
}
