//! Output formatting for estimates and forecasts.

use anyhow::Result;
use serde::Serialize;

/// Writes a value to stdout as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Human-readable wait: `"1h 5m"` or `"12 min"`. Negative values read as 0.
pub fn format_minutes(minutes: f64) -> String {
    if !minutes.is_finite() {
        return "no reliable estimate".to_string();
    }
    let m = minutes.round().max(0.0) as i64;
    let (h, mm) = (m / 60, m % 60);
    if h > 0 {
        format!("{h}h {mm}m")
    } else {
        format!("{mm} min")
    }
}
