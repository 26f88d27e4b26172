/// Share of samples dropped from each tail before summing.
pub const TRIM_FRACTION: f64 = 0.15;

/// Combines per-point extra-delay samples into one corridor delay in seconds.
///
/// Non-finite and negative samples are discarded. The remaining values are
/// sorted and `floor(n * 0.15)` are dropped from each end; if that would drop
/// everything, the full set is kept. The survivors are summed, not averaged,
/// so the result grows with the number of sampled sub-segments.
pub fn summarize(extras: &[f64]) -> u64 {
    let mut valid: Vec<f64> = extras
        .iter()
        .copied()
        .filter(|x| x.is_finite() && *x >= 0.0)
        .collect();
    if valid.is_empty() {
        return 0;
    }
    valid.sort_by(f64::total_cmp);

    let n = valid.len();
    let cut = (n as f64 * TRIM_FRACTION).floor() as usize;
    let trimmed = if n > 2 * cut {
        &valid[cut..n - cut]
    } else {
        &valid[..]
    };

    let sum: f64 = trimmed.iter().sum();
    sum.round().max(0.0) as u64
}
