//! Per-tick statistics helpers

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean absolute deviation from the slice's own mean
pub fn mean_abs_deviation(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    let deviation = values.iter().map(|v| (v - avg).abs()).sum::<f64>() / values.len() as f64;
    Some(deviation)
}

/// Failed fraction of a batch: `(total - successes) / total`.
/// An empty batch is "no data", not a division by zero.
pub fn packet_loss(successes: u32, total: u32) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let successes = successes.min(total);
    Some((total - successes) as f64 / total as f64)
}

/// Milliseconds as float
pub fn millis(d: std::time::Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
