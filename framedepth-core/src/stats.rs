//! Descriptive statistics over depth values

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by N), 0 for an empty slice
pub fn population_std_dev(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mu = mean(values);
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mu;
            d * d
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// Round to `places` decimal places
///
/// The exact binary value is rounded once, ties to even, so `2.675` (stored
/// just below) gives `2.67` and `2.125` gives `2.12`.
pub fn round_to(value: f64, places: usize) -> f64 {
    format!("{:.*}", places, value).parse().unwrap_or(value)
}
