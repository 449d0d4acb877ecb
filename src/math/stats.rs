//! Robust statistics helpers.

/// Median of `values`, sorting them in place.
///
/// Even counts average the two middle elements. Returns `None` for an empty slice.
pub fn median_mut(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Median of an iterator of values (copies into a scratch buffer).
pub fn median<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let mut buf: Vec<f64> = values.into_iter().collect();
    median_mut(&mut buf)
}
