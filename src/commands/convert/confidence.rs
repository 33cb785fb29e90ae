use crate::model::ConfidenceSource;

/// Returns the export's own score untouched when present. Otherwise yields a
/// synthetic placeholder cycling 0.95, 0.96, .. 0.99 by emitted position;
/// these values are not measurements.
pub fn resolve_confidence(explicit: Option<f64>, position: usize) -> (f64, ConfidenceSource) {
    match explicit {
        Some(score) => (score, ConfidenceSource::Measured),
        None => (synthetic_confidence(position), ConfidenceSource::Synthetic),
    }
}

fn synthetic_confidence(position: usize) -> f64 {
    (95 + position % 5) as f64 / 100.0
}
