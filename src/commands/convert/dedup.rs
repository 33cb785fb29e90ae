//! Optional merge of stacked boxes.
//!
//! Annotators often draw a second box over a glomerulus they already labeled.
//! Two boxes whose centres lie closer than the threshold are treated as one;
//! the more specific type wins, and ties keep the box seen first.

use crate::error::NormalizeError;
use crate::model::{Geometry, GlomerulusType};
use crate::taxonomy::LabelResolution;

/// A canonicalized item waiting for id and confidence assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub slot: usize,
    pub geometry: Geometry,
    pub kind: GlomerulusType,
    pub priority: u8,
    pub explicit_score: Option<f64>,
}

/// Merge priority; a policy fallback ranks below every mapped type.
pub fn priority(resolution: LabelResolution) -> u8 {
    match resolution {
        LabelResolution::Mapped(GlomerulusType::Sclerotic) => 10,
        LabelResolution::Mapped(GlomerulusType::Crescents) => 9,
        LabelResolution::Mapped(GlomerulusType::Membranous) => 8,
        LabelResolution::Mapped(GlomerulusType::Normal) => 7,
        LabelResolution::Mapped(GlomerulusType::Cellular) => 5,
        LabelResolution::Defaulted(_) => 1,
        LabelResolution::Drop(_) => 0,
    }
}

pub fn validate_threshold(threshold: f64) -> Result<(), NormalizeError> {
    if threshold.is_finite() && threshold > 0.0 {
        Ok(())
    } else {
        Err(NormalizeError::InvalidConfig(format!(
            "dedup threshold must be a positive number, got {threshold}"
        )))
    }
}

/// Returns the kept candidates in first-seen order and the number merged away.
/// A replacing box inherits the slot of the box it replaces so ids stay
/// ordered under per-slot numbering.
pub fn merge_duplicates(candidates: Vec<Candidate>, threshold: f64) -> (Vec<Candidate>, usize) {
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    let mut merged = 0;

    for candidate in candidates {
        let (cx, cy) = centre(&candidate.geometry);
        let existing = kept.iter_mut().find(|other| {
            let (x, y) = centre(&other.geometry);
            (cx - x).hypot(cy - y) < threshold
        });

        match existing {
            Some(existing) => {
                merged += 1;
                if candidate.priority > existing.priority {
                    *existing = Candidate {
                        slot: existing.slot,
                        ..candidate
                    };
                }
            }
            None => kept.push(candidate),
        }
    }

    (kept, merged)
}

fn centre(geometry: &Geometry) -> (f64, f64) {
    (
        geometry.x + geometry.width / 2.0,
        geometry.y + geometry.height / 2.0,
    )
}
