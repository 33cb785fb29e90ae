use crate::cli::IdNumbering;
use crate::error::NormalizeError;
use crate::model::{CanonicalRecord, ConfidenceSource, Geometry, GlomerulusType};

const ID_PREFIX: &str = "final-";
const GEOMETRY_SCALE: f64 = 10_000.0;

/// Builds records in emission order and hands out `final-N` ids.
#[derive(Debug)]
pub struct RecordAssembler {
    numbering: IdNumbering,
    base: u64,
    records: Vec<CanonicalRecord>,
}

impl RecordAssembler {
    pub fn new(numbering: IdNumbering, base: u64) -> Self {
        Self {
            numbering,
            base,
            records: Vec::new(),
        }
    }

    /// Number of records emitted so far; the next record's position.
    pub fn position(&self) -> usize {
        self.records.len()
    }

    /// `slot` is the item's index in the extracted result list. It only
    /// drives the id under [`IdNumbering::PerEmitted`].
    pub fn push(
        &mut self,
        slot: usize,
        geometry: Geometry,
        kind: GlomerulusType,
        confidence: (f64, ConfidenceSource),
    ) -> Result<(), NormalizeError> {
        let index = match self.numbering {
            IdNumbering::Continuous => self.records.len(),
            IdNumbering::PerEmitted => slot,
        };
        let number = u64::try_from(index)
            .ok()
            .and_then(|index| self.base.checked_add(index))
            .ok_or_else(|| {
                NormalizeError::InvalidConfig(format!(
                    "id base {} overflows at record index {index}",
                    self.base
                ))
            })?;

        self.records.push(CanonicalRecord {
            id: format!("{ID_PREFIX}{number}"),
            geometry: round_geometry(geometry),
            kind,
            confidence: confidence.0,
            confidence_source: confidence.1,
        });
        Ok(())
    }

    pub fn finish(self) -> Vec<CanonicalRecord> {
        self.records
    }
}

/// Rounds half away from zero at the fourth decimal place.
pub fn round4(value: f64) -> f64 {
    // `+ 0.0` folds -0.0 so it never renders as "-0.0000".
    (value * GEOMETRY_SCALE).round() / GEOMETRY_SCALE + 0.0
}

fn round_geometry(geometry: Geometry) -> Geometry {
    Geometry {
        x: round4(geometry.x),
        y: round4(geometry.y),
        width: round4(geometry.width),
        height: round4(geometry.height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(x: f64) -> Geometry {
        Geometry {
            x,
            y: 1.0,
            width: 2.0,
            height: 3.0,
        }
    }

    fn ids(records: &[CanonicalRecord]) -> Vec<&str> {
        records.iter().map(|record| record.id.as_str()).collect()
    }

    #[test]
    fn continuous_numbering_ignores_skipped_slots() {
        let mut assembler = RecordAssembler::new(IdNumbering::Continuous, 1);
        let synthetic = (0.95, ConfidenceSource::Synthetic);
        assembler.push(0, geometry(1.0), GlomerulusType::Sclerotic, synthetic).expect("push");
        assembler.push(3, geometry(2.0), GlomerulusType::Normal, synthetic).expect("push");
        assembler.push(4, geometry(3.0), GlomerulusType::Cellular, synthetic).expect("push");
        assert_eq!(ids(&assembler.finish()), vec!["final-1", "final-2", "final-3"]);
    }

    #[test]
    fn per_emitted_numbering_keeps_slot_gaps() {
        let mut assembler = RecordAssembler::new(IdNumbering::PerEmitted, 0);
        let synthetic = (0.95, ConfidenceSource::Synthetic);
        assembler.push(0, geometry(1.0), GlomerulusType::Sclerotic, synthetic).expect("push");
        assembler.push(3, geometry(2.0), GlomerulusType::Normal, synthetic).expect("push");
        assert_eq!(assembler.position(), 2);
        assert_eq!(ids(&assembler.finish()), vec!["final-0", "final-3"]);
    }

    #[test]
    fn id_base_overflow_is_a_config_error() {
        let mut assembler = RecordAssembler::new(IdNumbering::Continuous, u64::MAX);
        let synthetic = (0.95, ConfidenceSource::Synthetic);
        assembler
            .push(0, geometry(1.0), GlomerulusType::Sclerotic, synthetic)
            .expect("first id fits");
        let err = assembler
            .push(1, geometry(2.0), GlomerulusType::Sclerotic, synthetic)
            .unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidConfig(_)));
        assert_eq!(assembler.finish().len(), 1);
    }

    #[test]
    fn round4_is_half_away_from_zero() {
        // 1.03125 and its negation are exact binary ties at the fourth place.
        assert_eq!(round4(1.03125), 1.0313);
        assert_eq!(round4(-1.03125), -1.0313);
        assert_eq!(round4(12.345678), 12.3457);
        assert_eq!(round4(7.0), 7.0);
        assert!(round4(-0.00001).is_sign_positive());
    }
}
