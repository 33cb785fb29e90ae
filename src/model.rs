use std::fmt;

use serde::{Deserialize, Serialize};

pub const RECTANGLE_KIND: &str = "rectanglelabels";

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One entry of an export's `result` list, decoded loosely.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAnnotationItem {
    pub kind: String,
    pub geometry: Geometry,
    pub raw_labels: Vec<String>,
    pub explicit_score: Option<f64>,
}

impl RawAnnotationItem {
    pub fn is_rectangle(&self) -> bool {
        self.kind == RECTANGLE_KIND
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GlomerulusType {
    Sclerotic,
    Crescents,
    Membranous,
    Cellular,
    Normal,
}

impl GlomerulusType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sclerotic => "sclerotic",
            Self::Crescents => "crescents",
            Self::Membranous => "membranous",
            Self::Cellular => "cellular",
            Self::Normal => "normal",
        }
    }
}

impl fmt::Display for GlomerulusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceSource {
    /// Score carried by the export itself.
    Measured,
    /// Positional placeholder; not a model output.
    Synthetic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub id: String,
    pub geometry: Geometry,
    pub kind: GlomerulusType,
    pub confidence: f64,
    pub confidence_source: ConfidenceSource,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionCounts {
    pub result_items: usize,
    pub rectangle_items: usize,
    pub records_emitted: usize,
    pub dropped_empty_labels: usize,
    pub dropped_ignored: usize,
    pub dropped_unmatched: usize,
    pub defaulted: usize,
    pub merged_duplicates: usize,
    pub synthetic_confidence: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub report_version: u32,
    pub generated_at: String,
    pub source_path: String,
    pub source_sha256: String,
    pub shape_rule: String,
    pub counts: ConversionCounts,
    pub detected_labels: Vec<String>,
}
