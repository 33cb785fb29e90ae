//! Raw label to canonical glomerulus type resolution.
//!
//! Only the first label of an item is consulted. Ignored labels drop the item
//! before any matching happens, then an exact key lookup is tried, then the
//! keys are scanned in declared order for the first one contained in the
//! label. Anything still unmatched falls to the configured policy.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::NormalizeError;
use crate::model::GlomerulusType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMapping {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: GlomerulusType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    Skip,
    DefaultType {
        #[serde(rename = "type")]
        kind: GlomerulusType,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    EmptyLabels,
    Ignored,
    Unmatched,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyLabels => "empty_labels",
            Self::Ignored => "ignored",
            Self::Unmatched => "unmatched",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelResolution {
    Mapped(GlomerulusType),
    Defaulted(GlomerulusType),
    Drop(DropReason),
}

impl LabelResolution {
    pub fn describe(self) -> String {
        match self {
            Self::Mapped(kind) => kind.to_string(),
            Self::Defaulted(kind) => format!("{kind} (default)"),
            Self::Drop(reason) => format!("drop ({})", reason.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTaxonomy {
    pub mappings: Vec<LabelMapping>,
    #[serde(default)]
    pub ignored: BTreeSet<String>,
    #[serde(default = "default_unmatched")]
    pub unmatched: UnmatchedPolicy,
}

fn default_unmatched() -> UnmatchedPolicy {
    UnmatchedPolicy::Skip
}

const BUILTIN_MAPPINGS: &[(&str, GlomerulusType)] = &[
    ("硬化性肾小球", GlomerulusType::Sclerotic),
    ("硬化肾小球", GlomerulusType::Sclerotic),
    ("新月体肾小球", GlomerulusType::Crescents),
    ("新月体性肾小球", GlomerulusType::Crescents),
    ("伴有新月体形成的肾小球", GlomerulusType::Crescents),
    ("新月体形成的肾小球", GlomerulusType::Crescents),
    ("单纯系膜增生性肾小球", GlomerulusType::Membranous),
    ("单纯系膜增生肾小球", GlomerulusType::Membranous),
    ("毛细血管内增生性肾小球", GlomerulusType::Cellular),
    ("毛细血管内增生肾小球", GlomerulusType::Cellular),
    ("毛细血管细胞增生的肾小球", GlomerulusType::Cellular),
    ("固有细胞无明显增生性肾小球", GlomerulusType::Normal),
];

const BUILTIN_IGNORED: &[&str] = &["肾小球"];

impl Default for LabelTaxonomy {
    fn default() -> Self {
        Self {
            mappings: BUILTIN_MAPPINGS
                .iter()
                .map(|(label, kind)| LabelMapping {
                    label: (*label).to_string(),
                    kind: *kind,
                })
                .collect(),
            ignored: BUILTIN_IGNORED.iter().map(|label| label.to_string()).collect(),
            unmatched: UnmatchedPolicy::Skip,
        }
    }
}

impl LabelTaxonomy {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let taxonomy: LabelTaxonomy = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        taxonomy
            .validate()
            .with_context(|| format!("invalid taxonomy in {}", path.display()))?;
        Ok(taxonomy)
    }

    pub fn validate(&self) -> Result<(), NormalizeError> {
        if let Some(mapping) = self.mappings.iter().find(|m| m.label.is_empty()) {
            // An empty key is a substring of every label.
            return Err(NormalizeError::InvalidConfig(format!(
                "empty mapping label for type {}",
                mapping.kind
            )));
        }

        let mut seen = BTreeSet::new();
        for mapping in &self.mappings {
            if !seen.insert(mapping.label.as_str()) {
                return Err(NormalizeError::InvalidConfig(format!(
                    "duplicate mapping label: {}",
                    mapping.label
                )));
            }
        }

        Ok(())
    }

    pub fn resolve(&self, labels: &[String]) -> LabelResolution {
        let Some(label) = labels.first() else {
            return LabelResolution::Drop(DropReason::EmptyLabels);
        };

        if self.ignored.contains(label) {
            return LabelResolution::Drop(DropReason::Ignored);
        }

        if let Some(mapping) = self.mappings.iter().find(|m| m.label == *label) {
            return LabelResolution::Mapped(mapping.kind);
        }

        if let Some(mapping) = self
            .mappings
            .iter()
            .find(|m| label.contains(m.label.as_str()))
        {
            return LabelResolution::Mapped(mapping.kind);
        }

        match self.unmatched {
            UnmatchedPolicy::Skip => LabelResolution::Drop(DropReason::Unmatched),
            UnmatchedPolicy::DefaultType { kind } => LabelResolution::Defaulted(kind),
        }
    }
}
