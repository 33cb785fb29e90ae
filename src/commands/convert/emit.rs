use std::collections::BTreeSet;
use std::fmt::Write;

use anyhow::{Context, Result};
use regex::Regex;

use crate::cli::ExportStyle;
use crate::error::NormalizeError;
use crate::model::CanonicalRecord;

#[derive(Debug, Clone)]
pub struct EmitOptions {
    pub variable_name: String,
    pub export_style: ExportStyle,
    pub type_annotation: Option<String>,
    pub unique_count_header: bool,
}

pub fn validate_variable_name(name: &str) -> Result<()> {
    let pattern = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$")
        .context("failed to compile identifier regex")?;
    if !pattern.is_match(name) {
        return Err(NormalizeError::InvalidConfig(format!(
            "output variable name is not an identifier: {name:?}"
        ))
        .into());
    }
    Ok(())
}

/// Renders the whole output in memory so a run either writes everything or
/// nothing.
pub fn render(
    records: &[CanonicalRecord],
    detected_labels: &BTreeSet<String>,
    options: &EmitOptions,
) -> Result<String> {
    let mut out = String::new();

    if options.unique_count_header {
        writeln!(out, "// Total unique count: {}", records.len())?;
    }

    let qualifier = match options.export_style {
        ExportStyle::Export => "export const",
        ExportStyle::Plain => "const",
    };
    let annotation = options
        .type_annotation
        .as_deref()
        .map(|annotation| format!(": {annotation}"))
        .unwrap_or_default();

    writeln!(out, "{qualifier} {}{annotation} = [", options.variable_name)?;
    for record in records {
        writeln!(out, "  {},", render_record(record))?;
    }
    writeln!(out, "];")?;

    // JSON leaves U+2028/U+2029 raw, and both end a TypeScript line comment.
    let labels = serde_json::to_string(detected_labels)
        .context("failed to render detected labels")?
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029");
    writeln!(out)?;
    writeln!(out, "// Detected labels:")?;
    writeln!(out, "// {labels}")?;

    Ok(out)
}

pub fn render_record(record: &CanonicalRecord) -> String {
    let geometry = &record.geometry;
    format!(
        "{{ id: '{}', x: {:.4}, y: {:.4}, width: {:.4}, height: {:.4}, type: '{}', confidence: {} }}",
        record.id,
        geometry.x,
        geometry.y,
        geometry.width,
        geometry.height,
        record.kind,
        record.confidence
    )
}
