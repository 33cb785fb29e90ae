use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{ConvertArgs, IdNumbering};
use crate::commands::taxonomy::load_taxonomy;
use crate::model::{CanonicalRecord, ConfidenceSource, ConversionCounts, ConversionReport};
use crate::taxonomy::{DropReason, LabelResolution, LabelTaxonomy};
use crate::util::{now_utc_string, sha256_bytes, write_json_pretty, write_output};

mod assemble;
mod confidence;
mod dedup;
mod emit;
mod extract;
mod payload;

pub(crate) use extract::{decode_item, extract_results};
pub(crate) use payload::{locate_payload, read_source};

use assemble::RecordAssembler;
use confidence::resolve_confidence;
use dedup::{Candidate, merge_duplicates, priority, validate_threshold};
use emit::{EmitOptions, render, validate_variable_name};

const REPORT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions {
    pub numbering: IdNumbering,
    pub id_base: u64,
    /// Centre distance under which stacked boxes merge; `None` keeps every box.
    pub dedup_threshold: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub shape_rule: &'static str,
    pub records: Vec<CanonicalRecord>,
    pub detected_labels: BTreeSet<String>,
    pub counts: ConversionCounts,
}

pub fn run(args: ConvertArgs) -> Result<()> {
    let taxonomy = load_taxonomy(&args.taxonomy)?;
    validate_variable_name(&args.variable_name)?;
    if let Some(threshold) = args.dedup_threshold {
        validate_threshold(threshold)?;
    }

    let emit_options = EmitOptions {
        variable_name: args.variable_name.clone(),
        export_style: args.export_style,
        type_annotation: Some(args.type_annotation.trim().to_string())
            .filter(|annotation| !annotation.is_empty()),
        unique_count_header: args.dedup_threshold.is_some(),
    };
    let options = ConvertOptions {
        numbering: args.id_numbering,
        id_base: args.id_base,
        dedup_threshold: args.dedup_threshold,
    };

    info!(input = %args.input.display(), "starting conversion");

    let content = read_source(&args.input)?;
    let outcome = convert_content(&content, &taxonomy, options)
        .with_context(|| format!("failed to convert {}", args.input.display()))?;

    let text = render(&outcome.records, &outcome.detected_labels, &emit_options)?;
    write_output(args.output_path.as_deref(), &text)?;

    info!(
        rule = outcome.shape_rule,
        result_items = outcome.counts.result_items,
        rectangle_items = outcome.counts.rectangle_items,
        records = outcome.counts.records_emitted,
        dropped_ignored = outcome.counts.dropped_ignored,
        dropped_unmatched = outcome.counts.dropped_unmatched,
        defaulted = outcome.counts.defaulted,
        merged_duplicates = outcome.counts.merged_duplicates,
        "conversion completed"
    );

    if let Some(report_path) = &args.report_path {
        let report = build_report(&args.input, &content, &outcome);
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote conversion report");
    }

    Ok(())
}

pub fn convert_content(
    content: &str,
    taxonomy: &LabelTaxonomy,
    options: ConvertOptions,
) -> Result<ConversionOutcome> {
    let document = locate_payload(content)?;
    let extraction = extract_results(&document);

    let mut counts = ConversionCounts {
        result_items: extraction.entries.len(),
        ..ConversionCounts::default()
    };
    let mut detected_labels = BTreeSet::new();
    let mut candidates = Vec::new();

    for (slot, entry) in extraction.entries.iter().enumerate() {
        let item = decode_item(entry);
        if !item.is_rectangle() {
            continue;
        }

        counts.rectangle_items += 1;
        detected_labels.extend(item.raw_labels.iter().cloned());

        let resolution = taxonomy.resolve(&item.raw_labels);
        let kind = match resolution {
            LabelResolution::Mapped(kind) => kind,
            LabelResolution::Defaulted(kind) => {
                counts.defaulted += 1;
                debug!(
                    slot,
                    label = ?item.raw_labels.first(),
                    fallback = %kind,
                    "unmapped label defaulted"
                );
                kind
            }
            LabelResolution::Drop(reason) => {
                match reason {
                    DropReason::EmptyLabels => counts.dropped_empty_labels += 1,
                    DropReason::Ignored => counts.dropped_ignored += 1,
                    DropReason::Unmatched => counts.dropped_unmatched += 1,
                }
                debug!(
                    slot,
                    label = ?item.raw_labels.first(),
                    reason = reason.as_str(),
                    "item dropped"
                );
                continue;
            }
        };

        candidates.push(Candidate {
            slot,
            geometry: item.geometry,
            kind,
            priority: priority(resolution),
            explicit_score: item.explicit_score,
        });
    }

    if let Some(threshold) = options.dedup_threshold {
        let (kept, merged) = merge_duplicates(candidates, threshold);
        debug!(threshold, merged, kept = kept.len(), "merged stacked boxes");
        counts.merged_duplicates = merged;
        candidates = kept;
    }

    let mut assembler = RecordAssembler::new(options.numbering, options.id_base);
    for candidate in candidates {
        let confidence = resolve_confidence(candidate.explicit_score, assembler.position());
        assembler.push(candidate.slot, candidate.geometry, candidate.kind, confidence)?;
    }

    let records = assembler.finish();
    counts.records_emitted = records.len();
    counts.synthetic_confidence = records
        .iter()
        .filter(|record| record.confidence_source == ConfidenceSource::Synthetic)
        .count();

    Ok(ConversionOutcome {
        shape_rule: extraction.rule_name(),
        records,
        detected_labels,
        counts,
    })
}

fn build_report(source: &Path, content: &str, outcome: &ConversionOutcome) -> ConversionReport {
    ConversionReport {
        report_version: REPORT_VERSION,
        generated_at: now_utc_string(),
        source_path: source.display().to_string(),
        source_sha256: sha256_bytes(content.as_bytes()),
        shape_rule: outcome.shape_rule.to_string(),
        counts: outcome.counts.clone(),
        detected_labels: outcome.detected_labels.iter().cloned().collect(),
    }
}
