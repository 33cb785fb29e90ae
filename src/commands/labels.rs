use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::LabelsArgs;
use crate::commands::convert::{decode_item, extract_results, locate_payload, read_source};
use crate::commands::taxonomy::load_taxonomy;
use crate::taxonomy::LabelTaxonomy;
use crate::util::write_output;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelUsage {
    pub label: String,
    pub count: usize,
    /// Items carrying this label first; only these are resolved.
    pub first_count: usize,
}

pub fn run(args: LabelsArgs) -> Result<()> {
    let taxonomy = load_taxonomy(&args.taxonomy)?;
    let content = read_source(&args.input)?;
    let usages = collect_label_usage(&content)
        .with_context(|| format!("failed to read labels from {}", args.input.display()))?;

    let table = render_usage_table(&usages, &taxonomy);
    write_output(None, &table)?;

    info!(
        input = %args.input.display(),
        distinct_labels = usages.len(),
        "label inventory completed"
    );

    Ok(())
}

pub fn collect_label_usage(content: &str) -> Result<Vec<LabelUsage>> {
    let document = locate_payload(content)?;
    let extraction = extract_results(&document);

    let mut usage: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for entry in &extraction.entries {
        let item = decode_item(entry);
        if !item.is_rectangle() {
            continue;
        }

        for (index, label) in item.raw_labels.iter().enumerate() {
            let counts = usage.entry(label.clone()).or_default();
            counts.0 += 1;
            if index == 0 {
                counts.1 += 1;
            }
        }
    }

    Ok(usage
        .into_iter()
        .map(|(label, (count, first_count))| LabelUsage {
            label,
            count,
            first_count,
        })
        .collect())
}

pub fn render_usage_table(usages: &[LabelUsage], taxonomy: &LabelTaxonomy) -> String {
    let mut out = String::from("label\tcount\tfirst\tresolution\n");
    for usage in usages {
        let resolution = taxonomy.resolve(std::slice::from_ref(&usage.label));
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\n",
            usage.label,
            usage.count,
            usage.first_count,
            resolution.describe()
        ));
    }
    out
}
