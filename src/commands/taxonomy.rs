use anyhow::{Context, Result};
use tracing::info;

use crate::cli::{TaxonomyArgs, TaxonomyCommandArgs, UnmatchedMode};
use crate::model::GlomerulusType;
use crate::taxonomy::{LabelTaxonomy, UnmatchedPolicy};
use crate::util::write_output;

pub fn run(args: TaxonomyCommandArgs) -> Result<()> {
    let taxonomy = load_taxonomy(&args.taxonomy)?;
    let mut text =
        serde_json::to_string_pretty(&taxonomy).context("failed to serialize taxonomy")?;
    text.push('\n');

    write_output(args.output_path.as_deref(), &text)?;
    info!(
        mappings = taxonomy.mappings.len(),
        ignored = taxonomy.ignored.len(),
        "taxonomy written"
    );

    Ok(())
}

/// Built-in or file taxonomy, with the CLI unmatched-policy flags applied on top.
pub fn load_taxonomy(args: &TaxonomyArgs) -> Result<LabelTaxonomy> {
    let mut taxonomy = match &args.taxonomy_path {
        Some(path) => {
            let taxonomy = LabelTaxonomy::load(path)?;
            info!(path = %path.display(), mappings = taxonomy.mappings.len(), "loaded taxonomy");
            taxonomy
        }
        None => LabelTaxonomy::default(),
    };

    if let Some(policy) = unmatched_override(args) {
        taxonomy.unmatched = policy;
    }

    Ok(taxonomy)
}

fn unmatched_override(args: &TaxonomyArgs) -> Option<UnmatchedPolicy> {
    match (args.unmatched, args.default_type) {
        (Some(UnmatchedMode::Skip), _) => Some(UnmatchedPolicy::Skip),
        (Some(UnmatchedMode::DefaultType), kind) | (None, kind @ Some(_)) => {
            Some(UnmatchedPolicy::DefaultType {
                kind: kind.unwrap_or(GlomerulusType::Cellular),
            })
        }
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_to_builtin_skip_policy() {
        let taxonomy = load_taxonomy(&TaxonomyArgs::default()).expect("builtin taxonomy");
        assert_eq!(taxonomy, LabelTaxonomy::default());
        assert_eq!(taxonomy.unmatched, UnmatchedPolicy::Skip);
    }

    #[test]
    fn default_type_flag_implies_policy() {
        let args = TaxonomyArgs {
            default_type: Some(GlomerulusType::Normal),
            ..TaxonomyArgs::default()
        };
        assert_eq!(
            unmatched_override(&args),
            Some(UnmatchedPolicy::DefaultType {
                kind: GlomerulusType::Normal
            })
        );

        let args = TaxonomyArgs {
            unmatched: Some(UnmatchedMode::DefaultType),
            ..TaxonomyArgs::default()
        };
        assert_eq!(
            unmatched_override(&args),
            Some(UnmatchedPolicy::DefaultType {
                kind: GlomerulusType::Cellular
            })
        );
    }

    #[test]
    fn skip_flag_overrides_file_policy() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"mappings": [{{"label": "硬化肾小球", "type": "sclerotic"}}],
               "unmatched": {{"policy": "default_type", "type": "normal"}}}}"#
        )
        .expect("write taxonomy");

        let args = TaxonomyArgs {
            taxonomy_path: Some(file.path().to_path_buf()),
            unmatched: Some(UnmatchedMode::Skip),
            default_type: None,
        };
        let taxonomy = load_taxonomy(&args).expect("file taxonomy");
        assert_eq!(taxonomy.mappings.len(), 1);
        assert_eq!(taxonomy.unmatched, UnmatchedPolicy::Skip);
    }
}
