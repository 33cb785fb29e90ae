use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::GlomerulusType;

#[derive(Parser, Debug)]
#[command(
    name = "glomx",
    version,
    about = "Normalize glomerulus annotation exports into typed TypeScript records"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Convert(ConvertArgs),
    Labels(LabelsArgs),
    Taxonomy(TaxonomyCommandArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct TaxonomyArgs {
    /// JSON taxonomy file replacing the built-in label table.
    #[arg(long)]
    pub taxonomy_path: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub unmatched: Option<UnmatchedMode>,

    /// Fallback type for unmatched labels; implies `--unmatched default-type`.
    #[arg(long, value_enum)]
    pub default_type: Option<GlomerulusType>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum UnmatchedMode {
    Skip,
    DefaultType,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum IdNumbering {
    /// Ids count emitted records only; dropped items consume nothing.
    Continuous,
    /// Ids follow each item's slot in the result list; dropped items leave gaps.
    PerEmitted,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportStyle {
    Export,
    Plain,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub taxonomy: TaxonomyArgs,

    #[arg(long, default_value_t = 0)]
    pub id_base: u64,

    #[arg(long, value_enum, default_value_t = IdNumbering::Continuous)]
    pub id_numbering: IdNumbering,

    #[arg(long, default_value = "DATA_FINAL_IMG")]
    pub variable_name: String,

    #[arg(long, value_enum, default_value_t = ExportStyle::Export)]
    pub export_style: ExportStyle,

    /// TypeScript type written after the variable name; empty disables it.
    #[arg(long, default_value = "Glomerulus[]")]
    pub type_annotation: String,

    /// Merge boxes whose centres are closer than this distance, keeping the
    /// more specific type.
    #[arg(long)]
    pub dedup_threshold: Option<f64>,

    #[arg(long)]
    pub output_path: Option<PathBuf>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct LabelsArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub taxonomy: TaxonomyArgs,
}

#[derive(Args, Debug, Clone)]
pub struct TaxonomyCommandArgs {
    #[command(flatten)]
    pub taxonomy: TaxonomyArgs,

    #[arg(long)]
    pub output_path: Option<PathBuf>,
}
