use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::filters::ImageMode;

#[derive(Parser, Debug)]
#[command(
    name = "exambank",
    version,
    about = "Normalize, audit and write back exam question datasets"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inspect(InspectArgs),
    Taxonomy(TaxonomyArgs),
    Query(QueryArgs),
    Sync(SyncArgs),
    Replace(ReplaceArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DatasetArgs {
    #[arg(long = "dataset", required = true)]
    pub datasets: Vec<PathBuf>,

    /// Topic tree used to canonicalize topics. Looked up next to the first
    /// dataset when omitted.
    #[arg(long)]
    pub taxonomy: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub no_taxonomy: bool,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Print a single canonical question as JSON.
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TaxonomyArgs {
    #[arg(long)]
    pub path: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    #[arg(long = "exam")]
    pub exams: Vec<String>,

    #[arg(long, value_enum, default_value_t = ImageMode::All)]
    pub image_mode: ImageMode,

    /// `Super` or `Super > Sub`; repeatable.
    #[arg(long = "topic")]
    pub topics: Vec<String>,

    #[arg(long, default_value_t = 1.0)]
    pub topic_confidence_max: f64,

    #[arg(long, default_value_t = 1.0)]
    pub answer_confidence_max: f64,

    #[arg(long, default_value_t = false)]
    pub only_recommend_change: bool,

    #[arg(long, default_value_t = false)]
    pub only_needs_maintenance: bool,

    /// Terms separated by `;`; all of them have to match.
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long, default_value_t = false)]
    pub in_answers: bool,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[arg(long)]
    pub limit: Option<usize>,

    /// Sample this many questions from the filtered set; 0 keeps all.
    #[arg(long, default_value_t = 0)]
    pub random_n: usize,

    #[arg(long, default_value_t = false)]
    pub shuffle: bool,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    #[arg(long, conflicts_with = "in_place", required_unless_present = "in_place")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub in_place: bool,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// `ID=TEXT` manual answer explanation; an empty text clears it.
    #[arg(long = "answer-reason")]
    pub answer_reasons: Vec<String>,

    /// `ID=TEXT` manual topic reason; an empty text clears it.
    #[arg(long = "topic-reason")]
    pub topic_reasons: Vec<String>,

    /// `ID=TEXT` manual maintenance reason; an empty text clears it.
    #[arg(long = "maintenance-reason")]
    pub maintenance_reasons: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ReplaceArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[arg(long = "find")]
    pub find: String,

    #[arg(long = "replace-with")]
    pub replace_with: String,

    #[command(flatten)]
    pub output: OutputArgs,
}
