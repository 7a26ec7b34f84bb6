use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dast",
    about = "Semantic diff of syntax trees",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Which node kinds get a source-like rendering
    #[arg(long, global = true, default_value = "python")]
    pub layout: LayoutChoice,

    /// Print a one-line description of every change
    #[arg(long, global = true)]
    pub summary: bool,

    /// TOML file with `[diff]` and `[render]` tables
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Coloured source text
    Text,
    /// Source text with `[-removed-]` and `{+added+}` markers
    Markers,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LayoutChoice {
    Python,
    Generic,
}

#[derive(Subcommand)]
pub enum Command {
    /// Diff consecutive before/after pairs of JSON syntax trees
    Diff(DiffArgs),
    /// Print the structural fingerprint of a tree
    Fingerprint(FingerprintArgs),
    /// Print a tree as canonical source text
    Unparse(UnparseArgs),
}

#[derive(Args)]
pub struct DiffArgs {
    /// Tree files, read as before/after pairs
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    /// Extra field names to leave out of the comparison
    #[arg(long = "ignore", value_name = "FIELD")]
    pub ignore: Vec<String>,
    /// Report moved elements as removals and additions
    #[arg(long)]
    pub no_reorders: bool,
    /// Compare every field, positions included, with no move detection.
    /// Replaces the `[diff]` table of the config file
    #[arg(long)]
    pub strict: bool,
    /// Highlight elements that only moved
    #[arg(long)]
    pub show_moves: bool,
}

#[derive(Args)]
pub struct FingerprintArgs {
    pub path: PathBuf,
    /// Extra field names to leave out of the fingerprint
    #[arg(long = "ignore", value_name = "FIELD")]
    pub ignore: Vec<String>,
}

#[derive(Args)]
pub struct UnparseArgs {
    pub path: PathBuf,
}
