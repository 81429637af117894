use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use content_graph::marketplace::Marketplace;

/// Content graph and export tool for security-content repositories.
///
/// content-graph indexes packs and their content items into a typed relationship
/// graph, and exports items under the file names the management server expects.
#[derive(Parser, Debug)]
#[command(
    name = "content-graph",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for query results.
#[derive(Clone, Debug, ValueEnum, Default)]
pub enum OutputFormat {
    /// Compact one-line-per-fact format (default).
    #[default]
    Compact,
    /// Human-readable columnar table with optional ANSI color when stdout is a terminal.
    Table,
    /// Structured JSON suitable for programmatic consumption.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a content repository and print graph statistics.
    Index {
        /// Path to the repository root.
        path: PathBuf,

        /// Output results as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },

    /// Show a content item: metadata, owning pack, dependencies, tests and dependents.
    Show {
        /// Content item id (for packs, the pack directory name).
        id: String,

        /// Path to the repository root.
        path: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Export content items under server file names.
    ///
    /// Items are written to `<output>/<pack>/<kind directory>/`. XSIAM reports and
    /// dashboards whose version range straddles the cutover are written twice, with
    /// and without the `external-` prefix.
    Export {
        /// Path to the repository root.
        path: PathBuf,

        /// Destination directory.
        #[arg(short, long)]
        output: PathBuf,

        /// Target marketplace; overrides `marketplace` from content-graph.toml.
        #[arg(long, value_enum)]
        marketplace: Option<Marketplace>,

        /// Export only these item ids (repeatable). Exports everything when absent.
        #[arg(long = "id")]
        ids: Vec<String>,

        /// Output the export report as JSON.
        #[arg(long)]
        json: bool,
    },
}
