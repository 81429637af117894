mod cli;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands};
use content_graph::config::ContentGraphConfig;
use content_graph::export::export_graph;
use content_graph::ingest::build_graph;
use content_graph::query::stats::repo_stats;
use output::{ShowReport, format_show, print_export_report, print_summary};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Index { path, json } => {
            let config = ContentGraphConfig::load(&path);
            let ingested = build_graph(&path, &config)?;
            print_summary(&ingested.stats, &repo_stats(&ingested.graph), json);
        }

        Commands::Show { id, path, format } => {
            let config = ContentGraphConfig::load(&path);
            let ingested = build_graph(&path, &config)?;
            let graph = &ingested.graph;
            let report = graph
                .index_of(&id)
                .and_then(|idx| ShowReport::collect(graph, idx))
                .with_context(|| format!("no content item with id '{id}'"))?;
            format_show(&report, &format, &path);
        }

        Commands::Export {
            path,
            output,
            marketplace,
            ids,
            json,
        } => {
            let config = ContentGraphConfig::load(&path);
            let marketplace = marketplace.or(config.marketplace);
            let ingested = build_graph(&path, &config)?;
            let report = export_graph(&ingested.graph, &output, marketplace, &ids);
            print_export_report(&report, &output, json);
            if !report.failures.is_empty() {
                anyhow::bail!("{} items failed to export", report.failures.len());
            }
        }
    }

    Ok(())
}

/// Log to stderr. `--verbose` forces debug; otherwise `RUST_LOG` applies, defaulting to info.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}
