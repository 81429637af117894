use std::io::IsTerminal;
use std::path::Path;

use petgraph::stable_graph::NodeIndex;
use serde::Serialize;
use serde_json::Value;

use content_graph::export::model::ExportReport;
use content_graph::graph::ContentGraph;
use content_graph::graph::edge::RelationshipData;
use content_graph::ingest::IngestStats;
use content_graph::query::relations::{
    dependencies_of, pack_dependencies, pack_items, summary, tests_of, used_by,
};
use content_graph::query::stats::RepoStats;
use content_graph::version::CUTOVER_VERSION;

use crate::cli::OutputFormat;

/// Print a summary of the indexing run.
///
/// - `json = true`: emit a pretty-printed JSON object to stdout.
/// - `json = false`: emit a cargo-style human-readable summary to stdout.
///
/// If definitions were skipped, a warning line is written to **stderr** so that
/// the stdout stream remains clean for downstream JSON consumers.
pub fn print_summary(ingest: &IngestStats, graph: &RepoStats, json: bool) {
    if json {
        let summary = serde_json::json!({ "ingest": ingest, "graph": graph });
        match serde_json::to_string_pretty(&summary) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serialising stats: {}", e),
        }
        return;
    }

    println!(
        "Indexed {} packs and {} items in {:.2}s",
        ingest.packs, ingest.items, ingest.elapsed_secs
    );
    println!(
        "  {} integrations, {} scripts, {} playbooks, {} test playbooks, {} incident types",
        graph.integrations,
        graph.scripts,
        graph.playbooks,
        graph.test_playbooks,
        graph.incident_types,
    );
    println!(
        "  {} XSIAM reports, {} XSIAM dashboards ({} straddle {})",
        graph.xsiam_reports, graph.xsiam_dashboards, graph.straddling_items, CUTOVER_VERSION,
    );
    println!(
        "  {} relationships ({} IN_PACK, {} USES, {} TESTED_BY, {} DEPENDS_ON)",
        ingest.relationships,
        graph.in_pack_edges,
        graph.uses_edges,
        graph.tested_by_edges,
        graph.depends_on_edges,
    );
    if graph.deprecated > 0 {
        println!("  {} deprecated items", graph.deprecated);
    }

    if ingest.dropped_relationships > 0 {
        eprintln!(
            "  {} unresolved relationships dropped",
            ingest.dropped_relationships
        );
    }
    if ingest.skipped > 0 {
        eprintln!("  {} definitions skipped (parse errors)", ingest.skipped);
    }
}

/// A related item as shown by `show`.
#[derive(Debug, Serialize)]
pub struct Related {
    pub id: String,
    pub mandatory: bool,
}

/// Everything `show` prints about one node.
#[derive(Debug, Serialize)]
pub struct ShowReport {
    pub item: Value,
    pub uses: Vec<Related>,
    pub used_by: Vec<Related>,
    pub tested_by: Vec<String>,
    /// Only populated for packs.
    pub items: Vec<String>,
    /// Only populated for packs.
    pub depends_on: Vec<Related>,
}

impl ShowReport {
    pub fn collect(graph: &ContentGraph, idx: NodeIndex) -> Option<Self> {
        let related = |edges: Vec<RelationshipData>| -> Vec<Related> {
            edges
                .iter()
                .filter_map(|r| {
                    graph.node(r.content_item).map(|n| Related {
                        id: n.object_id.clone(),
                        mandatory: r.mandatory,
                    })
                })
                .collect()
        };
        Some(Self {
            item: summary(graph, idx)?,
            uses: related(dependencies_of(graph, idx)),
            used_by: related(used_by(graph, idx)),
            tested_by: tests_of(graph, idx)
                .iter()
                .map(|n| n.object_id.clone())
                .collect(),
            items: pack_items(graph, idx)
                .iter()
                .map(|n| n.object_id.clone())
                .collect(),
            depends_on: related(pack_dependencies(graph, idx)),
        })
    }

    fn field(&self, key: &str) -> String {
        match self.item.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "-".to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// (label, value) rows shared by the compact and table formats.
    fn rows(&self, project_root: &Path) -> Vec<(&'static str, String)> {
        let raw = self.field("file_path");
        let file = Path::new(&raw)
            .strip_prefix(project_root)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| raw.clone());
        let mut rows = vec![
            ("id", self.field("id")),
            ("type", self.field("content_type")),
            ("name", self.field("display_name")),
            ("file", file),
            ("pack", self.field("pack")),
            (
                "versions",
                format!("{}..{}", self.field("fromversion"), self.field("toversion")),
            ),
        ];
        if !self.uses.is_empty() {
            rows.push(("uses", join_related(&self.uses)));
        }
        if !self.used_by.is_empty() {
            rows.push(("used by", join_related(&self.used_by)));
        }
        if !self.tested_by.is_empty() {
            rows.push(("tested by", self.tested_by.join(", ")));
        }
        if !self.items.is_empty() {
            rows.push(("items", self.items.join(", ")));
        }
        if !self.depends_on.is_empty() {
            rows.push(("depends on", join_related(&self.depends_on)));
        }
        rows
    }
}

fn join_related(related: &[Related]) -> String {
    related
        .iter()
        .map(|r| {
            if r.mandatory {
                format!("{} (mandatory)", r.id)
            } else {
                r.id.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format and print a `show` result to stdout according to the selected output format.
pub fn format_show(report: &ShowReport, format: &OutputFormat, project_root: &Path) {
    match format {
        OutputFormat::Compact => {
            for (label, value) in report.rows(project_root) {
                println!("{} {}", label.replace(' ', "_"), value);
            }
        }

        OutputFormat::Table => {
            let use_color = std::io::stdout().is_terminal();
            let rows = report.rows(project_root);
            let label_w = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(5).max(5);

            if use_color {
                println!("\x1b[1m{:<label_w$}  {}\x1b[0m", "FIELD", "VALUE");
            } else {
                println!("{:<label_w$}  {}", "FIELD", "VALUE");
            }
            println!("{}", "-".repeat(label_w + 7));
            for (label, value) in rows {
                println!("{:<label_w$}  {}", label, value);
            }
        }

        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(report).unwrap_or_default()
            );
        }
    }
}

/// Print an export report. Failures always go to stderr.
pub fn print_export_report(report: &ExportReport, dest: &Path, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serialising export report: {}", e),
        }
    } else {
        println!(
            "Exported {} artifacts for {} items to {} ({} skipped)",
            report.artifact_count(),
            report.exported.len(),
            dest.display(),
            report.skipped
        );
        for export in &report.exported {
            for artifact in &export.artifacts {
                let rel = artifact.path.strip_prefix(dest).unwrap_or(&artifact.path);
                println!("  {}", rel.display());
            }
        }
    }

    for failure in &report.failures {
        eprintln!("  failed {}: {}", failure.id, failure.error);
    }
}
