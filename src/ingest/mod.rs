pub mod loader;

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ContentGraphConfig;
use crate::graph::ContentGraph;
use crate::graph::builder::GraphBuilder;
use crate::walker::walk_repository;

use loader::{LoadedItem, fallback_pack, load_item, load_pack};

/// Counters describing one ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub packs: usize,
    pub items: usize,
    pub relationships: usize,
    /// Definition files that could not be parsed and were left out.
    pub skipped: usize,
    /// Relationships dropped because their target is not in the repository.
    pub dropped_relationships: usize,
    pub elapsed_secs: f64,
}

/// A freshly built graph and the statistics of the run that built it.
#[derive(Debug)]
pub struct Ingested {
    pub graph: ContentGraph,
    pub stats: IngestStats,
}

/// Walk `root`, parse every definition and assemble the content graph.
///
/// Definitions are parsed in parallel and inserted in path order, so the resulting
/// graph is the same from run to run. Unparsable items are skipped with a warning; a
/// pack whose metadata cannot be read still gets a node so its items keep their owner.
pub fn build_graph(root: &Path, config: &ContentGraphConfig) -> anyhow::Result<Ingested> {
    let start = Instant::now();
    let discovery = walk_repository(root, config)?;

    let packs: Vec<_> = discovery
        .packs
        .par_iter()
        .map(|path| (path, load_pack(path)))
        .collect();
    let items: Vec<_> = discovery
        .definitions
        .par_iter()
        .map(|file| {
            let pack_id = file
                .pack_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            load_item(&file.path, file.content_type, &pack_id)
        })
        .collect();

    let mut stats = IngestStats::default();
    let mut builder = GraphBuilder::new();

    for (path, loaded) in packs {
        stats.packs += 1;
        match loaded {
            Ok(pack) => add_loaded(&mut builder, pack),
            Err(err) => {
                warn!("{err}; using an empty pack for {}", path.display());
                builder.add_node(fallback_pack(path));
            }
        }
    }
    for loaded in items {
        match loaded {
            Ok(item) => {
                stats.items += 1;
                add_loaded(&mut builder, item);
            }
            Err(err) => {
                warn!("skipping definition: {err}");
                stats.skipped += 1;
            }
        }
    }

    if config.ignore_unresolved_references {
        stats.dropped_relationships = builder.retain_resolvable().len();
    }

    let graph = builder
        .build()
        .with_context(|| format!("failed to build the content graph for {}", root.display()))?;
    stats.relationships = graph.edge_count();
    stats.elapsed_secs = start.elapsed().as_secs_f64();

    info!(
        "ingested {} packs and {} items ({} relationships) in {:.2}s",
        stats.packs, stats.items, stats.relationships, stats.elapsed_secs
    );
    Ok(Ingested { graph, stats })
}

fn add_loaded(builder: &mut GraphBuilder, loaded: LoadedItem) {
    builder.add_node(loaded.node);
    for relationship in loaded.relationships {
        builder.add_relationship(relationship);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edge::RelationshipKind;
    use crate::graph::node::ContentType;
    use crate::query::relations::{dependencies_of, owning_package, pack_items};
    use std::fs;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "Packs/Base/pack_metadata.json", r#"{"name": "Base"}"#);
        write(
            root,
            "Packs/Base/Scripts/Common/Common.yml",
            "commonfields:\n  id: Common\nname: Common\n",
        );
        write(
            root,
            "Packs/Cloud/pack_metadata.json",
            r#"{"name": "Cloud", "dependencies": {"Base": {"mandatory": true}}}"#,
        );
        write(
            root,
            "Packs/Cloud/Scripts/Hello/Hello.yml",
            "commonfields:\n  id: Hello\nname: Hello\ndependson:\n  must:\n  - Common\n",
        );
        write(
            root,
            "Packs/Cloud/XSIAMReports/report.json",
            r#"{"id": "cloud_report", "name": "Cloud Report"}"#,
        );
        dir
    }

    #[test]
    fn test_build_graph_links_items_and_packs() {
        let dir = repo();
        let ingested = build_graph(dir.path(), &ContentGraphConfig::default()).unwrap();
        let graph = &ingested.graph;

        assert_eq!(ingested.stats.packs, 2);
        assert_eq!(ingested.stats.items, 3);
        assert_eq!(ingested.stats.skipped, 0);
        assert_eq!(graph.node_count(), 5);
        // 3 IN_PACK + 1 USES + 1 DEPENDS_ON
        assert_eq!(graph.edge_count(), 5);
        assert_eq!(ingested.stats.relationships, 5);

        let hello = graph.index_of("Hello").unwrap();
        assert_eq!(owning_package(graph, hello).unwrap().object_id, "Cloud");

        let deps: Vec<_> = dependencies_of(graph, hello)
            .iter()
            .map(|r| graph.node(r.content_item).unwrap().object_id.clone())
            .collect();
        assert_eq!(deps, vec!["Common"]);

        let cloud = graph.index_of("Cloud").unwrap();
        assert_eq!(pack_items(graph, cloud).len(), 2);
        assert_eq!(graph.edges_by_kind()[&RelationshipKind::DependsOn], 1);
        assert_eq!(graph.nodes_by_type()[&ContentType::XsiamReport], 1);
    }

    #[test]
    fn test_unparsable_definitions_are_skipped() {
        let dir = repo();
        write(dir.path(), "Packs/Cloud/XSIAMReports/broken.json", "{ not json");
        let ingested = build_graph(dir.path(), &ContentGraphConfig::default()).unwrap();
        assert_eq!(ingested.stats.skipped, 1);
        assert_eq!(ingested.stats.items, 3);
    }

    #[test]
    fn test_broken_pack_metadata_still_owns_items() {
        let dir = repo();
        write(dir.path(), "Packs/Cloud/pack_metadata.json", "[1, 2]");
        let ingested = build_graph(dir.path(), &ContentGraphConfig::default()).unwrap();
        let graph = &ingested.graph;
        let report = graph.index_of("cloud_report").unwrap();
        assert_eq!(owning_package(graph, report).unwrap().object_id, "Cloud");
    }

    #[test]
    fn test_unresolved_reference_fails_unless_ignored() {
        let dir = repo();
        write(
            dir.path(),
            "Packs/Cloud/Scripts/Bye/Bye.yml",
            "commonfields:\n  id: Bye\nname: Bye\ndependson:\n  must:\n  - Builtin\n",
        );

        let err = build_graph(dir.path(), &ContentGraphConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("Builtin"), "{err:#}");

        let config = ContentGraphConfig {
            ignore_unresolved_references: true,
            ..Default::default()
        };
        let ingested = build_graph(dir.path(), &config).unwrap();
        assert_eq!(ingested.stats.dropped_relationships, 1);
        assert!(ingested.graph.index_of("Bye").is_some());
    }
}
