use petgraph::stable_graph::NodeIndex;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::graph::ContentGraph;
use crate::graph::edge::{RelationshipData, RelationshipKind};
use crate::graph::node::ContentNode;

/// The pack that contains `idx`.
///
/// Follows the `IN_PACK` edge leaving the node. With more than one such edge the first
/// in insertion order wins, so repeated calls always agree.
pub fn owning_package(graph: &ContentGraph, idx: NodeIndex) -> Option<&ContentNode> {
    let packs: Vec<RelationshipData> = graph
        .incident_edges(idx, RelationshipKind::InPack)
        .into_iter()
        .filter(RelationshipData::is_outgoing)
        .collect();

    if packs.len() > 1 {
        warn!(
            "ambiguous ownership for '{}': {} IN_PACK edges, using the first",
            node_id(graph, idx),
            packs.len()
        );
    }

    let first = packs.first()?;
    graph.node(first.content_item)
}

/// Items `idx` uses, with whether each use is mandatory.
///
/// Only edges leaving `idx` count; the reverse side of the symmetric index is skipped.
pub fn dependencies_of(graph: &ContentGraph, idx: NodeIndex) -> Vec<RelationshipData> {
    graph
        .incident_edges(idx, RelationshipKind::Uses)
        .into_iter()
        .filter(RelationshipData::is_outgoing)
        .collect()
}

/// Items that use `idx`.
pub fn used_by(graph: &ContentGraph, idx: NodeIndex) -> Vec<RelationshipData> {
    graph
        .incident_edges(idx, RelationshipKind::Uses)
        .into_iter()
        .filter(RelationshipData::is_incoming)
        .collect()
}

/// Test playbooks that exercise `idx`.
pub fn tests_of(graph: &ContentGraph, idx: NodeIndex) -> Vec<&ContentNode> {
    graph
        .incident_edges(idx, RelationshipKind::TestedBy)
        .into_iter()
        .filter(RelationshipData::is_outgoing)
        .filter_map(|r| graph.node(r.content_item))
        .collect()
}

/// Items contained in the pack `pack_idx`.
pub fn pack_items(graph: &ContentGraph, pack_idx: NodeIndex) -> Vec<&ContentNode> {
    graph
        .incident_edges(pack_idx, RelationshipKind::InPack)
        .into_iter()
        .filter(|r| r.is_incoming() && r.source != pack_idx)
        .filter_map(|r| graph.node(r.content_item))
        .collect()
}

/// Packs the pack `pack_idx` depends on.
pub fn pack_dependencies(graph: &ContentGraph, pack_idx: NodeIndex) -> Vec<RelationshipData> {
    graph
        .incident_edges(pack_idx, RelationshipKind::DependsOn)
        .into_iter()
        .filter(RelationshipData::is_outgoing)
        .collect()
}

/// Metadata summary of a node, including the id of its owning pack.
pub fn summary(graph: &ContentGraph, idx: NodeIndex) -> Option<Value> {
    let node = graph.node(idx)?;
    let pack = owning_package(graph, idx).map(|p| p.object_id.clone());
    let marketplaces: Vec<&str> = node.marketplaces.iter().map(|m| m.as_str()).collect();
    debug!("summarizing '{}'", node.object_id);
    Some(json!({
        "id": node.object_id,
        "name": node.name,
        "display_name": node.display_name,
        "content_type": node.content_type().as_str(),
        "file_path": node.path.to_string_lossy(),
        "fromversion": node.from_version.to_string(),
        "toversion": node.to_version.to_string(),
        "marketplaces": marketplaces,
        "deprecated": node.deprecated,
        "is_test": node.is_test,
        "description": node.description,
        "pack": pack,
    }))
}

fn node_id(graph: &ContentGraph, idx: NodeIndex) -> &str {
    graph.node(idx).map(|n| n.object_id.as_str()).unwrap_or("<unknown>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::{DeclaredRelationship, GraphBuilder};
    use crate::graph::node::tests::sample_node;
    use crate::graph::node::{NodeKind, PackInfo, PlaybookInfo, ScriptInfo};

    /// Pack `P` holds scripts `s1`, `s2` and test playbook `t1`;
    /// `s1` uses `s2` (mandatory) and `s3` (optional), and is tested by `t1`.
    fn fixture() -> ContentGraph {
        let mut b = GraphBuilder::new();
        b.add_node(sample_node("P", NodeKind::Pack(PackInfo::default())))
            .add_node(sample_node("Q", NodeKind::Pack(PackInfo::default())))
            .add_node(sample_node("s1", NodeKind::Script(ScriptInfo::default())))
            .add_node(sample_node("s2", NodeKind::Script(ScriptInfo::default())))
            .add_node(sample_node("s3", NodeKind::Script(ScriptInfo::default())))
            .add_node(sample_node("t1", NodeKind::TestPlaybook(PlaybookInfo::default())));
        for (item, pack) in [("s1", "P"), ("s2", "P"), ("t1", "P"), ("s3", "Q")] {
            b.add_relationship(DeclaredRelationship::new(RelationshipKind::InPack, item, pack));
        }
        b.add_relationship(
            DeclaredRelationship::new(RelationshipKind::Uses, "s1", "s2").mandatory(true),
        )
        .add_relationship(DeclaredRelationship::new(RelationshipKind::Uses, "s1", "s3"))
        .add_relationship(DeclaredRelationship::new(RelationshipKind::TestedBy, "s1", "t1"))
        .add_relationship(
            DeclaredRelationship::new(RelationshipKind::DependsOn, "P", "Q").mandatory(true),
        );
        b.build().unwrap()
    }

    fn idx(graph: &ContentGraph, id: &str) -> NodeIndex {
        graph.index_of(id).unwrap()
    }

    #[test]
    fn test_owning_package() {
        let g = fixture();
        assert_eq!(owning_package(&g, idx(&g, "s1")).unwrap().object_id, "P");
        assert_eq!(owning_package(&g, idx(&g, "s3")).unwrap().object_id, "Q");
        assert!(owning_package(&g, idx(&g, "P")).is_none(), "packs are not in a pack");
    }

    #[test]
    fn test_owning_package_ambiguous_is_deterministic() {
        let mut b = GraphBuilder::new();
        b.add_node(sample_node("P", NodeKind::Pack(PackInfo::default())))
            .add_node(sample_node("Q", NodeKind::Pack(PackInfo::default())))
            .add_node(sample_node("s", NodeKind::Script(ScriptInfo::default())))
            .add_relationship(DeclaredRelationship::new(RelationshipKind::InPack, "s", "Q"))
            .add_relationship(DeclaredRelationship::new(RelationshipKind::InPack, "s", "P"));
        let g = b.build().unwrap();
        let s = idx(&g, "s");
        for _ in 0..5 {
            assert_eq!(owning_package(&g, s).unwrap().object_id, "Q");
        }
    }

    #[test]
    fn test_dependencies_only_follow_outgoing_edges() {
        let g = fixture();
        let deps = dependencies_of(&g, idx(&g, "s1"));
        let found: Vec<(&str, bool)> = deps
            .iter()
            .map(|r| (g.node(r.content_item).unwrap().object_id.as_str(), r.mandatory))
            .collect();
        assert_eq!(found, vec![("s2", true), ("s3", false)]);

        // s2 is only used, it uses nothing.
        assert!(dependencies_of(&g, idx(&g, "s2")).is_empty());
    }

    #[test]
    fn test_used_by_is_the_reverse_of_dependencies() {
        let g = fixture();
        let users = used_by(&g, idx(&g, "s3"));
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].content_item, idx(&g, "s1"));
        assert!(used_by(&g, idx(&g, "s1")).is_empty());
    }

    #[test]
    fn test_tests_of() {
        let g = fixture();
        let tests: Vec<&str> = tests_of(&g, idx(&g, "s1"))
            .iter()
            .map(|n| n.object_id.as_str())
            .collect();
        assert_eq!(tests, vec!["t1"]);
        // The test playbook sees the incoming edge but is not tested by s1.
        assert!(tests_of(&g, idx(&g, "t1")).is_empty());
    }

    #[test]
    fn test_pack_items_and_dependencies() {
        let g = fixture();
        let mut items: Vec<&str> = pack_items(&g, idx(&g, "P"))
            .iter()
            .map(|n| n.object_id.as_str())
            .collect();
        items.sort();
        assert_eq!(items, vec!["s1", "s2", "t1"]);

        let deps = pack_dependencies(&g, idx(&g, "P"));
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].content_item, idx(&g, "Q"));
        assert!(deps[0].mandatory);
        assert!(pack_dependencies(&g, idx(&g, "Q")).is_empty());
    }

    #[test]
    fn test_empty_results_for_unrelated_nodes() {
        let g = fixture();
        let s2 = idx(&g, "s2");
        assert!(tests_of(&g, s2).is_empty());
        assert!(pack_dependencies(&g, s2).is_empty());
    }

    #[test]
    fn test_summary_includes_pack() {
        let g = fixture();
        let s = summary(&g, idx(&g, "s1")).unwrap();
        assert_eq!(s["id"], "s1");
        assert_eq!(s["pack"], "P");
        assert_eq!(s["content_type"], "script");
        assert_eq!(s["toversion"], "99.99.99");
    }
}
