use serde::Serialize;

use crate::graph::{ContentGraph, edge::RelationshipKind, node::ContentType};
use crate::version::VersionBucket;

/// Aggregated repository statistics derived from the content graph.
#[derive(Debug, Serialize)]
pub struct RepoStats {
    pub node_count: usize,
    pub packs: usize,
    pub integrations: usize,
    pub scripts: usize,
    pub playbooks: usize,
    pub test_playbooks: usize,
    pub incident_types: usize,
    pub xsiam_reports: usize,
    pub xsiam_dashboards: usize,
    pub deprecated: usize,
    pub in_pack_edges: usize,
    pub uses_edges: usize,
    pub tested_by_edges: usize,
    pub depends_on_edges: usize,
    /// Items whose export produces both the prefixed and unprefixed variant.
    pub straddling_items: usize,
}

/// Compute repository statistics from a built `ContentGraph`.
pub fn repo_stats(graph: &ContentGraph) -> RepoStats {
    let by_type = graph.nodes_by_type();
    let by_kind = graph.edges_by_kind();
    let count_type = |ct: ContentType| *by_type.get(&ct).unwrap_or(&0);
    let count_kind = |k: RelationshipKind| *by_kind.get(&k).unwrap_or(&0);

    let mut deprecated = 0usize;
    let mut straddling_items = 0usize;
    for (_, node) in graph.nodes() {
        if node.deprecated {
            deprecated += 1;
        }
        if node.spec().version_fanout && node.version_bucket() == VersionBucket::Straddling {
            straddling_items += 1;
        }
    }

    RepoStats {
        node_count: graph.node_count(),
        packs: count_type(ContentType::Pack),
        integrations: count_type(ContentType::Integration),
        scripts: count_type(ContentType::Script),
        playbooks: count_type(ContentType::Playbook),
        test_playbooks: count_type(ContentType::TestPlaybook),
        incident_types: count_type(ContentType::IncidentType),
        xsiam_reports: count_type(ContentType::XsiamReport),
        xsiam_dashboards: count_type(ContentType::XsiamDashboard),
        deprecated,
        in_pack_edges: count_kind(RelationshipKind::InPack),
        uses_edges: count_kind(RelationshipKind::Uses),
        tested_by_edges: count_kind(RelationshipKind::TestedBy),
        depends_on_edges: count_kind(RelationshipKind::DependsOn),
        straddling_items,
    }
}
