pub mod builder;
pub mod edge;
pub mod node;

use std::collections::HashMap;

use petgraph::Directed;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};

use edge::{RelationshipData, RelationshipEdge, RelationshipKind};
use node::{ContentNode, ContentType};

/// The content graph: packs and content items as nodes, typed relationships as edges.
///
/// Built once through [`builder::GraphBuilder`], then only read. Every edge is indexed
/// by kind on both of its endpoints, so traversal in either direction is a single lookup.
#[derive(Debug, Clone)]
pub struct ContentGraph {
    graph: StableGraph<ContentNode, RelationshipEdge, Directed>,
    id_index: HashMap<String, NodeIndex>,
    /// Incident edges per (node, kind), in insertion order.
    incidence: HashMap<(NodeIndex, RelationshipKind), Vec<EdgeIndex>>,
}

impl ContentGraph {
    pub(crate) fn new() -> Self {
        Self {
            graph: StableGraph::new(),
            id_index: HashMap::new(),
            incidence: HashMap::new(),
        }
    }

    /// Insert a node. The caller guarantees the id is not already present.
    pub(crate) fn insert_node(&mut self, node: ContentNode) -> NodeIndex {
        let id = node.object_id.clone();
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        idx
    }

    /// Insert an edge and index it on both endpoints.
    ///
    /// This is the only place edges enter the graph, so the two endpoint indexes can
    /// never disagree. A self-loop is indexed once.
    pub(crate) fn insert_edge(
        &mut self,
        source: NodeIndex,
        target: NodeIndex,
        edge: RelationshipEdge,
    ) -> EdgeIndex {
        let kind = edge.kind;
        let e = self.graph.add_edge(source, target, edge);
        self.incidence.entry((source, kind)).or_default().push(e);
        if target != source {
            self.incidence.entry((target, kind)).or_default().push(e);
        }
        e
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&ContentNode> {
        self.graph.node_weight(idx)
    }

    pub fn get_by_id(&self, id: &str) -> Option<&ContentNode> {
        self.index_of(id).and_then(|idx| self.node(idx))
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.id_index.get(id).copied()
    }

    /// All edges of `kind` touching `idx`, from either direction, in insertion order.
    pub fn incident_edges(&self, idx: NodeIndex, kind: RelationshipKind) -> Vec<RelationshipData> {
        let Some(edges) = self.incidence.get(&(idx, kind)) else {
            return Vec::new();
        };
        edges
            .iter()
            .filter_map(|&e| {
                let (source, target) = self.graph.edge_endpoints(e)?;
                let weight = self.graph.edge_weight(e)?;
                let content_item = if source == idx { target } else { source };
                Some(RelationshipData {
                    kind,
                    source,
                    target,
                    content_item,
                    is_direct: weight.is_direct,
                    mandatory: weight.mandatory,
                })
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterate nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &ContentNode)> {
        self.graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx).map(|n| (idx, n)))
    }

    /// Count of nodes broken down by content type.
    pub fn nodes_by_type(&self) -> HashMap<ContentType, usize> {
        let mut map: HashMap<ContentType, usize> = HashMap::new();
        for (_, node) in self.nodes() {
            *map.entry(node.content_type()).or_insert(0) += 1;
        }
        map
    }

    /// Count of edges broken down by relationship kind.
    pub fn edges_by_kind(&self) -> HashMap<RelationshipKind, usize> {
        let mut map: HashMap<RelationshipKind, usize> = HashMap::new();
        for e in self.graph.edge_indices() {
            if let Some(weight) = self.graph.edge_weight(e) {
                *map.entry(weight.kind).or_insert(0) += 1;
            }
        }
        map
    }
}
