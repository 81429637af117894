//! Two-pass construction of a `ContentGraph`.
//!
//! Nodes and declared relationships are collected first; `build` then inserts every
//! node, validates every relationship endpoint, and inserts the edges. A graph that
//! builds successfully has no dangling edges.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::ContentGraph;
use super::edge::{RelationshipEdge, RelationshipKind};
use super::node::ContentNode;
use crate::error::GraphError;

/// A relationship as declared by a definition, referencing nodes by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredRelationship {
    pub kind: RelationshipKind,
    pub source_id: String,
    pub target_id: String,
    pub is_direct: bool,
    pub mandatory: bool,
}

impl DeclaredRelationship {
    pub fn new(kind: RelationshipKind, source_id: &str, target_id: &str) -> Self {
        Self {
            kind,
            source_id: source_id.to_owned(),
            target_id: target_id.to_owned(),
            is_direct: true,
            mandatory: false,
        }
    }

    pub fn mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }
}

/// Collects nodes and relationships, then builds a validated `ContentGraph`.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<ContentNode>,
    relationships: Vec<DeclaredRelationship>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: ContentNode) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn add_relationship(&mut self, relationship: DeclaredRelationship) -> &mut Self {
        self.relationships.push(relationship);
        self
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Drop relationships whose endpoints are not among the collected nodes.
    ///
    /// Returns the dropped relationships. Each one is logged.
    pub fn retain_resolvable(&mut self) -> Vec<DeclaredRelationship> {
        let known: std::collections::HashSet<&str> =
            self.nodes.iter().map(|n| n.object_id.as_str()).collect();
        let (kept, dropped): (Vec<_>, Vec<_>) = self
            .relationships
            .drain(..)
            .partition(|r| known.contains(r.source_id.as_str()) && known.contains(r.target_id.as_str()));
        for r in &dropped {
            warn!(
                "dropping unresolved {} relationship {} -> {}",
                r.kind, r.source_id, r.target_id
            );
        }
        self.relationships = kept;
        dropped
    }

    /// Build the graph.
    ///
    /// Fails on the first duplicate node id or dangling relationship endpoint. Items
    /// declared in more than one pack are logged once here; queries then use the first.
    pub fn build(self) -> Result<ContentGraph, GraphError> {
        let mut graph = ContentGraph::new();

        for node in self.nodes {
            if let Some(existing) = graph.index_of(&node.object_id) {
                let first = graph
                    .node(existing)
                    .map(|n| n.path.clone())
                    .unwrap_or_default();
                return Err(GraphError::DuplicateNode {
                    id: node.object_id,
                    first,
                    second: node.path,
                });
            }
            graph.insert_node(node);
        }

        let mut pack_edges: HashMap<String, usize> = HashMap::new();
        for r in self.relationships {
            let resolve = |id: &str| {
                graph.index_of(id).ok_or_else(|| GraphError::DanglingEdge {
                    kind: r.kind,
                    source_id: r.source_id.clone(),
                    target_id: r.target_id.clone(),
                    missing: id.to_owned(),
                })
            };
            let source = resolve(&r.source_id)?;
            let target = resolve(&r.target_id)?;

            if r.kind == RelationshipKind::InPack {
                let count = pack_edges.entry(r.source_id.clone()).or_insert(0);
                *count += 1;
                if *count == 2 {
                    warn!(
                        "'{}' is declared in more than one pack; using the first",
                        r.source_id
                    );
                }
            }

            let edge = RelationshipEdge::new(r.kind)
                .direct(r.is_direct)
                .mandatory(r.mandatory);
            graph.insert_edge(source, target, edge);
        }

        debug!(
            "built content graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }
}
