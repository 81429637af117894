use std::fmt;

use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};

/// The kind of directed relationship between two content nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipKind {
    /// Item -> Pack: the item is shipped inside the pack.
    InPack,
    /// Item -> Item: the source needs the target at runtime.
    /// `mandatory` is false when the source can run without it.
    Uses,
    /// Item -> TestPlaybook: the target exercises the source.
    TestedBy,
    /// Pack -> Pack: a dependency declared in pack metadata.
    DependsOn,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::InPack => "IN_PACK",
            RelationshipKind::Uses => "USES",
            RelationshipKind::TestedBy => "TESTED_BY",
            RelationshipKind::DependsOn => "DEPENDS_ON",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge weight stored in the content graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub kind: RelationshipKind,
    /// False when the relationship was inferred through another item.
    pub is_direct: bool,
    /// Meaningful for `Uses` and `DependsOn` only.
    pub mandatory: bool,
}

impl RelationshipEdge {
    pub fn new(kind: RelationshipKind) -> Self {
        Self {
            kind,
            is_direct: true,
            mandatory: false,
        }
    }

    pub fn mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }

    pub fn direct(mut self, is_direct: bool) -> Self {
        self.is_direct = is_direct;
        self
    }
}

/// One incident edge seen from a particular node.
///
/// `content_item` is the endpoint that is *not* the node under query (for a self-loop,
/// both endpoints are the node). Callers that only want one direction compare it
/// against `source` or `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipData {
    pub kind: RelationshipKind,
    pub source: NodeIndex,
    pub target: NodeIndex,
    pub content_item: NodeIndex,
    pub is_direct: bool,
    pub mandatory: bool,
}

impl RelationshipData {
    /// True when the related item is the edge target, i.e. the edge leaves the queried node.
    pub fn is_outgoing(&self) -> bool {
        self.content_item == self.target
    }

    /// True when the related item is the edge source, i.e. the edge arrives at the queried node.
    pub fn is_incoming(&self) -> bool {
        self.content_item == self.source
    }
}
