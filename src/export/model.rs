use std::path::PathBuf;

use serde::Serialize;

/// What an exported file is, relative to the node it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRole {
    /// The serialized definition (or one of its two name variants).
    Primary,
    /// A sibling file copied alongside the definition, such as a report preview image.
    SideAsset,
}

/// One physical file produced by an export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportArtifact {
    pub path: PathBuf,
    /// Whether the file name carries the `external-` prefix.
    pub external: bool,
    pub role: ArtifactRole,
}

impl ExportArtifact {
    pub fn primary(path: PathBuf, external: bool) -> Self {
        Self {
            path,
            external,
            role: ArtifactRole::Primary,
        }
    }

    pub fn side_asset(path: PathBuf) -> Self {
        Self {
            path,
            external: false,
            role: ArtifactRole::SideAsset,
        }
    }
}

/// Artifacts produced for one node, with the identity the target marketplace sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeExport {
    /// Id of the node in the graph.
    pub id: String,
    /// Id written to the exported definition (`id_x2` outside `xsoar`).
    pub exported_id: String,
    /// Name written to the exported definition (`name_x2` outside `xsoar`).
    pub exported_name: String,
    /// Empty when the node is not valid for the target marketplace.
    pub artifacts: Vec<ExportArtifact>,
}

/// A node whose export failed. `produced` lists files that were written before the failure.
#[derive(Debug, Serialize)]
pub struct NodeFailure {
    pub id: String,
    pub error: String,
    pub produced: Vec<ExportArtifact>,
}

/// Result of exporting many nodes. Failures do not stop the remaining nodes.
#[derive(Debug, Default, Serialize)]
pub struct ExportReport {
    pub exported: Vec<NodeExport>,
    pub failures: Vec<NodeFailure>,
    /// Nodes skipped because they are packs or not valid for the target marketplace.
    pub skipped: usize,
}

impl ExportReport {
    pub fn artifact_count(&self) -> usize {
        self.exported.iter().map(|e| e.artifacts.len()).sum()
    }
}
