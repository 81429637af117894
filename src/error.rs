use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::export::model::ExportArtifact;
use crate::graph::edge::RelationshipKind;
use crate::graph::node::ContentType;

/// A version string that is not `MAJOR[.MINOR[.PATCH]]`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("invalid version string '{0}'")]
    Invalid(String),
    /// A fractional number such as `6.10`, which a parser reads as `6.1`.
    #[error("numeric version {0} is ambiguous; write it as a quoted string")]
    Unquoted(String),
}

/// Integrity violations detected while building a `ContentGraph`.
///
/// These are construction-time only: a graph that was built successfully never
/// produces them during traversal.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("{kind} relationship {source_id} -> {target_id} references unknown node '{missing}'")]
    DanglingEdge {
        kind: RelationshipKind,
        source_id: String,
        target_id: String,
        missing: String,
    },

    #[error("duplicate node id '{id}' ({} and {})", first.display(), second.display())]
    DuplicateNode {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Failure to read or interpret a content definition file.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{} is not a mapping at the top level", path.display())]
    NotAMapping { path: PathBuf },

    #[error("{} declares no id", path.display())]
    MissingId { path: PathBuf },

    #[error("{}: {source}", path.display())]
    Version {
        path: PathBuf,
        #[source]
        source: VersionError,
    },
}

/// The export stage during which a filesystem or serialization failure surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStep {
    CreateDestination,
    WritePrimary,
    CopySideAsset,
    RenameVariant,
    CopyVariant,
}

impl fmt::Display for ExportStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExportStep::CreateDestination => "create destination",
            ExportStep::WritePrimary => "write primary artifact",
            ExportStep::CopySideAsset => "copy side asset",
            ExportStep::RenameVariant => "rename variant",
            ExportStep::CopyVariant => "copy variant",
        };
        f.write_str(s)
    }
}

/// Failure of `export_node`.
///
/// Artifacts materialized before the failure are reported through [`ExportError::produced`]
/// and are left on disk.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{content_type} '{id}' cannot be exported")]
    NotExportable { id: String, content_type: ContentType },

    #[error("refusing to export '{id}' into its own source directory {}", dest.display())]
    DestinationIsSource { id: String, dest: PathBuf },

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("failed to serialize {}: {message}", path.display())]
    Serialize { path: PathBuf, message: String },

    #[error("{step} failed for {}: {source}", path.display())]
    Io {
        step: ExportStep,
        path: PathBuf,
        produced: Vec<ExportArtifact>,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Artifacts that exist on disk despite the failure.
    pub fn produced(&self) -> &[ExportArtifact] {
        match self {
            ExportError::Io { produced, .. } => produced,
            _ => &[],
        }
    }
}

/// Failure reported by a management API client. Never retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection to management API failed: {0}")]
    Connection(String),

    #[error("management API rejected credentials: {0}")]
    Unauthorized(String),

    #[error("management API rejected {}: status {status}: {message}", artifact.display())]
    Rejected {
        artifact: PathBuf,
        status: u16,
        message: String,
    },
}
