//! Boundary to the remote management API.
//!
//! The export pipeline never talks to the network itself. Callers supply a
//! [`ManagementClient`]; [`export_and_upload`] writes the artifacts locally first and
//! only then hands each primary artifact to the client.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::TransportError;
use crate::export::export_node;
use crate::export::model::{ArtifactRole, ExportArtifact};
use crate::graph::node::{ContentNode, ContentType};
use crate::marketplace::Marketplace;

/// What happened to one artifact at the upload boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadOutcome {
    /// The client accepted the artifact and returned a message.
    Imported(String),
    /// The kind has no import endpoint yet; nothing was sent.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    /// Id of the item as the target marketplace knows it.
    pub content_id: String,
    pub artifact: PathBuf,
    pub outcome: UploadOutcome,
}

/// A management API client able to import one exported artifact at a time.
pub trait ManagementClient {
    /// Import the artifact at `path` as content of kind `content_type`.
    fn import_content(
        &self,
        content_type: ContentType,
        path: &Path,
    ) -> Result<String, TransportError>;
}

/// Hand one exported artifact of `node` to `client`. `content_id` is the id written
/// into the artifact, which differs from the node id when a marketplace alias applies.
///
/// XSIAM reports have no import endpoint yet: their upload is a no-op and reports
/// [`UploadOutcome::Skipped`].
pub fn upload_artifact(
    client: &dyn ManagementClient,
    node: &ContentNode,
    content_id: &str,
    artifact: &ExportArtifact,
) -> Result<UploadResult, TransportError> {
    let outcome = match node.content_type() {
        ContentType::XsiamReport => {
            debug!("no import endpoint for xsiam reports, skipping {}", artifact.path.display());
            UploadOutcome::Skipped
        }
        content_type => UploadOutcome::Imported(client.import_content(content_type, &artifact.path)?),
    };
    Ok(UploadResult {
        content_id: content_id.to_owned(),
        artifact: artifact.path.clone(),
        outcome,
    })
}

/// Export `node` into `dest`, then upload every primary artifact.
///
/// A transport error stops the upload and is returned; the local artifacts written by
/// the export stay on disk.
pub fn export_and_upload(
    client: &dyn ManagementClient,
    node: &ContentNode,
    dest: &Path,
    marketplace: Option<Marketplace>,
) -> anyhow::Result<Vec<UploadResult>> {
    let export = export_node(node, dest, marketplace)
        .with_context(|| format!("failed to export '{}'", node.object_id))?;

    let mut results = Vec::new();
    for artifact in export
        .artifacts
        .iter()
        .filter(|a| a.role == ArtifactRole::Primary)
    {
        let result = upload_artifact(client, node, &export.exported_id, artifact)
            .with_context(|| format!("failed to upload {}", artifact.path.display()))?;
        results.push(result);
    }
    info!("uploaded {} artifacts for '{}'", results.len(), node.object_id);
    Ok(results)
}
