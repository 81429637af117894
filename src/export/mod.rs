pub mod model;
pub mod naming;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::definition::alternate_item_fields;
use crate::error::{ExportError, ExportStep};
use crate::graph::ContentGraph;
use crate::graph::node::ContentNode;
use crate::marketplace::Marketplace;
use crate::query::relations::owning_package;
use crate::version::VersionBucket;

use model::{ExportArtifact, ExportReport, NodeExport, NodeFailure};

/// Directory used for items that have no owning pack during a repository export.
const UNPACKED_DIR: &str = "_unpacked";

/// Export one content node into `dest`.
///
/// Steps:
/// 1. Skip nodes that are not valid for `marketplace` (returns no artifacts).
/// 2. Refuse a `dest` that is the directory holding the definition itself.
/// 3. Write the definition under its normalized name, applying `_x2` aliases for
///    marketplaces other than `xsoar`.
/// 4. Copy the sibling side asset, if the kind has one and it exists.
/// 5. For kinds with version fan-out, rename the primary to the variant its version
///    range calls for, or copy it to the second variant when the range straddles the
///    cutover.
///
/// Every returned path exists on disk. On failure the error carries the artifacts that
/// were already written; they are not removed.
pub fn export_node(
    node: &ContentNode,
    dest: &Path,
    marketplace: Option<Marketplace>,
) -> Result<NodeExport, ExportError> {
    let spec = node.spec();
    if !spec.exportable {
        return Err(ExportError::NotExportable {
            id: node.object_id.clone(),
            content_type: node.content_type(),
        });
    }
    if let Some(mp) = marketplace
        && !node.is_valid_for(mp)
    {
        debug!("skipping '{}': not valid for {}", node.object_id, mp);
        return Ok(NodeExport {
            id: node.object_id.clone(),
            exported_id: node.object_id.clone(),
            exported_name: node.name.clone(),
            artifacts: Vec::new(),
        });
    }
    if is_source_directory(dest, &node.path) {
        return Err(ExportError::DestinationIsSource {
            id: node.object_id.clone(),
            dest: dest.to_path_buf(),
        });
    }

    let mut produced: Vec<ExportArtifact> = Vec::new();

    std::fs::create_dir_all(dest)
        .map_err(|source| io_error(ExportStep::CreateDestination, dest, &produced, source))?;

    let (primary, identity) = write_primary(node, dest, marketplace)?;
    produced.push(primary);

    if let Some(suffix) = spec.side_asset_suffix
        && let Some(asset) = naming::side_asset_path(&node.path, suffix)
    {
        produced.push(copy_side_asset(&asset, dest, &produced)?);
    }

    if spec.version_fanout {
        apply_version_bucket(node.version_bucket(), &mut produced)?;
    }

    Ok(NodeExport {
        id: node.object_id.clone(),
        exported_id: identity.object_id,
        exported_name: identity.name,
        artifacts: produced,
    })
}

/// Export every exportable node of `graph` (or only `ids`, when non-empty) into
/// `dest/<pack id>/<kind directory>/`.
///
/// A failing node is recorded in the report and does not stop the others.
pub fn export_graph(
    graph: &ContentGraph,
    dest: &Path,
    marketplace: Option<Marketplace>,
    ids: &[String],
) -> ExportReport {
    let mut report = ExportReport::default();

    let selected: Vec<_> = if ids.is_empty() {
        graph.nodes().map(|(idx, _)| idx).collect()
    } else {
        let mut found = Vec::new();
        for id in ids {
            match graph.index_of(id) {
                Some(idx) => found.push(idx),
                None => report.failures.push(NodeFailure {
                    id: id.clone(),
                    error: format!("no content item with id '{id}'"),
                    produced: Vec::new(),
                }),
            }
        }
        found
    };

    for idx in selected {
        let Some(node) = graph.node(idx) else {
            continue;
        };
        if !node.spec().exportable {
            report.skipped += 1;
            continue;
        }

        let pack_dir = owning_package(graph, idx)
            .map(|p| p.object_id.clone())
            .unwrap_or_else(|| UNPACKED_DIR.to_owned());
        let node_dest = dest.join(pack_dir).join(node.spec().dir_name);

        match export_node(node, &node_dest, marketplace) {
            Ok(export) if export.artifacts.is_empty() => report.skipped += 1,
            Ok(export) => report.exported.push(export),
            Err(err) => {
                warn!("export of '{}' failed: {}", node.object_id, err);
                report.failures.push(NodeFailure {
                    id: node.object_id.clone(),
                    error: err.to_string(),
                    produced: err.produced().to_vec(),
                });
            }
        }
    }

    info!(
        "exported {} artifacts for {} items ({} skipped, {} failed)",
        report.artifact_count(),
        report.exported.len(),
        report.skipped,
        report.failures.len()
    );
    report
}

/// Serialize the definition under its normalized name. Returns the artifact and the
/// node as the target marketplace sees it.
fn write_primary(
    node: &ContentNode,
    dest: &Path,
    marketplace: Option<Marketplace>,
) -> Result<(ExportArtifact, ContentNode), ExportError> {
    let mut data = node.data()?;
    let identity = node.for_marketplace(marketplace, &data);
    if marketplace.is_some_and(|mp| mp.uses_aliases()) {
        alternate_item_fields(&mut data);
    }

    let file_name = node
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.json", node.object_id));
    let target = dest.join(naming::normalize_name(&file_name, node.content_type()));

    let rendered = node
        .format()
        .render(&data)
        .map_err(|message| ExportError::Serialize {
            path: target.clone(),
            message,
        })?;
    std::fs::write(&target, rendered)
        .map_err(|source| io_error(ExportStep::WritePrimary, &target, &[], source))?;

    debug!(
        "wrote '{}' ({}) to {}",
        identity.object_id,
        identity.name,
        target.display()
    );
    let external = is_external_path(&target);
    Ok((ExportArtifact::primary(target, external), identity))
}

/// Whether `dest` is the directory that holds `definition`. Exporting there would
/// overwrite or move the source files.
fn is_source_directory(dest: &Path, definition: &Path) -> bool {
    let parent = match definition.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (dest.canonicalize(), parent.canonicalize()) {
        (Ok(dest), Ok(parent)) => dest == parent,
        _ => false,
    }
}

fn copy_side_asset(
    asset: &Path,
    dest: &Path,
    produced: &[ExportArtifact],
) -> Result<ExportArtifact, ExportError> {
    let target = match asset.file_name() {
        Some(name) => dest.join(name),
        None => dest.to_path_buf(),
    };
    std::fs::copy(asset, &target)
        .map_err(|source| io_error(ExportStep::CopySideAsset, &target, produced, source))?;
    Ok(ExportArtifact::side_asset(target))
}

/// Bring the primary artifact (always `produced[0]`) in line with the version bucket.
fn apply_version_bucket(
    bucket: VersionBucket,
    produced: &mut Vec<ExportArtifact>,
) -> Result<(), ExportError> {
    let Some(primary) = produced.first().cloned() else {
        return Ok(());
    };
    let Some(variant) = naming::toggled_variant(&primary.path) else {
        return Ok(());
    };

    match bucket {
        VersionBucket::ModernOnly | VersionBucket::LegacyOnly => {
            let wants_external = bucket == VersionBucket::ModernOnly;
            if primary.external == wants_external {
                return Ok(());
            }
            std::fs::rename(&primary.path, &variant).map_err(|source| {
                io_error(ExportStep::RenameVariant, &variant, produced, source)
            })?;
            debug!(
                "renamed {} to {}",
                primary.path.display(),
                variant.display()
            );
            produced[0] = ExportArtifact::primary(variant, wants_external);
        }
        VersionBucket::Straddling => {
            std::fs::copy(&primary.path, &variant).map_err(|source| {
                io_error(ExportStep::CopyVariant, &variant, produced, source)
            })?;
            produced.push(ExportArtifact::primary(variant, !primary.external));
        }
    }
    Ok(())
}

fn is_external_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(naming::is_external)
}

fn io_error(
    step: ExportStep,
    path: &Path,
    produced: &[ExportArtifact],
    source: std::io::Error,
) -> ExportError {
    ExportError::Io {
        step,
        path: PathBuf::from(path),
        produced: produced.to_vec(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::{DeclaredRelationship, GraphBuilder};
    use crate::graph::edge::RelationshipKind;
    use crate::graph::node::tests::sample_node;
    use crate::graph::node::{NodeKind, PackInfo, ScriptInfo};
    use crate::version::Version;
    use model::ArtifactRole;
    use std::fs;
    use tempfile::TempDir;

    const REPORT_JSON: &str = r#"{"id": "cloud_report", "name": "Cloud Report", "name_x2": "Cloud Report v2"}"#;

    struct Fixture {
        _dir: TempDir,
        src: PathBuf,
        out: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let out = dir.path().join("out");
        fs::create_dir_all(&src).unwrap();
        Fixture {
            _dir: dir,
            src,
            out,
        }
    }

    fn report_node(fx: &Fixture, file: &str, from: &str, to: &str) -> ContentNode {
        let path = fx.src.join(file);
        fs::write(&path, REPORT_JSON).unwrap();
        let mut node = sample_node("cloud_report", NodeKind::XsiamReport);
        node.path = path;
        node.from_version = from.parse::<Version>().unwrap();
        node.to_version = to.parse::<Version>().unwrap();
        node
    }

    fn names(artifacts: &[ExportArtifact]) -> Vec<String> {
        artifacts
            .iter()
            .map(|a| a.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_straddling_exports_two_identical_files() {
        let fx = fixture();
        let node = report_node(&fx, "CloudReport.json", "0.0.0", "99.99.99");
        let artifacts = export_node(&node, &fx.out, None).unwrap().artifacts;

        assert_eq!(
            names(&artifacts),
            vec![
                "xsiamreport-CloudReport.json",
                "external-xsiamreport-CloudReport.json"
            ]
        );
        for a in &artifacts {
            assert!(a.path.exists(), "{} should exist", a.path.display());
        }
        assert!(!artifacts[0].external);
        assert!(artifacts[1].external);
        assert_eq!(
            fs::read(&artifacts[0].path).unwrap(),
            fs::read(&artifacts[1].path).unwrap()
        );
    }

    #[test]
    fn test_modern_only_exports_single_prefixed_file() {
        let fx = fixture();
        let node = report_node(&fx, "CloudReport.json", "6.10.0", "99.99.99");
        let artifacts = export_node(&node, &fx.out, None).unwrap().artifacts;

        assert_eq!(names(&artifacts), vec!["external-xsiamreport-CloudReport.json"]);
        assert!(artifacts[0].external);
        assert!(artifacts[0].path.exists());
        assert!(
            !fx.out.join("xsiamreport-CloudReport.json").exists(),
            "rename must not leave the old name behind"
        );
    }

    #[test]
    fn test_legacy_only_exports_single_unprefixed_file() {
        let fx = fixture();
        let node = report_node(&fx, "external-CloudReport.json", "0.0.0", "6.9.0");
        let artifacts = export_node(&node, &fx.out, None).unwrap().artifacts;

        assert_eq!(names(&artifacts), vec!["xsiamreport-CloudReport.json"]);
        assert!(!artifacts[0].external);
        assert_eq!(fs::read_dir(&fx.out).unwrap().count(), 1);
    }

    #[test]
    fn test_side_asset_is_attached() {
        let fx = fixture();
        let node = report_node(&fx, "foo.json", "6.10.0", "99.99.99");
        fs::write(fx.src.join("foo_image.png"), b"png").unwrap();

        let artifacts = export_node(&node, &fx.out, None).unwrap().artifacts;
        assert_eq!(artifacts.len(), 2);
        let asset = artifacts
            .iter()
            .find(|a| a.role == ArtifactRole::SideAsset)
            .unwrap();
        assert!(asset.path.ends_with("foo_image.png"));
        assert_eq!(fs::read(&asset.path).unwrap(), b"png");
        assert!(artifacts[0].external, "version rule still applies to the primary");
    }

    #[test]
    fn test_side_asset_with_straddling_range() {
        let fx = fixture();
        let node = report_node(&fx, "foo.json", "6.0.0", "8.0.0");
        fs::write(fx.src.join("foo_image.png"), b"png").unwrap();

        let artifacts = export_node(&node, &fx.out, None).unwrap().artifacts;
        assert_eq!(
            names(&artifacts),
            vec![
                "xsiamreport-foo.json",
                "foo_image.png",
                "external-xsiamreport-foo.json"
            ]
        );
    }

    #[test]
    fn test_marketplace_aliases_are_applied() {
        let fx = fixture();
        let node = report_node(&fx, "r.json", "6.10.0", "99.99.99");

        let v2 = export_node(&node, &fx.out.join("v2"), Some(Marketplace::MarketplaceV2)).unwrap();
        let data: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&v2.artifacts[0].path).unwrap()).unwrap();
        assert_eq!(data["name"], "Cloud Report v2");
        assert!(data.get("name_x2").is_none());
        assert_eq!(v2.id, "cloud_report");
        assert_eq!(v2.exported_name, "Cloud Report v2");

        let xsoar = export_node(&node, &fx.out.join("xsoar"), Some(Marketplace::Xsoar)).unwrap();
        let data: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&xsoar.artifacts[0].path).unwrap()).unwrap();
        assert_eq!(data["name"], "Cloud Report");
        assert_eq!(data["name_x2"], "Cloud Report v2");
        assert_eq!(xsoar.exported_name, "Cloud Report");
    }

    #[test]
    fn test_marketplace_alias_id_is_reported() {
        let fx = fixture();
        let path = fx.src.join("r.json");
        fs::write(&path, r#"{"id": "cloud_report", "id_x2": "cloud_report_v2", "name": "R"}"#)
            .unwrap();
        let mut node = sample_node("cloud_report", NodeKind::XsiamReport);
        node.path = path;

        let v2 = export_node(&node, &fx.out, Some(Marketplace::MarketplaceV2)).unwrap();
        assert_eq!(v2.id, "cloud_report");
        assert_eq!(v2.exported_id, "cloud_report_v2");
        let data: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&v2.artifacts[0].path).unwrap()).unwrap();
        assert_eq!(data["id"], "cloud_report_v2");

        let plain = export_node(&node, &fx.out.join("plain"), None).unwrap();
        assert_eq!(plain.exported_id, "cloud_report");
    }

    #[test]
    fn test_export_into_source_directory_is_refused() {
        let fx = fixture();
        let node = report_node(&fx, "foo.json", "0.0.0", "99.99.99");
        fs::write(fx.src.join("foo_image.png"), b"PNGDATA").unwrap();

        let err = export_node(&node, &fx.src, None).unwrap_err();
        assert!(matches!(err, ExportError::DestinationIsSource { .. }), "{err}");
        assert_eq!(fs::read(fx.src.join("foo_image.png")).unwrap(), b"PNGDATA");
        assert_eq!(fs::read_dir(&fx.src).unwrap().count(), 2);
    }

    #[test]
    fn test_normalized_source_survives_export_into_its_directory() {
        let fx = fixture();
        let node = report_node(&fx, "xsiamreport-foo.json", "6.10.0", "99.99.99");

        // The same directory reached through a different spelling.
        let dest = fx.src.join(".");
        let err = export_node(&node, &dest, Some(Marketplace::MarketplaceV2)).unwrap_err();
        assert!(matches!(err, ExportError::DestinationIsSource { .. }), "{err}");
        assert_eq!(fs::read_to_string(&node.path).unwrap(), REPORT_JSON);
        assert!(!fx.src.join("external-xsiamreport-foo.json").exists());
    }

    #[test]
    fn test_node_outside_marketplace_produces_nothing() {
        let fx = fixture();
        let mut node = report_node(&fx, "r.json", "0.0.0", "99.99.99");
        node.marketplaces.insert(Marketplace::MarketplaceV2);

        let artifacts = export_node(&node, &fx.out, Some(Marketplace::Xsoar))
            .unwrap()
            .artifacts;
        assert!(artifacts.is_empty());
        assert!(!fx.out.exists());
    }

    #[test]
    fn test_yaml_kinds_export_single_normalized_file() {
        let fx = fixture();
        let path = fx.src.join("Hello.yml");
        fs::write(&path, "commonfields:\n  id: hello\nname: hello\n").unwrap();
        let mut node = sample_node("hello", NodeKind::Script(ScriptInfo::default()));
        node.path = path;

        let artifacts = export_node(&node, &fx.out, None).unwrap().artifacts;
        assert_eq!(names(&artifacts), vec!["script-Hello.yml"]);
        let text = fs::read_to_string(&artifacts[0].path).unwrap();
        assert!(text.contains("id: hello"), "{text}");
    }

    #[test]
    fn test_packs_are_not_exportable() {
        let fx = fixture();
        let node = sample_node("P", NodeKind::Pack(PackInfo::default()));
        assert!(matches!(
            export_node(&node, &fx.out, None),
            Err(ExportError::NotExportable { .. })
        ));
    }

    #[test]
    fn test_missing_definition_is_reported() {
        let fx = fixture();
        let mut node = sample_node("gone", NodeKind::XsiamReport);
        node.path = fx.src.join("gone.json");
        let err = export_node(&node, &fx.out, None).unwrap_err();
        assert!(matches!(err, ExportError::Definition(_)), "{err}");
        assert!(err.produced().is_empty());
    }

    #[test]
    fn test_failed_side_asset_copy_reports_partial_result() {
        let fx = fixture();
        let node = report_node(&fx, "foo.json", "0.0.0", "99.99.99");
        fs::write(fx.src.join("foo_image.png"), b"png").unwrap();
        // A directory where the asset should land makes the copy fail.
        fs::create_dir_all(fx.out.join("foo_image.png")).unwrap();

        let err = export_node(&node, &fx.out, None).unwrap_err();
        match &err {
            ExportError::Io { step, .. } => assert_eq!(*step, ExportStep::CopySideAsset),
            other => panic!("expected Io error, got {other:?}"),
        }
        let produced = err.produced();
        assert_eq!(produced.len(), 1);
        assert!(produced[0].path.exists(), "partial results stay on disk");
    }

    #[test]
    fn test_export_graph_lays_out_by_pack() {
        let fx = fixture();
        let report = report_node(&fx, "r.json", "6.10.0", "99.99.99");
        let mut builder = GraphBuilder::new();
        builder
            .add_node(sample_node("Cloud", NodeKind::Pack(PackInfo::default())))
            .add_node(report)
            .add_relationship(DeclaredRelationship::new(
                RelationshipKind::InPack,
                "cloud_report",
                "Cloud",
            ));
        let graph = builder.build().unwrap();

        let result = export_graph(&graph, &fx.out, None, &[]);
        assert_eq!(result.exported.len(), 1);
        assert_eq!(result.skipped, 1, "the pack itself is skipped");
        assert!(result.failures.is_empty());
        assert!(
            fx.out
                .join("Cloud/XSIAMReports/external-xsiamreport-r.json")
                .exists()
        );

        let missing = export_graph(&graph, &fx.out, None, &["nope".to_string()]);
        assert_eq!(missing.failures.len(), 1);
        assert!(missing.exported.is_empty());
    }
}
