//! Turns one definition file into a content node plus the relationships it declares.

use std::collections::BTreeSet;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::definition::{bool_field, load_definition, str_field, string_list, version_field};
use crate::error::DefinitionError;
use crate::graph::builder::DeclaredRelationship;
use crate::graph::edge::RelationshipKind;
use crate::graph::node::{
    ContentNode, ContentType, IdLocation, IncidentTypeInfo, IntegrationInfo, NodeKind, PackInfo,
    PlaybookInfo, ScriptInfo,
};
use crate::marketplace::Marketplace;
use crate::version::{DEFAULT_FROM_VERSION, DEFAULT_TO_VERSION, Version};

/// Separator between an integration brand and a command in script references.
const COMMAND_SEPARATOR: &str = "|||";

/// A parsed definition, ready to be added to a `GraphBuilder`.
#[derive(Debug)]
pub struct LoadedItem {
    pub node: ContentNode,
    pub relationships: Vec<DeclaredRelationship>,
}

/// Load a pack from its `pack_metadata.json`. The pack id is the pack directory name.
pub fn load_pack(metadata_path: &Path) -> Result<LoadedItem, DefinitionError> {
    let data = load_definition(metadata_path)?;
    let map = as_map(&data, metadata_path)?;
    let pack_id = pack_id_of(metadata_path);

    let text = |key: &str| str_field(map, key).map(str::to_owned);
    let info = PackInfo {
        current_version: text("currentVersion"),
        support: text("support"),
        author: text("author"),
    };

    let name = str_field(map, "name").unwrap_or(&pack_id).to_owned();
    let mut relationships = Vec::new();
    if let Some(Value::Object(deps)) = map.get("dependencies") {
        for (dep_id, dep) in deps {
            let mandatory = dep.get("mandatory").and_then(Value::as_bool).unwrap_or(false);
            relationships.push(
                DeclaredRelationship::new(RelationshipKind::DependsOn, &pack_id, dep_id)
                    .mandatory(mandatory),
            );
        }
    }

    let node = ContentNode {
        object_id: pack_id.clone(),
        display_name: name.clone(),
        name,
        path: metadata_path.to_path_buf(),
        from_version: versions(map, metadata_path, &["serverMinVersion"], DEFAULT_FROM_VERSION)?,
        to_version: DEFAULT_TO_VERSION,
        marketplaces: marketplaces(map),
        deprecated: bool_field(map, "deprecated"),
        is_test: false,
        description: str_field(map, "description").map(str::to_owned),
        kind: NodeKind::Pack(info),
    };
    Ok(LoadedItem {
        node,
        relationships,
    })
}

/// A pack node for a pack whose metadata could not be read, so its items still resolve.
pub fn fallback_pack(metadata_path: &Path) -> ContentNode {
    let pack_id = pack_id_of(metadata_path);
    ContentNode {
        object_id: pack_id.clone(),
        name: pack_id.clone(),
        display_name: pack_id,
        path: metadata_path.to_path_buf(),
        from_version: DEFAULT_FROM_VERSION,
        to_version: DEFAULT_TO_VERSION,
        marketplaces: BTreeSet::new(),
        deprecated: false,
        is_test: false,
        description: None,
        kind: NodeKind::Pack(PackInfo::default()),
    }
}

/// Load a content item definition of kind `content_type` belonging to pack `pack_id`.
pub fn load_item(
    path: &Path,
    content_type: ContentType,
    pack_id: &str,
) -> Result<LoadedItem, DefinitionError> {
    let data = load_definition(path)?;
    let map = as_map(&data, path)?;

    let id_holder = match content_type.spec().id_location {
        IdLocation::CommonFields => map
            .get("commonfields")
            .and_then(Value::as_object)
            .unwrap_or(map),
        IdLocation::Root => map,
    };
    let object_id = str_field(id_holder, "id")
        .ok_or_else(|| DefinitionError::MissingId {
            path: path.to_path_buf(),
        })?
        .to_owned();
    let name = str_field(map, "name").unwrap_or(&object_id).to_owned();
    let display_name = str_field(map, "display")
        .or_else(|| str_field(map, "display_name"))
        .unwrap_or(&name)
        .to_owned();
    let description = str_field(map, "description")
        .or_else(|| str_field(map, "comment"))
        .map(str::to_owned);

    let mut relationships = vec![DeclaredRelationship::new(
        RelationshipKind::InPack,
        &object_id,
        pack_id,
    )];
    for test in string_list(map.get("tests")) {
        if test.to_lowercase().starts_with("no test") {
            continue;
        }
        relationships.push(DeclaredRelationship::new(
            RelationshipKind::TestedBy,
            &object_id,
            &test,
        ));
    }

    let mut uses = UsesCollector::default();
    let kind = match content_type {
        ContentType::Pack => NodeKind::Pack(PackInfo::default()),
        ContentType::Integration => NodeKind::Integration(IntegrationInfo {
            category: str_field(map, "category").map(str::to_owned),
            commands: integration_commands(map),
        }),
        ContentType::Script => {
            if let Some(Value::Object(depends)) = map.get("dependson") {
                for target in string_list(depends.get("must")) {
                    uses.add_reference(&target, true);
                }
                for target in string_list(depends.get("should")) {
                    uses.add_reference(&target, false);
                }
            }
            NodeKind::Script(ScriptInfo {
                script_type: str_field(map, "type").map(str::to_owned),
                docker_image: str_field(map, "dockerimage").map(str::to_owned),
            })
        }
        ContentType::Playbook | ContentType::TestPlaybook => {
            let info = PlaybookInfo {
                task_count: playbook_uses(map, &mut uses),
            };
            if content_type == ContentType::TestPlaybook {
                NodeKind::TestPlaybook(info)
            } else {
                NodeKind::Playbook(info)
            }
        }
        ContentType::IncidentType => {
            let playbook_id = str_field(map, "playbookId").map(str::to_owned);
            if let Some(playbook) = &playbook_id {
                uses.add(playbook, false);
            }
            NodeKind::IncidentType(IncidentTypeInfo { playbook_id })
        }
        ContentType::XsiamReport => NodeKind::XsiamReport,
        ContentType::XsiamDashboard => NodeKind::XsiamDashboard,
    };

    for (target, mandatory) in uses.targets {
        relationships.push(
            DeclaredRelationship::new(RelationshipKind::Uses, &object_id, &target)
                .mandatory(mandatory),
        );
    }

    let node = ContentNode {
        object_id,
        name,
        display_name,
        path: path.to_path_buf(),
        from_version: versions(
            map,
            path,
            &["fromversion", "fromVersion"],
            DEFAULT_FROM_VERSION,
        )?,
        to_version: versions(map, path, &["toversion", "toVersion"], DEFAULT_TO_VERSION)?,
        marketplaces: marketplaces(map),
        deprecated: bool_field(map, "deprecated"),
        is_test: content_type == ContentType::TestPlaybook,
        description,
        kind,
    };
    debug!(
        "loaded {} '{}' with {} relationships",
        content_type,
        node.object_id,
        relationships.len()
    );
    Ok(LoadedItem {
        node,
        relationships,
    })
}

/// USES targets in declaration order. A target referenced several times is mandatory
/// if any reference is.
#[derive(Default)]
struct UsesCollector {
    targets: Vec<(String, bool)>,
}

impl UsesCollector {
    fn add(&mut self, target: &str, mandatory: bool) {
        match self.targets.iter_mut().find(|(t, _)| t == target) {
            Some((_, existing)) => *existing |= mandatory,
            None => self.targets.push((target.to_owned(), mandatory)),
        }
    }

    /// Add a script reference, which may be `Brand|||command`. A bare `|||command`
    /// names no item and is ignored.
    fn add_reference(&mut self, reference: &str, mandatory: bool) {
        let target = match reference.split_once(COMMAND_SEPARATOR) {
            Some((brand, _)) => brand.trim(),
            None => reference.trim(),
        };
        if !target.is_empty() {
            self.add(target, mandatory);
        }
    }
}

/// Collect the scripts and sub-playbooks a playbook's tasks call. Returns the task count.
fn playbook_uses(map: &Map<String, Value>, uses: &mut UsesCollector) -> usize {
    let Some(Value::Object(tasks)) = map.get("tasks") else {
        return 0;
    };
    for task in tasks.values() {
        let mandatory = !task
            .get("skipunavailable")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let Some(inner) = task.get("task").and_then(Value::as_object) else {
            continue;
        };
        for key in ["scriptName", "script", "playbookName"] {
            if let Some(reference) = str_field(inner, key) {
                uses.add_reference(reference, mandatory);
            }
        }
    }
    tasks.len()
}

fn integration_commands(map: &Map<String, Value>) -> Vec<String> {
    map.get("script")
        .and_then(|s| s.get("commands"))
        .and_then(Value::as_array)
        .map(|commands| {
            commands
                .iter()
                .filter_map(|c| c.get("name").and_then(Value::as_str))
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn marketplaces(map: &Map<String, Value>) -> BTreeSet<Marketplace> {
    string_list(map.get("marketplaces"))
        .iter()
        .filter_map(|name| {
            let parsed = Marketplace::from_str_loose(name);
            if parsed.is_none() {
                debug!("ignoring unknown marketplace '{}'", name);
            }
            parsed
        })
        .collect()
}

fn versions(
    map: &Map<String, Value>,
    path: &Path,
    keys: &[&str],
    default: Version,
) -> Result<Version, DefinitionError> {
    version_field(map, keys)
        .and_then(|raw| Version::parse_or(raw.as_deref(), default))
        .map_err(|source| DefinitionError::Version {
            path: path.to_path_buf(),
            source,
        })
}

fn as_map<'a>(data: &'a Value, path: &Path) -> Result<&'a Map<String, Value>, DefinitionError> {
    data.as_object().ok_or_else(|| DefinitionError::NotAMapping {
        path: path.to_path_buf(),
    })
}

fn pack_id_of(metadata_path: &Path) -> String {
    metadata_path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
