use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::definition::{self, DefinitionFormat};
use crate::error::DefinitionError;
use crate::marketplace::Marketplace;
use crate::version::{CUTOVER_VERSION, Version, VersionBucket};

/// The type tag of a content node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContentType {
    Pack,
    Integration,
    Script,
    Playbook,
    TestPlaybook,
    IncidentType,
    XsiamReport,
    XsiamDashboard,
}

/// Where a definition keeps its `id` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdLocation {
    /// `commonfields.id` (integrations, scripts).
    CommonFields,
    /// Top-level `id`.
    Root,
}

/// Static per-kind configuration, resolved by content type instead of by runtime type name.
#[derive(Debug)]
pub struct KindSpec {
    pub content_type: ContentType,
    /// Directory inside a pack that holds definitions of this kind.
    pub dir_name: &'static str,
    /// File-name prefix the server expects (`script-foo.yml`).
    pub server_name: &'static str,
    pub id_location: IdLocation,
    pub format: DefinitionFormat,
    pub exportable: bool,
    /// Whether export fans out into `external-` prefixed variants by version range.
    pub version_fanout: bool,
    /// Sibling file attached on export: `<stem><suffix>` next to the definition.
    pub side_asset_suffix: Option<&'static str>,
}

static PACK: KindSpec = KindSpec {
    content_type: ContentType::Pack,
    dir_name: "",
    server_name: "pack",
    id_location: IdLocation::Root,
    format: DefinitionFormat::Json,
    exportable: false,
    version_fanout: false,
    side_asset_suffix: None,
};

static INTEGRATION: KindSpec = KindSpec {
    content_type: ContentType::Integration,
    dir_name: "Integrations",
    server_name: "integration",
    id_location: IdLocation::CommonFields,
    format: DefinitionFormat::Yaml,
    exportable: true,
    version_fanout: false,
    side_asset_suffix: None,
};

static SCRIPT: KindSpec = KindSpec {
    content_type: ContentType::Script,
    dir_name: "Scripts",
    server_name: "script",
    id_location: IdLocation::CommonFields,
    format: DefinitionFormat::Yaml,
    exportable: true,
    version_fanout: false,
    side_asset_suffix: None,
};

static PLAYBOOK: KindSpec = KindSpec {
    content_type: ContentType::Playbook,
    dir_name: "Playbooks",
    server_name: "playbook",
    id_location: IdLocation::Root,
    format: DefinitionFormat::Yaml,
    exportable: true,
    version_fanout: false,
    side_asset_suffix: None,
};

static TEST_PLAYBOOK: KindSpec = KindSpec {
    content_type: ContentType::TestPlaybook,
    dir_name: "TestPlaybooks",
    server_name: "playbook",
    id_location: IdLocation::Root,
    format: DefinitionFormat::Yaml,
    exportable: true,
    version_fanout: false,
    side_asset_suffix: None,
};

static INCIDENT_TYPE: KindSpec = KindSpec {
    content_type: ContentType::IncidentType,
    dir_name: "IncidentTypes",
    server_name: "incidenttype",
    id_location: IdLocation::Root,
    format: DefinitionFormat::Json,
    exportable: true,
    version_fanout: false,
    side_asset_suffix: None,
};

static XSIAM_REPORT: KindSpec = KindSpec {
    content_type: ContentType::XsiamReport,
    dir_name: "XSIAMReports",
    server_name: "xsiamreport",
    id_location: IdLocation::Root,
    format: DefinitionFormat::Json,
    exportable: true,
    version_fanout: true,
    side_asset_suffix: Some("_image.png"),
};

static XSIAM_DASHBOARD: KindSpec = KindSpec {
    content_type: ContentType::XsiamDashboard,
    dir_name: "XSIAMDashboards",
    server_name: "xsiamdashboard",
    id_location: IdLocation::Root,
    format: DefinitionFormat::Json,
    exportable: true,
    version_fanout: true,
    side_asset_suffix: Some("_image.png"),
};

/// Every kind, in declaration order.
pub static KIND_TABLE: [&KindSpec; 8] = [
    &PACK,
    &INTEGRATION,
    &SCRIPT,
    &PLAYBOOK,
    &TEST_PLAYBOOK,
    &INCIDENT_TYPE,
    &XSIAM_REPORT,
    &XSIAM_DASHBOARD,
];

impl ContentType {
    pub fn spec(&self) -> &'static KindSpec {
        match self {
            ContentType::Pack => &PACK,
            ContentType::Integration => &INTEGRATION,
            ContentType::Script => &SCRIPT,
            ContentType::Playbook => &PLAYBOOK,
            ContentType::TestPlaybook => &TEST_PLAYBOOK,
            ContentType::IncidentType => &INCIDENT_TYPE,
            ContentType::XsiamReport => &XSIAM_REPORT,
            ContentType::XsiamDashboard => &XSIAM_DASHBOARD,
        }
    }

    /// File-name prefix the server expects for this kind.
    pub fn server_name(&self) -> &'static str {
        self.spec().server_name
    }

    /// All distinct server prefixes. Used to strip stale prefixes from file names.
    pub fn server_names() -> impl Iterator<Item = &'static str> {
        let mut seen: Vec<&'static str> = Vec::new();
        KIND_TABLE.iter().filter_map(move |spec| {
            if seen.contains(&spec.server_name) {
                None
            } else {
                seen.push(spec.server_name);
                Some(spec.server_name)
            }
        })
    }

    /// Resolve a pack sub-directory name (`Scripts`, `XSIAMReports`, ...) to its kind.
    pub fn from_dir_name(dir: &str) -> Option<ContentType> {
        KIND_TABLE
            .iter()
            .find(|spec| !spec.dir_name.is_empty() && spec.dir_name == dir)
            .map(|spec| spec.content_type)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Pack => "pack",
            ContentType::Integration => "integration",
            ContentType::Script => "script",
            ContentType::Playbook => "playbook",
            ContentType::TestPlaybook => "test_playbook",
            ContentType::IncidentType => "incident_type",
            ContentType::XsiamReport => "xsiam_report",
            ContentType::XsiamDashboard => "xsiam_dashboard",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata read from `pack_metadata.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackInfo {
    pub current_version: Option<String>,
    pub support: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrationInfo {
    pub category: Option<String>,
    /// Command names declared under `script.commands`.
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptInfo {
    /// Runtime language (`python`, `powershell`, `javascript`).
    pub script_type: Option<String>,
    pub docker_image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybookInfo {
    pub task_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncidentTypeInfo {
    /// Playbook run when an incident of this type is created.
    pub playbook_id: Option<String>,
}

/// Kind-specific payload of a content node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Pack(PackInfo),
    Integration(IntegrationInfo),
    Script(ScriptInfo),
    Playbook(PlaybookInfo),
    TestPlaybook(PlaybookInfo),
    IncidentType(IncidentTypeInfo),
    XsiamReport,
    XsiamDashboard,
}

impl NodeKind {
    pub fn content_type(&self) -> ContentType {
        match self {
            NodeKind::Pack(_) => ContentType::Pack,
            NodeKind::Integration(_) => ContentType::Integration,
            NodeKind::Script(_) => ContentType::Script,
            NodeKind::Playbook(_) => ContentType::Playbook,
            NodeKind::TestPlaybook(_) => ContentType::TestPlaybook,
            NodeKind::IncidentType(_) => ContentType::IncidentType,
            NodeKind::XsiamReport => ContentType::XsiamReport,
            NodeKind::XsiamDashboard => ContentType::XsiamDashboard,
        }
    }
}

/// A vertex of the content graph: one pack or content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    pub object_id: String,
    pub name: String,
    pub display_name: String,
    /// Source definition file.
    pub path: PathBuf,
    pub from_version: Version,
    pub to_version: Version,
    /// Marketplaces the node is valid for. Empty means all of them.
    pub marketplaces: BTreeSet<Marketplace>,
    pub deprecated: bool,
    pub is_test: bool,
    pub description: Option<String>,
    pub kind: NodeKind,
}

impl ContentNode {
    pub fn content_type(&self) -> ContentType {
        self.kind.content_type()
    }

    pub fn spec(&self) -> &'static KindSpec {
        self.content_type().spec()
    }

    /// Encoding of the source definition, from its extension, falling back to the kind's default.
    pub fn format(&self) -> DefinitionFormat {
        DefinitionFormat::from_path(&self.path).unwrap_or(self.spec().format)
    }

    /// Whether the node may be exported for `marketplace`.
    pub fn is_valid_for(&self, marketplace: Marketplace) -> bool {
        self.marketplaces.is_empty() || self.marketplaces.contains(&marketplace)
    }

    /// Export bucket of the declared compatibility range.
    pub fn version_bucket(&self) -> VersionBucket {
        VersionBucket::classify(self.from_version, self.to_version, CUTOVER_VERSION)
    }

    /// Read the source definition from disk.
    pub fn data(&self) -> Result<Value, DefinitionError> {
        definition::load_definition(&self.path)
    }

    /// Identity of this node as seen by `marketplace`.
    ///
    /// Outside `xsoar`, an `id_x2` / `name_x2` alias in `data` replaces the id / name.
    /// The returned node is a copy; the graph's node is left untouched.
    pub fn for_marketplace(&self, marketplace: Option<Marketplace>, data: &Value) -> ContentNode {
        let mut aliased = self.clone();
        if !marketplace.is_some_and(|mp| mp.uses_aliases()) {
            return aliased;
        }
        let id_holder = match self.spec().id_location {
            IdLocation::CommonFields => data.get("commonfields").unwrap_or(data),
            IdLocation::Root => data,
        };
        if let Some(id) = id_holder.get("id_x2").and_then(Value::as_str) {
            aliased.object_id = id.to_owned();
        }
        if let Some(name) = data.get("name_x2").and_then(Value::as_str) {
            aliased.name = name.to_owned();
        }
        aliased
    }

    pub fn as_pack(&self) -> Option<&PackInfo> {
        match &self.kind {
            NodeKind::Pack(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_integration(&self) -> Option<&IntegrationInfo> {
        match &self.kind {
            NodeKind::Integration(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_script(&self) -> Option<&ScriptInfo> {
        match &self.kind {
            NodeKind::Script(info) => Some(info),
            _ => None,
        }
    }

    /// Playbook metadata, for both regular and test playbooks.
    pub fn as_playbook(&self) -> Option<&PlaybookInfo> {
        match &self.kind {
            NodeKind::Playbook(info) | NodeKind::TestPlaybook(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_incident_type(&self) -> Option<&IncidentTypeInfo> {
        match &self.kind {
            NodeKind::IncidentType(info) => Some(info),
            _ => None,
        }
    }
}
