use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{DefinitionError, VersionError};

/// Suffix marking a marketplace-specific alias of a field (`name_x2` aliases `name`).
pub const ALIAS_SUFFIX: &str = "_x2";

/// On-disk encoding of a content definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionFormat {
    Json,
    Yaml,
}

impl DefinitionFormat {
    /// Pick the format from a file extension. `.json` is JSON, `.yml`/`.yaml` is YAML.
    pub fn from_path(path: &Path) -> Option<DefinitionFormat> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(DefinitionFormat::Json),
            "yml" | "yaml" => Some(DefinitionFormat::Yaml),
            _ => None,
        }
    }

    /// Parse definition text into a generic document.
    pub fn parse(&self, path: &Path, text: &str) -> Result<Value, DefinitionError> {
        match self {
            DefinitionFormat::Json => {
                serde_json::from_str(text).map_err(|source| DefinitionError::Json {
                    path: path.to_path_buf(),
                    source,
                })
            }
            DefinitionFormat::Yaml => {
                serde_yaml::from_str(text).map_err(|source| DefinitionError::Yaml {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    /// Serialize a document in this format. JSON is pretty-printed with a trailing newline.
    pub fn render(&self, data: &Value) -> Result<String, String> {
        match self {
            DefinitionFormat::Json => serde_json::to_string_pretty(data)
                .map(|mut s| {
                    s.push('\n');
                    s
                })
                .map_err(|e| e.to_string()),
            DefinitionFormat::Yaml => serde_yaml::to_string(data).map_err(|e| e.to_string()),
        }
    }
}

/// Read and parse a definition file. The top-level value must be a mapping.
pub fn load_definition(path: &Path) -> Result<Value, DefinitionError> {
    let format = DefinitionFormat::from_path(path).unwrap_or(DefinitionFormat::Yaml);
    let text = std::fs::read_to_string(path).map_err(|source| DefinitionError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let data = format.parse(path, &text)?;
    if !data.is_object() {
        return Err(DefinitionError::NotAMapping {
            path: PathBuf::from(path),
        });
    }
    Ok(data)
}

/// Replace every field that has an `_x2` alias with the alias value, recursively.
///
/// The alias key itself is removed. Values nested in arrays are visited too.
pub fn alternate_item_fields(data: &mut Value) {
    match data {
        Value::Object(map) => {
            let aliased: Vec<String> = map
                .keys()
                .filter(|k| k.ends_with(ALIAS_SUFFIX) && k.len() > ALIAS_SUFFIX.len())
                .cloned()
                .collect();
            for alias in aliased {
                if let Some(base) = alias.strip_suffix(ALIAS_SUFFIX)
                    && let Some(value) = map.remove(&alias)
                {
                    map.insert(base.to_owned(), value);
                }
            }
            for value in map.values_mut() {
                alternate_item_fields(value);
            }
        }
        Value::Array(items) => {
            for item in items {
                alternate_item_fields(item);
            }
        }
        _ => {}
    }
}

/// Look up a non-empty string field.
pub fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Look up a version field written as a string, or as a bare integer (`fromversion: 6`).
///
/// A fractional number is rejected: `6.10` arrives as the float `6.1` and cannot be told
/// apart from `6.1`.
pub fn version_field(
    map: &Map<String, Value>,
    keys: &[&str],
) -> Result<Option<String>, VersionError> {
    for key in keys {
        match map.get(*key) {
            Some(Value::String(s)) => return Ok(Some(s.clone())),
            Some(Value::Number(n)) if n.is_u64() => return Ok(Some(n.to_string())),
            Some(Value::Number(n)) => return Err(VersionError::Unquoted(n.to_string())),
            _ => {}
        }
    }
    Ok(None)
}

/// Look up a boolean field, defaulting to false.
pub fn bool_field(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Collect a list of strings, also accepting a single string.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_owned()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            DefinitionFormat::from_path(Path::new("a/report.JSON")),
            Some(DefinitionFormat::Json)
        );
        assert_eq!(
            DefinitionFormat::from_path(Path::new("script-x.yml")),
            Some(DefinitionFormat::Yaml)
        );
        assert_eq!(DefinitionFormat::from_path(Path::new("README.md")), None);
    }

    #[test]
    fn test_alternate_item_fields_replaces_nested_aliases() {
        let mut data = json!({
            "name": "Old",
            "name_x2": "New",
            "commonfields": { "id": "old-id", "id_x2": "new-id" },
            "tasks": [ { "description": "a", "description_x2": "b" } ]
        });
        alternate_item_fields(&mut data);
        assert_eq!(
            data,
            json!({
                "name": "New",
                "commonfields": { "id": "new-id" },
                "tasks": [ { "description": "b" } ]
            })
        );
    }

    #[test]
    fn test_alternate_item_fields_adds_missing_base_field() {
        let mut data = json!({ "comment_x2": "only here" });
        alternate_item_fields(&mut data);
        assert_eq!(data, json!({ "comment": "only here" }));
    }

    #[test]
    fn test_load_definition_rejects_scalar_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scalar.yml");
        fs::write(&path, "just a string\n").unwrap();
        let err = load_definition(&path).unwrap_err();
        assert!(matches!(err, DefinitionError::NotAMapping { .. }), "{err}");
    }

    #[test]
    fn test_load_definition_reads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let yml = dir.path().join("a.yml");
        fs::write(&yml, "commonfields:\n  id: a\nname: A\n").unwrap();
        let json_path = dir.path().join("b.json");
        fs::write(&json_path, r#"{"id": "b", "fromVersion": "6.10.0"}"#).unwrap();

        assert_eq!(load_definition(&yml).unwrap()["commonfields"]["id"], "a");
        assert_eq!(load_definition(&json_path).unwrap()["fromVersion"], "6.10.0");
    }

    #[test]
    fn test_version_field_accepts_strings_and_integers() {
        let data = json!({ "fromVersion": "6.10.0", "toversion": 8 });
        let map = data.as_object().unwrap();
        assert_eq!(
            version_field(map, &["fromversion", "fromVersion"]).unwrap().as_deref(),
            Some("6.10.0")
        );
        assert_eq!(version_field(map, &["toversion"]).unwrap().as_deref(), Some("8"));
        assert_eq!(version_field(map, &["missing"]).unwrap(), None);
    }

    #[test]
    fn test_version_field_rejects_fractional_numbers() {
        let data: Value = serde_json::from_str(r#"{"fromversion": 6.10}"#).unwrap();
        let map = data.as_object().unwrap();
        assert!(matches!(
            version_field(map, &["fromversion"]),
            Err(VersionError::Unquoted(_))
        ));

        let yaml: Value = serde_yaml::from_str("fromversion: 6.10\n").unwrap();
        assert!(version_field(yaml.as_object().unwrap(), &["fromversion"]).is_err());
    }

    #[test]
    fn test_alternate_item_fields_strips_one_suffix() {
        let mut data = json!({ "a_x2_x2": 1 });
        alternate_item_fields(&mut data);
        assert_eq!(data, json!({ "a_x2": 1 }));
    }
}
