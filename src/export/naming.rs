use std::path::{Path, PathBuf};

use tracing::debug;

use crate::graph::node::ContentType;

/// File-name token marking the variant for servers at or past the cutover version.
pub const EXTERNAL_PREFIX: &str = "external-";

/// Normalize a definition file name for export.
///
/// Every leading known prefix token (`external-` and each kind's server prefix) is
/// stripped, then the server prefix of `content_type` is prepended. Normalizing an
/// already-normalized name returns it unchanged.
pub fn normalize_name(file_name: &str, content_type: ContentType) -> String {
    let base = strip_known_prefixes(file_name);
    let normalized = format!("{}-{}", content_type.server_name(), base);
    if normalized != file_name {
        debug!("normalized file name from {} to {}", file_name, normalized);
    }
    normalized
}

fn strip_known_prefixes(mut name: &str) -> &str {
    loop {
        let stripped = name.strip_prefix(EXTERNAL_PREFIX).or_else(|| {
            ContentType::server_names()
                .find_map(|prefix| name.strip_prefix(prefix)?.strip_prefix('-'))
        });
        match stripped {
            Some(rest) => name = rest,
            None => return name,
        }
    }
}

pub fn is_external(file_name: &str) -> bool {
    file_name.starts_with(EXTERNAL_PREFIX)
}

/// `name` with the `external-` prefix, added only if missing.
pub fn external_name(file_name: &str) -> String {
    if is_external(file_name) {
        file_name.to_owned()
    } else {
        format!("{EXTERNAL_PREFIX}{file_name}")
    }
}

/// `name` without its leading `external-` prefix.
pub fn legacy_name(file_name: &str) -> String {
    file_name
        .strip_prefix(EXTERNAL_PREFIX)
        .unwrap_or(file_name)
        .to_owned()
}

/// The same path with the opposite prefix state in its file name.
pub fn toggled_variant(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let toggled = if is_external(name) {
        legacy_name(name)
    } else {
        external_name(name)
    };
    Some(path.with_file_name(toggled))
}

/// The sibling asset of a definition: `<stem><suffix>` in the same directory, if it exists.
pub fn side_asset_path(definition: &Path, suffix: &str) -> Option<PathBuf> {
    let stem = definition.file_stem()?.to_str()?;
    let candidate = definition.with_file_name(format!("{stem}{suffix}"));
    candidate.is_file().then_some(candidate)
}
