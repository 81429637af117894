use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::ContentGraphConfig;
use crate::definition::DefinitionFormat;
use crate::graph::node::ContentType;

/// File marking a pack root directory.
pub const PACK_METADATA: &str = "pack_metadata.json";

/// A content definition discovered inside a pack.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// Root directory of the pack holding the definition.
    pub pack_dir: PathBuf,
    pub content_type: ContentType,
}

/// Everything the walker found, in path order.
#[derive(Debug, Default)]
pub struct Discovery {
    /// `pack_metadata.json` files, one per pack.
    pub packs: Vec<PathBuf>,
    pub definitions: Vec<DiscoveredFile>,
}

/// Walk a content repository and collect pack metadata and definition files.
///
/// Respects `.gitignore` rules and the exclusions from `config.exclude`. A definition
/// is any file under `<pack>/<kind directory>/` (at any depth) whose extension matches
/// the kind's format, where `<pack>` is the nearest ancestor holding `pack_metadata.json`.
pub fn walk_repository(root: &Path, config: &ContentGraphConfig) -> anyhow::Result<Discovery> {
    if !root.is_dir() {
        anyhow::bail!("{} is not a directory", root.display());
    }

    let files = collect_files(root, config);

    let pack_dirs: BTreeSet<PathBuf> = files
        .iter()
        .filter(|p| p.file_name().is_some_and(|n| n == PACK_METADATA))
        .filter_map(|p| p.parent().map(Path::to_path_buf))
        .collect();

    let mut discovery = Discovery {
        packs: pack_dirs.iter().map(|d| d.join(PACK_METADATA)).collect(),
        definitions: Vec::new(),
    };

    for path in &files {
        if let Some(found) = classify(path, &pack_dirs) {
            debug!("{} ({})", path.display(), found.content_type);
            discovery.definitions.push(found);
        }
    }
    discovery.definitions.sort();

    Ok(discovery)
}

/// Decide whether `path` is a definition file and of which kind.
fn classify(path: &Path, pack_dirs: &BTreeSet<PathBuf>) -> Option<DiscoveredFile> {
    let pack_dir = path.ancestors().skip(1).find(|a| pack_dirs.contains(*a))?;
    let relative = path.strip_prefix(pack_dir).ok()?;

    let mut components = relative.components();
    let dir_name = components.next()?.as_os_str().to_str()?;
    // The definition must live inside the kind directory, not be named like it.
    components.next()?;
    let content_type = ContentType::from_dir_name(dir_name)?;

    if DefinitionFormat::from_path(path)? != content_type.spec().format {
        return None;
    }

    Some(DiscoveredFile {
        path: path.to_path_buf(),
        pack_dir: pack_dir.to_path_buf(),
        content_type,
    })
}

/// Collect every file under `root` using the `ignore` crate, sorted by path.
fn collect_files(root: &Path, config: &ContentGraphConfig) -> Vec<PathBuf> {
    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(true)
        // Read .gitignore files even when the directory is not inside a git repository.
        .require_git(false)
        .build();

    let mut out = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                warn!("{err}");
                continue;
            }
        };

        if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
            continue;
        }

        let path = entry.path();
        if is_excluded_by_config(path, config) {
            continue;
        }

        out.push(path.to_path_buf());
    }
    out.sort();
    out
}

/// Returns true if `path` matches any exclusion pattern from config.
fn is_excluded_by_config(path: &Path, config: &ContentGraphConfig) -> bool {
    let Some(patterns) = &config.exclude else {
        return false;
    };

    let path_str = path.to_string_lossy();

    for pattern in patterns {
        let Ok(matcher) = glob::Pattern::new(pattern) else {
            continue;
        };
        if matcher.matches(&path_str) {
            return true;
        }
        // Also check if any component matches the pattern directly.
        if path
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .any(|s| matcher.matches(s))
        {
            return true;
        }
    }

    false
}
