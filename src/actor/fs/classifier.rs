//! Change classification.
//!
//! Pure functions from a path-level change to the rebuild it requires.
//! Nothing here touches the watcher or the rebuild actor.

use std::path::Path;

use super::types::{ChangeKind, FsChange};
use crate::config::ProjectConfig;
use crate::core::RebuildScope;
use crate::utils::path::is_hidden;

/// Directory names that are never watched or acted on.
pub(super) const IGNORED_DIRS: &[&str] = &["node_modules"];

/// Whether a change on `path` must never schedule a rebuild.
///
/// Covers everything wap writes itself (artifacts, generated source, the
/// binary, `.wap/`), hidden entries, dependency trees and editor scratch
/// files.
pub(super) fn is_ignored(path: &Path, config: &ProjectConfig) -> bool {
    if path == config.config_path {
        return false;
    }
    let root = config.get_root();
    config.is_self_written(path)
        || is_hidden(path, root)
        || path
            .strip_prefix(root)
            .unwrap_or(path)
            .components()
            .any(|c| IGNORED_DIRS.iter().any(|d| c.as_os_str() == *d))
        || is_temp_file(path)
}

/// Check if path is a temp/backup file (editor artifacts).
pub(super) fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || name.starts_with(".#")
        || name == "4913"
}

/// Rebuild scope required by one change, `None` when nothing should happen.
///
/// - `wap.toml` edits always need a full rebuild.
/// - A file created under the route tree adds a route: `Full`.
/// - A removed backend source is left to the user's tooling.
/// - Other removals go `Full` when they may drop a route or touch the
///   backend, `FrontendOnly` inside the rest of the frontend.
/// - Anything else is `FrontendOnly` inside the frontend, `Full` outside.
pub(super) fn classify(change: &FsChange, config: &ProjectConfig) -> Option<RebuildScope> {
    let path = change.path.as_path();
    if path == config.config_path {
        return Some(RebuildScope::Full);
    }

    let in_routes = path.starts_with(&config.frontend.routes);
    let in_frontend = path.starts_with(&config.frontend.dir);

    let scope = match change.kind {
        ChangeKind::Created if in_routes => RebuildScope::Full,
        ChangeKind::Removed if config.backend.is_source(path) => return None,
        ChangeKind::Removed if in_routes || !in_frontend => RebuildScope::Full,
        // Directory mtime churn carries no content change.
        ChangeKind::Modified if path.is_dir() => return None,
        _ if in_frontend => RebuildScope::FrontendOnly,
        _ => RebuildScope::Full,
    };
    Some(scope)
}

/// Classify every change of one event and keep the widest scope.
///
/// Returns the change that decided the scope alongside it.
pub(super) fn classify_all<'a>(
    changes: &'a [FsChange],
    config: &ProjectConfig,
) -> Option<(RebuildScope, &'a FsChange)> {
    changes
        .iter()
        .filter_map(|change| classify(change, config).map(|scope| (scope, change)))
        .max_by_key(|(scope, _)| scope.is_full())
}
