use std::path::{Path, PathBuf};
use std::sync::Arc;

use jwalk::WalkDir;
use notify::{RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

use super::classifier::is_ignored;
use crate::config::ProjectConfig;

/// Per-directory watch registrations.
///
/// Every directory under the project root is watched non-recursively so
/// ignored trees (`node_modules`, `.git`, the artifact directory) never cost a
/// watch descriptor. Directories created later are added as they appear.
pub(super) struct WatchSet {
    watched: FxHashSet<PathBuf>,
}

impl WatchSet {
    pub(super) fn new() -> Self {
        Self {
            watched: FxHashSet::default(),
        }
    }

    /// Watch `dir` and every non-ignored directory below it.
    ///
    /// Returns how many directories were newly added.
    pub(super) fn add_tree<W: Watcher>(
        &mut self,
        watcher: &mut W,
        dir: &Path,
        config: &Arc<ProjectConfig>,
    ) -> usize {
        let mut added = 0;
        for path in collect_dirs(dir, config) {
            if self.watched.contains(&path) {
                continue;
            }
            match watcher.watch(&path, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    crate::debug!("watch"; "watching {}", path.display());
                    self.watched.insert(path);
                    added += 1;
                }
                Err(e) => crate::debug!("watch"; "cannot watch {}: {}", path.display(), e),
            }
        }
        added
    }

    /// Drop registrations at or below a removed path.
    ///
    /// The OS has already released the watches; a directory recreated under
    /// the same name is picked up again by `add_tree`.
    pub(super) fn forget(&mut self, path: &Path) {
        self.watched.retain(|p| !p.starts_with(path));
    }

    pub(super) fn len(&self) -> usize {
        self.watched.len()
    }

    #[cfg(test)]
    pub(super) fn contains(&self, path: &Path) -> bool {
        self.watched.contains(path)
    }
}

/// `dir` plus all directories below it, pruning ignored subtrees.
pub(super) fn collect_dirs(dir: &Path, config: &Arc<ProjectConfig>) -> Vec<PathBuf> {
    if !dir.is_dir() || is_ignored(dir, config) {
        return Vec::new();
    }

    let config = Arc::clone(config);
    let mut dirs: Vec<PathBuf> = WalkDir::new(dir)
        .process_read_dir(move |_, _, _, children| {
            children.retain(|entry| {
                entry
                    .as_ref()
                    .is_ok_and(|e| e.file_type().is_dir() && !is_ignored(&e.path(), &config))
            });
        })
        .into_iter()
        .filter_map(Result::ok)
        .map(|e| e.path())
        .collect();
    dirs.sort();
    dirs
}
