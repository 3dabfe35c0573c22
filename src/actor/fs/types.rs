use std::path::{Path, PathBuf};

use notify::event::{EventKind, ModifyKind, RenameMode};

pub(super) use crate::actor::messages::ChangeKind;
use crate::utils::path::normalize_path;

/// A single path-level change extracted from a notify event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct FsChange {
    pub(super) path: PathBuf,
    pub(super) kind: ChangeKind,
}

impl FsChange {
    pub(super) fn new(path: &Path, kind: ChangeKind) -> Self {
        Self {
            path: normalize_path(path),
            kind,
        }
    }
}

/// Flatten a notify event into path-level changes.
///
/// Permission and other metadata-only events yield nothing, as do access
/// events. Renames are split into a removal of the old path and a creation
/// of the new one.
pub(super) fn changes_from_event(event: &notify::Event) -> Vec<FsChange> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Remove(_) => ChangeKind::Removed,
        EventKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
        EventKind::Modify(ModifyKind::Name(mode)) => return rename_changes(mode, &event.paths),
        EventKind::Modify(_) => ChangeKind::Modified,
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .map(|path| FsChange::new(path, kind))
        .collect()
}

fn rename_changes(mode: RenameMode, paths: &[PathBuf]) -> Vec<FsChange> {
    match (mode, paths) {
        (RenameMode::Both, [from, to, ..]) => vec![
            FsChange::new(from, ChangeKind::Removed),
            FsChange::new(to, ChangeKind::Created),
        ],
        (RenameMode::From, _) => paths
            .iter()
            .map(|p| FsChange::new(p, ChangeKind::Removed))
            .collect(),
        (RenameMode::To, _) => paths
            .iter()
            .map(|p| FsChange::new(p, ChangeKind::Created))
            .collect(),
        // Backends that cannot tell the two halves apart: trust the disk.
        _ => paths
            .iter()
            .map(|p| {
                let kind = if p.exists() {
                    ChangeKind::Created
                } else {
                    ChangeKind::Removed
                };
                FsChange::new(p, kind)
            })
            .collect(),
    }
}
