//! Route discovery.

use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::route::{Page, PageLayout};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("route directory `{0}` does not exist")]
    MissingRoot(PathBuf),

    #[error("`{first}` and `{second}` both map to page `{id}`")]
    DuplicateRoute {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Walk `root` recursively and derive one page per file.
///
/// Pages are ordered by relative path. Hidden files and directories are
/// skipped.
pub fn scan_routes(root: &Path, layout: &PageLayout) -> Result<Vec<Page>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingRoot(root.to_path_buf()));
    }

    let mut files = collect_files(root);
    files.sort();

    let mut seen: FxHashMap<String, PathBuf> = FxHashMap::default();
    let mut pages = Vec::with_capacity(files.len());

    for source in files {
        let relative = source.strip_prefix(root).unwrap_or(&source).to_path_buf();
        let page = Page::new(source.clone(), &relative, layout);

        if let Some(first) = seen.insert(page.id.clone(), source.clone()) {
            return Err(ScanError::DuplicateRoute {
                id: page.id,
                first,
                second: source,
            });
        }
        pages.push(page);
    }

    crate::debug!("scan"; "found {} pages under {}", pages.len(), root.display());
    Ok(pages)
}

/// Every non-directory entry under `root`.
///
/// Unreadable entries are reported and skipped so one bad directory does not
/// hide the rest of the route tree.
fn collect_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).skip_hidden(true) {
        match entry {
            Ok(e) if !e.file_type().is_dir() => files.push(e.path()),
            Ok(_) => {}
            Err(err) => crate::log!("scan"; "skipping unreadable entry: {}", err),
        }
    }
    files
}
