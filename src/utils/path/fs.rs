//! Path normalization utilities.
//!
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `is_hidden` - dot-prefixed names, anywhere in the path

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
///
/// The fallback matters for removed files: a deleted path can no longer be
/// canonicalized but must still compare equal to the paths we scanned.
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        };
        // The file itself may be gone while its parent still resolves
        // (e.g. a symlinked temp dir on macOS).
        match (absolute.parent(), absolute.file_name()) {
            (Some(parent), Some(name)) => parent
                .canonicalize()
                .map(|p| p.join(name))
                .unwrap_or(absolute),
            _ => absolute,
        }
    })
}

/// Whether any component of `path` below `base` starts with a dot.
///
/// Components of `base` itself are not inspected, so a project living under
/// `~/.local/src` is not treated as hidden.
pub fn is_hidden(path: &Path, base: &Path) -> bool {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components().any(|c| match c {
        Component::Normal(name) => name.to_str().is_some_and(|n| n.starts_with('.')),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_absolute() {
        let path = Path::new("/absolute/path/file.txt");
        let normalized = normalize_path(path);
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_normalize_path_relative() {
        let path = Path::new("relative/path/file.txt");
        let normalized = normalize_path(path);
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_normalize_removed_file_keeps_canonical_parent() {
        let temp = tempfile::TempDir::new().unwrap();
        let gone = temp.path().join("gone.svelte");
        let normalized = normalize_path(&gone);
        assert_eq!(
            normalized,
            temp.path().canonicalize().unwrap().join("gone.svelte")
        );
    }

    #[test]
    fn test_is_hidden() {
        let base = Path::new("/home/me/.projects/site");
        assert!(!is_hidden(Path::new("/home/me/.projects/site/frontend/a.svelte"), base));
        assert!(is_hidden(Path::new("/home/me/.projects/site/.wap/build/a.js"), base));
        assert!(is_hidden(Path::new("/home/me/.projects/site/frontend/.a.svelte.swp"), base));
    }
}
