//! `[backend]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [backend]
//! dir = "backend"
//! static_dir = "backend/public/build"     # Bundler output, served by the backend
//! generated = "backend/wap_gen.go"        # Overwritten on every full rebuild
//! binary = "app"                          # `.exe` is appended on Windows
//! build = ["go", "build", "-o", "$WAP_BINARY", "."]
//! source_extensions = ["go"]
//! ```
//!
//! `build` runs inside `dir`. `$WAP_BINARY`, `$WAP_BACKEND_DIR` and `$WAP_ROOT`
//! are expanded in every argument. Set `run` to launch something other than
//! the compiled binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Backend source tree and toolchain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub dir: PathBuf,

    /// Where page artifacts (`<page>.js`, `<page>.css`) are written.
    pub static_dir: PathBuf,

    /// Generated backend source file.
    pub generated: PathBuf,

    /// Compiled binary name, relative to `dir`.
    pub binary: String,

    /// Host toolchain build command.
    pub build: Vec<String>,

    /// Launch command override (default: the compiled binary).
    pub run: Option<Vec<String>>,

    /// Extensions of hand-written backend sources.
    pub source_extensions: Vec<String>,
}

impl BackendConfig {
    /// Platform-specific binary file name.
    pub fn binary_name(&self) -> String {
        if cfg!(windows) && !self.binary.ends_with(".exe") {
            format!("{}.exe", self.binary)
        } else {
            self.binary.clone()
        }
    }

    /// Absolute path of the compiled binary.
    pub fn binary_path(&self) -> PathBuf {
        self.dir.join(self.binary_name())
    }

    /// Whether `path` is a hand-written backend source file.
    pub fn is_source(&self, path: &Path) -> bool {
        path.starts_with(&self.dir)
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| self.source_extensions.iter().any(|s| s == ext))
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            dir: "backend".into(),
            static_dir: "backend/public/build".into(),
            generated: "backend/wap_gen.go".into(),
            binary: "app".into(),
            build: ["go", "build", "-o", "$WAP_BINARY", "."]
                .into_iter()
                .map(String::from)
                .collect(),
            run: None,
            source_extensions: vec!["go".into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_backend_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.backend.binary, "app");
        assert_eq!(config.backend.build[0], "go");
        assert!(config.backend.run.is_none());
    }

    #[test]
    fn test_backend_run_override() {
        let config = test_parse_config("[backend]\nrun = [\"air\"]");
        assert_eq!(config.backend.run, Some(vec!["air".to_string()]));
    }

    #[test]
    fn test_is_source() {
        let backend = BackendConfig {
            dir: "/p/backend".into(),
            ..Default::default()
        };
        assert!(backend.is_source(Path::new("/p/backend/main.go")));
        assert!(backend.is_source(Path::new("/p/backend/handlers/api.go")));
        assert!(!backend.is_source(Path::new("/p/backend/go.mod")));
        assert!(!backend.is_source(Path::new("/p/frontend/main.go")));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_binary_path() {
        let backend = BackendConfig {
            dir: "/p/backend".into(),
            ..Default::default()
        };
        assert_eq!(backend.binary_path(), PathBuf::from("/p/backend/app"));
    }
}
