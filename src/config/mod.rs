//! Project configuration management for `wap.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── frontend   # [frontend]
//! │   ├── backend    # [backend]
//! │   └── serve      # [serve]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError
//! │   └── handle     # Global config handle
//! └── mod.rs         # ProjectConfig (this file)
//! ```
//!
//! A missing `wap.toml` is not an error: every key has a default matching the
//! conventional project layout (`frontend/src/routes`, `backend/`).

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{BackendConfig, FrontendConfig, ServeConfig};
pub use types::{ConfigError, cfg, init_config, reload_config};

use crate::{
    cli::{Cli, Commands},
    log,
    utils::path::normalize_path,
};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Directory (relative to root) holding transient per-page build inputs.
pub const TMP_DIR: &str = ".wap";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing wap.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// CLI arguments reference (internal use only)
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub frontend: FrontendConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub serve: ServeConfig,
}

impl ProjectConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd to find the config file. The project root is
    /// the config file's parent directory, or cwd when no file exists.
    pub fn load(cli: &'static Cli) -> Result<Self> {
        let (config_path, exists) = Self::resolve_config_path(cli)?;

        let mut config = if exists {
            Self::from_path(&config_path)?
        } else {
            crate::debug!("config"; "{} not found, using defaults", cli.config.display());
            Self::default()
        };

        config.config_path = config_path;
        config.cli = Some(cli);
        config.finalize(cli);
        config.validate()?;

        Ok(config)
    }

    /// Resolve config file path, searching upward from cwd.
    fn resolve_config_path(cli: &Cli) -> Result<(PathBuf, bool)> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        match find_config_file(&cli.config) {
            Some(path) => Ok((path, true)),
            None => Ok((cwd.join(&cli.config), false)),
        }
    }

    /// Finalize configuration after loading.
    fn finalize(&mut self, cli: &Cli) {
        let root = self
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        self.normalize_paths(&root);
        self.apply_command_options(cli);
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.root = path.to_path_buf();
    }

    /// Join a path with the root directory.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Get path relative to the project root
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    /// Directory for transient bundler inputs (`<root>/.wap/build`).
    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join(TMP_DIR).join("build")
    }

    /// Whether `path` is something this tool writes itself.
    ///
    /// Events on these paths must never schedule a rebuild.
    pub fn is_self_written(&self, path: &Path) -> bool {
        path.starts_with(&self.backend.static_dir)
            || path.starts_with(self.root.join(TMP_DIR))
            || path == self.backend.generated
            || path == self.backend.binary_path()
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        crate::logger::set_verbose(cli.build_args().verbose);

        if let Commands::Run { reload_port, .. } = &cli.command {
            Self::update_option(&mut self.serve.reload_port, reload_port.as_ref());
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Normalize all paths relative to root directory.
    fn normalize_paths(&mut self, root: &Path) {
        let root = normalize_path(root);
        self.set_root(&root);
        self.config_path = normalize_path(&self.config_path);

        let join = |p: &Path| Self::resolve_path(p, &root);
        self.frontend.dir = join(&self.frontend.dir);
        self.frontend.routes = join(&self.frontend.routes);
        self.backend.dir = join(&self.backend.dir);
        self.backend.static_dir = join(&self.backend.static_dir);
        self.backend.generated = join(&self.backend.generated);
    }

    /// Expand a leading `~` and resolve relative paths against `root`.
    fn resolve_path(path: &Path, root: &Path) -> PathBuf {
        let path = match path.to_str() {
            Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
            None => path.to_path_buf(),
        };
        let full_path = if path.is_relative() {
            root.join(&path)
        } else {
            path
        };
        normalize_path(&full_path)
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration values that would make every cycle fail.
    pub fn validate(&self) -> Result<()> {
        if self.frontend.bundler.is_empty() {
            bail!(ConfigError::Validation("`frontend.bundler` is empty".into()));
        }
        if self.backend.build.is_empty() {
            bail!(ConfigError::Validation("`backend.build` is empty".into()));
        }
        if self.backend.run.as_ref().is_some_and(Vec::is_empty) {
            bail!(ConfigError::Validation("`backend.run` is empty".into()));
        }
        if self.backend.binary.is_empty() {
            bail!(ConfigError::Validation("`backend.binary` is empty".into()));
        }
        if self.frontend.build_timeout == Some(0) {
            bail!(ConfigError::Validation(
                "`frontend.build_timeout` must be at least 1 second".into()
            ));
        }
        if !self.backend.static_dir.starts_with(&self.backend.dir)
            && self.backend.run.is_none()
        {
            log!(
                "warning";
                "`backend.static_dir` is outside `backend.dir`, the backend may not find page artifacts"
            );
        }
        Ok(())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ProjectConfig {
    let (parsed, ignored) = ProjectConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Default config with every path resolved against `root`.
#[cfg(test)]
pub fn test_config_at(root: &Path) -> ProjectConfig {
    let mut config = ProjectConfig {
        config_path: root.join("wap.toml"),
        ..Default::default()
    };
    config.normalize_paths(root);
    config
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_str_invalid_toml() {
        let result = ProjectConfig::parse_with_ignored("[frontend\ndir = \"web\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_set_root() {
        let mut config = ProjectConfig::default();
        config.set_root(Path::new("/custom/path"));
        assert_eq!(config.get_root(), Path::new("/custom/path"));
        assert_eq!(config.tmp_dir(), Path::new("/custom/path/.wap/build"));
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[serve]\nreload_port = 9000\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = ProjectConfig::parse_with_ignored(content).unwrap();
        assert_eq!(config.serve.reload_port, 9000);
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_normalize_paths_against_root() {
        let temp = TempDir::new().unwrap();
        let config = test_config_at(temp.path());
        let root = temp.path().canonicalize().unwrap();

        assert_eq!(config.root, root);
        assert_eq!(config.frontend.routes, root.join("frontend/src/routes"));
        assert_eq!(config.backend.static_dir, root.join("backend/public/build"));
        assert_eq!(config.backend.generated, root.join("backend/wap_gen.go"));
    }

    #[test]
    fn test_tilde_paths_expanded() {
        let temp = TempDir::new().unwrap();
        let home = PathBuf::from(shellexpand::tilde("~").into_owned());

        let resolved = ProjectConfig::resolve_path(Path::new("~/sites/app"), temp.path());
        assert!(resolved.starts_with(&home));
        assert!(resolved.ends_with("sites/app"));
        assert!(!resolved.starts_with(temp.path()));

        let relative = ProjectConfig::resolve_path(Path::new("frontend"), temp.path());
        assert_eq!(relative, temp.path().canonicalize().unwrap().join("frontend"));
    }

    #[test]
    fn test_self_written_paths() {
        let temp = TempDir::new().unwrap();
        let config = test_config_at(temp.path());
        let root = &config.root;

        assert!(config.is_self_written(&root.join("backend/public/build/index.js")));
        assert!(config.is_self_written(&root.join("backend/wap_gen.go")));
        assert!(config.is_self_written(&config.backend.binary_path()));
        assert!(config.is_self_written(&root.join(".wap/build/index/build.js")));
        assert!(!config.is_self_written(&root.join("backend/main.go")));
        assert!(!config.is_self_written(&root.join("frontend/src/routes/index.svelte")));
    }

    #[test]
    fn test_validate_rejects_empty_commands() {
        let temp = TempDir::new().unwrap();
        let mut config = test_config_at(temp.path());
        assert!(config.validate().is_ok());

        config.frontend.bundler.clear();
        assert!(config.validate().is_err());

        let mut config = test_config_at(temp.path());
        config.backend.run = Some(Vec::new());
        assert!(config.validate().is_err());
    }
}
