//! The seam to the external frontend compiler.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ProjectConfig;
use crate::embed::bundle::{BUILD_JS, BuildScriptVars, ENTRY_JS, EntryVars};
use crate::page::Page;
use crate::utils::exec::{Cmd, FilterRule};

use super::BuildError;

/// Compiles one page into its script (and optionally style) artifact.
///
/// Implementations only produce artifacts; the coordinator checks which of
/// them exist afterwards.
pub trait Bundler: Send + Sync + 'static {
    fn bundle(&self, page: &Page) -> impl Future<Output = Result<(), BuildError>> + Send;
}

/// Bundler output worth hiding from verbose logs.
static BUNDLER_FILTER: FilterRule = FilterRule::new(&["npm WARN", "(node:"]);

/// Runs a Node-based bundler against a generated per-page build script.
#[derive(Debug, Clone)]
pub struct NodeBundler {
    command: Vec<String>,
    cwd: PathBuf,
    timeout: Option<Duration>,
}

impl NodeBundler {
    pub fn new(command: Vec<String>, cwd: PathBuf, timeout: Option<Duration>) -> Self {
        Self {
            command,
            cwd,
            timeout,
        }
    }

    pub fn from_config(config: &ProjectConfig) -> Self {
        Self::new(
            config.frontend.bundler.clone(),
            config.root.clone(),
            config.frontend.build_timeout(),
        )
    }

    /// Render the entry stub and build script into the page's work dir.
    fn write_inputs(page: &Page) -> std::io::Result<()> {
        std::fs::create_dir_all(page.work_dir())?;

        let entry = ENTRY_JS.render(&EntryVars {
            source: &path_str(&page.source),
        });
        std::fs::write(&page.entry, entry)?;

        let script = BUILD_JS.render(&BuildScriptVars {
            entry: &path_str(&page.entry),
            outfile: &path_str(&page.script),
        });
        std::fs::write(&page.build_script, script)
    }
}

impl Bundler for NodeBundler {
    async fn bundle(&self, page: &Page) -> Result<(), BuildError> {
        Self::write_inputs(page).map_err(|source| BuildError::Inputs {
            page: page.id.clone(),
            source,
        })?;

        Cmd::from_slice(&self.command)
            .arg(&page.build_script)
            .cwd(&self.cwd)
            .timeout(self.timeout)
            .filter(&BUNDLER_FILTER)
            .run()
            .await?;
        Ok(())
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
