//! Concurrent page builds with per-page failure isolation.
//!
//! ```text
//! PageBuilder::build(pages)
//!   ├── task: bundle(index)  ──┐
//!   ├── task: bundle(about)  ──┼── mpsc ──▶ exactly N (page, result) pairs
//!   └── task: bundle(blog)   ──┘
//! ```
//!
//! One failing page never cancels or delays its siblings. The coordinator
//! returns only after every task has reported, then removes the transient
//! bundler inputs.

mod bundler;

pub use bundler::{Bundler, NodeBundler};

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashSet;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::logger::ProgressLine;
use crate::page::Page;
use crate::utils::exec::ExecError;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to write build inputs for `{page}`: {source}")]
    Inputs {
        page: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("bundler exited cleanly but wrote no script at `{}`", .0.display())]
    MissingScript(PathBuf),

    #[error("build task for `{0}` ended without reporting")]
    Aborted(String),
}

/// Outcome of one page's build job.
#[derive(Debug)]
pub struct BuildResult {
    pub page: String,
    pub has_style: bool,
    pub error: Option<BuildError>,
}

impl BuildResult {
    #[inline]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Failure text shown to the user.
    pub fn diagnostic(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

/// Pages with up-to-date style fields, plus one result per page.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub pages: Vec<Page>,
    pub results: Vec<BuildResult>,
}

impl BuildReport {
    pub fn failed(&self) -> impl Iterator<Item = &BuildResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn is_success(&self) -> bool {
        self.results.iter().all(BuildResult::is_success)
    }

    /// Ids of pages that currently have a stylesheet.
    pub fn styled(&self) -> Vec<&str> {
        self.pages
            .iter()
            .filter(|p| p.style.is_some())
            .map(|p| p.id.as_str())
            .collect()
    }
}

/// Runs one bundler job per page, all at once.
pub struct PageBuilder<B> {
    bundler: Arc<B>,
}

impl<B: Bundler> PageBuilder<B> {
    pub fn new(bundler: B) -> Self {
        Self {
            bundler: Arc::new(bundler),
        }
    }

    /// Build every page concurrently and wait for all of them.
    ///
    /// Always yields exactly one result per input page, in input order.
    pub async fn build(&self, pages: Vec<Page>) -> BuildReport {
        let total = pages.len();
        if total == 0 {
            return BuildReport::default();
        }

        let progress = ProgressLine::new("pages", total);
        let (tx, mut rx) = mpsc::channel(total);

        for (index, page) in pages.iter().cloned().enumerate() {
            let tx = tx.clone();
            let bundler = Arc::clone(&self.bundler);
            tokio::spawn(async move {
                let built = build_page(bundler.as_ref(), page).await;
                let _ = tx.send((index, built)).await;
            });
        }
        // Channel closes once every task has sent or died
        drop(tx);

        let mut slots: Vec<Option<(Page, BuildResult)>> =
            std::iter::repeat_with(|| None).take(total).collect();
        while let Some((index, built)) = rx.recv().await {
            slots[index] = Some(built);
            progress.inc();
        }
        progress.finish();

        let mut report = BuildReport {
            pages: Vec::with_capacity(total),
            results: Vec::with_capacity(total),
        };
        for (slot, original) in slots.into_iter().zip(pages) {
            let (page, result) = slot.unwrap_or_else(|| aborted(original));
            if let Some(err) = &result.error {
                crate::debug!("build"; "{} failed: {}", result.page, err);
            }
            remove_inputs(&page);
            report.pages.push(page);
            report.results.push(result);
        }
        report
    }
}

async fn build_page<B: Bundler>(bundler: &B, mut page: Page) -> (Page, BuildResult) {
    // Bundlers leave an old stylesheet in place when the new bundle has none
    remove_if_exists(&page.style_target());

    let outcome = match bundler.bundle(&page).await {
        Ok(()) if !page.script.exists() => Err(BuildError::MissingScript(page.script.clone())),
        other => other,
    };

    if let Err(BuildError::Exec(ExecError::TimedOut { .. })) = &outcome {
        remove_artifacts(&page);
    }

    let style = page.style_target();
    page.style = style.exists().then_some(style);

    let result = BuildResult {
        page: page.id.clone(),
        has_style: page.style.is_some(),
        error: outcome.err(),
    };
    (page, result)
}

/// Result for a task that panicked before reporting.
fn aborted(mut page: Page) -> (Page, BuildResult) {
    let style = page.style_target();
    page.style = style.exists().then_some(style);
    let result = BuildResult {
        page: page.id.clone(),
        has_style: page.style.is_some(),
        error: Some(BuildError::Aborted(page.id.clone())),
    };
    (page, result)
}

/// Delete whatever a killed bundler may have half-written.
fn remove_artifacts(page: &Page) {
    remove_if_exists(&page.script);
    remove_if_exists(&page.style_target());
}

fn remove_inputs(page: &Page) {
    let dir = page.work_dir();
    if dir.exists()
        && let Err(err) = std::fs::remove_dir_all(dir)
    {
        crate::debug!("build"; "failed to remove {}: {}", dir.display(), err);
    }
}

/// Delete `.js`/`.css` files in the static directory that no page owns.
///
/// Returns how many files were removed.
pub fn prune_stale_artifacts(static_dir: &Path, pages: &[Page]) -> usize {
    let owned: FxHashSet<String> = pages.iter().flat_map(Page::artifact_names).collect();
    let Ok(entries) = std::fs::read_dir(static_dir) else {
        return 0;
    };

    let mut removed = 0;
    for path in entries.filter_map(Result::ok).map(|e| e.path()) {
        let is_artifact = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| matches!(ext, "js" | "css"));
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if !is_artifact || owned.contains(name) || !path.is_file() {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(err) => crate::debug!("build"; "failed to remove {}: {}", path.display(), err),
        }
    }
    removed
}

fn remove_if_exists(path: &Path) {
    if let Err(err) = std::fs::remove_file(path)
        && err.kind() != io::ErrorKind::NotFound
    {
        crate::debug!("build"; "failed to remove {}: {}", path.display(), err);
    }
}
