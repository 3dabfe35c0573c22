use std::path::Path;
use std::time::Instant;

use rustc_hash::FxHashSet;

use super::{CycleError, Pending, RebuildActor};
use crate::actor::messages::Trigger;
use crate::build::{BuildReport, Bundler, PageBuilder, prune_stale_artifacts};
use crate::config::{cfg, reload_config};
use crate::core::RebuildScope;
use crate::emit::{CodeEmitter, GoEmitter};
use crate::logger::{status_error, status_success};
use crate::page::{Page, PageLayout, scan_routes};
use crate::process::Supervisor;

impl<B: Bundler> RebuildActor<B> {
    /// Run one cycle, report it, and notify browsers on success.
    pub(super) async fn cycle(&mut self, pending: Pending) {
        let started = Instant::now();
        for trigger in &pending.triggers {
            crate::log!(
                "watch";
                "{} {}",
                trigger.kind.label(),
                self.config.root_relative(&trigger.path).display()
            );
        }

        // Nothing to rebuild selectively before the first successful scan,
        // and a route the last scan never saw needs a rescan.
        let scope = if self.pages.is_empty()
            || has_unknown_route(&self.pages, &pending.triggers, &self.config.frontend.routes)
        {
            RebuildScope::Full
        } else {
            pending.scope
        };

        let outcome = match scope {
            RebuildScope::Full => self.full(&pending.triggers).await,
            RebuildScope::FrontendOnly => self.frontend(&pending.triggers).await,
        };

        match outcome {
            Ok(summary) => {
                let elapsed = started.elapsed().as_secs_f64();
                status_success(&format!("{summary} in {elapsed:.2}s"));
                self.notify().await;
            }
            Err(err) => status_error(&format!("{scope} rebuild failed: {err}"), err.detail()),
        }
    }

    /// Rescan routes, rebuild every page, regenerate backend source and
    /// restart the backend.
    ///
    /// Page failures do not stop the restart, so the route table always
    /// matches the route tree; they only suppress the browser reload.
    async fn full(&mut self, triggers: &[Trigger]) -> Result<String, CycleError> {
        if triggers.iter().any(|t| t.path == self.config.config_path) {
            self.apply_config_reload().await?;
        }

        let layout = PageLayout::from_config(&self.config);
        let pages = scan_routes(&self.config.frontend.routes, &layout)?;
        let report = self.builder.build(pages).await;

        let pruned = prune_stale_artifacts(&self.config.backend.static_dir, &report.pages);
        if pruned > 0 {
            crate::debug!("rebuild"; "pruned {} stale artifacts", pruned);
        }
        self.pages = report.pages.clone();

        self.emitter.emit(&self.pages, true, true)?;
        self.restart_backend().await?;
        check_pages(&report)?;

        Ok(format!(
            "rebuilt {} and restarted backend",
            plural_pages(report.results.len())
        ))
    }

    /// Rebuild the changed page, or every page when a shared file changed.
    ///
    /// The backend keeps running unless the set of pages with a stylesheet
    /// changed, since the route table embeds stylesheet links.
    async fn frontend(&mut self, triggers: &[Trigger]) -> Result<String, CycleError> {
        let targets = select_pages(&self.pages, triggers);
        let styled_before = styled_ids(&self.pages);

        let report = self.builder.build(targets).await;
        for page in &report.pages {
            if let Some(slot) = self.pages.iter_mut().find(|p| p.id == page.id) {
                *slot = page.clone();
            }
        }

        if styled_ids(&self.pages) != styled_before {
            crate::debug!("rebuild"; "stylesheet set changed, regenerating backend");
            self.emitter.emit(&self.pages, true, true)?;
            self.restart_backend().await?;
        }
        check_pages(&report)?;

        Ok(match report.pages.as_slice() {
            [page] => format!("rebuilt {}", page.name),
            pages => format!("rebuilt {}", plural_pages(pages.len())),
        })
    }

    /// Kill and relaunch the backend, then give it time to bind its port.
    async fn restart_backend(&mut self) -> Result<(), CycleError> {
        self.supervisor.relaunch().await?;
        crate::debug!(
            "rebuild";
            "backend {:?} (pid {})",
            self.supervisor.state(),
            self.supervisor.pid().unwrap_or_default()
        );
        tokio::time::sleep(self.config.serve.settle()).await;
        Ok(())
    }

    /// Re-read `wap.toml` and rebuild components that depend on it.
    ///
    /// The reload port stays as bound at startup.
    async fn apply_config_reload(&mut self) -> Result<(), CycleError> {
        if !reload_config().map_err(CycleError::Config)? {
            return Ok(());
        }

        self.config = cfg();
        self.builder = PageBuilder::new((self.make_bundler)(&self.config));
        self.emitter = GoEmitter::from_config(&self.config).with_reload_port(self.reload_port);

        // The old process must be gone before its replacement is configured.
        self.supervisor.stop().await;
        self.supervisor = Supervisor::from_config(&self.config);

        crate::log!("config"; "reloaded {}", self.config.root_relative(&self.config.config_path).display());
        Ok(())
    }
}

/// Pages to rebuild for a frontend-only cycle.
///
/// Only the edited pages when every trigger is a page source, otherwise all
/// of them (a shared component may be imported anywhere).
pub(super) fn select_pages(pages: &[Page], triggers: &[Trigger]) -> Vec<Page> {
    let sources: FxHashSet<&Path> = triggers.iter().map(|t| t.path.as_path()).collect();
    let targets: Vec<Page> = pages
        .iter()
        .filter(|p| sources.contains(p.source.as_path()))
        .cloned()
        .collect();

    if targets.is_empty() || targets.len() < sources.len() {
        pages.to_vec()
    } else {
        targets
    }
}

/// Whether a trigger names a file under the route tree that is not a known
/// page, e.g. a route whose creation event fell inside the debounce window.
pub(super) fn has_unknown_route(pages: &[Page], triggers: &[Trigger], routes: &Path) -> bool {
    triggers.iter().any(|t| {
        t.path.starts_with(routes)
            && t.path.is_file()
            && !pages.iter().any(|p| p.source == t.path)
    })
}

fn styled_ids(pages: &[Page]) -> FxHashSet<String> {
    pages
        .iter()
        .filter(|p| p.style.is_some())
        .map(|p| p.id.clone())
        .collect()
}

fn check_pages(report: &BuildReport) -> Result<(), CycleError> {
    let failed: Vec<String> = report
        .failed()
        .map(|r| match r.diagnostic() {
            Some(diagnostic) => format!("{}: {}", r.page, diagnostic),
            None => r.page.clone(),
        })
        .collect();

    if failed.is_empty() {
        return Ok(());
    }
    Err(CycleError::Pages {
        failed: failed.len(),
        total: report.results.len(),
        detail: failed.join("\n"),
    })
}

fn plural_pages(count: usize) -> String {
    if count == 1 {
        "1 page".into()
    } else {
        format!("{count} pages")
    }
}
