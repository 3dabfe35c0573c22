//! One-shot production build.
//!
//! Pipeline: scan routes → build all pages → prune stale artifacts → emit
//! backend source (no live reload) → compile the backend into the project
//! root.

use std::time::Instant;

use anyhow::{Result, bail};

use super::common::{build_runtime, check_tools};
use crate::build::{NodeBundler, PageBuilder, prune_stale_artifacts};
use crate::config::ProjectConfig;
use crate::emit::{CodeEmitter, GoEmitter};
use crate::log;
use crate::page::{PageLayout, scan_routes};
use crate::process::Supervisor;

/// Build the whole project once. Any page failure fails the command.
pub fn build_project(config: &ProjectConfig) -> Result<()> {
    check_tools(config);
    let rt = build_runtime()?;
    rt.block_on(build_once(config))
}

async fn build_once(config: &ProjectConfig) -> Result<()> {
    let started = Instant::now();

    let layout = PageLayout::from_config(config);
    let pages = scan_routes(&config.frontend.routes, &layout)?;
    if pages.is_empty() {
        let routes = config.root_relative(&config.frontend.routes);
        log!("warning"; "no routes in {}", routes.display());
    }

    let report = PageBuilder::new(NodeBundler::from_config(config))
        .build(pages)
        .await;
    for result in report.failed() {
        log!("error"; "{}: {}", result.page, result.diagnostic().unwrap_or_default());
    }
    if !report.is_success() {
        bail!(
            "{} of {} pages failed to build",
            report.failed().count(),
            report.results.len()
        );
    }
    prune_stale_artifacts(&config.backend.static_dir, &report.pages);

    GoEmitter::from_config(config).emit(&report.pages, false, false)?;

    let binary = config.root_join(config.backend.binary_name());
    Supervisor::from_config(config).compile(&binary).await?;

    log!(
        "build";
        "{} pages and {} in {:.2}s",
        report.pages.len(),
        config.root_relative(&binary).display(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
