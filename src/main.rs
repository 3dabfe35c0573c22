//! wap - development orchestrator for multi-page Svelte frontends with a Go backend.

mod actor;
mod build;
mod cli;
mod config;
mod core;
mod embed;
mod emit;
mod logger;
mod page;
mod process;
mod reload;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::{ProjectConfig, init_config};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = init_config(ProjectConfig::load(cli)?);

    match &cli.command {
        Commands::Build { .. } => cli::build::build_project(&config),
        Commands::Run { .. } => cli::run::run_dev(config),
    }
}
