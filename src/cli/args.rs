//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Development orchestrator for a multi-page frontend with a compiled backend
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: wap.toml, searched upward)
    #[arg(short = 'C', long, default_value = "wap.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build all pages, generate backend routes and compile the backend
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Watch the project, rebuild on change, restart the backend and reload browsers
    #[command(visible_alias = "r")]
    Run {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Live reload WebSocket port
        #[arg(short = 'p', long)]
        reload_port: Option<u16>,
    },
}

/// Shared arguments for Build and Run commands
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

impl Cli {
    pub const fn build_args(&self) -> &BuildArgs {
        match &self.command {
            Commands::Build { build_args } | Commands::Run { build_args, .. } => build_args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from(["wap", "run", "--reload-port", "9000", "-V"]);
        assert!(cli.build_args().verbose);
        assert!(matches!(
            cli.command,
            Commands::Run {
                reload_port: Some(9000),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_build_with_config() {
        let cli = Cli::parse_from(["wap", "-C", "site/wap.toml", "build"]);
        assert!(matches!(cli.command, Commands::Build { .. }));
        assert_eq!(cli.config, PathBuf::from("site/wap.toml"));
        assert!(!cli.build_args().verbose);
    }

    #[test]
    fn test_default_config_name() {
        let cli = Cli::parse_from(["wap", "b"]);
        assert_eq!(cli.config, PathBuf::from("wap.toml"));
    }
}
