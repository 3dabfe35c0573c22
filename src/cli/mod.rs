//! Command-line interface module.

mod args;
pub mod build;
mod common;
pub mod run;

pub use args::{BuildArgs, Cli, Commands};
