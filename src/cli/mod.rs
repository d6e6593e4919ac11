//! CLI module - argument parsing, command dispatch and report rendering

pub mod args;
pub mod commands;
pub mod helpers;
pub mod report;

pub use args::{Cli, Commands, GlobalOpts, OutputFormat, SourceArgs};
