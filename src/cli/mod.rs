//! CLI module
//!
//! # Commands
//!
//! - `fetch <NAME>` - Fetch one config object using `--url`/`--api-key` or `REFLEX_*`
//! - `load` - Resolve settings from secret files or environment and fetch `REFLEX_CONFIG`
//! - `login` - Force a login and print the session summary

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
