//! Command-line interface for recordforge.
//!
//! Provides commands to run a generation job end to end, preview records
//! and list the built-in specifications.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
