//! CLI module
//!
//! Command-line interface for running exports.
//!
//! # Commands
//!
//! - `export` - Page through the configured query and upload every batch
//! - `seed` - Create and fill the dummy users table
//! - `check` - Test the source connection and the destination container

mod commands;
mod runner;
mod shutdown;

pub use commands::{Cli, Commands, ModeArg, OutputFormat};
pub use runner::Runner;
pub use shutdown::{ExitCode, ShutdownCoordinator};
