//! CLI module
//!
//! Command-line interface over a runtime config file.
//!
//! # Commands
//!
//! - `request` - Send one request (through the queue when configured)
//! - `health` - Probe an endpoint
//! - `paginate` - Collect every page of an endpoint
//! - `methods` - List registered custom auth methods
//! - `authorize-url` - Print the OAuth2 authorization URL
//! - `validate` - Check the config file

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
