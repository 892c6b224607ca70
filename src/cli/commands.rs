//! CLI commands and argument parsing

use crate::types::Method;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Integration runtime CLI
#[derive(Parser, Debug)]
#[command(name = "integration-runtime")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Runtime configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Inline auth payload JSON, replacing the configured one
    #[arg(long, global = true)]
    pub auth_json: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a single request and print the response body
    Request {
        /// HTTP method
        method: Method,

        /// Endpoint, relative to the base URL or absolute
        endpoint: String,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,

        /// Extra header as NAME:VALUE (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Request timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Probe an endpoint and report health
    Health {
        /// Endpoint to probe
        #[arg(long, default_value = crate::http::DEFAULT_HEALTH_ENDPOINT)]
        endpoint: String,
    },

    /// Fetch every page of a page-numbered endpoint
    Paginate {
        /// Endpoint to paginate
        endpoint: String,

        /// Records per page
        #[arg(long, default_value = "50")]
        limit: u32,

        /// Maximum pages to fetch
        #[arg(long, default_value = "10")]
        max_pages: u32,
    },

    /// List registered custom auth methods
    Methods,

    /// Print the OAuth2 authorization URL for the configured client
    AuthorizeUrl {
        /// Opaque state parameter
        #[arg(long)]
        state: Option<String>,
    },

    /// Validate the configuration file
    Validate,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One JSON document per line
    Json,
    /// Indented JSON
    Pretty,
}
