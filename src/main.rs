// Allow common clippy pedantic lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! `integration-runtime` binary
//!
//! Reads a runtime config (`-C api.yaml`) and talks to the API it describes:
//!
//! ```text
//! integration-runtime -C api.yaml request GET /users -H "Accept: application/json"
//! integration-runtime -C api.yaml paginate /items --limit 100 --max-pages 5
//! integration-runtime -C api.yaml health --endpoint /status
//! integration-runtime -C api.yaml authorize-url --state xyz
//! integration-runtime methods
//! ```
//!
//! Output is JSON on stdout; logs go to stderr (`RUST_LOG`, or `-v` for
//! debug).

use clap::Parser;
use integration_runtime::cli::{Cli, Runner};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let runner = Runner::new(cli);

    if let Err(e) = runner.run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
