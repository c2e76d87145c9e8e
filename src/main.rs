//! Press API documentation generator - command-line tool.
//!
//! # Usage
//!
//! ```bash
//! press-apidoc [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Print the endpoint groups as JSON:
//! ```bash
//! press-apidoc ./press
//! ```
//!
//! Write an OpenAPI document as YAML:
//! ```bash
//! press-apidoc ./press -m openapi -f yaml -o openapi.yaml
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! press-apidoc ./press -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use press_apidoc::cli;

fn main() -> Result<()> {
    // Parse once to read the verbose flag before the logger exists, validate afterwards
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // RUST_LOG directives take precedence over the default level
    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    info!("Press API documentation generator starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;

    cli::run(args)?;

    info!("API documentation generation completed successfully");

    Ok(())
}
