//! Press API documentation generator.
//!
//! This library statically analyses the Python sources of a Press (Frappe) checkout and produces
//! a description of its HTTP API without importing or running any of the code. Two kinds of
//! endpoints are found:
//!
//! - module functions decorated with `@frappe.whitelist()`, exposed at
//!   `/api/method/<module>.<function>`;
//! - the generic document endpoints (`run_doc_method`, `get`, `get_list`) of every doctype in the
//!   allow-list, together with the document methods decorated with `@dashboard_whitelist()`.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Walks the API package, skipping excluded paths and test modules
//! 2. [`parser`] - Parses Python files into `tree-sitter` syntax trees
//! 3. [`expr`] - Lowers expression nodes to a small closed shape for annotations and decorators
//! 4. [`extractor`] - Extracts functions, classes and dashboard fields per file
//! 5. [`allowlist`] - Loads the doctypes eligible for the generic document endpoints
//! 6. [`synthesizer`] - Builds the grouped endpoint document
//! 7. [`openapi_builder`] - Renders the endpoints as an OpenAPI 3 document
//! 8. [`serializer`] - Serializes any of the documents to JSON or YAML
//!
//! # Example Usage
//!
//! ```no_run
//! use press_apidoc::{cli, config::GeneratorConfig, serializer::serialize_json};
//! use std::path::Path;
//!
//! let config = GeneratorConfig::default();
//! let generation = cli::generate(Path::new("./press"), &config).unwrap();
//!
//! println!("{}", serialize_json(&generation.document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod allowlist;
pub mod cli;
pub mod config;
pub mod error;
pub mod expr;
pub mod extractor;
pub mod openapi_builder;
pub mod parser;
pub mod scanner;
pub mod serializer;
pub mod synthesizer;
