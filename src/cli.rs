use crate::allowlist::DoctypeAllowList;
use crate::config::GeneratorConfig;
use crate::extractor::python::PythonExtractor;
use crate::extractor::{FileSymbolTree, SymbolExtractor};
use crate::openapi_builder::OpenApiBuilder;
use crate::parser::{ParsedFile, PythonParser};
use crate::scanner::FileScanner;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use crate::synthesizer::{ApiDocSynthesizer, ApiDocument};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Press API documentation generator - extract whitelisted methods and doctype endpoints from Python sources
#[derive(Parser, Debug)]
#[command(name = "press-apidoc")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the project root (the Press checkout)
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Output format (json or yaml)
    #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Document to produce
    #[arg(short = 'm', long = "mode", value_enum, default_value = "groups")]
    pub mode: OutputMode,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Directory to scan, relative to the project root
    #[arg(long = "scan-dir", value_name = "DIR")]
    pub scan_dir: Option<PathBuf>,

    /// Module path of the scan directory
    #[arg(long = "base-module", value_name = "NAME")]
    pub base_module: Option<String>,

    /// Skip files with syntax errors instead of aborting
    #[arg(long = "skip-invalid")]
    pub skip_invalid: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Which document to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Group name to endpoint list
    Groups,
    /// OpenAPI 3 document
    Openapi,
    /// Raw per-file symbol trees
    Symbols,
}

/// Everything one run extracts from a project.
pub struct Generation {
    /// Symbol trees in scan order
    pub symbols: Vec<FileSymbolTree>,
    /// The synthesized endpoint groups
    pub document: ApiDocument,
    /// Number of files selected by the scanner
    pub files_scanned: usize,
    /// Number of files skipped because they failed to parse
    pub files_skipped: usize,
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        anyhow::bail!("Project path does not exist: {}", args.project_path.display());
    }

    if !args.project_path.is_dir() {
        anyhow::bail!("Project path is not a directory: {}", args.project_path.display());
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output: {:?} as {:?}", args.mode, args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output file: stdout");
    }

    Ok(args)
}

/// Loads the configuration file (if any) and applies the CLI overrides.
pub fn build_config(args: &CliArgs) -> Result<GeneratorConfig> {
    let mut config = match &args.config_path {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => GeneratorConfig::default(),
    };

    config.merge_cli(args.scan_dir.clone(), args.base_module.clone(), args.skip_invalid);
    config.validate()?;
    Ok(config)
}

/// Runs scan, parse, extraction and synthesis over `project_root`.
///
/// # Errors
///
/// Returns an error if the scan directory is missing, or if a file fails to parse and
/// `scan.skip_unparsable` is off. The parse failure can be downcast to
/// [`crate::error::Error::ParseError`].
pub fn generate(project_root: &Path, config: &GeneratorConfig) -> Result<Generation> {
    info!("Scanning {}...", project_root.join(&config.scan.scan_dir).display());
    let scan_result = FileScanner::from_config(project_root, config).scan()?;
    info!("Found {} Python files", scan_result.files.len());
    if scan_result.files.is_empty() {
        warn!("No Python files found in the scan directory");
    }

    info!("Parsing Python files...");
    let parse_results = PythonParser::new()?.parse_files(&scan_result.files);

    let mut parsed_files: Vec<ParsedFile> = Vec::with_capacity(parse_results.len());
    let mut files_skipped = 0;
    for (file, result) in scan_result.files.iter().zip(parse_results) {
        match result {
            Ok(parsed) => parsed_files.push(parsed),
            Err(_) if config.scan.skip_unparsable => {
                debug!("Skipping unparsable file: {}", file.path.display());
                files_skipped += 1;
            }
            Err(e) => return Err(e.context("Aborting: a scanned file could not be parsed")),
        }
    }
    info!("Successfully parsed {} files", parsed_files.len());

    info!("Extracting symbols...");
    let symbols = PythonExtractor::new(config.conventions.clone()).extract_symbols(&parsed_files);

    let allow_list = DoctypeAllowList::load(project_root, &config.allow_list);
    info!("Loaded {} allowed doctypes", allow_list.len());

    let document = ApiDocSynthesizer::new(&config.endpoints, &allow_list).synthesize(&symbols);

    Ok(Generation {
        symbols,
        document,
        files_scanned: scan_result.files.len(),
        files_skipped,
    })
}

/// Serializes the requested document of a generation.
pub fn render(
    generation: &Generation,
    mode: OutputMode,
    format: OutputFormat,
    config: &GeneratorConfig,
) -> Result<String> {
    match mode {
        OutputMode::Groups => serialize(&generation.document, format),
        OutputMode::Symbols => serialize(&generation.symbols, format),
        OutputMode::Openapi => {
            let mut builder = OpenApiBuilder::from_config(&config.openapi);
            builder.add_document(&generation.document);
            serialize(&builder.build(), format)
        }
    }
}

fn serialize<T: Serialize>(doc: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serialize_json(doc),
        OutputFormat::Yaml => serialize_yaml(doc),
    }
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting API documentation generation...");

    let config = build_config(&args)?;
    let generation = generate(&args.project_path, &config)?;

    info!("Serializing {:?} document as {:?}...", args.mode, args.output_format);
    let content = render(&generation, args.mode, args.output_format, &config)?;

    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
    } else {
        println!("{}", content);
    }

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Files scanned: {}", generation.files_scanned);
    info!("  - Files parsed: {}", generation.files_scanned - generation.files_skipped);
    if generation.files_skipped > 0 {
        info!("  - Files skipped: {}", generation.files_skipped);
    }
    info!("  - Groups: {}", generation.document.groups.len());
    info!("  - Endpoints: {}", generation.document.endpoint_count());

    Ok(())
}
