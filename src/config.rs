//! Generator configuration.
//!
//! Every convention the generator relies on (where to scan, what to skip, which
//! decorators mark endpoints, where the generic document endpoints live) is a
//! configuration value. The defaults describe a Press checkout; any of them can
//! be overridden from a TOML file passed with `--config`.

use crate::error::{Error, Result};
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub scan: ScanConfig,
    pub allow_list: AllowListConfig,
    pub conventions: Conventions,
    pub endpoints: EndpointConfig,
    pub openapi: OpenApiConfig,
}

/// Which part of the project tree is scanned
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory to walk, relative to the project root
    pub scan_dir: PathBuf,
    /// Dotted module path of `scan_dir`
    pub base_module: String,
    /// Path prefixes to skip, relative to the project root
    pub exclude: Vec<String>,
    /// Files starting with this prefix are never scanned
    pub test_file_prefix: String,
    /// Skip files with syntax errors instead of aborting the run
    pub skip_unparsable: bool,
}

/// Location of the doctype allow-list
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AllowListConfig {
    /// File holding the list, relative to the project root
    pub file: PathBuf,
    /// Top-level variable the list is assigned to
    pub variable: String,
}

/// Source conventions recognised by the symbol extractor
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Conventions {
    /// Decorator marking a module function as a public API method
    pub public_decorator: String,
    /// Decorator marking a document method as callable from the dashboard
    pub exposed_decorator: String,
    /// Class attribute listing the fields shown on the dashboard
    pub dashboard_fields_attr: String,
}

/// Paths and defaults of the synthesized endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Prefix of every whitelisted method path
    pub method_prefix: String,
    /// Generic endpoint that runs a whitelisted document method
    pub dispatch_path: String,
    /// Generic endpoint returning one document
    pub get_path: String,
    /// Generic endpoint returning a list of documents
    pub list_path: String,
    /// Default shown for document-name parameters
    pub name_placeholder: String,
    /// Default page size of the list endpoint
    pub list_limit: String,
}

/// Static metadata of the OpenAPI document
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenApiConfig {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    pub servers: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_dir: PathBuf::from("press/api"),
            base_module: "press.api".to_string(),
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            test_file_prefix: "test_".to_string(),
            skip_unparsable: false,
        }
    }
}

const DEFAULT_EXCLUDES: &[&str] = &[
    "backbone",
    "dashboard",
    "debugging",
    "deployment",
    "press/playbooks",
    "press/marketplace",
    "press/experimental",
    "press/press/report",
    "press/saas",
    "press/www",
    "press/patches",
    "press/api/tests",
    "press/config",
    "press/scripts",
    "press/templates",
    "press/tests",
    "press/api/developer",
    "press/partner",
    "setup.py",
    "press/commands.py",
    "press/overrides.py",
    "press/agent.py",
    "press/exceptions.py",
    "press/hooks.py",
    "press/install.py",
    "press/auth.py",
    "press/telegram_utils.py",
    "press/__init__.py",
    "press/sanity.py",
    "press/bootstrap.py",
    "press/notifications.py",
    "press/metrics.py",
    "press/runner.py",
    "press/press/audit.py",
    "press/press/__init__.py",
    "press/press/cleanup.py",
];

impl Default for AllowListConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("press/api/client.py"),
            variable: "ALLOWED_DOCTYPES".to_string(),
        }
    }
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            public_decorator: "frappe.whitelist".to_string(),
            exposed_decorator: "dashboard_whitelist".to_string(),
            dashboard_fields_attr: "dashboard_fields".to_string(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            method_prefix: "/api/method/".to_string(),
            dispatch_path: "/api/method/press.api.client.run_doc_method".to_string(),
            get_path: "/api/method/press.api.client.get".to_string(),
            list_path: "/api/method/press.api.client.get_list".to_string(),
            name_placeholder: "<name>".to_string(),
            list_limit: "100".to_string(),
        }
    }
}

impl Default for OpenApiConfig {
    fn default() -> Self {
        Self {
            title: "Press API".to_string(),
            version: "1.0.0".to_string(),
            description: Some("API reference generated from the Press source tree".to_string()),
            servers: vec!["https://frappecloud.com".to_string()],
        }
    }
}

impl GeneratorConfig {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let config: GeneratorConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Merge CLI arguments into config (CLI takes precedence)
    pub fn merge_cli(
        &mut self,
        scan_dir: Option<PathBuf>,
        base_module: Option<String>,
        skip_unparsable: bool,
    ) {
        if let Some(dir) = scan_dir {
            self.scan.scan_dir = dir;
        }

        if let Some(module) = base_module {
            self.scan.base_module = module;
        }

        if skip_unparsable {
            self.scan.skip_unparsable = true;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.scan.scan_dir.is_absolute() {
            return Err(Error::ConfigError(
                "scan.scan_dir must be relative to the project root".to_string(),
            ));
        }

        if self.scan.exclude.iter().any(|e| Path::new(e).is_absolute()) {
            return Err(Error::ConfigError(
                "scan.exclude entries must be relative to the project root".to_string(),
            ));
        }

        if self.scan.base_module.split('.').any(str::is_empty) && !self.scan.base_module.is_empty() {
            return Err(Error::ConfigError(format!(
                "scan.base_module is not a dotted module path: {:?}",
                self.scan.base_module
            )));
        }

        if self.conventions.public_decorator.is_empty() || self.conventions.exposed_decorator.is_empty() {
            return Err(Error::ConfigError("decorator names must not be empty".to_string()));
        }

        Ok(())
    }

    /// Exclusion prefixes joined against the project root
    pub fn excluded_paths(&self, project_root: &Path) -> Vec<PathBuf> {
        self.scan.exclude.iter().map(|e| project_root.join(e)).collect()
    }
}
