//! Symbol extraction from parsed source files.
//!
//! This module defines the normalized symbol model the generator works on: the top-level
//! functions and classes of each module, with their arguments, decorators and docstrings. The
//! model carries no syntax-tree types, so the synthesis stage never looks at raw nodes.
//!
//! # Example
//!
//! ```no_run
//! use press_apidoc::config::Conventions;
//! use press_apidoc::extractor::{python::PythonExtractor, SymbolExtractor};
//! use press_apidoc::parser::PythonParser;
//! use press_apidoc::scanner::SourceFile;
//! use std::path::PathBuf;
//!
//! let file = SourceFile {
//!     path: PathBuf::from("press/api/site.py"),
//!     module_path: "press.api.site".to_string(),
//! };
//! let parsed = PythonParser::new().unwrap().parse_file(&file).unwrap();
//! let extractor = PythonExtractor::new(Conventions::default());
//! let trees = extractor.extract_symbols(&[parsed]);
//! println!("Found {} functions", trees[0].functions.len());
//! ```

pub mod python;

use crate::parser::ParsedFile;
use serde::Serialize;

/// Trait for turning parsed files into symbol trees.
pub trait SymbolExtractor {
    /// Extracts one symbol tree per parsed file, in input order.
    fn extract_symbols(&self, parsed_files: &[ParsedFile]) -> Vec<FileSymbolTree>;
}

/// A positional function argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Argument {
    /// The parameter name
    pub name: String,
    /// Rendered annotation, empty when unannotated
    pub annotation: String,
    /// Source text of the default value, empty when there is none
    pub default: String,
}

/// A function or method definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSymbol {
    pub name: String,
    /// Trimmed docstring, empty when absent
    pub docs: String,
    /// Positional arguments in declaration order, without `self`
    pub args: Vec<Argument>,
    /// Dotted names of the recognised decorators, in order
    pub decorators: Vec<String>,
    /// Carries the public API decorator (`frappe.whitelist`)
    pub is_public_endpoint: bool,
    /// Carries the dashboard decorator (`dashboard_whitelist`)
    pub is_exposed_method: bool,
}

/// A class definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassSymbol {
    pub name: String,
    /// Functions defined directly in the class body
    pub methods: Vec<FunctionSymbol>,
    /// Literal entries of the class-level `dashboard_fields` list
    pub dashboard_fields: Vec<String>,
}

/// Everything extracted from one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSymbolTree {
    /// Dotted module path (e.g. `press.api.site`)
    pub module_path: String,
    /// Functions defined at module level
    pub functions: Vec<FunctionSymbol>,
    /// Classes defined at module level
    pub classes: Vec<ClassSymbol>,
}

impl FileSymbolTree {
    /// Create an empty tree for a module
    pub fn new(module_path: String) -> Self {
        Self {
            module_path,
            functions: Vec::new(),
            classes: Vec::new(),
        }
    }

    /// True when the module defines neither functions nor classes
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.classes.is_empty()
    }
}

impl Argument {
    /// Create a new Argument
    pub fn new(name: impl Into<String>, annotation: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: annotation.into(),
            default: default.into(),
        }
    }
}
