use crate::error::Error;
use crate::scanner::SourceFile;
use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};

/// Syntax tree parser for Python source files.
///
/// The `PythonParser` wraps a `tree-sitter` parser loaded with the Python grammar. Trees that
/// contain syntax errors are rejected with [`Error::ParseError`] pointing at the first error, so
/// the extractors only ever see well-formed modules.
///
/// # Example
///
/// ```no_run
/// use press_apidoc::parser::PythonParser;
/// use std::path::Path;
///
/// let mut parser = PythonParser::new().unwrap();
/// let tree = parser.parse_source("def ping():\n    return 'pong'\n", Path::new("ping.py")).unwrap();
/// println!("{} top-level statements", tree.root_node().named_child_count());
/// ```
pub struct PythonParser {
    parser: Parser,
}

/// A successfully parsed Python file with its syntax tree.
///
/// The tree borrows nothing, node text is resolved against `source`.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// Dotted module path assigned by the scanner
    pub module_path: String,
    /// The file content the tree was built from
    pub source: String,
    /// The parsed syntax tree
    pub tree: Tree,
}

impl PythonParser {
    /// Creates a parser with the Python grammar loaded.
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::language())
            .map_err(|e| anyhow!("Failed to load Python grammar: {}", e))?;
        Ok(Self { parser })
    }

    /// Parses Python source text.
    ///
    /// `path` is only used for error reporting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseError`] if the source contains a syntax error.
    pub fn parse_source(&mut self, source: &str, path: &Path) -> Result<Tree> {
        let tree = self.parser.parse(source, None).ok_or_else(|| Error::ParseError {
            file: path.to_path_buf(),
            message: "parser produced no tree".to_string(),
        })?;

        let rejected = first_syntax_error(tree.root_node())
            .map(|node| {
                let what = if node.is_missing() {
                    format!("missing `{}`", node.kind())
                } else {
                    "syntax error".to_string()
                };
                (node, what)
            })
            .or_else(|| first_python3_violation(tree.root_node()));

        if let Some((node, what)) = rejected {
            let position = node.start_position();
            return Err(Error::ParseError {
                file: path.to_path_buf(),
                message: format!("{} at line {}, column {}", what, position.row + 1, position.column + 1),
            }
            .into());
        }

        Ok(tree)
    }

    /// Reads and parses a single scanned file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file contains invalid Python syntax
    pub fn parse_file(&mut self, file: &SourceFile) -> Result<ParsedFile> {
        debug!("Parsing file: {}", file.path.display());

        let source = fs::read_to_string(&file.path)
            .with_context(|| format!("Failed to read file: {}", file.path.display()))?;

        let tree = self.parse_source(&source, &file.path)?;

        debug!("Successfully parsed file: {}", file.path.display());

        Ok(ParsedFile {
            path: file.path.clone(),
            module_path: file.module_path.clone(),
            source,
            tree,
        })
    }

    /// Parses multiple files, returning one result per input in the same order.
    ///
    /// Failures are logged but do not stop the remaining files from being parsed; whether a
    /// failure aborts the run is decided by the caller.
    pub fn parse_files(&mut self, files: &[SourceFile]) -> Vec<Result<ParsedFile>> {
        debug!("Parsing {} files", files.len());

        let results: Vec<Result<ParsedFile>> = files
            .iter()
            .map(|file| match self.parse_file(file) {
                Ok(parsed) => Ok(parsed),
                Err(e) => {
                    warn!("Failed to parse {}: {}", file.path.display(), e);
                    Err(e)
                }
            })
            .collect();

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );

        results
    }
}

/// Finds the first `ERROR` or missing node in document order.
fn first_syntax_error(node: Node) -> Option<Node> {
    if !node.has_error() {
        return None;
    }
    if node.is_error() || node.is_missing() {
        return Some(node);
    }

    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_syntax_error).or(Some(node))
}

/// Finds the first construct the grammar accepts but Python 3 rejects.
///
/// The grammar still parses Python 2 `print` and `exec` statements, and does not check that
/// positional parameters without a default never follow one with a default.
fn first_python3_violation(node: Node) -> Option<(Node, String)> {
    match node.kind() {
        "print_statement" => return Some((node, "Python 2 `print` statement".to_string())),
        "exec_statement" => return Some((node, "Python 2 `exec` statement".to_string())),
        "parameters" | "lambda_parameters" => {
            if let Some(param) = non_default_after_default(node) {
                return Some((param, "parameter without a default follows parameter with a default".to_string()));
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    children.into_iter().find_map(first_python3_violation)
}

/// First positional parameter without a default that follows a defaulted one.
fn non_default_after_default(parameters: Node) -> Option<Node> {
    let mut seen_default = false;
    let mut cursor = parameters.walk();
    let params: Vec<Node> = parameters.named_children(&mut cursor).collect();
    for param in params {
        match param.kind() {
            "default_parameter" | "typed_default_parameter" => seen_default = true,
            "identifier" if seen_default => return Some(param),
            "typed_parameter" => {
                let is_splat = param
                    .named_child(0)
                    .is_some_and(|first| first.kind() != "identifier");
                if is_splat {
                    return None;
                }
                if seen_default {
                    return Some(param);
                }
            }
            // keyword-only parameters may omit their default
            "keyword_separator" | "list_splat_pattern" | "dictionary_splat_pattern" => return None,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// Helper function to create a temporary file with content
    fn create_temp_file(dir: &TempDir, name: &str, content: &str) -> SourceFile {
        let file_path = dir.path().join(name);
        let mut file = fs::File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        SourceFile {
            path: file_path,
            module_path: format!("press.api.{}", name.trim_end_matches(".py")),
        }
    }

    #[test]
    fn test_parse_valid_python_file() {
        let temp_dir = TempDir::new().unwrap();
        let code = r#"
import frappe


class Site:
    dashboard_fields = ["name", "status"]


@frappe.whitelist()
def get(name: str) -> dict:
    return {}
"#;

        let file = create_temp_file(&temp_dir, "site.py", code);
        let parsed = PythonParser::new().unwrap().parse_file(&file).unwrap();

        assert_eq!(parsed.path, file.path);
        assert_eq!(parsed.module_path, "press.api.site");
        assert_eq!(parsed.tree.root_node().kind(), "module");
        assert_eq!(parsed.tree.root_node().named_child_count(), 3);
    }

    #[test]
    fn test_parse_invalid_python_file() {
        let temp_dir = TempDir::new().unwrap();
        let code = "def broken(:\n    return\n";

        let file = create_temp_file(&temp_dir, "broken.py", code);
        let err = PythonParser::new().unwrap().parse_file(&file).unwrap_err();

        match err.downcast_ref::<Error>() {
            Some(Error::ParseError { file: path, message }) => {
                assert_eq!(path, &file.path);
                assert!(message.contains("line "), "unexpected message: {}", message);
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    fn parse_error_message(source: &str) -> String {
        let err = PythonParser::new()
            .unwrap()
            .parse_source(source, Path::new("legacy.py"))
            .unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(Error::ParseError { message, .. }) => message.clone(),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_python2_statements_are_rejected() {
        let message = parse_error_message("import frappe\n\nprint \"hello\"\n");
        assert_eq!(message, "Python 2 `print` statement at line 3, column 1");

        let message = parse_error_message("def run():\n    exec \"x = 1\"\n");
        assert_eq!(message, "Python 2 `exec` statement at line 2, column 5");
    }

    #[test]
    fn test_print_call_is_accepted() {
        let mut parser = PythonParser::new().unwrap();
        assert!(parser.parse_source("print(\"hello\")\nexec(\"x = 1\")\n", Path::new("ok.py")).is_ok());
    }

    #[test]
    fn test_parameter_without_default_after_default_is_rejected() {
        let message = parse_error_message("def f(a=1, b):\n    pass\n");
        assert_eq!(
            message,
            "parameter without a default follows parameter with a default at line 1, column 12"
        );

        let message = parse_error_message("def g(a: int = 1, b: str):\n    pass\n");
        assert!(message.starts_with("parameter without a default"), "unexpected message: {}", message);

        assert!(parse_error_message("f = lambda a=1, b: a\n").starts_with("parameter without a default"));
    }

    #[test]
    fn test_keyword_only_parameters_may_omit_defaults() {
        let mut parser = PythonParser::new().unwrap();
        let path = Path::new("ok.py");
        assert!(parser.parse_source("def f(a=1, *, b):\n    pass\n", path).is_ok());
        assert!(parser.parse_source("def f(a=1, *args, b, **kwargs):\n    pass\n", path).is_ok());
        assert!(parser.parse_source("def f(a, b: int, c=1, /, d=2):\n    pass\n", path).is_ok());
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let file = SourceFile {
            path: PathBuf::from("/nonexistent/file.py"),
            module_path: "nonexistent.file".to_string(),
        };
        let err = PythonParser::new().unwrap().parse_file(&file).unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }

    #[test]
    fn test_parse_empty_source() {
        let tree = PythonParser::new()
            .unwrap()
            .parse_source("", Path::new("empty.py"))
            .unwrap();
        assert_eq!(tree.root_node().named_child_count(), 0);
    }

    #[test]
    fn test_parse_files_batch_keeps_order() {
        let temp_dir = TempDir::new().unwrap();
        let files = vec![
            create_temp_file(&temp_dir, "a.py", "def a():\n    pass\n"),
            create_temp_file(&temp_dir, "b.py", "class B(:\n"),
            create_temp_file(&temp_dir, "c.py", "X = 1\n"),
        ];

        let results = PythonParser::new().unwrap().parse_files(&files);

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
        assert_eq!(results[2].as_ref().unwrap().module_path, "press.api.c");
    }

    #[test]
    fn test_parse_files_empty_list() {
        let results = PythonParser::new().unwrap().parse_files(&[]);
        assert!(results.is_empty());
    }
}
