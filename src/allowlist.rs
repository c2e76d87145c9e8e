use crate::config::AllowListConfig;
use crate::expr::{list_of_constants, named_children, simple_assignment};
use crate::parser::PythonParser;
use log::{debug, warn};
use std::fs;
use std::path::Path;

/// Doctypes eligible for the generic document endpoints.
///
/// The list is read from a module-level assignment such as
///
/// ```python
/// ALLOWED_DOCTYPES = ["Site", "Site App", "Release Group"]
/// ```
///
/// in a well-known file of the project. A missing file, a syntax error, an absent variable or a
/// value that is not a list literal all produce an empty allow-list: the generator then simply
/// emits no document endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctypeAllowList {
    doctypes: Vec<String>,
}

impl DoctypeAllowList {
    /// Create an allow-list from doctype names
    pub fn new(doctypes: Vec<String>) -> Self {
        Self { doctypes }
    }

    /// Loads the allow-list configured in `config` from `project_root`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use press_apidoc::allowlist::DoctypeAllowList;
    /// use press_apidoc::config::AllowListConfig;
    /// use std::path::Path;
    ///
    /// let allow_list = DoctypeAllowList::load(Path::new("./press"), &AllowListConfig::default());
    /// println!("{} doctypes allowed", allow_list.len());
    /// ```
    pub fn load(project_root: &Path, config: &AllowListConfig) -> Self {
        let path = project_root.join(&config.file);
        debug!("Loading doctype allow-list from {}", path.display());

        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) => {
                warn!("Doctype allow-list not loaded from {}: {}", path.display(), e);
                return Self::default();
            }
        };

        let allow_list = Self::from_source(&source, &config.variable, &path);
        if allow_list.is_empty() {
            warn!("No `{}` list found in {}", config.variable, path.display());
        } else {
            debug!("Loaded {} allowed doctypes", allow_list.len());
        }
        allow_list
    }

    /// Reads the list assigned to `variable` at the top level of `source`.
    pub fn from_source(source: &str, variable: &str, path: &Path) -> Self {
        let tree = match PythonParser::new().and_then(|mut parser| parser.parse_source(source, path)) {
            Ok(tree) => tree,
            Err(e) => {
                warn!("Doctype allow-list not loaded: {}", e);
                return Self::default();
            }
        };

        let bytes = source.as_bytes();
        let doctypes = named_children(tree.root_node())
            .into_iter()
            .filter_map(|statement| simple_assignment(statement, bytes))
            .filter(|(target, _)| target == variable)
            .find_map(|(_, value)| list_of_constants(value, bytes))
            .unwrap_or_default();

        Self { doctypes }
    }

    /// True if `doctype` is allowed
    pub fn contains(&self, doctype: &str) -> bool {
        self.doctypes.iter().any(|d| d == doctype)
    }

    pub fn len(&self) -> usize {
        self.doctypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doctypes.is_empty()
    }

    /// Allowed doctypes in source order
    pub fn doctypes(&self) -> &[String] {
        &self.doctypes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn from_source(source: &str) -> DoctypeAllowList {
        DoctypeAllowList::from_source(source, "ALLOWED_DOCTYPES", Path::new("client.py"))
    }

    #[test]
    fn test_reads_list_in_source_order() {
        let allow_list = from_source(
            r#"
import frappe

ALLOWED_DOCTYPES = [
    "Site",
    "Site App",  # trailing comment
    "Release Group",
]

def get(doctype, name):
    pass
"#,
        );

        assert_eq!(allow_list.doctypes(), &["Site", "Site App", "Release Group"]);
        assert!(allow_list.contains("Site App"));
        assert!(!allow_list.contains("SiteApp"));
    }

    #[test]
    fn test_missing_variable_is_empty() {
        assert!(from_source("OTHER = [\"Site\"]\n").is_empty());
    }

    #[test]
    fn test_non_list_value_is_empty() {
        assert!(from_source("ALLOWED_DOCTYPES = (\"Site\",)\n").is_empty());
        assert!(from_source("ALLOWED_DOCTYPES = load_doctypes()\n").is_empty());
    }

    #[test]
    fn test_nested_assignment_is_ignored() {
        let allow_list = from_source("def f():\n    ALLOWED_DOCTYPES = [\"Site\"]\n");
        assert!(allow_list.is_empty());
    }

    #[test]
    fn test_syntax_error_is_empty() {
        assert!(from_source("ALLOWED_DOCTYPES = [\"Site\"\n").is_empty());
    }

    #[test]
    fn test_load_from_project_root() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("press/api/client.py");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "ALLOWED_DOCTYPES = [\"Site\", \"Bench\"]\n").unwrap();

        let allow_list = DoctypeAllowList::load(temp_dir.path(), &AllowListConfig::default());
        assert_eq!(allow_list, DoctypeAllowList::new(vec!["Site".to_string(), "Bench".to_string()]));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let config = AllowListConfig {
            file: PathBuf::from("does/not/exist.py"),
            ..AllowListConfig::default()
        };
        let allow_list = DoctypeAllowList::load(Path::new("/nonexistent"), &config);
        assert!(allow_list.is_empty());
    }
}
