use crate::config::GeneratorConfig;
use anyhow::Result;
use log::{debug, warn};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// File scanner for traversing the Python package tree.
///
/// The `FileScanner` walks the scan root depth-first. In every directory the `.py` files are
/// visited before the subdirectories, and both are taken in file-name order, so the resulting
/// file list is stable from run to run. Paths starting with an exclusion prefix are skipped;
/// an excluded directory is never descended into. Test modules (by default `test_*.py`) are
/// always skipped.
///
/// # Example
///
/// ```no_run
/// use press_apidoc::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./press/press/api"), "press.api".to_string());
/// let result = scanner.scan().unwrap();
/// println!("Found {} Python files", result.files.len());
/// ```
pub struct FileScanner {
    scan_root: PathBuf,
    base_module: String,
    excluded: Vec<PathBuf>,
    test_file_prefix: String,
}

/// A Python file selected for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path to the file
    pub path: PathBuf,
    /// Dotted module path derived from the file's position under the scan root
    pub module_path: String,
}

/// Result of directory scanning operation.
///
/// Contains the selected files in visit order and any warnings encountered during scanning.
pub struct ScanResult {
    /// Files to extract, in traversal order
    pub files: Vec<SourceFile>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl FileScanner {
    /// Creates a scanner for `scan_root`, whose module path is `base_module`.
    pub fn new(scan_root: PathBuf, base_module: String) -> Self {
        Self {
            scan_root,
            base_module,
            excluded: Vec::new(),
            test_file_prefix: "test_".to_string(),
        }
    }

    /// Creates a scanner from the `scan` section of the configuration.
    ///
    /// The scan directory and the exclusion entries are both resolved against `project_root`.
    pub fn from_config(project_root: &Path, config: &GeneratorConfig) -> Self {
        Self::new(project_root.join(&config.scan.scan_dir), config.scan.base_module.clone())
            .with_exclusions(config.excluded_paths(project_root))
            .with_test_file_prefix(config.scan.test_file_prefix.clone())
    }

    /// Sets the path prefixes to skip
    pub fn with_exclusions(mut self, excluded: Vec<PathBuf>) -> Self {
        self.excluded = excluded;
        self
    }

    /// Sets the file-name prefix of test modules; an empty prefix disables the rule
    pub fn with_test_file_prefix(mut self, prefix: String) -> Self {
        self.test_file_prefix = prefix;
        self
    }

    /// Returns true if `path` lies under one of the exclusion prefixes.
    ///
    /// Prefixes are compared by path component, so `api/tests` excludes `api/tests/x.py` but
    /// not `api/tests_helpers.py`.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.excluded.iter().any(|prefix| path.starts_with(prefix))
    }

    /// Scans the directory tree and collects the eligible `.py` files.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan root does not exist or is not a directory.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.scan_root.is_dir() {
            anyhow::bail!("Scan directory does not exist: {}", self.scan_root.display());
        }

        let mut files = Vec::new();
        let mut warnings = Vec::new();

        let walker = WalkDir::new(&self.scan_root).sort_by(files_first);

        for entry in walker.into_iter().filter_entry(|e| {
            // Don't filter the root directory itself
            if e.path() == self.scan_root {
                return true;
            }
            if self.is_excluded(e.path()) {
                debug!("Excluded: {}", e.path().display());
                return false;
            }
            true
        }) {
            match entry {
                Ok(entry) => {
                    if let Some(file) = self.select(&entry) {
                        debug!("Selected {} as {}", file.path.display(), file.module_path);
                        files.push(file);
                    }
                }
                Err(e) => {
                    // Record warning for inaccessible directories/files
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        Ok(ScanResult { files, warnings })
    }

    fn select(&self, entry: &DirEntry) -> Option<SourceFile> {
        if !entry.file_type().is_file() {
            return None;
        }
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("py") {
            return None;
        }

        let file_name = entry.file_name().to_string_lossy();
        if !self.test_file_prefix.is_empty() && file_name.starts_with(&self.test_file_prefix) {
            debug!("Skipping test module: {}", path.display());
            return None;
        }

        let relative = path.strip_prefix(&self.scan_root).ok()?;
        Some(SourceFile {
            path: path.to_path_buf(),
            module_path: module_path_for(&self.base_module, relative),
        })
    }
}

/// Files sort before directories, then by name.
fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Appends one path segment to a dotted module path.
///
/// `__init__.py` contributes nothing; other files contribute their name without extension and
/// directories their full name.
pub fn join_module_path(base: &str, file_or_dir: &str, is_file: bool) -> String {
    let segment = if !is_file {
        file_or_dir
    } else if file_or_dir == "__init__.py" {
        ""
    } else {
        Path::new(file_or_dir)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_or_dir)
    };

    match (base.is_empty(), segment.is_empty()) {
        (_, true) => base.to_string(),
        (true, false) => segment.to_string(),
        (false, false) => format!("{}.{}", base, segment),
    }
}

/// Module path of a file given its path relative to the scan root.
fn module_path_for(base: &str, relative: &Path) -> String {
    let components: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    let last = components.len().saturating_sub(1);
    components
        .iter()
        .enumerate()
        .fold(base.to_string(), |path, (index, segment)| {
            join_module_path(&path, segment, index == last)
        })
}
