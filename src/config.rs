//! Harness configuration
//!
//! `HarnessConfig` is the single value the run driver reads. The CLI builds it from parsed
//! arguments; library users and tests build it directly, usually starting from
//! [`HarnessConfig::for_project`].

use std::env;
use std::path::{Path, PathBuf};

/// Script extensions recognized when no `--extension` is given.
pub const DEFAULT_EXTENSIONS: &[&str] = &["rhai"];

/// Name prefixes that mark a zero-argument binding as a test function.
pub const DEFAULT_TEST_PREFIXES: &[&str] = &["test_"];

/// Subdirectory whose scripts are run by an in-tree runner script rather than by the harness.
pub const DEFAULT_DELEGATED_DIR: &str = "testthat";

/// Environment variable that skips the whole run, like `-DskipTests` for a Maven build.
pub const SKIP_TESTS_ENV: &str = "SKIP_TESTS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Root the test scripts are copied from.
    pub test_source_dir: PathBuf,
    /// Fixtures copied into the output root before the test sources. Optional on disk.
    pub test_resource_dir: Option<PathBuf>,
    /// Working root the tests are copied to, discovered in and executed from.
    pub test_output_dir: PathBuf,
    /// Destination for `TEST-*.xml` documents.
    pub report_output_dir: PathBuf,
    /// Non-test scripts, evaluated before the tests when `run_source_scripts_before_tests` is set.
    pub source_dir: PathBuf,
    pub run_source_scripts_before_tests: bool,
    pub skip_tests: bool,
    /// Report everything, but never signal the build as failed.
    pub test_failure_ignore: bool,
    /// Log each successful unit instead of only counting it.
    pub print_success: bool,
    /// Ordered literal substitutions applied to script files while copying.
    pub replace_strings_when_copy: Vec<(String, String)>,
    /// Directories searched by `import` statements, in order.
    pub module_path: Vec<PathBuf>,
    pub extensions: Vec<String>,
    pub test_prefixes: Vec<String>,
    pub delegated_dir: String,
}

impl HarnessConfig {
    /// Conventional layout rooted at a project directory.
    pub fn for_project(base: &Path) -> Self {
        Self {
            test_source_dir: base.join("src/test/rhai"),
            test_resource_dir: Some(base.join("src/test/resources")),
            test_output_dir: base.join("target/test-scripts"),
            report_output_dir: base.join("target/test-reports"),
            source_dir: base.join("src/main/rhai"),
            run_source_scripts_before_tests: false,
            skip_tests: false,
            test_failure_ignore: false,
            print_success: false,
            replace_strings_when_copy: Vec::new(),
            module_path: Vec::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            test_prefixes: DEFAULT_TEST_PREFIXES.iter().map(|p| p.to_string()).collect(),
            delegated_dir: DEFAULT_DELEGATED_DIR.to_string(),
        }
    }

    /// Whether the run should be skipped, either by configuration or by `SKIP_TESTS`.
    pub fn should_skip(&self) -> bool {
        self.skip_tests || skip_override(env::var(SKIP_TESTS_ENV).ok().as_deref())
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::for_project(Path::new("."))
    }
}

/// Any value other than `false` (case-insensitive) counts as a request to skip.
pub(crate) fn skip_override(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().eq_ignore_ascii_case("false"))
}

pub(crate) fn has_extension(name: &str, extensions: &[String]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e == ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_override_values() {
        assert!(!skip_override(None));
        assert!(!skip_override(Some("false")));
        assert!(!skip_override(Some("FALSE")));
        assert!(skip_override(Some("true")));
        assert!(skip_override(Some("")));
        assert!(skip_override(Some("yes")));
    }

    #[test]
    fn test_defaults_follow_project_layout() {
        let config = HarnessConfig::for_project(Path::new("/work"));
        assert_eq!(config.test_source_dir, PathBuf::from("/work/src/test/rhai"));
        assert_eq!(config.test_output_dir, PathBuf::from("/work/target/test-scripts"));
        assert_eq!(config.extensions, vec!["rhai".to_string()]);
        assert_eq!(config.test_prefixes, vec!["test_".to_string()]);
        assert!(!config.test_failure_ignore);
    }

    #[test]
    fn test_extension_matches_exactly() {
        let config = HarnessConfig::default();
        assert!(has_extension("math_test.rhai", &config.extensions));
        assert!(!has_extension("math_test.RHAI", &config.extensions));
        assert!(!has_extension("rhai", &config.extensions));
        assert!(!has_extension("notes.txt", &config.extensions));
    }
}
