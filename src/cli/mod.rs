//! CLI module for the testr harness
//!
//! This module is the build-tool adapter: it turns command-line flags into a
//! [`HarnessConfig`], runs the [`Harness`], and maps the result onto a process exit code.
//!
//! ## Exit codes
//!
//! - `0` - all units passed, the run was skipped, or there were no tests
//! - `1` - at least one unit failed or errored (unless `--test-failure-ignore`)
//! - `2` - the harness itself failed (directories, copying, sessions, reports)
//!
//! ## Design
//!
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use crate::aggregate::BuildFailure;
use crate::config::{DEFAULT_DELEGATED_DIR, HarnessConfig};
use crate::harness::{Harness, RunStatus};
use crate::outcome::error_chain;
use crate::version::TESTR_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    /// The harness could not complete the run.
    pub const HARNESS_ERROR: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Tests did not pass (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// The harness failed (exit code 2).
    pub fn harness(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::HARNESS_ERROR)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Build-time test harness for Rhai scripts
#[derive(Parser, Debug)]
#[command(name = "testr")]
#[command(version = TESTR_VERSION)]
#[command(about = "Run Rhai test scripts and write JUnit reports", long_about = None)]
pub struct Cli {
    /// Project root the default directories are resolved against
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Directory the test scripts are copied from (default: src/test/rhai)
    #[arg(long, value_name = "DIR")]
    pub test_source_dir: Option<PathBuf>,

    /// Fixtures copied before the test scripts (default: src/test/resources)
    #[arg(long, value_name = "DIR")]
    pub test_resource_dir: Option<PathBuf>,

    /// Working root the tests run from (default: target/test-scripts)
    #[arg(long, value_name = "DIR")]
    pub test_output_dir: Option<PathBuf>,

    /// Destination for TEST-*.xml reports (default: target/test-reports)
    #[arg(long = "report-dir", value_name = "DIR")]
    pub report_dir: Option<PathBuf>,

    /// Non-test scripts (default: src/main/rhai)
    #[arg(long, value_name = "DIR")]
    pub source_dir: Option<PathBuf>,

    /// Evaluate the source scripts once before running tests
    #[arg(long = "run-source-scripts")]
    pub run_source_scripts: bool,

    /// Skip the whole run (also: SKIP_TESTS=true)
    #[arg(long)]
    pub skip_tests: bool,

    /// Report failures but exit successfully
    #[arg(long)]
    pub test_failure_ignore: bool,

    /// Log every successful unit
    #[arg(long)]
    pub print_success: bool,

    /// Literal replacement applied to script files when copying, in order given
    #[arg(long = "replace", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub replace: Vec<(String, String)>,

    /// Directory searched by `import` statements (repeatable)
    #[arg(long = "module-path", value_name = "DIR")]
    pub module_path: Vec<PathBuf>,

    /// Script extension without the dot (repeatable, default: rhai)
    #[arg(long = "extension", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Name prefix marking a test function (repeatable, default: test_)
    #[arg(long = "test-prefix", value_name = "PREFIX")]
    pub test_prefixes: Vec<String>,

    /// Subdirectory left to an in-tree runner script
    #[arg(long, value_name = "NAME", default_value = DEFAULT_DELEGATED_DIR)]
    pub delegated_dir: String,
}

impl Cli {
    /// Resolve flags against the project defaults.
    pub fn into_config(self) -> HarnessConfig {
        let mut config = HarnessConfig::for_project(&self.project_dir);
        if let Some(dir) = self.test_source_dir {
            config.test_source_dir = dir;
        }
        if let Some(dir) = self.test_resource_dir {
            config.test_resource_dir = Some(dir);
        }
        if let Some(dir) = self.test_output_dir {
            config.test_output_dir = dir;
        }
        if let Some(dir) = self.report_dir {
            config.report_output_dir = dir;
        }
        if let Some(dir) = self.source_dir {
            config.source_dir = dir;
        }
        if !self.extensions.is_empty() {
            config.extensions = self
                .extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect();
        }
        if !self.test_prefixes.is_empty() {
            config.test_prefixes = self.test_prefixes;
        }
        config.run_source_scripts_before_tests = self.run_source_scripts;
        config.skip_tests = self.skip_tests;
        config.test_failure_ignore = self.test_failure_ignore;
        config.print_success = self.print_success;
        config.replace_strings_when_copy = self.replace;
        config.module_path = self.module_path;
        config.delegated_dir = self.delegated_dir;
        config
    }
}

/// Parse a `KEY=VALUE` pair. The value may itself contain `=`.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the run and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = cli.into_config();
    let ignore_failures = config.test_failure_ignore;

    let status = Harness::new(config)
        .run()
        .map_err(|e| CliError::harness(format!("Error: {}", error_chain(&e))))?;

    match status.verdict(ignore_failures) {
        Ok(()) => {
            if ignore_failures {
                warn_ignored(&status);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => Err(CliError::failure(failure_message(&failure))),
    }
}

fn warn_ignored(status: &RunStatus) {
    if let Some(run) = status.test_run() {
        let counts = run.counts();
        if counts.has_problems() {
            tracing::warn!(
                "Ignoring {} failures and {} errors (--test-failure-ignore)",
                counts.failures,
                counts.errors
            );
        }
    }
}

/// The build failure line followed by the representative cause.
fn failure_message(failure: &BuildFailure) -> String {
    let mut message = failure.to_string();
    if let Some(cause) = &failure.cause {
        if let Some(issue) = cause.issue() {
            message.push('\n');
            message.push_str(issue);
        }
        if let Some(error) = cause.error() {
            message.push('\n');
            message.push_str(&error.detail);
        }
    }
    message
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::outcome::Outcome;
    use crate::outcome::fixtures::result;
    use std::path::Path;

    #[test]
    fn test_cli_parse_defaults() {
        let config = Cli::try_parse_from(["testr"]).unwrap().into_config();
        assert_eq!(config, HarnessConfig::for_project(Path::new(".")));
    }

    #[test]
    fn test_cli_parse_directories() {
        let cli = Cli::try_parse_from([
            "testr",
            "--project-dir",
            "/p",
            "--test-source-dir",
            "/p/tests",
            "--report-dir",
            "/r",
        ])
        .unwrap();
        let config = cli.into_config();
        assert_eq!(config.test_source_dir, PathBuf::from("/p/tests"));
        assert_eq!(config.report_output_dir, PathBuf::from("/r"));
        assert_eq!(config.test_output_dir, PathBuf::from("/p/target/test-scripts"));
    }

    #[test]
    fn test_cli_parse_flags() {
        let cli = Cli::try_parse_from([
            "testr",
            "--skip-tests",
            "--test-failure-ignore",
            "--print-success",
            "--run-source-scripts",
        ])
        .unwrap();
        let config = cli.into_config();
        assert!(config.skip_tests);
        assert!(config.test_failure_ignore);
        assert!(config.print_success);
        assert!(config.run_source_scripts_before_tests);
    }

    #[test]
    fn test_cli_parse_replacements_keep_order() {
        let cli = Cli::try_parse_from(["testr", "--replace", "B=1", "--replace", "A=x=y"]).unwrap();
        assert_eq!(
            cli.replace,
            vec![
                ("B".to_string(), "1".to_string()),
                ("A".to_string(), "x=y".to_string())
            ]
        );
    }

    #[test]
    fn test_cli_parse_rejects_bad_replacement() {
        assert!(Cli::try_parse_from(["testr", "--replace", "novalue"]).is_err());
        assert!(Cli::try_parse_from(["testr", "--replace", "=v"]).is_err());
    }

    #[test]
    fn test_cli_parse_lists() {
        let cli = Cli::try_parse_from([
            "testr",
            "--extension",
            ".rhai",
            "--extension",
            "script",
            "--test-prefix",
            "check_",
            "--module-path",
            "lib",
            "--delegated-dir",
            "manual",
        ])
        .unwrap();
        let config = cli.into_config();
        assert_eq!(config.extensions, vec!["rhai".to_string(), "script".to_string()]);
        assert_eq!(config.test_prefixes, vec!["check_".to_string()]);
        assert_eq!(config.module_path, vec![PathBuf::from("lib")]);
        assert_eq!(config.delegated_dir, "manual");
    }

    #[test]
    fn test_failure_message_includes_cause() {
        let failure = BuildFailure {
            failures: 1,
            errors: 0,
            cause: Some(result("a.rhai", "test_bad()", Outcome::Failure, 1)),
        };
        let message = failure_message(&failure);
        assert!(message.starts_with("There were 1 failures and 0 errors\n"));
        assert!(message.contains("eval-error executing test test_bad()"));
        assert!(message.contains("caused by: <inner> & more"));
    }
}
