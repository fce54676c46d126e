//! Test unit results and outcome classification
//!
//! A [`TestUnitResult`] is opened by [`UnitTimer::start`] right before its unit runs and
//! closed exactly once by one of the `UnitTimer` finishers. After that it is read-only.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::session::{ScriptFailure, SessionError};

/// Classification of a unit's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    /// The tested code failed.
    Failure,
    /// The harness itself failed while running the unit.
    Error,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "SUCCESS",
            Outcome::Failure => "FAILURE",
            Outcome::Error => "ERROR",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a non-successful unit captured from its failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedError {
    /// One-line summary.
    pub message: String,
    /// Full text, including nested causes.
    pub detail: String,
}

/// One executed test unit: a whole file, or one test function within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestUnitResult {
    source_file: PathBuf,
    unit_name: String,
    outcome: Outcome,
    issue: Option<String>,
    error: Option<CapturedError>,
    started_at: SystemTime,
    ended_at: SystemTime,
}

impl TestUnitResult {
    pub fn source_file(&self) -> &Path {
        &self.source_file
    }

    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Short classification, e.g. `eval-error executing test math.rhai: test_add()`.
    pub fn issue(&self) -> Option<&str> {
        self.issue.as_deref()
    }

    pub fn error(&self) -> Option<&CapturedError> {
        self.error.as_ref()
    }

    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    pub fn ended_at(&self) -> SystemTime {
        self.ended_at
    }

    pub fn elapsed(&self) -> Duration {
        self.ended_at.duration_since(self.started_at).unwrap_or(Duration::ZERO)
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

/// Clock for a unit that has started but not yet finished.
#[derive(Debug)]
pub struct UnitTimer {
    source_file: PathBuf,
    unit_name: String,
    /// How the unit is named inside issue strings.
    label: String,
    started_at: SystemTime,
}

impl UnitTimer {
    pub fn start(source_file: &Path, unit_name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            source_file: source_file.to_path_buf(),
            unit_name: unit_name.into(),
            label: label.into(),
            started_at: SystemTime::now(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn succeed(self) -> TestUnitResult {
        self.finish(Outcome::Success, None, None)
    }

    /// Close the unit as a failure of the tested code.
    pub fn fail(self, failure: &ScriptFailure) -> TestUnitResult {
        let issue = failure_issue(failure, &self.label);
        let error = CapturedError {
            message: failure.message.clone(),
            detail: failure.detail.clone(),
        };
        self.finish(Outcome::Failure, Some(issue), Some(error))
    }

    /// Close the unit as a harness fault.
    pub fn error(self, error: &SessionError) -> TestUnitResult {
        let issue = format!("harness-error cleaning up {}", self.label);
        let error = CapturedError {
            message: error.to_string(),
            detail: error_chain(error),
        };
        self.finish(Outcome::Error, Some(issue), Some(error))
    }

    fn finish(self, outcome: Outcome, issue: Option<String>, error: Option<CapturedError>) -> TestUnitResult {
        TestUnitResult {
            source_file: self.source_file,
            unit_name: self.unit_name,
            outcome,
            issue,
            error,
            started_at: self.started_at,
            ended_at: SystemTime::now(),
        }
    }
}

/// `<kind> <verb> <unit>`, independent of the underlying message text.
pub fn failure_issue(failure: &ScriptFailure, label: &str) -> String {
    format!("{} {} {}", failure.kind.label(), failure.kind.verb(), label)
}

/// An error's text followed by each of its sources.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str("\n  caused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Error text on a single line, as printed in console summaries.
pub fn one_line(text: &str) -> String {
    text.trim().replace("\r\n", ", ").replace('\n', ", ")
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A closed result with a fixed start and duration, for aggregate and report tests.
    pub(crate) fn result(file: &str, unit: &str, outcome: Outcome, millis: u64) -> TestUnitResult {
        let started_at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let (issue, error) = match outcome {
            Outcome::Success => (None, None),
            Outcome::Failure => (
                Some(format!("eval-error executing test {unit}")),
                Some(CapturedError {
                    message: "Runtime error: boom\nsecond line".to_string(),
                    detail: "Runtime error: boom\n  caused by: <inner> & more".to_string(),
                }),
            ),
            Outcome::Error => (
                Some(format!("harness-error cleaning up {unit}")),
                Some(CapturedError {
                    message: "failed to remove test binding".to_string(),
                    detail: "Cleanup { name: \"t\" }".to_string(),
                }),
            ),
        };
        TestUnitResult {
            source_file: PathBuf::from(file),
            unit_name: unit.to_string(),
            outcome,
            issue,
            error,
            started_at,
            ended_at: started_at + Duration::from_millis(millis),
        }
    }
}
