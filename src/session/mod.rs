//! Interpreter session boundary
//!
//! The harness never talks to the interpreter directly. It goes through two traits:
//!
//! - [`SessionFactory`] builds one fresh [`ScriptSession`] per test file, so global bindings
//!   created by one file are never visible to another.
//! - [`ScriptSession`] evaluates source, lists the named values of its global namespace with
//!   their arity, invokes a binding with no arguments and removes it afterwards.
//!
//! Every failure raised while running user code crosses this boundary as a [`ScriptFailure`]
//! tagged with a closed [`FailureKind`]; classification happens once, here, rather than in the
//! runner. Harness-side faults are [`SessionError`]s instead.
//!
//! The default implementation is [`RhaiSession`], backed by the `rhai` crate.

mod diagnostic;
mod engine;
mod host;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use self::engine::{RhaiSession, RhaiSessionFactory};

/// Errors raised by the harness side of a session (never by user code).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot use {} as working directory: {source}", path.display())]
    WorkingDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("working directory {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to remove test binding `{name}` after execution: {reason}")]
    Cleanup { name: String, reason: String },
}

/// Closed set of ways user code can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The source text could not be parsed.
    Parse,
    /// The script file could not be read.
    Io,
    /// The interpreter raised a structured runtime error (`throw`, failed assertion).
    Eval,
    /// Anything else the interpreter raised while running valid code.
    Other,
}

impl FailureKind {
    /// Short stable label used at the front of an issue string.
    pub fn label(self) -> &'static str {
        match self {
            FailureKind::Parse => "parse-error",
            FailureKind::Io => "io-error",
            FailureKind::Eval => "eval-error",
            FailureKind::Other => "runtime-error",
        }
    }

    /// What the harness was doing when the failure happened.
    pub fn verb(self) -> &'static str {
        match self {
            FailureKind::Parse => "parsing script",
            FailureKind::Io => "reading file",
            FailureKind::Eval => "executing test",
            FailureKind::Other => "occurred running script",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A failure raised by user code, classified at the interpreter boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFailure {
    pub kind: FailureKind,
    /// One-line summary of the failure.
    pub message: String,
    /// Full captured text: message, nested causes and, for parse errors, a source snippet.
    pub detail: String,
}

impl ScriptFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: detail.into(),
        }
    }

    pub fn io(path: &Path, error: &io::Error) -> Self {
        let message = format!("cannot read {}: {}", path.display(), error);
        let detail = format!("{}: {}\n  caused by: {:?}", FailureKind::Io, message, error.kind());
        Self::new(FailureKind::Io, message, detail)
    }
}

impl fmt::Display for ScriptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A named value in a session's global namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    /// Declared parameter count; `None` when the value is not callable.
    pub arity: Option<usize>,
}

impl Binding {
    pub fn is_nullary_callable(&self) -> bool {
        self.arity == Some(0)
    }
}

/// An isolated interpreter environment with its own global namespace.
pub trait ScriptSession {
    /// Directory relative file references in scripts resolve against.
    fn working_dir(&self) -> &Path;

    /// Read and evaluate a whole file at top level.
    fn eval_file(&mut self, path: &Path) -> Result<(), ScriptFailure>;

    /// Evaluate source text at top level; `name` identifies it in diagnostics.
    fn eval_source(&mut self, name: &str, source: &str) -> Result<(), ScriptFailure>;

    /// Named values of the global namespace with their arity, in namespace order.
    fn bindings(&self) -> Vec<Binding>;

    /// Invoke the binding `name` with no arguments.
    fn call(&mut self, name: &str) -> Result<(), ScriptFailure>;

    /// Remove the nullary binding `name` from the global namespace.
    fn remove(&mut self, name: &str) -> Result<(), SessionError>;
}

/// Builds fresh sessions bound to the host module environment.
pub trait SessionFactory {
    type Session: ScriptSession;

    fn create(&self, working_dir: &Path) -> Result<Self::Session, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_labels_are_stable() {
        assert_eq!(FailureKind::Parse.label(), "parse-error");
        assert_eq!(FailureKind::Parse.verb(), "parsing script");
        assert_eq!(FailureKind::Eval.verb(), "executing test");
        assert_eq!(FailureKind::Other.to_string(), "runtime-error");
    }

    #[test]
    fn test_io_failure_mentions_path() {
        let err = io::Error::new(io::ErrorKind::NotFound, "no such file");
        let failure = ScriptFailure::io(Path::new("gone.rhai"), &err);
        assert_eq!(failure.kind, FailureKind::Io);
        assert!(failure.message.contains("gone.rhai"));
        assert!(failure.detail.contains("NotFound"));
    }

    #[test]
    fn test_nullary_binding() {
        let binding = Binding {
            name: "test_a".into(),
            arity: Some(0),
        };
        assert!(binding.is_nullary_callable());
        let value = Binding {
            name: "test_b".into(),
            arity: None,
        };
        assert!(!value.is_nullary_callable());
    }
}
