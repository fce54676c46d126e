#![forbid(unsafe_code)]
//! testr: a build-time test harness for Rhai scripts
//!
//! testr discovers test scripts under a source tree, runs each file in its own embedded Rhai
//! session, classifies every test unit (a whole file, or a zero-argument `test_*` function
//! defined in it), and reports the aggregate both on the console and as one JUnit XML
//! document per file.
//!
//! ## Pipeline
//!
//! ```text
//! copier -> discovery -> { session -> runner (file unit, then function units) } -> aggregate -> report
//! ```
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. Every module
//!   except tests enforces `#![deny(clippy::unwrap_used)]` through the crate attributes below.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Script failures never panic**: anything a test script raises is caught at the unit
//!   boundary and becomes a [`outcome::TestUnitResult`]. Only harness bookkeeping errors
//!   ([`harness::HarnessError`]) stop a run.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod copier;
pub mod discovery;
pub mod harness;
pub mod outcome;
pub mod report;
pub mod runner;
pub mod session;
pub mod version;

pub use aggregate::{BuildFailure, FileGroup, OutcomeCounts, TestRun};
pub use config::HarnessConfig;
pub use harness::{Harness, HarnessError, RunStatus};
pub use outcome::{Outcome, TestUnitResult};
pub use session::{RhaiSession, RhaiSessionFactory, ScriptSession, SessionFactory};
