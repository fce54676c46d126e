//! Reporting
//!
//! Both sinks render the same [`TestRun`], so the console summary and the XML documents can
//! not disagree about counts or outcomes.
//!
//! ## Reporter Trait
//!
//! Reporting is separated from execution by the [`Reporter`] trait. The harness drives the
//! console reporter and the JUnit reporter in turn; other formats only need another
//! implementation.

mod console;
mod junit;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::aggregate::TestRun;

pub use console::ConsoleReporter;
pub use junit::{JunitReporter, report_file_name, suite_name};

/// Errors raised while producing a report. These are harness faults and end the run.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write console summary: {0}")]
    Console(#[from] io::Error),

    #[error("failed to write report {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to render XML report: {0}")]
    Xml(String),
}

/// Trait for rendering an aggregated run.
pub trait Reporter {
    fn report(&mut self, run: &TestRun) -> Result<(), ReportError>;
}

/// Seconds with exactly three decimals and `.` as separator.
pub fn seconds(duration: Duration) -> String {
    format!("{:.3}", duration.as_secs_f64())
}

/// `minutes: MM seconds: SS millis: SSS`
pub fn total_time(duration: Duration) -> String {
    let millis = duration.as_millis();
    format!(
        "minutes: {:02} seconds: {:02} millis: {:03}",
        millis / 60_000,
        (millis / 1_000) % 60,
        millis % 1_000
    )
}
