//! Run-wide aggregation of unit results
//!
//! Elapsed times are sums of unit times rather than the wall-clock span of the run. With
//! sequential execution the two agree; the sum stays correct for a concurrent executor.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::outcome::{Outcome, TestUnitResult};

/// Counts by outcome kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub successes: usize,
    pub failures: usize,
    pub errors: usize,
}

impl OutcomeCounts {
    pub fn of<'a>(results: impl IntoIterator<Item = &'a TestUnitResult>) -> Self {
        let mut counts = Self::default();
        for result in results {
            match result.outcome() {
                Outcome::Success => counts.successes += 1,
                Outcome::Failure => counts.failures += 1,
                Outcome::Error => counts.errors += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.successes + self.failures + self.errors
    }

    pub fn has_problems(&self) -> bool {
        self.failures > 0 || self.errors > 0
    }
}

/// The results of one source file, in execution order.
#[derive(Debug, Clone)]
pub struct FileGroup<'a> {
    pub source_file: &'a Path,
    pub results: Vec<&'a TestUnitResult>,
}

impl FileGroup<'_> {
    pub fn counts(&self) -> OutcomeCounts {
        OutcomeCounts::of(self.results.iter().copied())
    }

    pub fn elapsed(&self) -> Duration {
        self.results.iter().map(|r| r.elapsed()).sum()
    }
}

/// Every unit result produced by one harness invocation, in execution order.
#[derive(Debug, Clone, Default)]
pub struct TestRun {
    results: Vec<TestUnitResult>,
    files: Vec<PathBuf>,
}

impl TestRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the results of one executed file.
    pub fn record_file(&mut self, file: &Path, results: Vec<TestUnitResult>) {
        self.files.push(file.to_path_buf());
        self.results.extend(results);
    }

    pub fn results(&self) -> &[TestUnitResult] {
        &self.results
    }

    pub fn files_executed(&self) -> usize {
        self.files.len()
    }

    pub fn total_units(&self) -> usize {
        self.results.len()
    }

    pub fn counts(&self) -> OutcomeCounts {
        OutcomeCounts::of(&self.results)
    }

    /// Results grouped by source file; files and units keep execution order.
    pub fn by_file(&self) -> Vec<FileGroup<'_>> {
        let mut groups: Vec<FileGroup<'_>> = Vec::new();
        for result in &self.results {
            match groups.iter_mut().find(|g| g.source_file == result.source_file()) {
                Some(group) => group.results.push(result),
                None => groups.push(FileGroup {
                    source_file: result.source_file(),
                    results: vec![result],
                }),
            }
        }
        groups
    }

    pub fn elapsed(&self) -> Duration {
        self.results.iter().map(|r| r.elapsed()).sum()
    }

    /// Decide whether the enclosing build fails.
    ///
    /// The representative cause is the first `Error` unit, else the first `Failure` unit.
    pub fn verdict(&self, ignore_failures: bool) -> Result<(), BuildFailure> {
        let counts = self.counts();
        if !counts.has_problems() || ignore_failures {
            return Ok(());
        }

        let cause = self
            .results
            .iter()
            .find(|r| r.outcome() == Outcome::Error)
            .or_else(|| self.results.iter().find(|r| r.outcome() == Outcome::Failure))
            .cloned();

        Err(BuildFailure {
            failures: counts.failures,
            errors: counts.errors,
            cause,
        })
    }
}

/// Signal to the host build that tests did not pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFailure {
    pub failures: usize,
    pub errors: usize,
    pub cause: Option<TestUnitResult>,
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "There were {} failures and {} errors", self.failures, self.errors)
    }
}

impl std::error::Error for BuildFailure {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::fixtures::result;
    use proptest::prelude::*;

    fn sample_run() -> TestRun {
        let mut run = TestRun::new();
        run.record_file(
            Path::new("a.rhai"),
            vec![
                result("a.rhai", "a.rhai", Outcome::Success, 10),
                result("a.rhai", "test_x()", Outcome::Failure, 20),
            ],
        );
        run.record_file(
            Path::new("b.rhai"),
            vec![
                result("b.rhai", "b.rhai", Outcome::Success, 5),
                result("b.rhai", "test_y()", Outcome::Error, 7),
            ],
        );
        run
    }

    #[test]
    fn test_counts_and_totals() {
        let run = sample_run();
        assert_eq!(
            run.counts(),
            OutcomeCounts {
                successes: 2,
                failures: 1,
                errors: 1
            }
        );
        assert_eq!(run.total_units(), 4);
        assert_eq!(run.files_executed(), 2);
        assert_eq!(run.elapsed(), Duration::from_millis(42));
    }

    #[test]
    fn test_grouping_preserves_order() {
        let run = sample_run();
        let groups = run.by_file();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].source_file, Path::new("a.rhai"));
        let names: Vec<&str> = groups[0].results.iter().map(|r| r.unit_name()).collect();
        assert_eq!(names, vec!["a.rhai", "test_x()"]);
        assert_eq!(groups[1].elapsed(), Duration::from_millis(12));
    }

    #[test]
    fn test_verdict_prefers_errors() {
        let failure = sample_run().verdict(false).unwrap_err();
        assert_eq!(failure.to_string(), "There were 1 failures and 1 errors");
        assert_eq!(failure.cause.unwrap().outcome(), Outcome::Error);
    }

    #[test]
    fn test_verdict_first_failure_without_errors() {
        let mut run = TestRun::new();
        run.record_file(
            Path::new("a.rhai"),
            vec![
                result("a.rhai", "test_first()", Outcome::Failure, 1),
                result("a.rhai", "test_second()", Outcome::Failure, 1),
            ],
        );
        let failure = run.verdict(false).unwrap_err();
        assert_eq!(failure.cause.unwrap().unit_name(), "test_first()");
    }

    #[test]
    fn test_verdict_ignore_failures() {
        assert!(sample_run().verdict(true).is_ok());
    }

    #[test]
    fn test_verdict_clean_run() {
        let mut run = TestRun::new();
        run.record_file(Path::new("a.rhai"), vec![result("a.rhai", "a.rhai", Outcome::Success, 3)]);
        assert!(run.verdict(false).is_ok());
    }

    fn outcome_strategy() -> impl Strategy<Value = Outcome> {
        prop_oneof![Just(Outcome::Success), Just(Outcome::Failure), Just(Outcome::Error)]
    }

    proptest! {
        /// Property: outcome counts add up and per-file time is the sum of its units.
        #[test]
        fn accounting_holds(units in prop::collection::vec((0usize..4, outcome_strategy(), 0u64..5_000), 0..40)) {
            let mut run = TestRun::new();
            for file in 0..4 {
                let name = format!("f{file}.rhai");
                let results: Vec<_> = units
                    .iter()
                    .filter(|(f, _, _)| *f == file)
                    .map(|(_, outcome, ms)| result(&name, "u()", *outcome, *ms))
                    .collect();
                run.record_file(Path::new(&name), results);
            }

            let counts = run.counts();
            prop_assert_eq!(counts.total(), run.total_units());
            prop_assert_eq!(run.total_units(), units.len());

            let mut grouped = Duration::ZERO;
            for group in run.by_file() {
                let expected: Duration = group.results.iter().map(|r| r.elapsed()).sum();
                prop_assert_eq!(group.elapsed(), expected);
                grouped += group.elapsed();
            }
            prop_assert_eq!(grouped, run.elapsed());
        }
    }
}
