//! Console summary

use std::io::Write;

use super::{ReportError, Reporter, total_time};
use crate::aggregate::TestRun;
use crate::outcome::one_line;

/// Summary printer (maven-surefire style) over any writer.
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn report(&mut self, run: &TestRun) -> Result<(), ReportError> {
        let counts = run.counts();
        let out = &mut self.out;

        writeln!(out)?;
        writeln!(out, "Test summary:")?;
        writeln!(out, "-------------")?;
        writeln!(
            out,
            "{} Files executed, Tests run: {}, Successes: {}, Failures: {}, Errors: {}",
            run.files_executed(),
            run.total_units(),
            counts.successes,
            counts.failures,
            counts.errors
        )?;

        if counts.has_problems() {
            writeln!(out)?;
            writeln!(out, "Results:")?;
            for result in run.results().iter().filter(|r| !r.is_success()) {
                let message = result.error().map(|e| one_line(&e.message)).unwrap_or_default();
                writeln!(
                    out,
                    "\t{} : {} : {}",
                    result.outcome(),
                    result.issue().unwrap_or_default(),
                    message
                )?;
            }
        } else {
            writeln!(out, "\tSUCCESS! {} tests run", run.total_units())?;
        }

        writeln!(out)?;
        writeln!(out, "Total time: {}", total_time(run.elapsed()))?;
        writeln!(out)?;
        writeln!(out, "--------------END OF TESTS--------------")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Outcome;
    use crate::outcome::fixtures::result;
    use std::path::Path;

    fn render(run: &TestRun) -> String {
        let mut reporter = ConsoleReporter::new(Vec::new());
        reporter.report(run).unwrap();
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn test_all_success_prints_single_line() {
        let mut run = TestRun::new();
        run.record_file(
            Path::new("a.rhai"),
            vec![
                result("a.rhai", "a.rhai", Outcome::Success, 250),
                result("a.rhai", "test_a()", Outcome::Success, 1000),
            ],
        );
        let text = render(&run);
        assert!(text.contains("1 Files executed, Tests run: 2, Successes: 2, Failures: 0, Errors: 0"));
        assert!(text.contains("\tSUCCESS! 2 tests run"));
        assert!(!text.contains("Results:"));
        assert!(text.contains("Total time: minutes: 00 seconds: 01 millis: 250"));
    }

    #[test]
    fn test_problems_are_listed_on_one_line() {
        let mut run = TestRun::new();
        run.record_file(
            Path::new("a.rhai"),
            vec![
                result("a.rhai", "a.rhai", Outcome::Success, 1),
                result("a.rhai", "test_bad()", Outcome::Failure, 1),
            ],
        );
        let text = render(&run);
        assert!(text.contains("Results:"));
        assert!(text.contains("\tFAILURE : eval-error executing test test_bad() : Runtime error: boom, second line"));
        assert!(!text.contains("SUCCESS!"));
        assert!(text.contains("Total time:"));
    }

    #[test]
    fn test_empty_run_still_summarizes() {
        let text = render(&TestRun::new());
        assert!(text.contains("0 Files executed, Tests run: 0"));
        assert!(text.contains("END OF TESTS"));
    }
}
