//! Per-file execution: the file-level unit, then one unit per test function
//!
//! Both kinds of unit share the file's session, so functions defined at file scope are
//! visible to the test functions discovered afterwards. Failures in user code are caught at
//! the unit boundary and never stop the remaining units of the file.

use std::collections::HashSet;
use std::path::Path;

use crate::outcome::{TestUnitResult, UnitTimer, one_line};
use crate::session::{Binding, ScriptSession};

/// Runs the units of one test file inside a caller-owned session.
#[derive(Debug, Clone)]
pub struct FileRunner<'a> {
    test_prefixes: &'a [String],
    print_success: bool,
}

impl<'a> FileRunner<'a> {
    pub fn new(test_prefixes: &'a [String], print_success: bool) -> Self {
        Self {
            test_prefixes,
            print_success,
        }
    }

    /// Run the file-level unit, then every discovered test function, in order.
    #[tracing::instrument(skip_all, fields(file = %file.display()))]
    pub fn run<S: ScriptSession>(&self, session: &mut S, file: &Path) -> Vec<TestUnitResult> {
        tracing::debug!("Working directory {}", session.working_dir().display());
        let mut results = vec![self.run_file_unit(session, file)];
        results.extend(self.run_function_units(session, file));
        results
    }

    fn run_file_unit<S: ScriptSession>(&self, session: &mut S, file: &Path) -> TestUnitResult {
        let file_name = file_name(file);
        let timer = UnitTimer::start(file, file_name.clone(), file_name.clone());

        match session.eval_file(file) {
            Ok(()) => {
                if self.print_success {
                    tracing::info!("\t# {}: Success", file_name);
                }
                timer.succeed()
            }
            Err(failure) => {
                tracing::warn!("\t# {}: Failure detected: {}", file_name, one_line(&failure.message));
                timer.fail(&failure)
            }
        }
    }

    fn run_function_units<S: ScriptSession>(&self, session: &mut S, file: &Path) -> Vec<TestUnitResult> {
        let file_name = file_name(file);
        let tests = self.test_functions(session.bindings());
        let mut results = Vec::with_capacity(tests.len());

        for name in tests {
            let unit_name = format!("{name}()");
            let label = format!("{file_name}: {unit_name}");
            tracing::info!("\t# Running test function {} in {}", unit_name, file_name);

            let timer = UnitTimer::start(file, unit_name, label);
            let called = session.call(&name);
            // Remove before closing the unit, so a cleanup fault is recorded against it.
            let removed = session.remove(&name);

            let result = match (called, removed) {
                (_, Err(error)) => {
                    tracing::error!("\t\t# {}: {}", timer.label(), error);
                    timer.error(&error)
                }
                (Ok(()), Ok(())) => {
                    if self.print_success {
                        tracing::info!("\t\t# {}: Success", timer.label());
                    }
                    timer.succeed()
                }
                (Err(failure), Ok(())) => {
                    tracing::warn!("\t\t# {}: Failure detected: {}", timer.label(), one_line(&failure.message));
                    timer.fail(&failure)
                }
            };
            results.push(result);
        }
        results
    }

    /// Names of nullary bindings carrying a test prefix, each once, in namespace order.
    fn test_functions(&self, bindings: Vec<Binding>) -> Vec<String> {
        let mut seen = HashSet::new();
        bindings
            .into_iter()
            .filter(|b| b.is_nullary_callable() && self.is_test_name(&b.name))
            .filter(|b| seen.insert(b.name.clone()))
            .map(|b| b.name)
            .collect()
    }

    fn is_test_name(&self, name: &str) -> bool {
        let name = name.trim();
        self.test_prefixes.iter().any(|prefix| name.starts_with(prefix.as_str()))
    }
}

fn file_name(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}
