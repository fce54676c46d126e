//! Run driver
//!
//! [`Harness`] owns one invocation: it prepares the output root, runs every discovered test
//! file in a fresh session, keeps the append-only result sequence, and hands the finished
//! [`TestRun`] to the reporters. Deciding whether the build fails is left to the caller,
//! through [`RunStatus::verdict`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::aggregate::{BuildFailure, TestRun};
use crate::config::HarnessConfig;
use crate::copier::{CopyError, FixtureCopier};
use crate::discovery::discover_scripts;
use crate::report::{ConsoleReporter, JunitReporter, ReportError, Reporter};
use crate::runner::FileRunner;
use crate::session::{RhaiSessionFactory, ScriptFailure, ScriptSession, SessionError, SessionFactory};
use crate::version::TESTR_VERSION;

/// Faults of the harness itself. Any of these ends the run without a verdict.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to create directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy files from {} to {}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: CopyError,
    },

    #[error("failed to clean up previous test scripts")]
    Cleanup(#[source] CopyError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("failed to run source script {}: {failure}", path.display())]
    SourceScript { path: PathBuf, failure: ScriptFailure },

    #[error(transparent)]
    Report(#[from] ReportError),
}

/// How a run ended, when it ended without a harness fault.
#[derive(Debug, Clone)]
pub enum RunStatus {
    /// Skipped by configuration or `SKIP_TESTS`.
    Skipped,
    /// The test source directory does not exist.
    NoTests,
    Completed(TestRun),
}

impl RunStatus {
    pub fn test_run(&self) -> Option<&TestRun> {
        match self {
            RunStatus::Completed(run) => Some(run),
            RunStatus::Skipped | RunStatus::NoTests => None,
        }
    }

    /// Whether the enclosing build should fail. Skipped and empty runs always pass.
    pub fn verdict(&self, ignore_failures: bool) -> Result<(), BuildFailure> {
        match self {
            RunStatus::Completed(run) => run.verdict(ignore_failures),
            RunStatus::Skipped | RunStatus::NoTests => Ok(()),
        }
    }
}

/// The test harness, generic over how sessions are built.
pub struct Harness<F: SessionFactory = RhaiSessionFactory> {
    config: HarnessConfig,
    factory: F,
}

impl Harness<RhaiSessionFactory> {
    /// A harness over Rhai sessions resolving imports through `config.module_path`.
    pub fn new(config: HarnessConfig) -> Self {
        let factory = RhaiSessionFactory::new(config.module_path.clone());
        Self { config, factory }
    }
}

impl<F: SessionFactory> Harness<F> {
    pub fn with_factory(config: HarnessConfig, factory: F) -> Self {
        Self { config, factory }
    }

    /// Run with the console summary on stdout.
    pub fn run(&self) -> Result<RunStatus, HarnessError> {
        let mut console = ConsoleReporter::new(io::stdout().lock());
        self.run_with(&mut console)
    }

    /// Run with the console summary going to `console`. JUnit documents are always written.
    pub fn run_with(&self, console: &mut dyn Reporter) -> Result<RunStatus, HarnessError> {
        let config = &self.config;
        if config.should_skip() {
            tracing::info!("Tests are skipped");
            return Ok(RunStatus::Skipped);
        }

        tracing::info!("");
        tracing::info!("--------------------------------------------------------");
        tracing::info!("                RUNNING RHAI TESTS (testr {})", TESTR_VERSION);
        tracing::info!("--------------------------------------------------------");

        create_dir(&config.report_output_dir)?;
        create_dir(&config.test_output_dir)?;
        self.prepare_output()?;

        if !config.test_source_dir.exists() {
            tracing::info!("No test files found in {}", config.test_source_dir.display());
            return Ok(RunStatus::NoTests);
        }
        self.copy_into_output(&config.test_source_dir)?;

        if config.run_source_scripts_before_tests {
            self.run_source_scripts()?;
        }

        let run = self.run_tests()?;

        console.report(&run)?;
        JunitReporter::new(&config.report_output_dir, &config.test_output_dir).report(&run)?;
        Ok(RunStatus::Completed(run))
    }

    fn copier(&self) -> FixtureCopier<'_> {
        FixtureCopier::new(&self.config.extensions, &self.config.replace_strings_when_copy)
    }

    /// Remove stale scripts and restore resources into the output root.
    fn prepare_output(&self) -> Result<(), HarnessError> {
        let removed = self
            .copier()
            .clean_scripts(&self.config.test_output_dir)
            .map_err(HarnessError::Cleanup)?;
        tracing::debug!("Removed {} stale scripts from {}", removed, self.config.test_output_dir.display());

        // Resources may contain scripts deleted just above.
        if let Some(resources) = &self.config.test_resource_dir {
            if resources.is_dir() {
                self.copy_into_output(resources)?;
            }
        }
        Ok(())
    }

    fn copy_into_output(&self, from: &Path) -> Result<(), HarnessError> {
        let to = &self.config.test_output_dir;
        tracing::info!("Copying {} to {}", from.display(), to.display());
        self.copier()
            .copy_tree(from, to)
            .map_err(|source| HarnessError::Copy {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source,
            })?;
        Ok(())
    }

    /// Evaluate every source script once, in a single session rooted at `source_dir`.
    fn run_source_scripts(&self) -> Result<(), HarnessError> {
        let config = &self.config;
        if !config.source_dir.is_dir() {
            tracing::warn!("Source directory {} does not exist", config.source_dir.display());
            return Ok(());
        }

        let mut session = self.factory.create(&config.source_dir)?;
        for path in discover_scripts(&config.source_dir, &config.extensions, &config.delegated_dir) {
            tracing::info!("Running source script {}", path.display());
            session
                .eval_file(&path)
                .map_err(|failure| HarnessError::SourceScript { path, failure })?;
        }
        Ok(())
    }

    fn run_tests(&self) -> Result<TestRun, HarnessError> {
        let config = &self.config;
        let files = discover_scripts(&config.test_output_dir, &config.extensions, &config.delegated_dir);
        let runner = FileRunner::new(&config.test_prefixes, config.print_success);
        let mut run = TestRun::new();

        for file in files {
            tracing::info!("");
            tracing::info!("# Running test {}", file.display());
            // Every file resolves relative paths from the output root, wherever it sits below it.
            let mut session = self.factory.create(&config.test_output_dir)?;
            let results = runner.run(&mut session, &file);
            run.record_file(&file, results);
        }
        Ok(run)
    }
}

fn create_dir(path: &Path) -> Result<(), HarnessError> {
    fs::create_dir_all(path).map_err(|source| HarnessError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
