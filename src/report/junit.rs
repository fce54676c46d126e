//! JUnit XML documents, one per source file
//!
//! ```xml
//! <testsuite tests="3" failures="1" errors="0" name="sub.math_test" time="0.012">
//!   <testcase classname="math_test" name="math_test.rhai" time="0.004"/>
//!   <testcase classname="math_test" name="test_bad()" time="0.008">
//!     <failure message="eval-error executing test math_test.rhai: test_bad()" type="FAILURE">...</failure>
//!   </testcase>
//! </testsuite>
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::{ReportError, Reporter, seconds};
use crate::aggregate::{FileGroup, TestRun};
use crate::discovery::relative_to;

/// Writes `TEST-<dotted relative path>.xml` files into a report directory.
#[derive(Debug, Clone)]
pub struct JunitReporter {
    report_dir: PathBuf,
    test_root: PathBuf,
}

impl JunitReporter {
    /// `test_root` is the directory report names are made relative to.
    pub fn new(report_dir: impl Into<PathBuf>, test_root: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
            test_root: test_root.into(),
        }
    }

    fn write_group(&self, group: &FileGroup<'_>) -> Result<PathBuf, ReportError> {
        let relative = relative_to(group.source_file, &self.test_root);
        let xml = render_suite(group, relative)?;
        let path = self.report_dir.join(report_file_name(relative));
        fs::write(&path, xml).map_err(|source| ReportError::File {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

impl Reporter for JunitReporter {
    fn report(&mut self, run: &TestRun) -> Result<(), ReportError> {
        for group in run.by_file() {
            let path = self.write_group(&group)?;
            tracing::debug!("Wrote {}", path.display());
        }
        Ok(())
    }
}

/// Relative path with separators replaced by dots.
fn dotted(relative: &Path) -> String {
    relative
        .iter()
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(".")
}

/// `TEST-sub.math_test.rhai.xml` for `sub/math_test.rhai`.
pub fn report_file_name(relative: &Path) -> String {
    format!("TEST-{}.xml", dotted(relative))
}

/// `sub.math_test` for `sub/math_test.rhai`.
pub fn suite_name(relative: &Path) -> String {
    dotted(&relative.with_extension(""))
}

fn render_suite(group: &FileGroup<'_>, relative: &Path) -> Result<String, ReportError> {
    let counts = group.counts();
    let classname = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let tests = group.results.len().to_string();
    let failures = counts.failures.to_string();
    let errors = counts.errors.to_string();
    let name = suite_name(relative);
    let time = seconds(group.elapsed());
    let mut suite = BytesStart::new("testsuite");
    suite.push_attribute(("tests", tests.as_str()));
    suite.push_attribute(("failures", failures.as_str()));
    suite.push_attribute(("errors", errors.as_str()));
    suite.push_attribute(("name", name.as_str()));
    suite.push_attribute(("time", time.as_str()));
    emit(&mut writer, Event::Start(suite))?;

    for result in &group.results {
        let time = seconds(result.elapsed());
        let mut case = BytesStart::new("testcase");
        case.push_attribute(("classname", classname.as_str()));
        case.push_attribute(("name", result.unit_name()));
        case.push_attribute(("time", time.as_str()));

        if result.is_success() {
            emit(&mut writer, Event::Empty(case))?;
            continue;
        }

        emit(&mut writer, Event::Start(case))?;
        let mut failure = BytesStart::new("failure");
        failure.push_attribute(("message", result.issue().unwrap_or_default()));
        failure.push_attribute(("type", result.outcome().as_str()));
        emit(&mut writer, Event::Start(failure))?;
        let detail = result.error().map(|e| e.detail.as_str()).unwrap_or_default();
        emit(&mut writer, Event::Text(BytesText::new(detail)))?;
        emit(&mut writer, Event::End(BytesEnd::new("failure")))?;
        emit(&mut writer, Event::End(BytesEnd::new("testcase")))?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("testsuite")))?;
    String::from_utf8(writer.into_inner()).map_err(|e| ReportError::Xml(e.to_string()))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ReportError> {
    writer.write_event(event).map_err(|e| ReportError::Xml(e.to_string()))
}
