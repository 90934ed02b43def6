// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering a merged run as an HTML report.
//!
//! Rendering is a pure projection of a [`Run`]: the same run and [`RenderConfig`] always produce
//! the same document. [`write_report`] additionally writes the document to disk.

mod html;

use crate::errors::RenderError;
use camino::Utf8PathBuf;
use parallel_report_metadata::Run;
use std::fs;
use tracing::debug;

/// Settings for a rendered report.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RenderConfig {
    /// The directory the report is written to.
    pub output_dir: Utf8PathBuf,

    /// The file name of the report within `output_dir`.
    pub file_name: String,

    /// The title shown at the top of the report.
    pub report_title: String,

    /// The project name shown under the title.
    pub project_name: String,
}

impl RenderConfig {
    /// Returns the path the report is written to.
    pub fn report_path(&self) -> Utf8PathBuf {
        self.output_dir.join(&self.file_name)
    }
}

/// Renders the run as an HTML document.
pub fn render_report(run: &Run, config: &RenderConfig) -> Result<String, RenderError> {
    let mut buf = Vec::new();
    html::serialize_run(run, config, &mut buf).map_err(RenderError::Serialize)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Renders the run and writes it to [`RenderConfig::report_path`], creating the output directory
/// if necessary.
///
/// Returns the path of the written report.
pub fn write_report(run: &Run, config: &RenderConfig) -> Result<Utf8PathBuf, RenderError> {
    let document = render_report(run, config)?;

    fs::create_dir_all(&config.output_dir).map_err(|error| RenderError::CreateDir {
        dir: config.output_dir.clone(),
        error,
    })?;
    let path = config.report_path();
    fs::write(&path, document).map_err(|error| RenderError::Write {
        path: path.clone(),
        error,
    })?;

    debug!("wrote report to `{path}`");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use parallel_report_metadata::{
        Hook, HookKind, Stats, Step, StepStatus, Suite, Test, TestError, TestStatus,
    };
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn config() -> RenderConfig {
        RenderConfig {
            output_dir: "output".into(),
            file_name: "report.html".to_owned(),
            report_title: "API <Tests>".to_owned(),
            project_name: "billing".to_owned(),
        }
    }

    fn sample_run() -> Run {
        let mut run = Run::new(at(0));

        let mut suite = Suite::new("Users", "tests/users.ts", at(0));
        let mut before_suite = Hook::started("seed", at(0));
        before_suite.finish(at(5), HookKind::BeforeSuite, None, None);
        suite.hooks.push(before_suite);

        let mut passed = Test::new("lists users", at(10));
        passed.status = TestStatus::Passed;
        passed.tags = vec!["@a".to_owned(), "@a".to_owned(), "@b".to_owned()];
        let mut step = Step::started("sendGetRequest", at(10));
        step.finish(at(1260), "I", StepStatus::Passed, "'/users'");
        passed.steps.push(step);
        passed.mark_finished(at(1300));
        let mut after = Hook::started("cleanup", at(1300));
        after.finish(at(1310), HookKind::After, None, None);
        passed.hooks.push(after);
        suite.tests.push(passed);

        let mut skipped = Test::new("deletes users", at(20));
        skipped.status = TestStatus::Pending;
        skipped.skip_reason = Some("not ready".to_owned());
        suite.tests.push(skipped);

        let error = TestError {
            stack: "at users.ts:10".to_owned(),
            message: "expected <201>".to_owned(),
            actual: "500".to_owned(),
            expected: "201".to_owned(),
            file: "tests/users.ts".to_owned(),
            test_name: "creates user".to_owned(),
        };
        let mut failed = Test::new("creates user", at(30));
        failed.status = TestStatus::Failed;
        failed.error = Some(error.clone());
        suite.tests.push(failed);
        suite.failures.push(error);

        suite.finish(at(2000));
        run.add_suite(suite);
        run.finish(at(2000), Stats::new(1, 1, 1));
        run
    }

    #[test]
    fn document_structure() {
        let document = render_report(&sample_run(), &config()).unwrap();

        assert!(document.starts_with("<!DOCTYPE html>"), "{document}");
        assert!(document.contains("<title>API &lt;Tests&gt;</title>"));
        assert!(document.contains("billing"));
        assert!(document.contains("Generated 01 Jan 1970, 12:00:02 AM UTC"));
        assert!(document.contains(r#"id="suite-0""#));
        assert!(document.contains("Before Suite Hooks"));
        assert!(!document.contains("After Suite Hooks"));
        assert!(document.contains("After Test Hook"));
        assert!(!document.contains("Before Test Hook"));
        assert!(document.contains("I.sendGetRequest ('/users')"));
        assert!(document.contains("1.25s"));
        assert!(document.contains("not ready"));
        assert!(document.contains(r#"id="failures""#));
        assert!(document.contains("expected &lt;201&gt;"));
        assert!(document.contains("at users.ts:10"));
        assert!(document.contains(r#"class="col summary-failed text-danger""#));
    }

    #[test]
    fn tags_are_deduplicated() {
        let document = render_report(&sample_run(), &config()).unwrap();
        let tags: Vec<_> = document
            .lines()
            .filter(|line| line.contains("tag\">"))
            .map(|line| line.trim())
            .collect();
        assert_eq!(
            tags,
            [
                r#"<span class="badge text-bg-secondary me-1 tag">@a</span>"#,
                r#"<span class="badge text-bg-secondary me-1 tag">@b</span>"#,
            ]
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let run = sample_run();
        assert_eq!(
            render_report(&run, &config()).unwrap(),
            render_report(&run, &config()).unwrap()
        );
    }

    #[test]
    fn empty_run_renders_without_sections() {
        let document = render_report(&Run::new(at(0)), &config()).unwrap();
        assert!(document.contains(r#"id="suites""#));
        assert!(!document.contains(r#"id="failures""#));
        assert!(!document.contains("accordion-item"));
        assert!(document.contains(r#"class="col summary-failed""#));
    }

    #[test]
    fn format_helpers() {
        assert_eq!(html::format_duration(Duration::from_millis(1234)), "1.23s");
        assert_eq!(html::format_duration(Duration::ZERO), "0.00s");

        let mut step = Step::started("seeResponseCodeIs", at(0));
        step.finish(at(0), "I", StepStatus::Passed, "200");
        assert_eq!(html::format_step_line(&step), "I.seeResponseCodeIs (200)");
        step.actor.clear();
        assert_eq!(html::format_step_line(&step), "seeResponseCodeIs (200)");
    }

    #[test]
    fn write_report_creates_directory() {
        let temp = camino_tempfile::Utf8TempDir::new().unwrap();
        let config = RenderConfig {
            output_dir: temp.path().join("out/nested"),
            ..config()
        };
        let path = write_report(&sample_run(), &config).unwrap();
        assert_eq!(path, temp.path().join("out/nested/report.html"));
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("lists users"));
    }
}
