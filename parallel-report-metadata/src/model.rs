// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::serde_helpers::duration_millis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// Returns the time elapsed between `start` and `end`.
///
/// If `end` is earlier than `start`, the span is zero.
pub fn span_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
    (end - start).to_std().unwrap_or_default()
}

/// The outcome of a single step.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    /// The step succeeded.
    Passed,
    /// The step failed.
    Failed,
    /// The step was skipped.
    Skipped,
    /// The step is pending.
    Pending,
    /// The step's outcome was not reported, or was not recognized.
    #[default]
    Unknown,
}

impl StepStatus {
    /// Interprets the status string carried by a step-finished event.
    ///
    /// Test runners report a successful step as `success`; `passed` is accepted as well. Any
    /// unrecognized value maps to [`StepStatus::Unknown`].
    pub fn from_event_status(status: &str) -> Self {
        match status {
            "success" | "passed" => Self::Passed,
            "failed" => Self::Failed,
            "skipped" => Self::Skipped,
            "pending" => Self::Pending,
            _ => Self::Unknown,
        }
    }

    /// Returns the string form of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Pending => "pending",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single step executed by a test or a hook.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Step {
    /// The name of the step, e.g. `sendGetRequest`.
    pub name: String,

    /// The actor that performed the step, e.g. `I`.
    #[serde(default)]
    pub actor: String,

    /// The step's arguments, already formatted for display.
    #[serde(default)]
    pub args: String,

    /// The outcome of the step.
    #[serde(default)]
    pub status: StepStatus,

    /// The time at which the step started.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,

    /// The time at which the step finished.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,

    /// The time taken by the step.
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl Step {
    /// Creates a step that started at the given time.
    ///
    /// Until it is finished, the step's end time equals its start time.
    pub fn started(name: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            actor: String::new(),
            args: String::new(),
            status: StepStatus::Unknown,
            start_time: at,
            end_time: at,
            duration: Duration::ZERO,
        }
    }

    /// Marks this step as finished at the given time.
    pub fn finish(
        &mut self,
        at: DateTime<Utc>,
        actor: impl Into<String>,
        status: StepStatus,
        args: impl Into<String>,
    ) -> &mut Self {
        self.end_time = at;
        self.duration = span_between(self.start_time, at);
        self.actor = actor.into();
        self.status = status;
        self.args = args.into();
        self
    }
}

/// The kind of a hook.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum HookKind {
    /// Runs once before all tests in a suite.
    BeforeSuite,
    /// Runs once after all tests in a suite.
    AfterSuite,
    /// Runs before each test.
    Before,
    /// Runs after each test.
    After,
    /// The kind could not be determined.
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl HookKind {
    /// Parses a hook kind as reported by a hook-finished event.
    ///
    /// Accepts either the bare kind (`BeforeSuite`) or a full hook title of the form
    /// `"before all" hook: BeforeSuite`, in which case the text after `hook: ` is used.
    pub fn parse(input: &str) -> Self {
        let kind = input
            .rsplit_once("hook: ")
            .map_or(input, |(_, kind)| kind)
            .trim();
        match kind {
            "BeforeSuite" => Self::BeforeSuite,
            "AfterSuite" => Self::AfterSuite,
            "Before" => Self::Before,
            "After" => Self::After,
            _ => Self::Unknown,
        }
    }

    /// Returns true if this hook runs once per suite rather than once per test.
    pub fn is_suite_scoped(self) -> bool {
        matches!(self, Self::BeforeSuite | Self::AfterSuite)
    }

    /// Returns the string form of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeSuite => "BeforeSuite",
            Self::AfterSuite => "AfterSuite",
            Self::Before => "Before",
            Self::After => "After",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The status of a hook.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookStatus {
    /// The hook has started but not finished.
    #[default]
    Started,
    /// The hook finished without an error.
    Passed,
    /// The hook finished with an error.
    Failed,
}

/// A hook that ran as part of a suite or a test.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Hook {
    /// The title of the hook.
    pub title: String,

    /// The kind of hook.
    #[serde(default)]
    pub kind: HookKind,

    /// The status of the hook.
    #[serde(default)]
    pub status: HookStatus,

    /// The time at which the hook started.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,

    /// The time at which the hook finished.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,

    /// The time taken by the hook.
    #[serde(with = "duration_millis")]
    pub duration: Duration,

    /// The error produced by the hook, if any.
    #[serde(default)]
    pub error: Option<TestError>,

    /// The source file the hook was defined in.
    #[serde(default)]
    pub location: Option<String>,

    /// The steps executed by this hook, in the order they started.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Hook {
    /// Creates a hook that started at the given time.
    pub fn started(title: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            kind: HookKind::Unknown,
            status: HookStatus::Started,
            start_time: at,
            end_time: at,
            duration: Duration::ZERO,
            error: None,
            location: None,
            steps: Vec::new(),
        }
    }

    /// Marks this hook as finished at the given time.
    ///
    /// The status is derived from whether an error is present.
    pub fn finish(
        &mut self,
        at: DateTime<Utc>,
        kind: HookKind,
        error: Option<TestError>,
        location: Option<String>,
    ) -> &mut Self {
        self.end_time = at;
        self.duration = span_between(self.start_time, at);
        self.kind = kind;
        self.status = if error.is_some() {
            HookStatus::Failed
        } else {
            HookStatus::Passed
        };
        self.error = error;
        self.location = location;
        self
    }
}

/// The status of a test.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestStatus {
    /// The test passed.
    Passed,
    /// The test failed.
    Failed,
    /// The test is pending, i.e. it was skipped by the test runner.
    Pending,
    /// The test was skipped.
    Skipped,
    /// The test has started but its outcome is not known yet.
    #[default]
    JustStarted,
}

impl TestStatus {
    /// Interprets the state string carried by test events.
    ///
    /// Unrecognized states map to [`TestStatus::JustStarted`].
    pub fn from_state(state: &str) -> Self {
        match state {
            "passed" => Self::Passed,
            "failed" => Self::Failed,
            "pending" => Self::Pending,
            "skipped" => Self::Skipped,
            _ => Self::JustStarted,
        }
    }

    /// Returns true if the test did not run.
    pub fn is_skipped(self) -> bool {
        matches!(self, Self::Pending | Self::Skipped)
    }

    /// Returns the string form of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Pending => "pending",
            Self::Skipped => "skipped",
            Self::JustStarted => "just-started",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved snapshot of an error raised by a test or a hook.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TestError {
    /// The stack trace, with ANSI escapes removed.
    pub stack: String,

    /// The error message.
    pub message: String,

    /// A display form of the actual value, for assertion failures.
    pub actual: String,

    /// A display form of the expected value, for assertion failures.
    pub expected: String,

    /// The file containing the test or hook that raised this error.
    pub file: String,

    /// The title of the test or hook that raised this error.
    pub test_name: String,
}

/// A single test.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Test {
    /// The title of the test.
    pub title: String,

    /// The status of the test.
    #[serde(default)]
    pub status: TestStatus,

    /// The time at which the test started executing.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,

    /// The time at which the test finished.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,

    /// The time taken by the test.
    #[serde(with = "duration_millis")]
    pub duration: Duration,

    /// The file the test is defined in.
    #[serde(default)]
    pub file: String,

    /// Tags attached to the test, in declaration order. May contain duplicates.
    #[serde(default)]
    pub tags: Vec<String>,

    /// The steps executed by the test, ordered by start time.
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Per-test hooks, in the order they finished.
    #[serde(default)]
    pub hooks: Vec<Hook>,

    /// The error that caused this test to fail, if any.
    #[serde(default)]
    pub error: Option<TestError>,

    /// Warnings emitted while running the test.
    #[serde(default)]
    pub warnings: Vec<String>,

    /// The reason this test was skipped, if it was.
    #[serde(default)]
    pub skip_reason: Option<String>,
}

impl Test {
    /// Creates a test allocated at the given time.
    pub fn new(title: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            status: TestStatus::JustStarted,
            start_time: at,
            end_time: at,
            duration: Duration::ZERO,
            file: String::new(),
            tags: Vec::new(),
            steps: Vec::new(),
            hooks: Vec::new(),
            error: None,
            warnings: Vec::new(),
            skip_reason: None,
        }
    }

    /// Records the time at which the test actually started executing.
    pub fn mark_started(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.start_time = at;
        self.end_time = at;
        self
    }

    /// Records the time at which the test finished, and computes its duration.
    pub fn mark_finished(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.end_time = at;
        self.duration = span_between(self.start_time, at);
        self
    }

    /// Sorts steps by their start time.
    ///
    /// The sort is stable, so steps that started at the same instant keep their arrival order.
    pub fn sort_steps_by_start_time(&mut self) {
        self.steps.sort_by_key(|step| step.start_time);
    }

    /// Returns per-test hooks of the given kind.
    pub fn hooks_of_kind(&self, kind: HookKind) -> impl Iterator<Item = &Hook> + '_ {
        self.hooks.iter().filter(move |hook| hook.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test_case("success", StepStatus::Passed ; "success")]
    #[test_case("passed", StepStatus::Passed ; "passed")]
    #[test_case("failed", StepStatus::Failed ; "failed")]
    #[test_case("skipped", StepStatus::Skipped ; "skipped")]
    #[test_case("pending", StepStatus::Pending ; "pending")]
    #[test_case("queued", StepStatus::Unknown ; "unrecognized")]
    #[test_case("", StepStatus::Unknown ; "empty")]
    fn step_status_from_event(input: &str, expected: StepStatus) {
        assert_eq!(StepStatus::from_event_status(input), expected);
    }

    #[test_case("BeforeSuite", HookKind::BeforeSuite ; "bare before suite")]
    #[test_case("After", HookKind::After ; "bare after")]
    #[test_case("\"before all\" hook: BeforeSuite", HookKind::BeforeSuite ; "titled before suite")]
    #[test_case("\"after each\" hook: After", HookKind::After ; "titled after")]
    #[test_case("\"before each\" hook: Before for \"x\"", HookKind::Unknown ; "titled with suffix")]
    #[test_case("whatever", HookKind::Unknown ; "unrecognized")]
    fn hook_kind_parse(input: &str, expected: HookKind) {
        assert_eq!(HookKind::parse(input), expected);
    }

    #[test]
    fn span_is_never_negative() {
        assert_eq!(span_between(at(500), at(100)), Duration::ZERO);
        assert_eq!(span_between(at(100), at(500)), Duration::from_millis(400));
    }

    #[test]
    fn hook_status_follows_error() {
        let mut hook = Hook::started("setup", at(10));
        hook.finish(at(30), HookKind::Before, None, None);
        assert_eq!(hook.status, HookStatus::Passed);
        assert_eq!(hook.duration, Duration::from_millis(20));

        let mut hook = Hook::started("setup", at(10));
        hook.finish(
            at(10),
            HookKind::Before,
            Some(TestError::default()),
            Some("tests/a.ts".to_owned()),
        );
        assert_eq!(hook.status, HookStatus::Failed);
        assert_eq!(hook.duration, Duration::ZERO);
    }

    #[test]
    fn steps_sort_stably_by_start_time() {
        let mut test = Test::new("t", at(0));
        test.steps.push(Step::started("c", at(30)));
        test.steps.push(Step::started("a", at(10)));
        test.steps.push(Step::started("b1", at(20)));
        test.steps.push(Step::started("b2", at(20)));
        test.sort_steps_by_start_time();

        let names: Vec<_> = test.steps.iter().map(|step| step.name.as_str()).collect();
        assert_eq!(names, ["a", "b1", "b2", "c"]);
    }

    #[test]
    fn step_deserializes_with_unknown_fields() {
        let json = r#"{
            "name": "sendGetRequest",
            "actor": "I",
            "args": "'/users'",
            "status": "passed",
            "start-time": 100,
            "end-time": 150,
            "duration": 50,
            "helper": "REST"
        }"#;
        let step: Step = serde_json::from_str(json).expect("step deserializes");
        assert_eq!(step.name, "sendGetRequest");
        assert_eq!(step.status, StepStatus::Passed);
        assert_eq!(step.start_time, at(100));
        assert_eq!(step.duration, Duration::from_millis(50));
    }
}
