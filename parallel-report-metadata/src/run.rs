// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{Hook, HookKind, Stats, Test, TestError, serde_helpers::duration_millis, span_between};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A group of tests defined in a single file.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Suite {
    /// The title of the suite.
    pub title: String,

    /// The file the suite is defined in, relative to the workspace root.
    #[serde(default)]
    pub file: String,

    /// Tags attached to the suite.
    #[serde(default)]
    pub tags: Vec<String>,

    /// The tests in this suite, in the order they finished (or were skipped).
    #[serde(default)]
    pub tests: Vec<Test>,

    /// Suite-level hooks, in the order they finished.
    #[serde(default)]
    pub hooks: Vec<Hook>,

    /// Errors produced by failing tests in this suite.
    #[serde(default)]
    pub failures: Vec<TestError>,

    /// The time at which the suite started.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,

    /// The time at which the suite finished.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,

    /// The time taken by the suite.
    #[serde(with = "duration_millis")]
    pub duration: Duration,

    /// Summary counts for this suite.
    #[serde(default)]
    pub stats: Stats,
}

impl Suite {
    /// Creates a suite that started at the given time.
    pub fn new(title: impl Into<String>, file: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            file: file.into(),
            tags: Vec::new(),
            tests: Vec::new(),
            hooks: Vec::new(),
            failures: Vec::new(),
            start_time: at,
            end_time: at,
            duration: Duration::ZERO,
            stats: Stats::default(),
        }
    }

    /// Marks the suite as finished and computes its stats from its tests.
    pub fn finish(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.end_time = at;
        self.duration = span_between(self.start_time, at);
        self.stats = Stats::from_tests(&self.tests);
        self
    }

    /// Returns suite-level hooks of the given kind.
    pub fn hooks_of_kind(&self, kind: HookKind) -> impl Iterator<Item = &Hook> + '_ {
        self.hooks.iter().filter(move |hook| hook.kind == kind)
    }
}

/// A test run: either the share executed by one worker, or the merged result of all workers.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Run {
    /// The suites in this run.
    #[serde(default)]
    pub suites: Vec<Suite>,

    /// Errors produced by failing tests across all suites.
    #[serde(default)]
    pub failures: Vec<TestError>,

    /// Summary counts for this run.
    #[serde(default)]
    pub stats: Stats,

    /// The time at which the run started.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,

    /// The time at which the run finished.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,

    /// The wall-clock time taken by the run.
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl Run {
    /// Creates an empty run that started at the given time.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            suites: Vec::new(),
            failures: Vec::new(),
            stats: Stats::default(),
            start_time: at,
            end_time: at,
            duration: Duration::ZERO,
        }
    }

    /// Appends a finished suite, along with its failures.
    pub fn add_suite(&mut self, suite: Suite) -> &mut Self {
        self.failures.extend(suite.failures.iter().cloned());
        self.suites.push(suite);
        self
    }

    /// Marks the run as finished with the given stats.
    pub fn finish(&mut self, at: DateTime<Utc>, stats: Stats) -> &mut Self {
        self.end_time = at;
        self.duration = span_between(self.start_time, at);
        self.stats = stats;
        self
    }

    /// Returns the total number of tests across all suites, as recorded by each suite's stats.
    pub fn suite_test_total(&self) -> usize {
        self.suites.iter().map(|suite| suite.stats.total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestStatus;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn suite_finish_computes_stats() {
        let mut suite = Suite::new("Login", "tests/login.spec.ts", at(0));
        for status in [TestStatus::Passed, TestStatus::Failed, TestStatus::Pending] {
            let mut test = Test::new("t", at(0));
            test.status = status;
            suite.tests.push(test);
        }
        suite.finish(at(250));

        assert_eq!(suite.stats, Stats::new(1, 1, 1));
        assert_eq!(suite.duration, Duration::from_millis(250));
    }

    #[test]
    fn add_suite_collects_failures() {
        let mut run = Run::new(at(0));
        let mut suite = Suite::new("Login", "tests/login.spec.ts", at(0));
        suite.failures.push(TestError {
            message: "bad password".to_owned(),
            ..Default::default()
        });
        run.add_suite(suite);

        assert_eq!(run.suites.len(), 1);
        assert_eq!(run.failures.len(), 1);
        assert_eq!(run.failures[0].message, "bad password");
    }

    #[test]
    fn run_round_trips_through_json() {
        let mut run = Run::new(at(100));
        run.finish(at(500), Stats::new(3, 1, 0));
        let json = serde_json::to_string(&run).expect("run serializes");
        assert!(json.contains(r#""start-time":100"#), "json: {json}");
        assert!(json.contains(r#""duration":400"#), "json: {json}");

        let back: Run = serde_json::from_str(&json).expect("run deserializes");
        assert_eq!(back, run);
    }
}
