// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle events emitted by a test worker.
//!
//! A worker reports its progress as newline-delimited JSON, one [`ReporterEvent`] per line:
//!
//! ```json
//! {"timestamp": 1700000000000, "event": "test-before", "title": "logs in"}
//! ```
//!
//! The `event` field selects the [`ReporterEventKind`]; the rest of the object is the payload for
//! that kind. Unknown payload fields are ignored.

use crate::errors::EventParseError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead};

/// A single timestamped event.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ReporterEvent {
    /// The time at which the event occurred.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// The kind of event this is, along with its payload.
    #[serde(flatten)]
    pub kind: ReporterEventKind,
}

impl ReporterEvent {
    /// Creates a new event.
    pub fn new(timestamp: DateTime<Utc>, kind: ReporterEventKind) -> Self {
        Self { timestamp, kind }
    }

    /// Parses a single line of an event stream.
    pub fn parse_line(line: &str, line_number: usize) -> Result<Self, EventParseError> {
        serde_json::from_str(line).map_err(|error| EventParseError::new(line_number, error))
    }
}

/// The kind of a [`ReporterEvent`].
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "kebab-case")]
pub enum ReporterEventKind {
    /// The worker's run started.
    RunBefore,

    /// The worker's run finished.
    RunAfter,

    /// A suite started.
    SuiteBefore {
        /// The suite's title.
        title: String,

        /// The file the suite is defined in.
        #[serde(default)]
        file: String,

        /// Tags attached to the suite.
        #[serde(default)]
        tags: Vec<String>,
    },

    /// A suite finished.
    SuiteAfter {
        /// The suite's title.
        #[serde(default)]
        title: String,
    },

    /// A hook started.
    HookStarted {
        /// The hook's title.
        title: String,
    },

    /// A hook finished.
    HookFinished {
        /// The hook's title.
        title: String,

        /// The hook kind, either bare (`BeforeSuite`) or as a full hook title.
        #[serde(default)]
        kind: String,

        /// The error raised by the hook, if any.
        #[serde(default)]
        error: Option<ErrorPayload>,

        /// The file the hook is defined in.
        #[serde(default)]
        location: Option<String>,
    },

    /// A test was scheduled.
    TestBefore {
        /// The test's title.
        title: String,
    },

    /// A test started executing.
    TestStarted {
        /// The test's title.
        title: String,
    },

    /// A test passed.
    TestPassed {
        /// The test's title.
        title: String,
    },

    /// A test failed.
    TestFailed {
        /// The test's title.
        title: String,

        /// The file the test is defined in.
        #[serde(default)]
        file: String,

        /// The error raised by the test.
        #[serde(default)]
        error: Option<ErrorPayload>,
    },

    /// A test was skipped without running.
    TestSkipped {
        /// The test's title.
        title: String,

        /// The test state reported by the runner, e.g. `pending` or `skipped`.
        #[serde(default)]
        state: Option<String>,

        /// The file the test is defined in.
        #[serde(default)]
        file: String,

        /// Tags attached to the test.
        #[serde(default)]
        tags: Vec<String>,

        /// Why the test was skipped.
        #[serde(default)]
        skip_reason: Option<String>,
    },

    /// A test finished.
    TestFinished {
        /// The test's title.
        title: String,

        /// The final test state, e.g. `passed` or `failed`.
        #[serde(default)]
        state: String,

        /// The file the test is defined in.
        #[serde(default)]
        file: String,

        /// Tags attached to the test.
        #[serde(default)]
        tags: Vec<String>,

        /// The error raised by the test, if any.
        #[serde(default)]
        error: Option<ErrorPayload>,

        /// Warnings emitted while running the test.
        #[serde(default)]
        warnings: Vec<String>,
    },

    /// All per-test work, including After hooks, is done.
    TestAfter {
        /// The test's title.
        #[serde(default)]
        title: String,
    },

    /// A step started.
    StepStarted {
        /// The step's name.
        name: String,
    },

    /// A step passed.
    StepPassed {
        /// The step's name.
        name: String,
    },

    /// A step failed.
    StepFailed {
        /// The step's name.
        name: String,
    },

    /// A step finished.
    StepFinished {
        /// The step's name.
        name: String,

        /// The actor that performed the step.
        #[serde(default)]
        actor: String,

        /// The step status, e.g. `success` or `failed`.
        #[serde(default)]
        status: String,

        /// The raw arguments passed to the step.
        #[serde(default)]
        args: Vec<serde_json::Value>,
    },
}

impl ReporterEventKind {
    /// Returns the wire name of this event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RunBefore => "run-before",
            Self::RunAfter => "run-after",
            Self::SuiteBefore { .. } => "suite-before",
            Self::SuiteAfter { .. } => "suite-after",
            Self::HookStarted { .. } => "hook-started",
            Self::HookFinished { .. } => "hook-finished",
            Self::TestBefore { .. } => "test-before",
            Self::TestStarted { .. } => "test-started",
            Self::TestPassed { .. } => "test-passed",
            Self::TestFailed { .. } => "test-failed",
            Self::TestSkipped { .. } => "test-skipped",
            Self::TestFinished { .. } => "test-finished",
            Self::TestAfter { .. } => "test-after",
            Self::StepStarted { .. } => "step-started",
            Self::StepPassed { .. } => "step-passed",
            Self::StepFailed { .. } => "step-failed",
            Self::StepFinished { .. } => "step-finished",
        }
    }
}

/// An error raised by a test or a hook, as reported by the runner.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ErrorPayload {
    /// The stack trace, possibly containing terminal escape sequences.
    pub stack: Option<String>,

    /// The error message.
    pub message: Option<String>,

    /// The actual value of a failed assertion.
    pub actual: Option<ErrorValue>,

    /// The expected value of a failed assertion.
    pub expected: Option<ErrorValue>,
}

/// The actual or expected value of a failed assertion.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ErrorValue {
    /// A regular-expression pattern.
    Pattern {
        /// The pattern source.
        pattern: String,

        /// The pattern flags.
        #[serde(default)]
        flags: String,
    },

    /// Any other JSON value.
    Value(serde_json::Value),
}

/// Reads events from a newline-delimited JSON stream.
///
/// Blank lines are skipped. Each remaining line yields either an event or an [`EventParseError`];
/// I/O errors are returned separately so callers can tell a corrupt line from a broken stream.
#[derive(Debug)]
pub struct EventStreamReader<R> {
    reader: R,
    line_number: usize,
    buf: String,
}

impl<R: BufRead> EventStreamReader<R> {
    /// Creates a new reader over the given stream.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            buf: String::new(),
        }
    }

    /// Reads the next non-blank line and parses it.
    ///
    /// Returns `Ok(None)` at the end of the stream.
    pub fn next_event(&mut self) -> io::Result<Option<Result<ReporterEvent, EventParseError>>> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }
            return Ok(Some(ReporterEvent::parse_line(line, self.line_number)));
        }
    }

    /// Returns the number of lines read so far.
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}
