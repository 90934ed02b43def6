// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `parallel-report` failures.
///
/// `parallel-report` invocations may fail for a variety of reasons. This structure documents the
/// exit codes that may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum ParallelReportExitCode {}

impl ParallelReportExitCode {
    /// No errors occurred and `parallel-report` exited normally.
    pub const OK: i32 = 0;

    /// No worker journals were found, so no report was generated.
    pub const NO_JOURNALS_FOUND: i32 = 4;

    /// A worker's event stream could not be read.
    pub const EVENT_STREAM_FAILED: i32 = 70;

    /// A worker journal could not be written.
    pub const JOURNAL_WRITE_FAILED: i32 = 71;

    /// A user issue happened while setting up a `parallel-report` invocation.
    pub const SETUP_ERROR: i32 = 96;

    /// Worker journals were found but could not be merged.
    pub const MERGE_FAILED: i32 = 102;

    /// Writing the rendered report produced an error. Worker journals are left in place.
    pub const RENDER_FAILED: i32 = 110;
}
