// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconstructs a worker's execution tree from its flat event stream.

use super::helpers::{format_step_args, relative_to, resolve_error};
use crate::events::{ErrorPayload, ReporterEvent, ReporterEventKind};
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use parallel_report_metadata::{
    Hook, HookKind, Run, Stats, Step, StepStatus, Suite, Test, TestStatus,
};
use tracing::{debug, warn};

/// The skip reason recorded when the runner does not provide one.
pub const DEFAULT_SKIP_REASON: &str = "No additional information available for this skipped test.";

/// Builds a [`Run`] for a single worker, one event at a time.
///
/// Events must be fed in the order the worker emitted them. The builder never reads the wall
/// clock: every time it records comes from an event's timestamp.
#[derive(Debug)]
pub struct RunTreeBuilder {
    workspace_root: Utf8PathBuf,
    run: Option<Run>,
    counters: Stats,
    cursor: Cursor,
}

impl RunTreeBuilder {
    /// Creates a new builder.
    ///
    /// Suite and test file paths under `workspace_root` are stored relative to it.
    pub fn new(workspace_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            run: None,
            counters: Stats::default(),
            cursor: Cursor::default(),
        }
    }

    /// Processes a single event.
    ///
    /// Returns the completed run once `run-after` is processed. The builder is then ready for a
    /// new run.
    pub fn handle_event(&mut self, event: ReporterEvent) -> Option<Run> {
        let ReporterEvent { timestamp, kind } = event;
        if !matches!(kind, ReporterEventKind::RunBefore) {
            self.run_mut(timestamp);
        }

        match kind {
            ReporterEventKind::RunBefore => {
                if self.run.as_ref().is_some_and(|run| !run.suites.is_empty()) {
                    warn!("run started again before the previous run finished, discarding it");
                }
                self.run = Some(Run::new(timestamp));
                self.counters = Stats::default();
                self.cursor = Cursor::default();
            }
            ReporterEventKind::RunAfter => {
                return Some(self.finish_run(timestamp));
            }
            ReporterEventKind::SuiteBefore { title, file, tags } => {
                if self.cursor.suite.is_some() {
                    debug!("suite `{title}` started before the previous suite finished");
                    self.close_suite(timestamp);
                }
                let file = relative_to(&self.workspace_root, &file);
                let mut suite = Suite::new(title, file, timestamp);
                suite.tags = tags;
                self.cursor.suite = Some(suite);
            }
            ReporterEventKind::SuiteAfter { title } => {
                if self.cursor.suite.is_none() {
                    debug!("ignoring suite-after for `{title}`: no suite is running");
                    return None;
                }
                self.close_suite(timestamp);
            }
            ReporterEventKind::HookStarted { title } => {
                if let Some(open) = self.cursor.hook.take() {
                    debug!(
                        "hook `{}` never finished, dropping it in favor of `{title}`",
                        open.hook.title,
                    );
                }
                self.cursor.hook = Some(OpenHook::new(Hook::started(title, timestamp)));
            }
            ReporterEventKind::HookFinished {
                title,
                kind,
                error,
                location,
            } => {
                self.finish_hook(timestamp, title, &kind, error, location);
            }
            ReporterEventKind::TestBefore { title } => {
                if let Some(CurrentTest {
                    state: TestState::Running(test),
                    ..
                }) = &self.cursor.test
                {
                    debug!("test `{}` never finished, dropping it", test.title);
                }
                self.cursor.test = Some(CurrentTest::running(Test::new(title, timestamp)));
                self.counters.total += 1;
            }
            ReporterEventKind::TestStarted { title } => match self.cursor.running_test_mut() {
                Some(test) => {
                    test.mark_started(timestamp);
                }
                None => debug!("ignoring test-started for `{title}`: no test is running"),
            },
            ReporterEventKind::TestPassed { title } => {
                if self.cursor.active_test_mut().is_some() {
                    self.counters.passed += 1;
                } else {
                    debug!("ignoring test-passed for `{title}`: no test is running");
                }
            }
            ReporterEventKind::TestFailed { title, file, error } => {
                // A failing suite hook reports test-failed without a test. The failure is still
                // recorded, but only tests are counted.
                if self.cursor.active_test_mut().is_some() {
                    self.counters.failed += 1;
                } else {
                    debug!("test-failed for `{title}` without a running test, not counting it");
                }
                self.record_failure(&title, &file, error.unwrap_or_default());
            }
            ReporterEventKind::TestSkipped {
                title,
                state,
                file,
                tags,
                skip_reason,
            } => {
                self.counters.total += 1;
                self.counters.skipped += 1;

                let mut test = Test::new(title, timestamp);
                test.status = state
                    .as_deref()
                    .map(TestStatus::from_state)
                    .filter(|status| status.is_skipped())
                    .unwrap_or(TestStatus::Pending);
                test.file = relative_to(&self.workspace_root, &file);
                test.tags = tags;
                test.skip_reason =
                    Some(skip_reason.unwrap_or_else(|| DEFAULT_SKIP_REASON.to_owned()));

                match &mut self.cursor.suite {
                    Some(suite) => suite.tests.push(test),
                    None => debug!("dropping skipped test `{}`: no suite is running", test.title),
                }
            }
            ReporterEventKind::TestFinished {
                title,
                state,
                file,
                tags,
                error,
                warnings,
            } => {
                self.finish_test(timestamp, &title, &state, &file, tags, error, warnings);
            }
            ReporterEventKind::TestAfter { .. } => {
                self.cursor.test = None;
            }
            ReporterEventKind::StepStarted { name } => match self.cursor.step_scope() {
                Some(mut scope) => scope.start(Step::started(name, timestamp)),
                None => debug!("ignoring step `{name}`: no test or hook is running"),
            },
            ReporterEventKind::StepPassed { name } | ReporterEventKind::StepFailed { name } => {
                debug!("step `{name}` reported an outcome");
            }
            ReporterEventKind::StepFinished {
                name,
                actor,
                status,
                args,
            } => match self.cursor.step_scope() {
                Some(mut scope) => {
                    scope.finish(name, timestamp).finish(
                        timestamp,
                        actor,
                        StepStatus::from_event_status(&status),
                        format_step_args(&args),
                    );
                }
                None => debug!("ignoring finished step `{name}`: no test or hook is running"),
            },
        }

        None
    }

    fn run_mut(&mut self, at: DateTime<Utc>) -> &mut Run {
        self.run.get_or_insert_with(|| {
            debug!("event received before run-before, starting the run implicitly");
            Run::new(at)
        })
    }

    fn finish_hook(
        &mut self,
        at: DateTime<Utc>,
        title: String,
        kind: &str,
        error: Option<ErrorPayload>,
        location: Option<String>,
    ) {
        let Some(OpenHook { mut hook, .. }) = self.cursor.hook.take() else {
            debug!("ignoring hook-finished for `{title}`: no hook is running");
            return;
        };

        let kind = HookKind::parse(kind);
        let error = error.map(|payload| {
            let file = location
                .as_deref()
                .map(|location| relative_to(&self.workspace_root, location))
                .unwrap_or_default();
            resolve_error(&payload, &file, &title)
        });
        hook.finish(at, kind, error, location);

        let attach_to_suite = kind.is_suite_scoped() && self.cursor.suite.is_some();
        match self.cursor.active_test_mut() {
            Some(test) if attach_to_suite => test.hooks.push(hook.clone()),
            Some(test) => {
                test.hooks.push(hook);
                return;
            }
            None if !attach_to_suite => {
                debug!("dropping hook `{}`: nothing to attach it to", hook.title);
                return;
            }
            None => {}
        }
        if let Some(suite) = &mut self.cursor.suite {
            suite.hooks.push(hook);
        }
    }

    fn record_failure(&mut self, title: &str, file: &str, payload: ErrorPayload) {
        let error = resolve_error(&payload, &relative_to(&self.workspace_root, file), title);
        if let Some(test) = self.cursor.active_test_mut() {
            test.error = Some(error.clone());
        }
        match &mut self.cursor.suite {
            Some(suite) => suite.failures.push(error),
            None => debug!("failure for `{title}` recorded outside of a suite"),
        }
    }

    #[expect(clippy::too_many_arguments)]
    fn finish_test(
        &mut self,
        at: DateTime<Utc>,
        title: &str,
        state: &str,
        file: &str,
        tags: Vec<String>,
        error: Option<ErrorPayload>,
        warnings: Vec<String>,
    ) {
        let mut test = match self.cursor.test.take() {
            Some(CurrentTest {
                state: TestState::Running(test),
                ..
            }) => test,
            other => {
                debug!("ignoring test-finished for `{title}`: no test is running");
                self.cursor.test = other;
                return;
            }
        };

        let file = relative_to(&self.workspace_root, file);
        test.mark_finished(at);
        test.status = TestStatus::from_state(state);
        test.tags = tags;
        test.warnings = warnings;
        if let Some(payload) = error {
            test.error = Some(resolve_error(&payload, &file, title));
        }
        test.file = file;
        test.sort_steps_by_start_time();

        match &mut self.cursor.suite {
            Some(suite) => {
                suite.tests.push(test);
                // The test stays addressable until test-after so that After hooks and late steps
                // land on it.
                self.cursor.test = Some(CurrentTest {
                    state: TestState::Finished {
                        index: suite.tests.len() - 1,
                    },
                    open_steps: Vec::new(),
                });
            }
            None => debug!("dropping test `{}`: no suite is running", test.title),
        }
    }

    fn close_suite(&mut self, at: DateTime<Utc>) {
        if let Some(open) = self.cursor.hook.take() {
            debug!("hook `{}` never finished, dropping it", open.hook.title);
        }
        if let Some(CurrentTest {
            state: TestState::Running(test),
            ..
        }) = self.cursor.test.take()
        {
            debug!("test `{}` never finished, dropping it", test.title);
        }

        if let Some(mut suite) = self.cursor.suite.take() {
            suite.finish(at);
            self.run_mut(at).add_suite(suite);
        }
    }

    fn finish_run(&mut self, at: DateTime<Utc>) -> Run {
        if self.cursor.suite.is_some() {
            debug!("run finished while a suite was still running, closing it");
            self.close_suite(at);
        }

        let stats = std::mem::take(&mut self.counters);
        if !stats.is_consistent() {
            warn!(
                "worker counters are inconsistent: total {} != passed {} + failed {} + skipped {}",
                stats.total, stats.passed, stats.failed, stats.skipped,
            );
        }

        let mut run = self.run.take().unwrap_or_else(|| Run::new(at));
        run.finish(at, stats);
        self.cursor = Cursor::default();
        run
    }
}

/// The builder's pointers into the tree under construction.
#[derive(Debug, Default)]
struct Cursor {
    suite: Option<Suite>,
    test: Option<CurrentTest>,
    // A hook is open if and only if this is set.
    hook: Option<OpenHook>,
}

impl Cursor {
    fn running_test_mut(&mut self) -> Option<&mut Test> {
        match &mut self.test.as_mut()?.state {
            TestState::Running(test) => Some(test),
            TestState::Finished { .. } => None,
        }
    }

    fn active_test_mut(&mut self) -> Option<&mut Test> {
        match &mut self.test.as_mut()?.state {
            TestState::Running(test) => Some(test),
            TestState::Finished { index } => self.suite.as_mut()?.tests.get_mut(*index),
        }
    }

    /// Returns where new steps go: the open hook if there is one, otherwise the active test.
    fn step_scope(&mut self) -> Option<StepScope<'_>> {
        if let Some(open) = &mut self.hook {
            return Some(StepScope {
                steps: &mut open.hook.steps,
                open_steps: &mut open.open_steps,
            });
        }

        let current = self.test.as_mut()?;
        let steps = match &mut current.state {
            TestState::Running(test) => &mut test.steps,
            TestState::Finished { index } => &mut self.suite.as_mut()?.tests.get_mut(*index)?.steps,
        };
        Some(StepScope {
            steps,
            open_steps: &mut current.open_steps,
        })
    }
}

#[derive(Debug)]
struct CurrentTest {
    state: TestState,
    // Indexes into the test's steps of steps that have started but not finished.
    open_steps: Vec<usize>,
}

impl CurrentTest {
    fn running(test: Test) -> Self {
        Self {
            state: TestState::Running(test),
            open_steps: Vec::new(),
        }
    }
}

#[derive(Debug)]
enum TestState {
    Running(Test),
    /// The test has been attached to the current suite at this index.
    Finished { index: usize },
}

#[derive(Debug)]
struct OpenHook {
    hook: Hook,
    open_steps: Vec<usize>,
}

impl OpenHook {
    fn new(hook: Hook) -> Self {
        Self {
            hook,
            open_steps: Vec::new(),
        }
    }
}

struct StepScope<'a> {
    steps: &'a mut Vec<Step>,
    open_steps: &'a mut Vec<usize>,
}

impl StepScope<'_> {
    fn start(&mut self, step: Step) {
        self.open_steps.push(self.steps.len());
        self.steps.push(step);
    }

    /// Resolves a finished step to the most recently started open step with the same name.
    ///
    /// If there is no such step, a new one starting at `at` is created.
    fn finish(&mut self, name: String, at: DateTime<Utc>) -> &mut Step {
        let steps = &*self.steps;
        let position = self
            .open_steps
            .iter()
            .rposition(|&index| steps[index].name == name);

        let index = match position {
            Some(position) => self.open_steps.remove(position),
            None => {
                debug!("step `{name}` finished without starting, recording it with zero duration");
                self.steps.push(Step::started(name, at));
                self.steps.len() - 1
            }
        };
        &mut self.steps[index]
    }
}
