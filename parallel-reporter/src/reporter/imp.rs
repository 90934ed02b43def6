// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::builder::RunTreeBuilder;
use crate::{
    errors::{DisplayErrorChain, EventStreamError, WriteEventError},
    events::{EventStreamReader, ReporterEvent},
    journal::{JournalWriter, WorkerId},
};
use camino::Utf8PathBuf;
use parallel_report_metadata::Stats;
use std::io::BufRead;
use tracing::{debug, warn};

/// Records a single worker's events, writing its journal when the run finishes.
#[derive(Debug)]
pub struct WorkerReporter {
    builder: RunTreeBuilder,
    journal: JournalWriter,
    written: Option<WrittenJournal>,
}

impl WorkerReporter {
    /// Creates a new reporter.
    pub fn new(workspace_root: impl Into<Utf8PathBuf>, journal: JournalWriter) -> Self {
        Self {
            builder: RunTreeBuilder::new(workspace_root),
            journal,
            written: None,
        }
    }

    /// Returns the worker this reporter records events for.
    pub fn worker_id(&self) -> WorkerId {
        self.journal.worker_id()
    }

    /// Processes a single event.
    ///
    /// When the event finishes the run, the worker's journal is written.
    pub fn write_event(&mut self, event: ReporterEvent) -> Result<(), WriteEventError> {
        if let Some(run) = self.builder.handle_event(event) {
            let stats = run.stats;
            let path = self.journal.write(run)?;
            self.written = Some(WrittenJournal { path, stats });
        }
        Ok(())
    }

    /// Processes every event in a newline-delimited JSON stream.
    ///
    /// Lines that cannot be parsed are logged and skipped.
    pub fn record_stream(
        &mut self,
        reader: impl BufRead,
    ) -> Result<RecordSummary, EventStreamError> {
        let mut reader = EventStreamReader::new(reader);
        let mut summary = RecordSummary::default();

        while let Some(event) = reader.next_event().map_err(EventStreamError::Read)? {
            let event = match event {
                Ok(event) => event,
                Err(error) => {
                    warn!("skipping malformed event: {}", DisplayErrorChain::new(&error));
                    summary.malformed_events += 1;
                    continue;
                }
            };

            debug!("worker {}: {}", self.worker_id(), event.kind.name());
            self.write_event(event)
                .map_err(|error| EventStreamError::WriteEvent {
                    line_number: reader.line_number(),
                    error,
                })?;
            summary.events += 1;
        }

        if self.written.is_none() && summary.events > 0 {
            warn!(
                "worker {}: event stream ended before the run finished, no journal written",
                self.worker_id(),
            );
        }
        summary.journal = self.written.clone();
        Ok(summary)
    }

    /// Returns the most recently written journal, if any.
    pub fn written_journal(&self) -> Option<&WrittenJournal> {
        self.written.as_ref()
    }
}

/// A journal written by a [`WorkerReporter`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WrittenJournal {
    /// The path to the journal.
    pub path: Utf8PathBuf,

    /// The stats of the run recorded in the journal.
    pub stats: Stats,
}

/// A summary of a recorded event stream.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RecordSummary {
    /// The number of events processed.
    pub events: usize,

    /// The number of lines that could not be parsed.
    pub malformed_events: usize,

    /// The journal written for the run, or `None` if the stream never finished a run.
    pub journal: Option<WrittenJournal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::read_journal;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn record_stream_writes_journal() {
        let temp = Utf8TempDir::new().unwrap();
        let mut reporter =
            WorkerReporter::new("/work", JournalWriter::new(temp.path(), WorkerId::new(2)));

        let input = indoc! {r#"
            {"timestamp": 0, "event": "run-before"}
            {"timestamp": 1, "event": "suite-before", "title": "Users", "file": "/work/tests/users.ts"}
            {"timestamp": 2, "event": "test-before", "title": "lists users"}
            garbage
            {"timestamp": 3, "event": "test-started", "title": "lists users"}
            {"timestamp": 4, "event": "test-passed", "title": "lists users"}
            {"timestamp": 9, "event": "test-finished", "title": "lists users", "state": "passed"}
            {"timestamp": 9, "event": "test-after", "title": "lists users"}
            {"timestamp": 10, "event": "suite-after", "title": "Users"}
            {"timestamp": 11, "event": "run-after"}
        "#};
        let summary = reporter.record_stream(input.as_bytes()).unwrap();

        assert_eq!(summary.events, 9);
        assert_eq!(summary.malformed_events, 1);
        let written = summary.journal.expect("journal written");
        assert_eq!(written.path, temp.path().join("worker-journal-2.json"));
        assert_eq!(written.stats, Stats::new(1, 0, 0));

        let journal = read_journal(&written.path).unwrap();
        assert_eq!(journal.worker_id, WorkerId::new(2));
        assert_eq!(journal.run.suites[0].file, "tests/users.ts");
        assert_eq!(journal.run.suites[0].tests[0].title, "lists users");
    }

    #[test]
    fn unfinished_stream_writes_nothing() {
        let temp = Utf8TempDir::new().unwrap();
        let mut reporter =
            WorkerReporter::new("/work", JournalWriter::new(temp.path(), WorkerId::new(0)));

        let input = r#"{"timestamp": 0, "event": "run-before"}"#;
        let summary = reporter.record_stream(input.as_bytes()).unwrap();
        assert_eq!(summary.events, 1);
        assert_eq!(summary.journal, None);
        assert!(reporter.written_journal().is_none());
        assert!(!temp.path().join("worker-journal-0.json").exists());
    }
}
