// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::Result;
use parallel_report_metadata::Stats;
use parallel_reporter::{
    errors::JournalReadError,
    journal::{JournalDir, WorkerId, read_journal},
};
use pretty_assertions::assert_eq;
use std::fs;

#[test]
fn unknown_fields_are_ignored() -> Result<()> {
    test_init();

    let journal = read_journal(&fixture_path("journal-unknown-fields.json"))?;
    assert_eq!(journal.worker_id, WorkerId::new(7));
    assert_eq!(journal.run.stats, Stats::new(1, 0, 0));
    assert!(journal.run.suites.is_empty());

    Ok(())
}

#[test]
fn unreadable_journals_are_skipped() -> Result<()> {
    test_init();

    let temp = Utf8TempDir::new()?;
    install_journal(temp.path(), 9, "journal-truncated.json")?;
    install_journal(temp.path(), 8, "journal-future-version.json")?;
    install_journal(temp.path(), 7, "journal-unknown-fields.json")?;
    // Files that don't match the journal naming scheme are left alone.
    fs::write(temp.path().join("notes.json"), "{}")?;

    let dir = JournalDir::new(temp.path());
    let worker_ids: Vec<_> = dir.list()?.into_iter().map(|entry| entry.worker_id.get()).collect();
    assert_eq!(worker_ids, [7, 8, 9]);

    let read = dir.read_all()?;
    assert_eq!(read.journals.len(), 1);
    assert_eq!(read.journals[0].worker_id, WorkerId::new(7));
    assert_eq!(read.skipped.len(), 2);
    assert!(matches!(
        read.skipped[0],
        JournalReadError::UnsupportedVersion {
            format_version: 2,
            ..
        }
    ));
    assert!(matches!(
        read.skipped[1],
        JournalReadError::Deserialize { .. }
    ));

    assert_eq!(dir.remove_all()?, 3);
    assert!(temp.path().join("notes.json").exists());

    Ok(())
}
