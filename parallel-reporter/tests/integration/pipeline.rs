// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::{Result, bail, ensure};
use parallel_report_metadata::{Stats, TestStatus};
use parallel_reporter::{
    errors::{FinalizeError, MergeError},
    finalize::{ReportOutcome, generate_report},
    journal::JournalDir,
    merge::merge_journals,
};
use pretty_assertions::assert_eq;
use std::{fs, time::Duration};

#[test]
fn login_and_users_workers_merge() -> Result<()> {
    test_init();

    let temp = Utf8TempDir::new()?;
    let journal_dir = JournalDir::new(temp.path().join("journals"));

    let login = record_fixture(&journal_dir, 0, "login-events.ndjson")?;
    assert_eq!(login.malformed_events, 0);
    let Some(login_journal) = login.journal else {
        bail!("login worker wrote no journal");
    };
    assert_eq!(login_journal.stats, Stats::new(2, 1, 0));

    let users = record_fixture(&journal_dir, 1, "users-events.ndjson")?;
    assert_eq!(users.malformed_events, 1);
    let Some(users_journal) = users.journal else {
        bail!("users worker wrote no journal");
    };
    assert_eq!(users_journal.stats, Stats::new(2, 0, 0));

    let read = journal_dir.read_all()?;
    ensure!(read.skipped.is_empty(), "no journals skipped");
    let run = merge_journals(read.journals)?;

    assert_eq!(run.stats, Stats::new(4, 1, 0));
    assert_eq!(run.stats.total, 5);
    let titles: Vec<_> = run.suites.iter().map(|suite| suite.title.as_str()).collect();
    assert_eq!(titles, ["Login", "Users"]);
    assert_eq!(run.suite_test_total(), 5);
    assert_eq!(run.duration, Duration::from_millis(600));

    assert_eq!(run.failures.len(), 1);
    let failure = &run.failures[0];
    assert_eq!(failure.test_name, "bad password");
    assert_eq!(failure.file, "tests/login.ts");
    assert_eq!(failure.message, r#"[1] "401""#);
    assert_eq!(failure.actual, "200");
    assert_eq!(failure.expected, "401");

    let login_suite = &run.suites[0];
    assert_eq!(login_suite.stats, Stats::new(2, 1, 0));
    assert_eq!(login_suite.hooks.len(), 1);
    let bad_password = &login_suite.tests[2];
    assert_eq!(bad_password.status, TestStatus::Failed);
    assert_eq!(bad_password.steps[0].args, "401");
    assert_eq!(login_suite.tests[0].steps[0].args, "'password', <secret>");

    let users_suite = &run.suites[1];
    assert_eq!(users_suite.tests[0].hooks.len(), 1);
    assert_eq!(
        users_suite.tests[0].steps[0].duration,
        Duration::from_millis(250)
    );

    Ok(())
}

#[test]
fn report_generation_removes_journals() -> Result<()> {
    test_init();

    let temp = Utf8TempDir::new()?;
    let journal_dir = JournalDir::new(temp.path().join("output"));
    record_fixture(&journal_dir, 0, "login-events.ndjson")?;
    record_fixture(&journal_dir, 1, "users-events.ndjson")?;

    let (report_path, stats, removed_journals, skipped_journals) =
        match generate_report(&journal_dir, &render_config(journal_dir.path()))? {
            ReportOutcome::Generated {
                report_path,
                stats,
                removed_journals,
                skipped_journals,
            } => (report_path, stats, removed_journals, skipped_journals),
            other => bail!("expected a generated report, found {other:?}"),
        };

    assert_eq!(stats, Stats::new(4, 1, 0));
    assert_eq!(removed_journals, 2);
    assert_eq!(skipped_journals, 0);
    assert_eq!(journal_dir.list()?, vec![]);

    let document = fs::read_to_string(&report_path)?;
    ensure!(document.contains("web-app"), "project name rendered");
    ensure!(
        document.contains("I.sendGetRequest ('/users')"),
        "step line rendered"
    );
    ensure!(document.contains("bad password"), "failure rendered");
    ensure!(
        document.matches("@smoke").count() == 1,
        "duplicate tags rendered once"
    );

    Ok(())
}

#[test]
fn render_failure_keeps_journals() -> Result<()> {
    test_init();

    let temp = Utf8TempDir::new()?;
    let journal_dir = JournalDir::new(temp.path().join("journals"));
    record_fixture(&journal_dir, 0, "login-events.ndjson")?;

    let blocked = temp.path().join("blocked");
    fs::write(&blocked, "not a directory")?;
    let outcome = generate_report(&journal_dir, &render_config(&blocked))?;

    ensure!(!outcome.is_generated(), "render failed: {outcome:?}");
    assert_eq!(journal_dir.list()?.len(), 1);

    // A retry with a usable output directory succeeds and cleans up.
    let outcome = generate_report(&journal_dir, &render_config(&temp.path().join("out")))?;
    ensure!(outcome.is_generated(), "render succeeded: {outcome:?}");
    assert_eq!(journal_dir.list()?, vec![]);

    Ok(())
}

#[test]
fn no_journals_produces_no_report() -> Result<()> {
    test_init();

    let temp = Utf8TempDir::new()?;
    let journal_dir = JournalDir::new(temp.path());
    let config = render_config(temp.path());

    match generate_report(&journal_dir, &config) {
        Err(FinalizeError::Merge(MergeError::NoJournals)) => {}
        other => bail!("expected no journals, found {other:?}"),
    }
    ensure!(!config.report_path().exists(), "no report written");

    Ok(())
}
