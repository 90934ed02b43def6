// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{errors::MergeError, journal::Journal};
use parallel_report_metadata::{Run, span_between};
use tracing::debug;

/// Merges the runs recorded by each worker into a single run.
///
/// Suites and failures are concatenated in the order the runs are provided, stats are summed, and
/// the merged run spans from the earliest start to the latest end.
pub fn merge_runs(runs: impl IntoIterator<Item = Run>) -> Result<Run, MergeError> {
    let mut runs = runs.into_iter();
    let mut merged = runs.next().ok_or(MergeError::NoJournals)?;
    let mut worker_count = 1;

    for run in runs {
        let Run {
            suites,
            failures,
            stats,
            start_time,
            end_time,
            duration: _,
        } = run;

        merged.suites.extend(suites);
        merged.failures.extend(failures);
        merged.stats += stats;
        merged.start_time = merged.start_time.min(start_time);
        merged.end_time = merged.end_time.max(end_time);
        worker_count += 1;
    }

    merged.duration = span_between(merged.start_time, merged.end_time);
    debug!(
        "merged {worker_count} worker runs: {} suites, {} tests",
        merged.suites.len(),
        merged.stats.total,
    );
    Ok(merged)
}

/// Merges the runs recorded in a set of journals.
pub fn merge_journals(journals: impl IntoIterator<Item = Journal>) -> Result<Run, MergeError> {
    merge_runs(journals.into_iter().map(|journal| journal.run))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use parallel_report_metadata::{Stats, Suite};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::time::Duration;
    use test_strategy::proptest;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn run(start: i64, end: i64, stats: Stats, suites: &[&str]) -> Run {
        let mut run = Run::new(at(start));
        for title in suites {
            let mut suite = Suite::new(*title, format!("tests/{title}.ts"), at(start));
            suite.finish(at(end));
            run.add_suite(suite);
        }
        run.finish(at(end), stats);
        run
    }

    #[test]
    fn no_runs_is_an_error() {
        assert_eq!(merge_runs(Vec::new()), Err(MergeError::NoJournals));
    }

    #[test]
    fn single_run_is_unchanged() {
        let only = run(100, 500, Stats::new(1, 0, 0), &["a"]);
        assert_eq!(merge_runs([only.clone()]), Ok(only));
    }

    #[test]
    fn spans_and_suites_are_combined() {
        let merged = merge_runs([
            run(200, 800, Stats::new(2, 0, 0), &["users"]),
            run(100, 500, Stats::new(2, 1, 0), &["login", "logout"]),
        ])
        .unwrap();

        assert_eq!(merged.start_time, at(100));
        assert_eq!(merged.end_time, at(800));
        assert_eq!(merged.duration, Duration::from_millis(700));
        assert_eq!(merged.stats, Stats::new(4, 1, 0));
        let titles: Vec<_> = merged.suites.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["users", "login", "logout"]);
    }

    fn arb_stats() -> impl Strategy<Value = Stats> {
        (0usize..50, 0usize..50, 0usize..50)
            .prop_map(|(passed, failed, skipped)| Stats::new(passed, failed, skipped))
    }

    fn arb_run() -> impl Strategy<Value = Run> {
        (0i64..10_000, 0i64..10_000, arb_stats()).prop_map(|(start, length, stats)| {
            let mut run = Run::new(at(start));
            run.finish(at(start + length), stats);
            run
        })
    }

    #[proptest]
    fn merged_stats_are_summed(
        #[strategy(proptest::collection::vec(arb_run(), 1..8))] runs: Vec<Run>,
    ) {
        let expected: Stats = runs.iter().map(|run| run.stats).sum();
        let earliest = runs.iter().map(|run| run.start_time).min().unwrap();
        let latest = runs.iter().map(|run| run.end_time).max().unwrap();

        let merged = merge_runs(runs).unwrap();
        prop_assert_eq!(merged.stats, expected);
        prop_assert!(merged.stats.is_consistent());
        prop_assert_eq!(merged.start_time, earliest);
        prop_assert_eq!(merged.end_time, latest);
        prop_assert_eq!(merged.duration, span_between(earliest, latest));
    }
}
