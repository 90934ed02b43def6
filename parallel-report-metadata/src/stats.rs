// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{Test, TestStatus};
use serde::{Deserialize, Serialize};
use std::{iter::Sum, ops::AddAssign};

/// Summary counts for a suite or a run.
///
/// A well-formed `Stats` always satisfies `total == passed + failed + skipped`. Stats built through
/// [`Stats::from_tests`] or [`Stats::record`] uphold this by construction.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Stats {
    /// The total number of tests.
    pub total: usize,

    /// The number of tests that passed.
    pub passed: usize,

    /// The number of tests that failed.
    pub failed: usize,

    /// The number of tests that were skipped or pending.
    pub skipped: usize,
}

impl Stats {
    /// Creates stats from individual counts, computing the total.
    pub fn new(passed: usize, failed: usize, skipped: usize) -> Self {
        Self {
            total: passed + failed + skipped,
            passed,
            failed,
            skipped,
        }
    }

    /// Computes stats from a list of tests.
    ///
    /// Tests whose outcome is not known yet are not counted.
    pub fn from_tests<'a>(tests: impl IntoIterator<Item = &'a Test>) -> Self {
        let mut stats = Self::default();
        for test in tests {
            stats.record(test.status);
        }
        stats
    }

    /// Records the outcome of a single test.
    pub fn record(&mut self, status: TestStatus) {
        match status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
            TestStatus::Pending | TestStatus::Skipped => self.skipped += 1,
            TestStatus::JustStarted => return,
        }
        self.total += 1;
    }

    /// Returns true if `total == passed + failed + skipped`.
    pub fn is_consistent(&self) -> bool {
        self.total == self.passed + self.failed + self.skipped
    }

    /// Returns true if any test failed.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, other: Self) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

impl Sum for Stats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, stats| {
            acc += stats;
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    #[test]
    fn from_tests_counts_each_status() {
        let at = Utc.timestamp_millis_opt(0).unwrap();
        let tests: Vec<_> = [
            TestStatus::Passed,
            TestStatus::Passed,
            TestStatus::Failed,
            TestStatus::Pending,
            TestStatus::Skipped,
            TestStatus::JustStarted,
        ]
        .into_iter()
        .map(|status| {
            let mut test = Test::new("t", at);
            test.status = status;
            test
        })
        .collect();

        let stats = Stats::from_tests(&tests);
        assert_eq!(
            stats,
            Stats {
                total: 5,
                passed: 2,
                failed: 1,
                skipped: 2,
            }
        );
        assert!(stats.is_consistent());
    }

    #[test]
    fn sum_adds_every_field() {
        let stats: Stats = [Stats::new(2, 1, 0), Stats::new(2, 0, 0), Stats::default()]
            .into_iter()
            .sum();
        assert_eq!(stats, Stats::new(4, 1, 0));
        assert_eq!(stats.total, 5);
    }
}
