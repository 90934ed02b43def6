// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generating the final report once every worker has finished.

use crate::{
    errors::{DisplayErrorChain, FinalizeError, RenderError},
    journal::JournalDir,
    merge::merge_journals,
    render::{RenderConfig, write_report},
};
use camino::Utf8PathBuf;
use parallel_report_metadata::Stats;
use tracing::{debug, error, info, warn};

/// The result of a report generation attempt that got as far as rendering.
#[derive(Debug)]
pub enum ReportOutcome {
    /// The report was written and the journals were removed.
    Generated {
        /// The path to the written report.
        report_path: Utf8PathBuf,

        /// The merged stats of all workers.
        stats: Stats,

        /// The number of journals that were removed.
        removed_journals: usize,

        /// The number of journals that could not be read and were left out of the report.
        skipped_journals: usize,
    },

    /// The report could not be written. The journals were left in place.
    RenderFailed {
        /// The underlying error.
        error: RenderError,
    },
}

impl ReportOutcome {
    /// Returns true if the report was written.
    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated { .. })
    }
}

/// Reads every journal in `journal_dir`, merges them and writes the report.
///
/// After the report is written, the journals are removed. A failure to remove them is logged but
/// does not fail report generation. If rendering fails, the journals are kept so the merge can be
/// retried.
pub fn generate_report(
    journal_dir: &JournalDir,
    config: &RenderConfig,
) -> Result<ReportOutcome, FinalizeError> {
    let read = journal_dir.read_all()?;
    let skipped_journals = read.skipped.len();
    debug!(
        "read {} journals from `{}` ({skipped_journals} skipped)",
        read.journals.len(),
        journal_dir.path(),
    );

    let run = merge_journals(read.journals)?;
    let stats = run.stats;

    let report_path = match write_report(&run, config) {
        Ok(path) => path,
        Err(error) => {
            error!(
                "failed to generate report: {}",
                DisplayErrorChain::new(&error),
            );
            return Ok(ReportOutcome::RenderFailed { error });
        }
    };
    info!("report generated at {report_path}");

    let removed_journals = match journal_dir.remove_all() {
        Ok(count) => count,
        Err(error) => {
            warn!(
                "failed to remove journals: {}",
                DisplayErrorChain::new(&error),
            );
            0
        }
    };

    Ok(ReportOutcome::Generated {
        report_path,
        stats,
        removed_journals,
        skipped_journals,
    })
}
