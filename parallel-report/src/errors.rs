// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use parallel_report_metadata::ParallelReportExitCode;
use parallel_reporter::errors::{
    ConfigParseError, ConfigParseErrorKind, EventStreamError, FinalizeError, JournalScanError,
};
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An expected error that causes parallel-report to exit with a documented exit code.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("workspace root is invalid")]
    WorkspaceRootInvalid { workspace_root: String },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("failed to open event stream")]
    EventStreamOpenFailed {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to record event stream")]
    RecordFailed {
        #[from]
        err: EventStreamError,
    },
    #[error("failed to scan journal directory")]
    JournalScanFailed {
        #[from]
        err: JournalScanError,
    },
    #[error("no journals found")]
    NoJournalsFound { journal_dir: Utf8PathBuf },
    #[error("failed to merge journals")]
    MergeFailed {
        #[source]
        err: FinalizeError,
    },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::WorkspaceRootInvalid { .. }
            | Self::ConfigParseError { .. }
            | Self::EventStreamOpenFailed { .. }
            | Self::JournalScanFailed { .. } => ParallelReportExitCode::SETUP_ERROR,
            Self::RecordFailed { err } => match err {
                EventStreamError::WriteEvent { .. } => ParallelReportExitCode::JOURNAL_WRITE_FAILED,
                _ => ParallelReportExitCode::EVENT_STREAM_FAILED,
            },
            Self::NoJournalsFound { .. } => ParallelReportExitCode::NO_JOURNALS_FOUND,
            Self::MergeFailed { .. } => ParallelReportExitCode::MERGE_FAILED,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::CurrentDirFailed { err } => {
                error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::WorkspaceRootInvalid { workspace_root } => {
                error!(
                    "workspace root `{}` is not valid UTF-8",
                    workspace_root.style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                match err.kind() {
                    ConfigParseErrorKind::DeserializeError(path_error) => {
                        error!(
                            "failed to parse config file at `{}`: at `{}`",
                            err.config_file().style(styles.bold),
                            path_error.path().style(styles.bold),
                        );
                        Some(path_error.inner() as &dyn Error)
                    }
                    ConfigParseErrorKind::BuildError(build_error) => {
                        error!(
                            "failed to read config file at `{}`",
                            err.config_file().style(styles.bold),
                        );
                        Some(build_error.as_ref() as &dyn Error)
                    }
                    _ => {
                        error!(
                            "failed to load config file at `{}`",
                            err.config_file().style(styles.bold),
                        );
                        err.source()
                    }
                }
            }
            Self::EventStreamOpenFailed { path, err } => {
                error!("failed to open event stream `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::RecordFailed { err } => match err {
                EventStreamError::WriteEvent { line_number, error } => {
                    error!(
                        "failed to write journal after event on line {}",
                        line_number.style(styles.bold),
                    );
                    Some(error as &dyn Error)
                }
                _ => {
                    error!("failed to read event stream");
                    err.source()
                }
            },
            Self::JournalScanFailed { err } => {
                error!("{err}");
                err.source()
            }
            Self::NoJournalsFound { journal_dir } => {
                error!(
                    "no worker journals found in `{}`, no report generated",
                    journal_dir.style(styles.bold),
                );
                None
            }
            Self::MergeFailed { err } => {
                error!("failed to merge worker journals");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
