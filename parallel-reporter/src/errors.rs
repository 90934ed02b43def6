// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by parallel-reporter.

use crate::journal::WorkerId;
use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error, fmt, io};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse parallel-report config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// A line of an event stream could not be parsed as an event.
#[derive(Debug, Error)]
#[error("invalid event on line {line_number}")]
pub struct EventParseError {
    line_number: usize,
    #[source]
    error: serde_json::Error,
}

impl EventParseError {
    pub(crate) fn new(line_number: usize, error: serde_json::Error) -> Self {
        Self { line_number, error }
    }

    /// Returns the 1-based line number of the invalid event.
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

/// An error that occurred while reading an event stream.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EventStreamError {
    /// The stream could not be read.
    #[error("error reading event stream")]
    Read(#[source] io::Error),

    /// An event was processed but could not be recorded.
    #[error("error recording event on line {line_number}")]
    WriteEvent {
        /// The 1-based line number of the event.
        line_number: usize,

        /// The underlying error.
        #[source]
        error: WriteEventError,
    },
}

/// An error that occurred while writing a worker journal.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JournalWriteError {
    /// The journal directory could not be created.
    #[error("error creating journal directory `{dir}`")]
    CreateDir {
        /// The journal directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The journal could not be serialized.
    #[error("error serializing journal for worker {worker_id}")]
    Serialize {
        /// The worker whose journal was being serialized.
        worker_id: WorkerId,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// The journal could not be written to disk.
    #[error("error writing journal to `{path}`")]
    Write {
        /// The path to the journal.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: atomicwrites::Error<io::Error>,
    },
}

/// An error that occurred while reading a single worker journal.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JournalReadError {
    /// The journal could not be read from disk.
    #[error("error reading journal `{path}`")]
    Read {
        /// The path to the journal.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The journal could not be deserialized.
    #[error("error deserializing journal `{path}`")]
    Deserialize {
        /// The path to the journal.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: serde_path_to_error::Error<serde_json::Error>,
    },

    /// The journal was followed by trailing data.
    #[error("trailing data after journal `{path}`")]
    TrailingData {
        /// The path to the journal.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// The journal's format version is not supported.
    #[error(
        "journal `{path}` has format version {format_version}, \
         but this version of parallel-report supports versions 1 through {supported}"
    )]
    UnsupportedVersion {
        /// The path to the journal.
        path: Utf8PathBuf,

        /// The version found in the journal.
        format_version: u32,

        /// The newest supported version.
        supported: u32,
    },
}

/// An error that occurred while scanning a directory for worker journals.
#[derive(Debug, Error)]
#[error("error scanning journal directory `{dir}`")]
pub struct JournalScanError {
    dir: Utf8PathBuf,
    #[source]
    error: io::Error,
}

impl JournalScanError {
    pub(crate) fn new(dir: impl Into<Utf8PathBuf>, error: io::Error) -> Self {
        Self {
            dir: dir.into(),
            error,
        }
    }
}

/// An error that occurred while deleting worker journals.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JournalCleanupError {
    /// The journal directory could not be scanned.
    #[error(transparent)]
    Scan(#[from] JournalScanError),

    /// A journal could not be removed.
    #[error("error removing journal `{path}`")]
    Remove {
        /// The path to the journal.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while merging worker runs.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum MergeError {
    /// There was nothing to merge.
    #[error("no worker journals found")]
    NoJournals,
}

/// An error that occurred while rendering or writing a report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RenderError {
    /// The document could not be serialized.
    #[error("error serializing report")]
    Serialize(#[source] quick_xml::Error),

    /// The output directory could not be created.
    #[error("error creating report directory `{dir}`")]
    CreateDir {
        /// The output directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The report could not be written.
    #[error("error writing report to `{path}`")]
    Write {
        /// The path to the report.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while a worker reporter processed an event.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// The worker's journal could not be written.
    #[error(transparent)]
    Journal(#[from] JournalWriteError),
}

/// An error that prevented report generation from starting.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FinalizeError {
    /// The journal directory could not be scanned.
    #[error(transparent)]
    Scan(#[from] JournalScanError),

    /// The journals could not be merged.
    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// Displays an error along with its chain of causes.
///
/// The first line is the error itself. Each cause follows on its own line, indented under a
/// `caused by:` heading.
pub struct DisplayErrorChain<E> {
    error: E,
    initial_indent: &'static str,
}

impl<E: error::Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self {
            error,
            initial_indent: "",
        }
    }

    /// Creates a new `DisplayErrorChain` that indents every line by `initial_indent`.
    pub fn new_with_initial_indent(initial_indent: &'static str, error: E) -> Self {
        Self {
            error,
            initial_indent,
        }
    }
}

impl<E: error::Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = self.initial_indent;
        write!(f, "{indent}{}", self.error)?;

        let mut source = self.error.source();
        if source.is_some() {
            write!(f, "\n{indent}  caused by:")?;
        }
        while let Some(cause) = source {
            // Multi-line causes keep their continuation lines aligned under the bullet.
            let lines = cause.to_string().replace('\n', &format!("\n{indent}    "));
            write!(f, "\n{indent}  - {lines}")?;
            source = cause.source();
        }
        Ok(())
    }
}
