// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-worker journals.
//!
//! When a worker's run finishes, its [`Run`] tree is written to `worker-journal-{id}.json` in the
//! journal directory. Once every worker is done, the journals are read back, merged and, after
//! the report has been written, removed.

use crate::errors::{
    DisplayErrorChain, JournalCleanupError, JournalReadError, JournalScanError, JournalWriteError,
};
use camino::{Utf8Path, Utf8PathBuf};
use parallel_report_metadata::Run;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, fs, io, io::Write};
use tracing::{debug, warn};

/// The prefix of every journal file name.
pub const JOURNAL_FILE_PREFIX: &str = "worker-journal-";

/// The extension of every journal file name.
pub const JOURNAL_FILE_EXTENSION: &str = "json";

/// The journal format version written by this version of parallel-report.
pub const JOURNAL_FORMAT_VERSION: u32 = 1;

/// The identity of a worker within a parallel run.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct WorkerId(u32);

impl WorkerId {
    /// Creates a new worker ID.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the numeric ID.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Returns the name of this worker's journal file.
    pub fn journal_file_name(self) -> String {
        format!("{JOURNAL_FILE_PREFIX}{}.{JOURNAL_FILE_EXTENSION}", self.0)
    }

    /// Parses a journal file name, returning the worker ID it belongs to.
    ///
    /// Returns `None` if `file_name` is not of the form `worker-journal-{id}.json`.
    pub fn from_journal_file_name(file_name: &str) -> Option<Self> {
        let id = file_name
            .strip_prefix(JOURNAL_FILE_PREFIX)?
            .strip_suffix(JOURNAL_FILE_EXTENSION)?
            .strip_suffix('.')?;
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        id.parse().ok().map(Self)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The on-disk record of a single worker's run.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Journal {
    /// The journal format version.
    pub format_version: u32,

    /// The worker that produced this journal.
    pub worker_id: WorkerId,

    /// The worker's run.
    pub run: Run,
}

impl Journal {
    /// Creates a journal for the given worker's run, at the current format version.
    pub fn new(worker_id: WorkerId, run: Run) -> Self {
        Self {
            format_version: JOURNAL_FORMAT_VERSION,
            worker_id,
            run,
        }
    }
}

/// Writes a single worker's journal.
#[derive(Clone, Debug)]
pub struct JournalWriter {
    dir: Utf8PathBuf,
    worker_id: WorkerId,
}

impl JournalWriter {
    /// Creates a writer for the given worker, writing into `dir`.
    pub fn new(dir: impl Into<Utf8PathBuf>, worker_id: WorkerId) -> Self {
        Self {
            dir: dir.into(),
            worker_id,
        }
    }

    /// Returns the worker this writer belongs to.
    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    /// Returns the path the journal is written to.
    pub fn path(&self) -> Utf8PathBuf {
        self.dir.join(self.worker_id.journal_file_name())
    }

    /// Writes the run to the journal, replacing any previous journal for this worker.
    ///
    /// The file is written to a temporary location and renamed into place, so readers never
    /// observe a partially written journal.
    pub fn write(&self, run: Run) -> Result<Utf8PathBuf, JournalWriteError> {
        fs::create_dir_all(&self.dir).map_err(|error| JournalWriteError::CreateDir {
            dir: self.dir.clone(),
            error,
        })?;

        let journal = Journal::new(self.worker_id, run);
        let contents =
            serde_json::to_vec_pretty(&journal).map_err(|error| JournalWriteError::Serialize {
                worker_id: self.worker_id,
                error,
            })?;

        let path = self.path();
        atomicwrites::AtomicFile::new(&path, atomicwrites::AllowOverwrite)
            .write(|file| file.write_all(&contents))
            .map_err(|error| JournalWriteError::Write {
                path: path.clone(),
                error,
            })?;

        debug!("wrote journal for worker {} to `{path}`", self.worker_id);
        Ok(path)
    }
}

/// Reads a single journal.
///
/// Unknown fields are ignored and logged at debug level.
pub fn read_journal(path: &Utf8Path) -> Result<Journal, JournalReadError> {
    let contents = fs::read_to_string(path).map_err(|error| JournalReadError::Read {
        path: path.to_owned(),
        error,
    })?;

    let mut unknown = BTreeSet::new();
    let mut deserializer = serde_json::Deserializer::from_str(&contents);
    let mut cb = |ignored_path: serde_ignored::Path| {
        unknown.insert(ignored_path.to_string());
    };
    let ignored = serde_ignored::Deserializer::new(&mut deserializer, &mut cb);
    let journal: Journal =
        serde_path_to_error::deserialize(ignored).map_err(|error| JournalReadError::Deserialize {
            path: path.to_owned(),
            error,
        })?;
    deserializer
        .end()
        .map_err(|error| JournalReadError::TrailingData {
            path: path.to_owned(),
            error,
        })?;

    if journal.format_version == 0 || journal.format_version > JOURNAL_FORMAT_VERSION {
        return Err(JournalReadError::UnsupportedVersion {
            path: path.to_owned(),
            format_version: journal.format_version,
            supported: JOURNAL_FORMAT_VERSION,
        });
    }
    if !unknown.is_empty() {
        debug!(
            "journal `{path}`: ignoring unknown fields: {}",
            unknown.into_iter().collect::<Vec<_>>().join(", "),
        );
    }

    Ok(journal)
}

/// A journal file found in a journal directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JournalEntry {
    /// The worker the journal belongs to.
    pub worker_id: WorkerId,

    /// The path to the journal.
    pub path: Utf8PathBuf,
}

/// The journals read from a journal directory.
#[derive(Debug, Default)]
pub struct ReadJournals {
    /// Journals that were read successfully, ordered by worker ID.
    pub journals: Vec<Journal>,

    /// Journals that could not be read.
    pub skipped: Vec<JournalReadError>,
}

/// A directory that worker journals are written to.
#[derive(Clone, Debug)]
pub struct JournalDir {
    dir: Utf8PathBuf,
}

impl JournalDir {
    /// Creates a new `JournalDir`.
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the path to the directory.
    pub fn path(&self) -> &Utf8Path {
        &self.dir
    }

    /// Returns a writer for the given worker's journal.
    pub fn writer(&self, worker_id: WorkerId) -> JournalWriter {
        JournalWriter::new(self.dir.clone(), worker_id)
    }

    /// Lists journal files in the directory, ordered by worker ID.
    ///
    /// A directory that does not exist contains no journals.
    pub fn list(&self) -> Result<Vec<JournalEntry>, JournalScanError> {
        let read_dir = match self.dir.read_dir_utf8() {
            Ok(read_dir) => read_dir,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(JournalScanError::new(&self.dir, error)),
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|error| JournalScanError::new(&self.dir, error))?;
            let Some(worker_id) = WorkerId::from_journal_file_name(entry.file_name()) else {
                continue;
            };
            let file_type = entry
                .file_type()
                .map_err(|error| JournalScanError::new(&self.dir, error))?;
            if file_type.is_file() {
                entries.push(JournalEntry {
                    worker_id,
                    path: entry.into_path(),
                });
            }
        }

        entries.sort_by_key(|entry| entry.worker_id);
        Ok(entries)
    }

    /// Reads every journal in the directory.
    ///
    /// Journals that cannot be read are logged and returned in [`ReadJournals::skipped`].
    pub fn read_all(&self) -> Result<ReadJournals, JournalScanError> {
        let mut read = ReadJournals::default();
        for entry in self.list()? {
            match read_journal(&entry.path) {
                Ok(journal) => {
                    if journal.worker_id != entry.worker_id {
                        debug!(
                            "journal `{}` records worker {}, expected {}",
                            entry.path, journal.worker_id, entry.worker_id,
                        );
                    }
                    read.journals.push(journal);
                }
                Err(error) => {
                    warn!(
                        "skipping unreadable journal: {}",
                        DisplayErrorChain::new(&error),
                    );
                    read.skipped.push(error);
                }
            }
        }
        Ok(read)
    }

    /// Removes every journal file in the directory.
    ///
    /// Returns the number of journals removed.
    pub fn remove_all(&self) -> Result<usize, JournalCleanupError> {
        let entries = self.list()?;
        for entry in &entries {
            fs::remove_file(&entry.path).map_err(|error| JournalCleanupError::Remove {
                path: entry.path.clone(),
                error,
            })?;
        }
        debug!("removed {} journals from `{}`", entries.len(), self.dir);
        Ok(entries.len())
    }
}
