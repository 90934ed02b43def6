// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::{Result, WrapErr};
use parallel_reporter::{
    journal::{JournalDir, WorkerId},
    render::RenderConfig,
    reporter::{RecordSummary, WorkerReporter},
};
use std::{fs, io::BufReader, sync::Once};

/// The workspace root the fixture event streams were recorded under.
pub(crate) const FIXTURE_WORKSPACE_ROOT: &str = "/work";

pub(crate) fn test_init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = color_eyre::install();
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

pub(crate) fn fixture_path(name: &str) -> Utf8PathBuf {
    Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Records a fixture event stream as the given worker.
pub(crate) fn record_fixture(
    journal_dir: &JournalDir,
    worker_id: u32,
    fixture: &str,
) -> Result<RecordSummary> {
    let path = fixture_path(fixture);
    let file = fs::File::open(&path).wrap_err_with(|| format!("opening `{path}`"))?;
    let mut reporter = WorkerReporter::new(
        FIXTURE_WORKSPACE_ROOT,
        journal_dir.writer(WorkerId::new(worker_id)),
    );
    let summary = reporter
        .record_stream(BufReader::new(file))
        .wrap_err_with(|| format!("recording `{path}`"))?;
    Ok(summary)
}

/// Copies a fixture journal into the directory under the given worker's file name.
pub(crate) fn install_journal(journal_dir: &Utf8Path, worker_id: u32, fixture: &str) -> Result<()> {
    fs::create_dir_all(journal_dir)?;
    let dest = journal_dir.join(WorkerId::new(worker_id).journal_file_name());
    fs::copy(fixture_path(fixture), &dest).wrap_err_with(|| format!("copying to `{dest}`"))?;
    Ok(())
}

pub(crate) fn render_config(output_dir: &Utf8Path) -> RenderConfig {
    RenderConfig {
        output_dir: output_dir.to_owned(),
        file_name: "parallel-report.html".to_owned(),
        report_title: "Test Report".to_owned(),
        project_name: "web-app".to_owned(),
    }
}
