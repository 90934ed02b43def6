// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError, Result,
    output::{OutputContext, OutputOpts},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use parallel_report_metadata::ParallelReportExitCode;
use parallel_reporter::{
    config::{ParallelReportConfig, ReportOverrides},
    errors::{FinalizeError, MergeError},
    finalize::{ReportOutcome, generate_report},
    journal::{JournalDir, WorkerId},
    reporter::WorkerReporter,
};
use std::{
    fs::File,
    io::{self, BufReader},
};
use tracing::info;

/// Records parallel test workers' events into journals and merges them into a single report.
///
/// Each worker pipes its event stream into `parallel-report record`. Once every worker has
/// exited, `parallel-report merge` combines the workers' journals into one HTML report.
#[derive(Debug, Parser)]
#[command(
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100
)]
pub struct ParallelReportApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[clap(flatten)]
    config_opts: ConfigOpts,

    #[clap(subcommand)]
    command: Command,
}

impl ParallelReportApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    ///
    /// Returns the exit code.
    pub fn exec(self, output: OutputContext) -> Result<i32> {
        let workspace_root = self.config_opts.workspace_root()?;
        let config = self.config_opts.make_config(&workspace_root)?;

        match self.command {
            Command::Record(opts) => opts.exec(&config, &self.config_opts.overrides(None)),
            Command::Merge(opts) => {
                let overrides = self.config_opts.overrides(Some(opts.report));
                exec_merge(&config, &overrides, output)
            }
        }
    }
}

#[derive(Debug, Args)]
struct ConfigOpts {
    /// Workspace root [default: current directory]
    ///
    /// Relative output and journal directories are resolved against this directory, and source
    /// file paths in events are reported relative to it.
    #[arg(long, global = true, value_name = "DIR", env = "PARALLEL_REPORT_WORKSPACE_ROOT")]
    workspace_root: Option<Utf8PathBuf>,

    /// Config file [default: workspace-root/.config/parallel-report.toml]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    /// Directory worker journals are written to and read from [default: the report output
    /// directory]
    #[arg(long, global = true, value_name = "DIR", env = "PARALLEL_REPORT_JOURNAL_DIR")]
    journal_dir: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    fn workspace_root(&self) -> Result<Utf8PathBuf> {
        match &self.workspace_root {
            Some(root) => Ok(root.clone()),
            None => {
                let cwd = std::env::current_dir()
                    .map_err(|err| ExpectedError::CurrentDirFailed { err })?;
                Utf8PathBuf::try_from(cwd).map_err(|err| ExpectedError::WorkspaceRootInvalid {
                    workspace_root: err.as_path().display().to_string(),
                })
            }
        }
    }

    fn make_config(&self, workspace_root: &Utf8Path) -> Result<ParallelReportConfig> {
        let config =
            ParallelReportConfig::from_sources(workspace_root, self.config_file.as_deref())?;
        Ok(config)
    }

    fn overrides(&self, report: Option<ReportOpts>) -> ReportOverrides {
        let ReportOpts {
            output_dir,
            file_name,
            report_title,
            project_name,
        } = report.unwrap_or_default();
        ReportOverrides {
            output_dir,
            file_name,
            report_title,
            project_name,
            journal_dir: self.journal_dir.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record one worker's event stream into its journal
    ///
    /// Events are read as newline-delimited JSON, one event per line. The journal is written once
    /// the `run-after` event is seen.
    Record(RecordOpts),

    /// Merge all worker journals into a single HTML report
    ///
    /// Journals are removed once the report has been written. If the report could not be written,
    /// the journals are kept so the merge can be retried.
    Merge(MergeOpts),
}

#[derive(Debug, Args)]
struct RecordOpts {
    /// Identity of the worker whose events are being recorded
    #[arg(long, value_name = "N", env = "PARALLEL_REPORT_WORKER_ID")]
    worker_id: u32,

    /// File to read events from [default: standard input]
    #[arg(long, value_name = "PATH")]
    events: Option<Utf8PathBuf>,
}

impl RecordOpts {
    fn exec(self, config: &ParallelReportConfig, overrides: &ReportOverrides) -> Result<i32> {
        let journal_dir = JournalDir::new(config.journal_dir(overrides));
        let mut reporter = WorkerReporter::new(
            config.workspace_root(),
            journal_dir.writer(WorkerId::new(self.worker_id)),
        );

        let summary = match &self.events {
            Some(path) => {
                let file = File::open(path).map_err(|err| ExpectedError::EventStreamOpenFailed {
                    path: path.clone(),
                    err,
                })?;
                reporter.record_stream(BufReader::new(file))?
            }
            None => reporter.record_stream(io::stdin().lock())?,
        };

        if let Some(journal) = &summary.journal {
            info!(
                "worker {}: recorded {} events ({} malformed) to {}",
                self.worker_id, summary.events, summary.malformed_events, journal.path,
            );
        }
        Ok(ParallelReportExitCode::OK)
    }
}

#[derive(Debug, Args)]
struct MergeOpts {
    #[clap(flatten)]
    report: ReportOpts,
}

#[derive(Debug, Default, Args)]
#[command(next_help_heading = "Report options")]
struct ReportOpts {
    /// Directory the report is written to [default: output]
    #[arg(long, value_name = "DIR")]
    output_dir: Option<Utf8PathBuf>,

    /// File name of the report [default: parallel-report.html]
    #[arg(long, value_name = "NAME")]
    file_name: Option<String>,

    /// Title shown at the top of the report [default: Test Report]
    #[arg(long, value_name = "TITLE")]
    report_title: Option<String>,

    /// Project name shown under the title [default: workspace directory name]
    #[arg(long, value_name = "NAME")]
    project_name: Option<String>,
}

fn exec_merge(
    config: &ParallelReportConfig,
    overrides: &ReportOverrides,
    output: OutputContext,
) -> Result<i32> {
    let render_config = config.render_config(overrides);
    let journal_dir = JournalDir::new(config.journal_dir(overrides));

    let outcome = match generate_report(&journal_dir, &render_config) {
        Ok(outcome) => outcome,
        Err(FinalizeError::Scan(err)) => return Err(err.into()),
        Err(FinalizeError::Merge(MergeError::NoJournals)) => {
            return Err(ExpectedError::NoJournalsFound {
                journal_dir: journal_dir.path().to_owned(),
            });
        }
        Err(err) => return Err(ExpectedError::MergeFailed { err }),
    };

    match outcome {
        ReportOutcome::Generated {
            report_path,
            stats,
            removed_journals,
            skipped_journals,
        } => {
            if output.verbose {
                info!(
                    "merged {} tests ({} passed, {} failed, {} skipped), \
                     removed {removed_journals} journals, skipped {skipped_journals}",
                    stats.total, stats.passed, stats.failed, stats.skipped,
                );
            }
            println!("{report_path}");
            Ok(ParallelReportExitCode::OK)
        }
        // The error has already been logged.
        ReportOutcome::RenderFailed { .. } => Ok(ParallelReportExitCode::RENDER_FAILED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_app() {
        ParallelReportApp::command().debug_assert();
    }

    #[test]
    fn parse_merge_overrides() {
        let app = ParallelReportApp::try_parse_from([
            "parallel-report",
            "--workspace-root",
            "/work",
            "merge",
            "--output-dir",
            "reports",
            "--report-title",
            "Nightly",
            "--journal-dir",
            "journals",
        ])
        .unwrap();

        let Command::Merge(opts) = app.command else {
            panic!("expected merge command");
        };
        let overrides = app.config_opts.overrides(Some(opts.report));
        assert_eq!(
            overrides,
            ReportOverrides {
                output_dir: Some("reports".into()),
                file_name: None,
                report_title: Some("Nightly".to_owned()),
                project_name: None,
                journal_dir: Some("journals".into()),
            }
        );
        assert_eq!(app.config_opts.workspace_root().unwrap(), "/work");
    }

    #[test]
    fn record_requires_worker_id() {
        let error = ParallelReportApp::try_parse_from(["parallel-report", "record"]).unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let app = ParallelReportApp::try_parse_from([
            "parallel-report",
            "record",
            "--worker-id",
            "3",
            "--events",
            "events.ndjson",
        ])
        .unwrap();
        let Command::Record(opts) = app.command else {
            panic!("expected record command");
        };
        assert_eq!(opts.worker_id, 3);
        assert_eq!(opts.events.as_deref(), Some(Utf8Path::new("events.ndjson")));
    }
}
