// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::render::RenderConfig;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// Report settings supplied at invocation time, e.g. on the command line.
///
/// Each field that is set takes precedence over the value from the config files.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReportOverrides {
    /// The directory the report is written to.
    pub output_dir: Option<Utf8PathBuf>,

    /// The file name of the report.
    pub file_name: Option<String>,

    /// The title shown at the top of the report.
    pub report_title: Option<String>,

    /// The project name shown under the title.
    pub project_name: Option<String>,

    /// The directory worker journals are read from and written to.
    pub journal_dir: Option<Utf8PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(in crate::config) struct ReportImpl {
    output_dir: Utf8PathBuf,
    file_name: String,
    report_title: String,
    #[serde(default)]
    project_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(in crate::config) struct JournalImpl {
    #[serde(default)]
    dir: Option<Utf8PathBuf>,
}

impl ReportImpl {
    pub(in crate::config) fn render_config(
        &self,
        workspace_root: &Utf8Path,
        overrides: &ReportOverrides,
    ) -> RenderConfig {
        let output_dir = overrides.output_dir.as_ref().unwrap_or(&self.output_dir);
        let file_name = overrides.file_name.as_ref().unwrap_or(&self.file_name);
        let report_title = overrides.report_title.as_ref().unwrap_or(&self.report_title);
        let project_name = overrides
            .project_name
            .as_ref()
            .or(self.project_name.as_ref())
            .cloned()
            .unwrap_or_else(|| default_project_name(workspace_root));

        RenderConfig {
            output_dir: resolve_dir(workspace_root, output_dir),
            file_name: file_name.clone(),
            report_title: report_title.clone(),
            project_name,
        }
    }
}

impl JournalImpl {
    /// Returns the journal directory, falling back to the report's output directory.
    pub(in crate::config) fn dir(
        &self,
        workspace_root: &Utf8Path,
        overrides: &ReportOverrides,
        render_config: &RenderConfig,
    ) -> Utf8PathBuf {
        match overrides.journal_dir.as_ref().or(self.dir.as_ref()) {
            Some(dir) => resolve_dir(workspace_root, dir),
            None => render_config.output_dir.clone(),
        }
    }
}

fn resolve_dir(workspace_root: &Utf8Path, dir: &Utf8Path) -> Utf8PathBuf {
    if dir.is_absolute() {
        dir.to_owned()
    } else {
        workspace_root.join(dir)
    }
}

fn default_project_name(workspace_root: &Utf8Path) -> String {
    workspace_root.file_name().unwrap_or("project").to_owned()
}
