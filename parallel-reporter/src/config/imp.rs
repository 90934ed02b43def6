// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::elements::{JournalImpl, ReportImpl, ReportOverrides};
use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind},
    render::RenderConfig,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::collections::BTreeSet;
use swrite::{SWrite, swrite};
use tracing::warn;

/// Overall configuration for parallel-report.
///
/// Configuration is read from an embedded set of defaults, overlaid with an optional config file.
#[derive(Clone, Debug)]
pub struct ParallelReportConfig {
    workspace_root: Utf8PathBuf,
    inner: ParallelReportConfigDeserialize,
}

impl ParallelReportConfig {
    /// The default location of the config within the workspace root.
    pub const CONFIG_PATH: &'static str = ".config/parallel-report.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// Reads the parallel-report config from the given file, or if not specified from
    /// `.config/parallel-report.toml` in the workspace root.
    ///
    /// If the file isn't specified and the default location doesn't exist, only the defaults are
    /// used.
    pub fn from_sources(
        workspace_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let workspace_root = workspace_root.into();

        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (inner, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        if !unknown.is_empty() {
            unknown_config_keys(&config_file, &workspace_root, &unknown);
        }

        Ok(Self {
            workspace_root,
            inner,
        })
    }

    /// Returns the workspace root.
    pub fn workspace_root(&self) -> &Utf8Path {
        &self.workspace_root
    }

    /// Returns the settings for the rendered report, with overrides applied.
    pub fn render_config(&self, overrides: &ReportOverrides) -> RenderConfig {
        self.inner
            .report
            .render_config(&self.workspace_root, overrides)
    }

    /// Returns the directory worker journals are read from and written to, with overrides
    /// applied.
    pub fn journal_dir(&self, overrides: &ReportOverrides) -> Utf8PathBuf {
        let render_config = self.render_config(overrides);
        self.inner
            .journal
            .dir(&self.workspace_root, overrides, &render_config)
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(ParallelReportConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: ParallelReportConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // The config crate also reports the key; drop it since serde_path_to_error
                // tracks the path already.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

fn unknown_config_keys(
    config_file: &Utf8Path,
    workspace_root: &Utf8Path,
    unknown: &BTreeSet<String>,
) {
    let mut unknown_str = String::new();
    if unknown.len() == 1 {
        // Print this on the same line.
        unknown_str.push_str("key: ");
        unknown_str.extend(unknown.iter().map(String::as_str));
    } else {
        unknown_str.push_str("keys:\n");
        for ignored_key in unknown {
            swrite!(unknown_str, "\n  - {ignored_key}");
        }
    }

    warn!(
        "in config file {}, ignoring unknown configuration {unknown_str}",
        config_file
            .strip_prefix(workspace_root)
            .unwrap_or(config_file),
    )
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ParallelReportConfigDeserialize {
    report: ReportImpl,
    #[serde(default)]
    journal: JournalImpl,
}
