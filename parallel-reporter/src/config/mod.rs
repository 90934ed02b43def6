// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for parallel-report.
//!
//! Configuration is read from a TOML file, by default `.config/parallel-report.toml` in the
//! workspace root, layered on top of the defaults in `default-config.toml`.

mod elements;
mod imp;

pub use elements::ReportOverrides;
pub use imp::*;
