// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured access to the execution trees produced by parallel-report.
//!
//! Each worker of a parallel test run records a [`Run`] made up of [`Suite`]s, which in turn hold
//! [`Test`]s, [`Hook`]s and [`Step`]s. These trees are written to per-worker journals and later
//! merged into a single [`Run`] that is rendered as a report.
//!
//! Every type in this crate serializes with kebab-case field names. Unknown fields are ignored
//! while deserializing, so older readers can consume journals written by newer writers.

mod exit_codes;
mod model;
mod run;
mod serde_helpers;
mod stats;

pub use exit_codes::*;
pub use model::*;
pub use run::*;
pub use stats::*;
