// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for parallel-report.
//!
//! Each worker of a parallel test run feeds its lifecycle events into a [`reporter::WorkerReporter`],
//! which builds the worker's execution tree and writes it to a journal once the run finishes. After
//! all workers are done, [`finalize::generate_report`] merges the journals into a single run,
//! renders it as an HTML report and removes the journals.
//!
//! For the data model shared by all of these stages, see the
//! [`parallel_report_metadata`] crate.

pub mod config;
pub mod errors;
pub mod events;
pub mod finalize;
pub mod journal;
pub mod merge;
pub mod render;
pub mod reporter;
