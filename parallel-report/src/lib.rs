// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line front end for parallel-report.
//!
//! Each worker of a parallel test run pipes its lifecycle events into `parallel-report record`,
//! which writes the worker's journal once the run finishes. After all workers exit,
//! `parallel-report merge` combines the journals into a single HTML report.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, StderrStyles};
