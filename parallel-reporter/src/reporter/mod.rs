// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns a worker's event stream into a run tree and records it in a journal.
//!
//! The main structure in this module is [`WorkerReporter`], which feeds events into a
//! [`RunTreeBuilder`] and writes the finished run to the worker's journal.

mod builder;
mod helpers;
mod imp;

pub use builder::*;
pub use helpers::{StepArgument, format_error_value, format_step_args};
pub use imp::*;
