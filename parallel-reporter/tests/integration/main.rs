// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the worker-to-report pipeline.
//!
//! Event streams and journals under `tests/fixtures` are fed through the public API: each worker's
//! stream is recorded into a journal, and the journals are then merged and rendered.

mod fixtures;
mod journals;
mod pipeline;
