// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # observer-parser
//!
//! Turns the text printed by the on-device benchmark binary into typed
//! [`MeasurementRecord`]s.
//!
//! The binary's output is an unversioned log. Only lines of the form
//!
//! ```text
//! PyTorchObserver {"type": "NET", "unit": "us", "metric": "latency", "value": "599746"}
//! ```
//!
//! carry data; everything else ("Starting benchmark.", "Running warmup
//! runs.", ...) is skipped. [`parse`] returns a lazy iterator over one
//! [`RawRunOutput`]; calling it again restarts from the first line.

mod error;
mod observations;
mod raw;
mod record;
mod summary_line;

pub use error::ParseError;
pub use observations::{parse, parse_all, Observations, MAIN_RUNS_MARKER, OBSERVER_TAG};
pub use raw::RawRunOutput;
pub use record::MeasurementRecord;
pub use summary_line::{find_reported_summary, parse_summary_line, ReportedSummary};
