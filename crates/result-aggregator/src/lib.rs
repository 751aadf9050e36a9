// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # result-aggregator
//!
//! Summary statistics over measurement records, and the keyed
//! [`ResultSet`] that collects one [`RunResult`] per (model, profile).
//!
//! Summaries are derived, never stored: [`RunResult::summary`] recomputes
//! from the records on every call.

mod error;
mod result;
mod set;
mod summary;

pub use error::AggregateError;
pub use result::RunResult;
pub use set::{ResultKey, ResultSet, TaskFile};
pub use summary::{summarize, Summary};
