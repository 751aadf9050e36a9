// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The outcome of a whole run: results, failures, and skipped tasks.

use crate::task::{TaskFailure, TaskState};
use result_aggregator::{AggregateError, ResultKey, ResultSet};
use std::path::Path;
use std::time::Duration;

/// A failed task, reduced to what the report shows.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FailedTask {
    pub model: String,
    pub profile: String,
    pub device: String,
    pub failed_from: TaskState,
    /// Error taxonomy name, e.g. `TimeoutError`.
    pub kind: &'static str,
    pub reason: String,
}

impl From<TaskFailure> for FailedTask {
    fn from(f: TaskFailure) -> Self {
        Self {
            model: f.key.model,
            profile: f.key.profile,
            device: f.device,
            failed_from: f.failed_from,
            kind: f.error.kind(),
            reason: f.error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SkippedTask {
    pub model: String,
    pub profile: String,
    pub device: String,
}

impl SkippedTask {
    pub(crate) fn new(key: ResultKey, device: String) -> Self {
        Self {
            model: key.model,
            profile: key.profile,
            device,
        }
    }
}

#[derive(serde::Serialize)]
struct ExportedReport<'a> {
    results: serde_json::Value,
    failures: &'a [FailedTask],
    skipped: &'a [SkippedTask],
    cancelled: bool,
    elapsed_secs: f64,
}

/// Best-effort result of a run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: ResultSet,
    pub failures: Vec<FailedTask>,
    pub skipped: Vec<SkippedTask>,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.results.len() + self.failures.len() + self.skipped.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// `1` in strict mode when any task failed, `0` otherwise.
    pub fn exit_code(&self, strict: bool) -> i32 {
        if strict && self.has_failures() {
            1
        } else {
            0
        }
    }

    /// Orders failures and skipped tasks by key.
    pub(crate) fn finish(&mut self, elapsed: Duration, cancelled: bool) {
        self.failures
            .sort_by(|a, b| (&a.model, &a.profile).cmp(&(&b.model, &b.profile)));
        self.skipped
            .sort_by(|a, b| (&a.model, &a.profile).cmp(&(&b.model, &b.profile)));
        self.elapsed = elapsed;
        self.cancelled = cancelled;
    }

    /// One-line summary suitable for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "Run: {} tasks in {:.1}s, {} recorded, {} failed, {} skipped{}",
            self.total(),
            self.elapsed.as_secs_f64(),
            self.results.len(),
            self.failures.len(),
            self.skipped.len(),
            if self.cancelled { " (cancelled)" } else { "" },
        )
    }

    pub fn to_json(&self) -> Result<serde_json::Value, AggregateError> {
        let exported = ExportedReport {
            results: self.results.to_json()?,
            failures: &self.failures,
            skipped: &self.skipped,
            cancelled: self.cancelled,
            elapsed_secs: self.elapsed.as_secs_f64(),
        };
        Ok(serde_json::to_value(exported)?)
    }

    /// Writes the whole report as one JSON document.
    pub fn write_json(&self, path: &Path) -> Result<(), AggregateError> {
        let body = serde_json::to_string_pretty(&self.to_json()?)?;
        std::fs::write(path, body).map_err(|e| AggregateError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}
