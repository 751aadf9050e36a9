// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Descriptive statistics over one run's records.

use observer_parser::MeasurementRecord;

/// Derived statistics of one run.
///
/// With zero records every statistic is `None` (serialised as `null`),
/// never zero or NaN.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Summary {
    pub count: usize,
    /// Unit of the first record.
    pub unit: Option<String>,
    /// Arithmetic mean; the per-iteration latency.
    pub mean: Option<f64>,
    /// Population standard deviation.
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Iterations per second implied by `mean`.
    pub iters_per_second: Option<f64>,
}

/// Computes the summary of `records`.
///
/// Units are not checked here; see [`RunResult::new`](crate::RunResult::new).
pub fn summarize(records: &[MeasurementRecord]) -> Summary {
    let count = records.len();
    let Some(first) = records.first() else {
        return Summary {
            count: 0,
            unit: None,
            mean: None,
            std_dev: None,
            min: None,
            max: None,
            iters_per_second: None,
        };
    };

    let n = count as f64;
    let mean = records.iter().map(|r| r.value).sum::<f64>() / n;
    let variance = records
        .iter()
        .map(|r| (r.value - mean).powi(2))
        .sum::<f64>()
        / n;
    let min = records.iter().map(|r| r.value).fold(f64::INFINITY, f64::min);
    let max = records.iter().map(|r| r.value).fold(f64::NEG_INFINITY, f64::max);

    Summary {
        count,
        unit: Some(first.unit.clone()),
        mean: Some(mean),
        std_dev: Some(variance.sqrt()),
        min: Some(min),
        max: Some(max),
        iters_per_second: iters_per_second(mean, &first.unit),
    }
}

/// `1e6 / mean` for microseconds; other time units are scaled accordingly.
fn iters_per_second(mean: f64, unit: &str) -> Option<f64> {
    let per_second = match unit {
        "us" => 1e6,
        "ms" => 1e3,
        "ns" => 1e9,
        "s" => 1.0,
        _ => return None,
    };
    (mean > 0.0).then(|| per_second / mean)
}
