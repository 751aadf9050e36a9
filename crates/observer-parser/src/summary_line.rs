// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The binary's own closing summary line.
//!
//! ```text
//! Main run finished. Microseconds per iter: 584549. Iters per second: 1.71072
//! ```
//!
//! Informational only. Callers compare it with the summary computed from
//! the observations; it never decides success.

const PREFIX: &str = "Main run finished. Microseconds per iter:";
const SEPARATOR: &str = ". Iters per second:";

/// Figures reported by the benchmark binary itself.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ReportedSummary {
    pub us_per_iter: f64,
    pub iters_per_second: f64,
}

/// Parses a single summary line. Returns `None` for anything else.
pub fn parse_summary_line(line: &str) -> Option<ReportedSummary> {
    let rest = line.trim().strip_prefix(PREFIX)?;
    let (us, ips) = rest.split_once(SEPARATOR)?;
    Some(ReportedSummary {
        us_per_iter: us.trim().parse().ok()?,
        iters_per_second: ips.trim().trim_end_matches('.').parse().ok()?,
    })
}

/// Finds the last summary line in `stdout`.
pub fn find_reported_summary(stdout: &str) -> Option<ReportedSummary> {
    stdout.lines().rev().find_map(parse_summary_line)
}
