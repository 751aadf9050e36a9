// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `droid-bench parse` command: summarise captured output offline.

use observer_parser::{find_reported_summary, parse_all, MeasurementRecord, RawRunOutput, ReportedSummary};
use result_aggregator::{summarize, Summary};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Serialize)]
struct ParsedOutput<'a> {
    records: &'a [MeasurementRecord],
    summary: &'a Summary,
    reported: Option<ReportedSummary>,
}

pub fn execute(input: PathBuf, json: bool) -> anyhow::Result<ExitCode> {
    let text = std::fs::read_to_string(&input)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", input.display()))?;
    let raw = RawRunOutput::from_stdout(text);
    let records = parse_all(&raw)?;
    let summary = summarize(&records);
    let reported = find_reported_summary(raw.stdout());

    if json {
        let doc = ParsedOutput {
            records: &records,
            summary: &summary,
            reported,
        };
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(ExitCode::SUCCESS);
    }

    let unit = summary.unit.clone().unwrap_or_default();
    println!("  {}", input.display());
    println!("   Samples:  {}", summary.count);
    println!("   Mean:     {} {unit}", super::fmt_value(summary.mean));
    println!("   Std:      {} {unit}", super::fmt_value(summary.std_dev));
    println!("   Min:      {} {unit}", super::fmt_value(summary.min));
    println!("   Max:      {} {unit}", super::fmt_value(summary.max));
    println!("   Iter/s:   {}", super::fmt_rate(summary.iters_per_second));
    if let Some(r) = reported {
        println!(
            "   Reported: {:.1} us/iter, {:.3} iter/s",
            r.us_per_iter, r.iters_per_second
        );
    }
    Ok(ExitCode::SUCCESS)
}
