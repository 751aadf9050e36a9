// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `droid-bench run` command: the full session matrix.
//!
//! Expands the session's models × profiles, deals the tasks over the
//! devices, and prints a results table followed by the failures. Failed
//! tasks never stop the run; with `--strict` they turn the exit code to 1.

use bench_config::SessionConfig;
use device_bridge::BridgeError;
use orchestrator::{OrchestratorSettings, RunOrchestrator};
use std::path::PathBuf;
use std::process::ExitCode;

pub async fn execute(
    session: SessionConfig,
    strict: bool,
    output: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             droid-bench · Session Runner            ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let strict = strict || session.strict;
    let tasks = session.benchmark_matrix()?;

    let orchestrator = RunOrchestrator::new(
        super::adb_transport(&session),
        OrchestratorSettings::from_session(&session),
    );
    // With no reachable device the run still goes ahead: every task is
    // reported as failed and the exit code follows `strict`.
    let devices = match orchestrator.resolve_devices(&session.devices).await {
        Ok(devices) => devices,
        Err(BridgeError::NoDevices) => {
            tracing::warn!("no reachable device; every task will fail");
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };

    println!("  Session:");
    println!("   Tasks:    {}", tasks.len());
    println!("   Profiles: {}", session.profiles.len());
    if devices.is_empty() {
        println!("   Devices:  (none reachable)");
    } else {
        println!(
            "   Devices:  {}",
            devices.iter().map(|d| d.serial()).collect::<Vec<_>>().join(", ")
        );
    }
    println!("   Timeout:  {}s per command", session.command_timeout_secs);
    println!("   Strict:   {strict}");
    println!();

    let report = orchestrator
        .run(devices, tasks, super::cancel_on_ctrl_c())
        .await;

    // ── Results Table ──────────────────────────────────────────
    println!(
        "  {:<24} {:<12} {:<16} {:>4} {:>12} {:>10} {:>12} {:>12} {:>8}  {}",
        "Model", "Profile", "Device", "N", "Mean", "Std", "Min", "Max", "It/s", "Unit",
    );
    println!("  {}", "-".repeat(128));
    for (key, result) in report.results.sorted() {
        let s = result.summary();
        println!(
            "  {:<24} {:<12} {:<16} {:>4} {:>12} {:>10} {:>12} {:>12} {:>8}  {}",
            key.model,
            key.profile,
            result.device(),
            s.count,
            super::fmt_value(s.mean),
            super::fmt_value(s.std_dev),
            super::fmt_value(s.min),
            super::fmt_value(s.max),
            super::fmt_rate(s.iters_per_second),
            s.unit.unwrap_or_default(),
        );
    }
    println!();

    // ── Failures ───────────────────────────────────────────────
    if report.has_failures() {
        println!("  Failures:");
        for f in &report.failures {
            println!(
                "   {}/{} on {} [{} while {}]: {}",
                f.model, f.profile, f.device, f.kind, f.failed_from, f.reason
            );
        }
        println!();
    }
    if !report.skipped.is_empty() {
        println!("  Skipped (cancelled): {}", report.skipped.len());
        for s in &report.skipped {
            println!("   {}/{} on {}", s.model, s.profile, s.device);
        }
        println!();
    }

    // ── Exports ────────────────────────────────────────────────
    if let Some(dir) = &session.results_dir {
        let files = report.results.write_task_files(dir)?;
        println!("  Wrote {} result file(s) to {}", files.len(), dir.display());
    }
    if let Some(path) = &output {
        report.write_json(path)?;
        println!("  Wrote report to {}", path.display());
    }

    println!("  {}", report.summary());
    println!();

    let code = report.exit_code(strict);
    if code != 0 {
        tracing::error!("{} task(s) failed in strict mode", report.failures.len());
    }
    Ok(ExitCode::from(code as u8))
}
