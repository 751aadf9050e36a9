// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `droid-bench profile` command: one model, one profile, one device.
//!
//! Goes through the same pipeline as `run`:
//! ```text
//! BenchTask<Pending> → push → <Pushed> → invoke → <Invoked> → parse → <Parsed> → record
//! ```

use bench_config::{BenchmarkConfig, RunProfile, SessionConfig};
use orchestrator::{OrchestratorSettings, RunOrchestrator};
use std::path::PathBuf;
use std::process::ExitCode;

pub struct ProfileArgs {
    pub model: PathBuf,
    pub device: Option<String>,
    pub warmup: u32,
    pub iter: u32,
    pub threads: u32,
    pub bundled_input: Option<u32>,
    pub input_dims: Option<String>,
    pub input_type: String,
    pub cpu_affinity: Vec<u32>,
    pub vulkan: bool,
    pub raw_output_dir: Option<PathBuf>,
}

pub async fn execute(session: SessionConfig, args: ProfileArgs) -> anyhow::Result<ExitCode> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             droid-bench · Model Profiler            ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Configuration ──────────────────────────────────────────
    let input_dims = args.input_dims.as_deref().map(parse_dims).transpose()?;
    let profile = RunProfile {
        warmup: args.warmup,
        iter: args.iter,
        threads: args.threads,
        vulkan: args.vulkan,
        use_bundled_input: args.bundled_input,
        input_dims,
        input_type: args.input_type.split(';').map(|t| t.trim().to_string()).collect(),
        cpu_affinity: (!args.cpu_affinity.is_empty()).then_some(args.cpu_affinity),
        ..RunProfile::named("cli")
    };
    let config = BenchmarkConfig::new(&args.model, &profile)?;
    if !args.model.is_file() {
        anyhow::bail!("model file not found: {}", args.model.display());
    }

    println!("  Config:");
    println!("   Model:    {}", args.model.display());
    println!("   Warmup:   {}", config.warmup);
    println!("   Iter:     {}", config.iter);
    println!("   Threads:  {}", config.threads);
    if let Some(affinity) = &config.cpu_affinity {
        println!("   Cores:    {:?} (mask {:#x})", affinity.cores(), affinity.mask());
    }
    println!();

    // ── Device ─────────────────────────────────────────────────
    let settings = OrchestratorSettings {
        raw_output_dir: args.raw_output_dir.clone(),
        ..OrchestratorSettings::from_session(&session)
    };
    let orchestrator = RunOrchestrator::new(super::adb_transport(&session), settings);
    let requested: Vec<String> = args.device.into_iter().collect();
    let device = orchestrator
        .resolve_devices(&requested)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no device resolved"))?;
    println!("  Device:   {device}");
    println!();

    // ── Benchmark ──────────────────────────────────────────────
    println!("  Running {config} ...");
    let key = result_aggregator::ResultKey::for_config(&config);
    let report = orchestrator
        .run(vec![device], vec![config], super::cancel_on_ctrl_c())
        .await;
    println!();

    if let Some(failed) = report.failures.first() {
        println!("  FAILED ({} while {}): {}", failed.kind, failed.failed_from, failed.reason);
        println!();
        return Ok(ExitCode::FAILURE);
    }
    let Some(result) = report.results.get(&key) else {
        println!("  Skipped (cancelled).");
        println!();
        return Ok(ExitCode::FAILURE);
    };

    let s = result.summary();
    let unit = s.unit.clone().unwrap_or_default();
    println!("  Results:");
    println!("   Samples:  {}", s.count);
    println!("   Mean:     {} {unit}", super::fmt_value(s.mean));
    println!("   Std:      {} {unit}", super::fmt_value(s.std_dev));
    println!("   Min:      {} {unit}", super::fmt_value(s.min));
    println!("   Max:      {} {unit}", super::fmt_value(s.max));
    println!("   Iter/s:   {}", super::fmt_rate(s.iters_per_second));
    if let Some(dir) = &args.raw_output_dir {
        println!("   Raw:      {}", dir.display());
    }
    println!();
    Ok(ExitCode::SUCCESS)
}

/// Parses "1,3,224,224;1,10" into one shape per input.
fn parse_dims(text: &str) -> anyhow::Result<Vec<Vec<u64>>> {
    text.split(';')
        .map(|shape| {
            shape
                .split(',')
                .map(|d| {
                    d.trim()
                        .parse::<u64>()
                        .map_err(|e| anyhow::anyhow!("invalid dimension '{}' in '{text}': {e}", d.trim()))
                })
                .collect()
        })
        .collect()
}
