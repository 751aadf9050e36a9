// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # droid-bench
//!
//! Command-line interface for on-device PyTorch speed benchmarks.
//!
//! ## Usage
//! ```bash
//! # List attached devices
//! droid-bench devices
//!
//! # Benchmark one model on one device
//! droid-bench profile --model ./models/mobilenet_v2.pt --bundled-input 0 --iter 20
//!
//! # Run a whole session (models × profiles over every device)
//! droid-bench run --config session.toml --strict --output report.json
//!
//! # Re-parse captured output offline
//! droid-bench parse --input raw/mobilenet_v2__cpu-1t.txt
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "droid-bench",
    about = "Orchestrates PyTorch mobile speed benchmarks on Android devices",
    version,
    author
)]
struct Cli {
    /// Path to a TOML session file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the adb executable (overrides the session file).
    #[arg(long, global = true)]
    adb: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List attached devices and their states.
    Devices,

    /// Benchmark a single model with a single profile on one device.
    Profile {
        /// Model file (TorchScript `.pt` / `.ptl`).
        #[arg(short, long)]
        model: PathBuf,

        /// Device serial (default: first online device).
        #[arg(short, long)]
        device: Option<String>,

        /// Untimed warmup iterations.
        #[arg(long, default_value_t = 5)]
        warmup: u32,

        /// Measured iterations.
        #[arg(long, default_value_t = 5)]
        iter: u32,

        /// Thread-pool cap on the device.
        #[arg(long, default_value_t = 1)]
        threads: u32,

        /// Use the input bundled with the model at this index.
        #[arg(long, conflicts_with = "input_dims")]
        bundled_input: Option<u32>,

        /// Input shapes, e.g. "1,3,224,224" or "1,3,224,224;1,10".
        #[arg(long)]
        input_dims: Option<String>,

        /// Input types, one per input, separated by ';'.
        #[arg(long, default_value = "float")]
        input_type: String,

        /// Cores to pin the benchmark to, e.g. "4,5,6,7".
        #[arg(long, value_delimiter = ',')]
        cpu_affinity: Vec<u32>,

        /// Run on the Vulkan backend.
        #[arg(long)]
        vulkan: bool,

        /// Directory to save the raw benchmark output in.
        #[arg(long)]
        raw_output_dir: Option<PathBuf>,
    },

    /// Run every model × profile of the session file.
    Run {
        /// Exit non-zero when any task fails.
        #[arg(long)]
        strict: bool,

        /// Write the full report as JSON to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse captured benchmark output offline.
    Parse {
        /// File holding the benchmark's stdout.
        #[arg(short, long)]
        input: PathBuf,

        /// Print the records and summary as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    let session = commands::load_session(cli.config.as_deref(), cli.adb)?;

    match cli.command {
        Commands::Devices => commands::devices::execute(session).await,
        Commands::Profile {
            model,
            device,
            warmup,
            iter,
            threads,
            bundled_input,
            input_dims,
            input_type,
            cpu_affinity,
            vulkan,
            raw_output_dir,
        } => {
            let args = commands::profile::ProfileArgs {
                model,
                device,
                warmup,
                iter,
                threads,
                bundled_input,
                input_dims,
                input_type,
                cpu_affinity,
                vulkan,
                raw_output_dir,
            };
            commands::profile::execute(session, args).await
        }
        Commands::Run { strict, output } => {
            if cli.config.is_none() {
                anyhow::bail!("`run` needs a session file: pass --config <file>");
            }
            commands::run::execute(session, strict, output).await
        }
        Commands::Parse { input, json } => commands::parse::execute(input, json),
    }
}
