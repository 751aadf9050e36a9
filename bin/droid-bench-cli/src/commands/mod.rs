// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared helpers.

pub mod devices;
pub mod parse;
pub mod profile;
pub mod run;

use bench_config::SessionConfig;
use device_bridge::AdbTransport;
use orchestrator::CancellationToken;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Initialises logging on stderr. `RUST_LOG` takes precedence over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the session file if one is given, then applies CLI overrides.
pub fn load_session(config: Option<&Path>, adb: Option<PathBuf>) -> anyhow::Result<SessionConfig> {
    let mut session = match config {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default(),
    };
    if let Some(adb) = adb {
        session.adb_path = adb;
    }
    Ok(session)
}

pub(crate) fn adb_transport(session: &SessionConfig) -> Arc<AdbTransport> {
    Arc::new(AdbTransport::new(&session.adb_path).with_transfer_timeout(session.transfer_timeout()))
}

/// A token cancelled on Ctrl-C. Workers finish their current task first.
pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n  Interrupted: finishing tasks in flight, skipping the rest...");
            trigger.cancel();
        }
    });
    token
}

pub(crate) fn fmt_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
}

pub(crate) fn fmt_rate(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"))
}
