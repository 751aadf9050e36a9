// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `droid-bench devices` command: list attached devices.

use bench_config::SessionConfig;
use device_bridge::DeviceTransport;
use std::process::ExitCode;

pub async fn execute(session: SessionConfig) -> anyhow::Result<ExitCode> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              droid-bench · Devices                  ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let transport = super::adb_transport(&session);
    let devices = transport.list_devices().await?;

    if devices.is_empty() {
        println!("  No devices attached ({}).", session.adb_path.display());
        println!();
        return Ok(ExitCode::SUCCESS);
    }

    println!("  {:<28} {:<14} {}", "Serial", "State", "Usable");
    println!("  {}", "-".repeat(52));
    for entry in &devices {
        println!(
            "  {:<28} {:<14} {}",
            entry.serial,
            entry.state.to_string(),
            if entry.state.is_online() { "yes" } else { "no" },
        );
    }
    println!();

    let online = devices.iter().filter(|d| d.state.is_online()).count();
    println!("  {online} of {} device(s) usable.", devices.len());
    println!();
    Ok(ExitCode::SUCCESS)
}
