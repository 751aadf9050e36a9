// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! [`DeviceTransport`] implementation that shells out to the `adb` binary.
//!
//! Every call spawns a fresh `adb` process. Calls that target a device
//! first run `adb -s <serial> get-state` so that a device that vanished
//! since the last call surfaces as [`BridgeError::DeviceUnavailable`].
//!
//! Deadlines are enforced here with `tokio::time::timeout`; the spawned
//! `adb` process is killed when its future is dropped. The process on the
//! device side may keep running after a timeout.

use crate::{parse_device_list, BridgeError, CommandOutput, DeviceEntry, DeviceHandle, DeviceTransport};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Deadline for short bridge queries (`devices`, `get-state`, `getprop`).
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for a single push or pull.
const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(120);

/// `adb` stderr fragments that mean the device went away, not that the
/// command itself failed.
const DISCONNECT_MARKERS: &[&str] = &[
    "device offline",
    "device not found",
    "no devices/emulators found",
    "device unauthorized",
    "device still authorizing",
    "error: closed",
    "protocol fault",
];

/// Talks to devices through the `adb` command-line client.
#[derive(Debug, Clone)]
pub struct AdbTransport {
    adb_path: PathBuf,
    transfer_timeout: Duration,
}

impl AdbTransport {
    /// Creates a transport using the given `adb` executable (a bare name is
    /// looked up on `PATH`).
    pub fn new(adb_path: impl Into<PathBuf>) -> Self {
        Self {
            adb_path: adb_path.into(),
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
        }
    }

    /// Sets the deadline applied to each push and pull.
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    pub fn adb_path(&self) -> &Path {
        &self.adb_path
    }

    /// Spawns `adb [-s serial] args...` and waits for it up to `timeout`.
    async fn exec(
        &self,
        device: Option<&DeviceHandle>,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, BridgeError> {
        let label = args.join(" ");
        let mut cmd = Command::new(&self.adb_path);
        if let Some(device) = device {
            cmd.arg("-s").arg(device.serial());
        }
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::trace!(
            device = device.map(|d| d.serial()).unwrap_or("-"),
            "adb {label}"
        );

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(BridgeError::io(
                    label,
                    format!("cannot run '{}': {e}", self.adb_path.display()),
                ))
            }
            Err(_) => {
                return Err(BridgeError::Timeout {
                    command: label,
                    after: timeout,
                })
            }
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            // Killed by a signal: no exit code.
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Confirms the device is attached and in the `device` state.
    async fn ensure_online(&self, device: &DeviceHandle) -> Result<(), BridgeError> {
        let out = match self.exec(Some(device), &["get-state"], PROBE_TIMEOUT).await {
            Ok(out) => out,
            Err(BridgeError::Timeout { .. }) => {
                return Err(BridgeError::unavailable(
                    device.serial(),
                    "no answer to get-state",
                ))
            }
            Err(e) => return Err(e),
        };

        let state = out.stdout.trim();
        if !out.succeeded() || state != "device" {
            let detail = if state.is_empty() {
                failure_detail(&out)
            } else {
                format!("state is '{state}'")
            };
            return Err(BridgeError::unavailable(device.serial(), detail));
        }
        Ok(())
    }

    /// Maps a failed transfer to the right error kind.
    fn transfer_error(&self, op: &str, device: &DeviceHandle, out: &CommandOutput) -> BridgeError {
        let detail = failure_detail(out);
        if looks_disconnected(&out.stderr) {
            BridgeError::unavailable(device.serial(), detail)
        } else {
            BridgeError::io(op, detail)
        }
    }
}

#[async_trait]
impl DeviceTransport for AdbTransport {
    async fn list_devices(&self) -> Result<Vec<DeviceEntry>, BridgeError> {
        let out = self.exec(None, &["devices"], PROBE_TIMEOUT).await?;
        if !out.succeeded() {
            return Err(BridgeError::io("devices", failure_detail(&out)));
        }
        Ok(parse_device_list(&out.stdout))
    }

    async fn resolve(&self, serial: Option<&str>) -> Result<DeviceHandle, BridgeError> {
        let handle = match serial {
            Some(serial) => DeviceHandle::new(serial),
            None => self
                .list_devices()
                .await?
                .iter()
                .find_map(DeviceEntry::handle)
                .ok_or(BridgeError::NoDevices)?,
        };

        self.ensure_online(&handle).await?;

        let out = self
            .exec(Some(&handle), &["shell", "getprop", "ro.serialno"], PROBE_TIMEOUT)
            .await?;
        if !out.succeeded() {
            return Err(BridgeError::unavailable(handle.serial(), failure_detail(&out)));
        }
        tracing::info!(
            device = %handle,
            reported_serial = out.stdout.trim(),
            "device online"
        );
        Ok(handle)
    }

    async fn push(
        &self,
        device: &DeviceHandle,
        local: &Path,
        remote: &str,
    ) -> Result<(), BridgeError> {
        if !local.is_file() {
            return Err(BridgeError::io(
                "push",
                format!("local file not found: {}", local.display()),
            ));
        }
        self.ensure_online(device).await?;

        let local_str = local.to_string_lossy();
        let out = self
            .exec(Some(device), &["push", &*local_str, remote], self.transfer_timeout)
            .await?;
        if !out.succeeded() {
            return Err(self.transfer_error("push", device, &out));
        }
        tracing::debug!(device = %device, "pushed {} -> {remote}", local.display());
        Ok(())
    }

    async fn pull(
        &self,
        device: &DeviceHandle,
        remote: &str,
        local: &Path,
    ) -> Result<(), BridgeError> {
        self.ensure_online(device).await?;

        let local_str = local.to_string_lossy();
        let out = self
            .exec(Some(device), &["pull", remote, &*local_str], self.transfer_timeout)
            .await?;
        if !out.succeeded() {
            return Err(self.transfer_error("pull", device, &out));
        }
        tracing::debug!(device = %device, "pulled {remote} -> {}", local.display());
        Ok(())
    }

    async fn run_command(
        &self,
        device: &DeviceHandle,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, BridgeError> {
        self.ensure_online(device).await?;

        let mut shell_args: Vec<&str> = Vec::with_capacity(args.len() + 2);
        shell_args.push("shell");
        shell_args.push(program);
        shell_args.extend(args.iter().map(String::as_str));

        let out = match self.exec(Some(device), &shell_args, timeout).await {
            Err(BridgeError::Timeout { after, .. }) => {
                tracing::warn!(
                    device = %device,
                    "'{program}' exceeded {}s; remote process may still be running",
                    after.as_secs_f64()
                );
                return Err(BridgeError::Timeout {
                    command: program.to_string(),
                    after,
                });
            }
            other => other?,
        };

        // adb reports a lost connection as exit 255 with an `error:` line.
        if out.exit_code == 255 && looks_disconnected(&out.stderr) {
            return Err(BridgeError::unavailable(device.serial(), failure_detail(&out)));
        }
        Ok(out)
    }
}

fn looks_disconnected(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    DISCONNECT_MARKERS.iter().any(|m| lower.contains(m))
}

/// Picks the most useful text out of a failed command's output.
fn failure_detail(out: &CommandOutput) -> String {
    let stderr = out.stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    let stdout = out.stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_string();
    }
    format!("exit code {}", out.exit_code)
}
