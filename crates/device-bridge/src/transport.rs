// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`DeviceTransport`] trait.

use crate::{BridgeError, DeviceEntry, DeviceHandle};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Captured result of a remote command that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    /// Returns a zero-exit output carrying `stdout`.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// Returns a failed output with the given exit code and stderr.
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Remote-device capability used by the benchmark pipeline.
///
/// Implementations must not cache device state between calls: each call
/// verifies that the device is reachable before acting on it. All
/// operations are safe to retry; pushing the same file twice overwrites.
///
/// A transport is shared between per-device workers, so it must be
/// `Send + Sync`. It is the caller's job to serialise calls per device.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Lists every attached device, reachable or not.
    async fn list_devices(&self) -> Result<Vec<DeviceEntry>, BridgeError>;

    /// Resolves a handle for `serial`, or for the first online device when
    /// `serial` is `None`, after confirming the device answers.
    async fn resolve(&self, serial: Option<&str>) -> Result<DeviceHandle, BridgeError>;

    /// Copies a host file to `remote` on the device, overwriting.
    async fn push(&self, device: &DeviceHandle, local: &Path, remote: &str)
        -> Result<(), BridgeError>;

    /// Copies `remote` from the device to a host path, overwriting.
    async fn pull(&self, device: &DeviceHandle, remote: &str, local: &Path)
        -> Result<(), BridgeError>;

    /// Runs `program args...` on the device.
    ///
    /// Returns the captured output whatever the exit code is. Fails with
    /// [`BridgeError::Timeout`] if the command outlives `timeout`; the
    /// deadline is enforced on the host side.
    async fn run_command(
        &self,
        device: &DeviceHandle,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, BridgeError>;
}
