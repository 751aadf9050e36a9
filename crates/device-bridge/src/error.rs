// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for device transport operations.

use std::time::Duration;

/// Errors raised while talking to a device through the bridge.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// The bridge cannot reach the device (offline, unauthorized, unplugged).
    #[error("device '{serial}' unavailable: {detail}")]
    DeviceUnavailable { serial: String, detail: String },

    /// A file transfer or bridge process failed.
    #[error("{op} failed: {detail}")]
    Io { op: String, detail: String },

    /// The command did not finish before the host-side deadline.
    #[error("'{command}' timed out after {}s", after.as_secs_f64())]
    Timeout { command: String, after: Duration },

    /// No reachable device is attached.
    #[error("no reachable devices attached")]
    NoDevices,
}

impl BridgeError {
    /// Returns `true` for errors worth retrying after a short backoff.
    ///
    /// Timeouts are not transient: the remote process may still be running,
    /// and re-issuing the command would pile a second one on top of it.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BridgeError::DeviceUnavailable { .. } | BridgeError::Io { .. }
        )
    }

    pub(crate) fn io(op: impl Into<String>, detail: impl Into<String>) -> Self {
        BridgeError::Io {
            op: op.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn unavailable(serial: impl Into<String>, detail: impl Into<String>) -> Self {
        BridgeError::DeviceUnavailable {
            serial: serial.into(),
            detail: detail.into(),
        }
    }
}
