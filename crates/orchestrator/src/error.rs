// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for benchmark tasks.

use bench_config::ConfigError;
use device_bridge::{BridgeError, Transient};
use observer_parser::ParseError;
use result_aggregator::AggregateError;

/// Why a task ended in `Failed`.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The device bridge failed (unreachable device, transfer error, timeout).
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The benchmark binary exited non-zero.
    #[error("benchmark exited with code {exit_code}: {stderr}")]
    Execution { exit_code: i32, stderr: String },

    /// An observation line was rejected.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The parsed records could not form a result.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The benchmark binary could not be installed on the device.
    #[error("binary provisioning failed: {detail}")]
    Provision { kind: &'static str, detail: String },

    /// The worker stopped before reporting this task.
    #[error("worker aborted: {0}")]
    Aborted(String),
}

impl TaskError {
    /// Taxonomy name shown in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::Bridge(BridgeError::DeviceUnavailable { .. } | BridgeError::NoDevices) => {
                "DeviceUnavailableError"
            }
            TaskError::Bridge(BridgeError::Io { .. }) => "IOError",
            TaskError::Bridge(BridgeError::Timeout { .. }) => "TimeoutError",
            TaskError::Execution { .. } => "ExecutionError",
            TaskError::Parse(_) => "ParseError",
            TaskError::Aggregate(AggregateError::Write { .. } | AggregateError::Json(_)) => "IOError",
            TaskError::Aggregate(_) => "ParseError",
            TaskError::Config(_) => "ConfigError",
            TaskError::Provision { kind, .. } => kind,
            TaskError::Aborted(_) => "AbortedError",
        }
    }

    /// Wraps a provisioning failure so it can be reported against every
    /// queued task.
    pub(crate) fn provision(cause: &TaskError) -> Self {
        TaskError::Provision {
            kind: cause.kind(),
            detail: cause.to_string(),
        }
    }
}

impl Transient for TaskError {
    fn is_transient(&self) -> bool {
        matches!(self, TaskError::Bridge(e) if e.is_transient())
    }
}
