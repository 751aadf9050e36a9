// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Matrix scheduling across devices.
//!
//! Tasks are dealt round-robin to devices. Each device gets one worker
//! (a tokio task) that runs its queue in order, so a device never sees two
//! overlapping transfers or commands. Workers send outcomes over a channel
//! to a single collector, which is the only writer of the
//! [`ResultSet`](result_aggregator::ResultSet).

use crate::report::{FailedTask, RunReport, SkippedTask};
use crate::task::{TaskFailure, TaskState};
use crate::worker::{DeviceWorker, TaskOutcome};
use crate::{BenchmarkInvoker, TaskError};
use bench_config::{BenchmarkConfig, SessionConfig};
use device_bridge::{
    retry_transient, BridgeError, DeviceEntry, DeviceHandle, DeviceTransport, RetryPolicy,
};
use result_aggregator::ResultKey;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const OUTCOME_CHANNEL_CAPACITY: usize = 64;

/// Settings shared by every worker of a run.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub remote_dir: String,
    /// Device path of the benchmark binary.
    pub remote_binary: String,
    /// Host binary to install on each device before its queue starts.
    pub local_binary: Option<PathBuf>,
    pub command_timeout: Duration,
    pub retry: RetryPolicy,
    pub raw_output_dir: Option<PathBuf>,
}

impl OrchestratorSettings {
    pub fn from_session(session: &SessionConfig) -> Self {
        Self {
            remote_dir: session.remote_dir.clone(),
            remote_binary: session.remote_binary_path(),
            local_binary: session.local_binary.clone(),
            command_timeout: session.command_timeout(),
            retry: RetryPolicy::new(session.retry.max_attempts, session.retry.base_delay()),
            raw_output_dir: session.raw_output_dir.clone(),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_session(&SessionConfig::default())
    }
}

/// Runs a benchmark matrix over a set of devices.
pub struct RunOrchestrator {
    transport: Arc<dyn DeviceTransport>,
    settings: Arc<OrchestratorSettings>,
}

impl RunOrchestrator {
    pub fn new(transport: Arc<dyn DeviceTransport>, settings: OrchestratorSettings) -> Self {
        Self {
            transport,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Resolves the devices to run on.
    ///
    /// With no serials, every online device is used. Transient lookup
    /// failures are retried under the run's [`RetryPolicy`]. Requested
    /// devices that still cannot be resolved are skipped with a warning; if
    /// none remain the result is [`BridgeError::NoDevices`].
    pub async fn resolve_devices(&self, serials: &[String]) -> Result<Vec<DeviceHandle>, BridgeError> {
        let retry = &self.settings.retry;
        let transport = &self.transport;
        let mut handles: Vec<DeviceHandle> = if serials.is_empty() {
            retry_transient(retry, "list devices", move || transport.list_devices())
                .await?
                .iter()
                .filter_map(DeviceEntry::handle)
                .collect()
        } else {
            let mut resolved = Vec::with_capacity(serials.len());
            for serial in serials {
                let what = format!("resolve {serial}");
                let result =
                    retry_transient(retry, &what, move || transport.resolve(Some(serial.as_str()))).await;
                match result {
                    Ok(handle) => resolved.push(handle),
                    Err(e) => tracing::warn!("skipping device {serial}: {e}"),
                }
            }
            resolved
        };

        let mut seen = std::collections::HashSet::new();
        handles.retain(|h| seen.insert(h.clone()));
        if handles.is_empty() {
            return Err(BridgeError::NoDevices);
        }
        tracing::info!(
            "using {} device(s): {}",
            handles.len(),
            handles.iter().map(|h| h.serial()).collect::<Vec<_>>().join(", ")
        );
        Ok(handles)
    }

    /// Deals tasks round-robin over `devices`, preserving matrix order
    /// within each queue.
    pub fn assign(
        devices: &[DeviceHandle],
        tasks: Vec<BenchmarkConfig>,
    ) -> Vec<(DeviceHandle, Vec<BenchmarkConfig>)> {
        let mut queues: Vec<(DeviceHandle, Vec<BenchmarkConfig>)> =
            devices.iter().map(|d| (d.clone(), Vec::new())).collect();
        if queues.is_empty() {
            return queues;
        }
        let n = queues.len();
        for (i, task) in tasks.into_iter().enumerate() {
            queues[i % n].1.push(task);
        }
        queues
    }

    /// Runs `tasks` on `devices` and collects a best-effort report.
    ///
    /// A failed task never stops the run. Cancelling `cancel` lets each
    /// worker finish its current task; the rest are reported as skipped.
    pub async fn run(
        &self,
        devices: Vec<DeviceHandle>,
        tasks: Vec<BenchmarkConfig>,
        cancel: CancellationToken,
    ) -> RunReport {
        let started = tokio::time::Instant::now();
        let mut report = RunReport::default();

        if devices.is_empty() {
            for config in &tasks {
                report.failures.push(FailedTask::from(TaskFailure {
                    key: ResultKey::for_config(config),
                    device: String::new(),
                    failed_from: TaskState::Pending,
                    error: TaskError::Bridge(BridgeError::NoDevices),
                }));
            }
            report.finish(started.elapsed(), cancel.is_cancelled());
            return report;
        }

        let invoker = Arc::new(
            BenchmarkInvoker::new(
                Arc::clone(&self.transport),
                self.settings.remote_dir.clone(),
                self.settings.command_timeout,
            )
            .with_retry(self.settings.retry),
        );

        let (tx, mut rx) = mpsc::channel(OUTCOME_CHANNEL_CAPACITY);
        let mut workers = Vec::with_capacity(devices.len());
        for (device, queue) in Self::assign(&devices, tasks) {
            if queue.is_empty() {
                continue;
            }
            let keys: Vec<ResultKey> = queue.iter().map(ResultKey::for_config).collect();
            let worker = DeviceWorker {
                device: device.clone(),
                invoker: Arc::clone(&invoker),
                settings: Arc::clone(&self.settings),
                queue,
            };
            let handle = tokio::spawn(worker.run(tx.clone(), cancel.clone()));
            workers.push((device, keys, handle));
        }
        drop(tx);

        // Outcomes per device arrive in queue order.
        let mut reported: HashMap<String, usize> = HashMap::new();
        while let Some(outcome) = rx.recv().await {
            match outcome {
                TaskOutcome::Recorded(result) => {
                    *reported.entry(result.device().to_string()).or_default() += 1;
                    report.results.merge(result.key(), result);
                }
                TaskOutcome::Failed(failure) => {
                    *reported.entry(failure.device.clone()).or_default() += 1;
                    report.failures.push(failure.into());
                }
                TaskOutcome::Skipped { key, device } => {
                    *reported.entry(device.clone()).or_default() += 1;
                    report.skipped.push(SkippedTask::new(key, device));
                }
            }
        }

        for (device, keys, handle) in workers {
            if let Err(e) = handle.await {
                tracing::error!("[{device}] worker aborted: {e}");
                let done = reported.get(device.serial()).copied().unwrap_or(0);
                for key in keys.into_iter().skip(done) {
                    report.failures.push(FailedTask::from(TaskFailure {
                        key,
                        device: device.serial().to_string(),
                        failed_from: TaskState::Pending,
                        error: TaskError::Aborted(e.to_string()),
                    }));
                }
            }
        }

        report.finish(started.elapsed(), cancel.is_cancelled());
        tracing::info!("{}", report.summary());
        report
    }
}
