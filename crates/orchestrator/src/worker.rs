// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-device worker: processes one device's queue strictly in order.

use crate::task::{BenchTask, TaskFailure, TaskState};
use crate::{BenchmarkInvoker, OrchestratorSettings, TaskError};
use bench_config::BenchmarkConfig;
use device_bridge::DeviceHandle;
use result_aggregator::{ResultKey, RunResult};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Terminal outcome of one task, sent to the collector.
#[derive(Debug)]
pub enum TaskOutcome {
    Recorded(RunResult),
    Failed(TaskFailure),
    /// Not started because the run was cancelled.
    Skipped { key: ResultKey, device: String },
}

pub(crate) struct DeviceWorker {
    pub(crate) device: DeviceHandle,
    pub(crate) invoker: Arc<BenchmarkInvoker>,
    pub(crate) settings: Arc<OrchestratorSettings>,
    pub(crate) queue: Vec<BenchmarkConfig>,
}

impl DeviceWorker {
    /// Runs the queue. Cancellation is checked before each task, i.e. after
    /// every terminal transition, never during an invocation.
    pub(crate) async fn run(self, outcomes: mpsc::Sender<TaskOutcome>, cancel: CancellationToken) {
        tracing::info!("[{}] worker started with {} tasks", self.device, self.queue.len());

        if let Some(local) = &self.settings.local_binary {
            if !cancel.is_cancelled() {
                if let Err(e) = self
                    .invoker
                    .provision_binary(&self.device, local, &self.settings.remote_binary)
                    .await
                {
                    tracing::error!("[{}] {e}; failing {} queued tasks", self.device, self.queue.len());
                    for config in &self.queue {
                        let failure = TaskFailure {
                            key: ResultKey::for_config(config),
                            device: self.device.serial().to_string(),
                            failed_from: TaskState::Pending,
                            error: TaskError::provision(&e),
                        };
                        if outcomes.send(TaskOutcome::Failed(failure)).await.is_err() {
                            return;
                        }
                    }
                    return;
                }
            }
        }

        let mut queue = self.queue.iter();
        for config in queue.by_ref() {
            if cancel.is_cancelled() {
                self.skip(config, &outcomes).await;
                break;
            }
            let outcome = match self.process(config.clone()).await {
                Ok(result) => TaskOutcome::Recorded(result),
                Err(failure) => TaskOutcome::Failed(failure),
            };
            if outcomes.send(outcome).await.is_err() {
                tracing::debug!("[{}] collector gone, stopping", self.device);
                return;
            }
        }
        for config in queue {
            self.skip(config, &outcomes).await;
        }
        tracing::info!("[{}] worker finished", self.device);
    }

    async fn process(&self, config: BenchmarkConfig) -> Result<RunResult, TaskFailure> {
        let task = BenchTask::new(config, self.device.clone());
        let task = task.push(&self.invoker).await?;
        let task = task.invoke(&self.invoker, &self.settings.remote_binary).await?;
        self.save_raw_output(&task).await;
        task.parse()?.record()
    }

    async fn save_raw_output(&self, task: &BenchTask<crate::task::Invoked>) {
        let Some(dir) = &self.settings.raw_output_dir else {
            return;
        };
        let path = dir.join(format!("{}.txt", task.key().file_stem()));
        let written = match tokio::fs::create_dir_all(dir).await {
            Ok(()) => tokio::fs::write(&path, task.raw_output().stdout()).await,
            Err(e) => Err(e),
        };
        match written {
            Ok(()) => tracing::debug!("[{}] raw output saved to {}", self.device, path.display()),
            Err(e) => tracing::warn!("[{}] could not save {}: {e}", self.device, path.display()),
        }
    }

    async fn skip(&self, config: &BenchmarkConfig, outcomes: &mpsc::Sender<TaskOutcome>) {
        let outcome = TaskOutcome::Skipped {
            key: ResultKey::for_config(config),
            device: self.device.serial().to_string(),
        };
        let _ = outcomes.send(outcome).await;
    }
}
