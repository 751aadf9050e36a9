// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! One (model, profile) task with a type-state–enforced lifecycle.
//!
//! ```text
//! BenchTask<Pending>
//!     │  .push()
//!     ▼
//! BenchTask<Pushed>
//!     │  .invoke()      (model removed afterwards, pass or fail)
//!     ▼
//! BenchTask<Invoked>
//!     │  .parse()
//!     ▼
//! BenchTask<Parsed>
//!     │  .record()
//!     ▼
//!   RunResult           (Recorded)
//! ```
//!
//! Every transition consumes the task. A failed transition yields a
//! [`TaskFailure`] naming the state the task was in, so a task is always
//! either recorded or failed and never left half-processed.

use crate::{BenchmarkInvoker, TaskError};
use bench_config::BenchmarkConfig;
use device_bridge::DeviceHandle;
use observer_parser::{find_reported_summary, MeasurementRecord, RawRunOutput, ReportedSummary};
use result_aggregator::{ResultKey, RunResult};
use std::fmt;

/// Lifecycle states of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum TaskState {
    Pending,
    Pushed,
    Invoked,
    Parsed,
    Recorded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Recorded | TaskState::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ── Stage markers ──────────────────────────────────────────────

/// Not yet on the device.
#[derive(Debug)]
pub struct Pending;

/// Model copied to the device.
#[derive(Debug)]
pub struct Pushed {
    remote_model: String,
}

/// Benchmark ran to completion with exit code 0.
#[derive(Debug)]
pub struct Invoked {
    raw: RawRunOutput,
}

/// Observations decoded.
#[derive(Debug)]
pub struct Parsed {
    records: Vec<MeasurementRecord>,
    reported: Option<ReportedSummary>,
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Pending {}
    impl Sealed for super::Pushed {}
    impl Sealed for super::Invoked {}
    impl Sealed for super::Parsed {}
}

/// Non-terminal task stages.
pub trait Stage: fmt::Debug + sealed::Sealed {
    const STATE: TaskState;
}

impl Stage for Pending {
    const STATE: TaskState = TaskState::Pending;
}
impl Stage for Pushed {
    const STATE: TaskState = TaskState::Pushed;
}
impl Stage for Invoked {
    const STATE: TaskState = TaskState::Invoked;
}
impl Stage for Parsed {
    const STATE: TaskState = TaskState::Parsed;
}

// ── Failure ────────────────────────────────────────────────────

/// A task that moved to `Failed`.
#[derive(Debug)]
pub struct TaskFailure {
    pub key: ResultKey,
    pub device: String,
    /// State the task was in when the error occurred.
    pub failed_from: TaskState,
    pub error: TaskError,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {} failed while {}: {}",
            self.key, self.device, self.failed_from, self.error
        )
    }
}

// ── Task ───────────────────────────────────────────────────────

/// A benchmark task bound to the device that runs it.
#[derive(Debug)]
pub struct BenchTask<S: Stage = Pending> {
    config: BenchmarkConfig,
    device: DeviceHandle,
    stage: S,
}

impl<S: Stage> BenchTask<S> {
    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    pub fn device(&self) -> &DeviceHandle {
        &self.device
    }

    pub fn key(&self) -> ResultKey {
        ResultKey::for_config(&self.config)
    }

    pub fn state(&self) -> TaskState {
        S::STATE
    }

    fn fail(&self, error: impl Into<TaskError>) -> TaskFailure {
        let failure = TaskFailure {
            key: self.key(),
            device: self.device.serial().to_string(),
            failed_from: S::STATE,
            error: error.into(),
        };
        tracing::warn!("[{}] {failure}", self.device);
        failure
    }

    fn advance<T: Stage>(self, stage: T) -> BenchTask<T> {
        tracing::debug!(
            "[{}] {}: {} -> {}",
            self.device,
            self.config,
            S::STATE,
            T::STATE
        );
        BenchTask {
            config: self.config,
            device: self.device,
            stage,
        }
    }
}

impl BenchTask<Pending> {
    pub fn new(config: BenchmarkConfig, device: DeviceHandle) -> Self {
        Self {
            config,
            device,
            stage: Pending,
        }
    }

    /// Copies the model to the device.
    pub async fn push(self, invoker: &BenchmarkInvoker) -> Result<BenchTask<Pushed>, TaskFailure> {
        match invoker.push_model(&self.device, &self.config).await {
            Ok(remote_model) => Ok(self.advance(Pushed { remote_model })),
            Err(e) => Err(self.fail(e)),
        }
    }
}

impl BenchTask<Pushed> {
    pub fn remote_model(&self) -> &str {
        &self.stage.remote_model
    }

    /// Runs the benchmark, then removes the model from the device.
    pub async fn invoke(
        self,
        invoker: &BenchmarkInvoker,
        remote_binary: &str,
    ) -> Result<BenchTask<Invoked>, TaskFailure> {
        let result = invoker.invoke(&self.device, remote_binary, &self.config).await;
        invoker.remove_model(&self.device, &self.stage.remote_model).await;
        match result {
            Ok(raw) => Ok(self.advance(Invoked { raw })),
            Err(e) => Err(self.fail(e)),
        }
    }
}

impl BenchTask<Invoked> {
    pub fn raw_output(&self) -> &RawRunOutput {
        &self.stage.raw
    }

    /// Decodes the observation lines of the captured output.
    pub fn parse(self) -> Result<BenchTask<Parsed>, TaskFailure> {
        match observer_parser::parse_all(&self.stage.raw) {
            Ok(records) => {
                if records.is_empty() {
                    tracing::info!("[{}] {}: no observations reported", self.device, self.config);
                }
                let reported = find_reported_summary(self.stage.raw.stdout());
                Ok(self.advance(Parsed { records, reported }))
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}

impl BenchTask<Parsed> {
    pub fn records(&self) -> &[MeasurementRecord] {
        &self.stage.records
    }

    /// Binds the records into a [`RunResult`]. Fails when they mix units.
    pub fn record(self) -> Result<RunResult, TaskFailure> {
        let key = self.key();
        let serial = self.device.serial().to_string();
        let reported = self.stage.reported;

        match RunResult::new(self.config, serial.clone(), self.stage.records) {
            Ok(result) => {
                let summary = result.summary();
                tracing::info!(
                    "[{serial}] {key}: {} records, mean {}",
                    summary.count,
                    summary
                        .mean
                        .map(|m| format!("{m:.1} {}", summary.unit.as_deref().unwrap_or("")))
                        .unwrap_or_else(|| "n/a".to_string())
                );
                if let (Some(reported), Some(mean)) = (reported, summary.mean) {
                    tracing::debug!(
                        "[{serial}] {key}: binary reports {:.1} us/iter, computed {mean:.1}",
                        reported.us_per_iter
                    );
                }
                Ok(result)
            }
            Err(e) => {
                let failure = TaskFailure {
                    key,
                    device: serial,
                    failed_from: TaskState::Parsed,
                    error: e.into(),
                };
                tracing::warn!("[{}] {failure}", failure.device);
                Err(failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_config::RunProfile;
    use device_bridge::mock::{Operation, Scripted, ScriptedTransport};
    use device_bridge::{CommandOutput, DeviceTransport, RetryPolicy};
    use std::sync::Arc;
    use std::time::Duration;

    const BINARY: &str = "/data/local/tmp/speed_benchmark_torch";

    fn setup() -> (Arc<ScriptedTransport>, BenchmarkInvoker, BenchTask<Pending>) {
        let t = Arc::new(ScriptedTransport::new(&["R58M"]));
        let dyn_t: Arc<dyn DeviceTransport> = t.clone();
        let invoker = BenchmarkInvoker::new(dyn_t, "/data/local/tmp", Duration::from_secs(60))
            .with_retry(RetryPolicy::none());
        let profile = RunProfile {
            use_bundled_input: Some(0),
            ..RunProfile::named("cpu-1t")
        };
        let config = BenchmarkConfig::new("models/resnet18.pt", &profile).unwrap();
        (t, invoker, BenchTask::new(config, DeviceHandle::new("R58M")))
    }

    fn observation(unit: &str, value: &str) -> String {
        format!(
            "PyTorchObserver {{\"type\": \"NET\", \"unit\": \"{unit}\", \"metric\": \"latency\", \"value\": \"{value}\"}}\n"
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_lifecycle() {
        let (t, invoker, task) = setup();
        let out = format!(
            "Starting benchmark.\nMain runs.\n{}{}Main run finished. Microseconds per iter: 150. Iters per second: 6666.67\n",
            observation("us", "100"),
            observation("us", "200")
        );
        t.script(Operation::Run, "speed_benchmark_torch", Scripted::Output(CommandOutput::success(out)));

        assert_eq!(task.state(), TaskState::Pending);
        let task = task.push(&invoker).await.unwrap();
        assert_eq!(task.state(), TaskState::Pushed);
        assert_eq!(task.remote_model(), "/data/local/tmp/resnet18.pt");
        let task = task.invoke(&invoker, BINARY).await.unwrap();
        assert_eq!(task.state(), TaskState::Invoked);
        let task = task.parse().unwrap();
        assert_eq!(task.records().len(), 2);
        let result = task.record().unwrap();
        assert_eq!(result.summary().mean, Some(150.0));
        assert_eq!(result.device(), "R58M");

        let details: Vec<String> = t.calls().into_iter().map(|c| c.detail).collect();
        assert!(details[1].starts_with(BINARY));
        assert_eq!(details[2], "rm -f /data/local/tmp/resnet18.pt");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_failure_still_removes_model() {
        let (t, invoker, task) = setup();
        t.script(
            Operation::Run,
            "speed_benchmark_torch",
            Scripted::Output(CommandOutput::failure(134, "Aborted")),
        );
        let task = task.push(&invoker).await.unwrap();
        let failure = task.invoke(&invoker, BINARY).await.unwrap_err();
        assert_eq!(failure.failed_from, TaskState::Pushed);
        assert_eq!(failure.error.kind(), "ExecutionError");
        assert_eq!(failure.key.to_string(), "resnet18/cpu-1t");
        assert_eq!(t.calls().last().unwrap().detail, "rm -f /data/local/tmp/resnet18.pt");
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_failure_from_pending() {
        let (t, invoker, task) = setup();
        t.script(
            Operation::Push,
            "resnet18.pt",
            Scripted::Fail(device_bridge::BridgeError::Io {
                op: "push".into(),
                detail: "connection reset".into(),
            }),
        );
        let failure = task.push(&invoker).await.unwrap_err();
        assert_eq!(failure.failed_from, TaskState::Pending);
        assert_eq!(failure.error.kind(), "IOError");
        assert_eq!(t.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parse_failure_from_invoked() {
        let (t, invoker, task) = setup();
        t.script(
            Operation::Run,
            "speed_benchmark_torch",
            Scripted::Output(CommandOutput::success(observation("us", "soon"))),
        );
        let task = task.push(&invoker).await.unwrap();
        let task = task.invoke(&invoker, BINARY).await.unwrap();
        let failure = task.parse().unwrap_err();
        assert_eq!(failure.failed_from, TaskState::Invoked);
        assert_eq!(failure.error.kind(), "ParseError");
        assert!(failure.to_string().contains("soon"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mixed_units_fail_recording() {
        let (t, invoker, task) = setup();
        t.script(
            Operation::Run,
            "speed_benchmark_torch",
            Scripted::Output(CommandOutput::success(format!(
                "{}{}",
                observation("us", "1"),
                observation("ms", "1")
            ))),
        );
        let task = task.push(&invoker).await.unwrap();
        let task = task.invoke(&invoker, BINARY).await.unwrap().parse().unwrap();
        let failure = task.record().unwrap_err();
        assert_eq!(failure.failed_from, TaskState::Parsed);
        assert_eq!(failure.error.kind(), "ParseError");
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_observations_is_recorded() {
        let (_t, invoker, task) = setup();
        let task = task.push(&invoker).await.unwrap();
        let result = task
            .invoke(&invoker, BINARY)
            .await
            .unwrap()
            .parse()
            .unwrap()
            .record()
            .unwrap();
        assert!(result.records().is_empty());
        assert!(result.summary().mean.is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskState::Recorded.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::Parsed.is_terminal());
    }
}
