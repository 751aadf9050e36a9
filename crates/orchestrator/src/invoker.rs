// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Remote command construction and execution.

use crate::TaskError;
use bench_config::BenchmarkConfig;
use device_bridge::{retry_transient, DeviceHandle, DeviceTransport, RetryPolicy};
use observer_parser::RawRunOutput;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// A remote program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Builds the benchmark invocation, prefixed with `taskset` when the
    /// configuration pins cores.
    pub fn for_benchmark(remote_binary: &str, remote_model: &str, config: &BenchmarkConfig) -> Self {
        let bench_args = config.binary_args(remote_model);
        match &config.cpu_affinity {
            Some(affinity) => {
                let mut args = affinity.taskset_args().to_vec();
                args.push(remote_binary.to_string());
                args.extend(bench_args);
                Self {
                    program: "taskset".to_string(),
                    args,
                }
            }
            None => Self {
                program: remote_binary.to_string(),
                args: bench_args,
            },
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Pushes models, runs the benchmark binary, and captures its output.
///
/// Holds no per-device state: the device is passed into every call.
pub struct BenchmarkInvoker {
    transport: Arc<dyn DeviceTransport>,
    remote_dir: String,
    command_timeout: Duration,
    retry: RetryPolicy,
}

impl BenchmarkInvoker {
    pub fn new(
        transport: Arc<dyn DeviceTransport>,
        remote_dir: impl Into<String>,
        command_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            remote_dir: remote_dir.into(),
            command_timeout,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn remote_dir(&self) -> &str {
        &self.remote_dir
    }

    /// Copies the benchmark binary to `remote_binary` and makes it executable.
    pub async fn provision_binary(
        &self,
        device: &DeviceHandle,
        local_binary: &Path,
        remote_binary: &str,
    ) -> Result<(), TaskError> {
        tracing::info!("[{device}] installing {} as {remote_binary}", local_binary.display());
        retry_transient(&self.retry, "provision binary", move || async move {
            self.transport.push(device, local_binary, remote_binary).await?;
            let chmod = self
                .transport
                .run_command(
                    device,
                    "chmod",
                    &["755".to_string(), remote_binary.to_string()],
                    self.command_timeout,
                )
                .await?;
            if !chmod.succeeded() {
                return Err(TaskError::Execution {
                    exit_code: chmod.exit_code,
                    stderr: chmod.stderr.trim().to_string(),
                });
            }
            Ok::<(), TaskError>(())
        })
        .await
    }

    /// Pushes the configuration's model and returns its device path.
    pub async fn push_model(
        &self,
        device: &DeviceHandle,
        config: &BenchmarkConfig,
    ) -> Result<String, TaskError> {
        let remote = config.remote_model_path(&self.remote_dir);
        let target = remote.as_str();
        retry_transient(&self.retry, "push model", move || {
            self.transport.push(device, &config.model_path, target)
        })
        .await?;
        tracing::debug!("[{device}] pushed {}", remote);
        Ok(remote)
    }

    /// Runs the benchmark for `config` with the binary at `remote_binary`.
    ///
    /// Transient bridge errors are retried under the retry policy. A
    /// timeout is returned as is. A non-zero exit code becomes
    /// [`TaskError::Execution`] carrying the captured stderr.
    pub async fn invoke(
        &self,
        device: &DeviceHandle,
        remote_binary: &str,
        config: &BenchmarkConfig,
    ) -> Result<RawRunOutput, TaskError> {
        let remote_model = config.remote_model_path(&self.remote_dir);
        let command = CommandLine::for_benchmark(remote_binary, &remote_model, config);
        tracing::info!("[{device}] {config}: {command}");

        let (program, args) = (command.program.as_str(), command.args.as_slice());
        let out = retry_transient(&self.retry, "invoke benchmark", move || {
            self.transport
                .run_command(device, program, args, self.command_timeout)
        })
        .await?;

        if !out.succeeded() {
            let stderr = if out.stderr.trim().is_empty() {
                last_lines(&out.stdout, 5)
            } else {
                out.stderr.trim().to_string()
            };
            return Err(TaskError::Execution {
                exit_code: out.exit_code,
                stderr,
            });
        }
        Ok(RawRunOutput::new(out.stdout, out.stderr, out.exit_code))
    }

    /// Deletes a pushed model. Failures are logged and otherwise ignored.
    pub async fn remove_model(&self, device: &DeviceHandle, remote_model: &str) {
        let args = ["-f".to_string(), remote_model.to_string()];
        match self
            .transport
            .run_command(device, "rm", &args, self.command_timeout)
            .await
        {
            Ok(out) if out.succeeded() => tracing::debug!("[{device}] removed {remote_model}"),
            Ok(out) => tracing::warn!(
                "[{device}] could not remove {remote_model} (exit {}): {}",
                out.exit_code,
                out.stderr.trim()
            ),
            Err(e) => tracing::warn!("[{device}] could not remove {remote_model}: {e}"),
        }
    }
}

/// Some binaries report fatal errors on stdout only.
fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_config::RunProfile;
    use device_bridge::mock::{Operation, Scripted, ScriptedTransport};
    use device_bridge::{BridgeError, CommandOutput};

    fn config(profile: RunProfile) -> BenchmarkConfig {
        BenchmarkConfig::new("models/mobilenet_v2.pt", &profile).unwrap()
    }

    fn bundled() -> RunProfile {
        RunProfile {
            use_bundled_input: Some(0),
            ..RunProfile::named("cpu-1t")
        }
    }

    fn invoker(transport: &Arc<ScriptedTransport>) -> BenchmarkInvoker {
        let dyn_transport: Arc<dyn DeviceTransport> = transport.clone();
        BenchmarkInvoker::new(dyn_transport, "/data/local/tmp", Duration::from_secs(60))
            .with_retry(RetryPolicy::new(3, Duration::from_millis(100)))
    }

    #[test]
    fn test_command_line_plain() {
        let c = config(bundled());
        let cmd = CommandLine::for_benchmark(
            "/data/local/tmp/speed_benchmark_torch",
            "/data/local/tmp/mobilenet_v2.pt",
            &c,
        );
        assert_eq!(cmd.program, "/data/local/tmp/speed_benchmark_torch");
        assert_eq!(cmd.args[0], "--model=/data/local/tmp/mobilenet_v2.pt");
        assert_eq!(cmd.args.len(), 10);
    }

    #[test]
    fn test_command_line_taskset() {
        let c = config(RunProfile {
            cpu_affinity: Some(vec![4, 5, 6, 7]),
            threads: 4,
            ..bundled()
        });
        let cmd = CommandLine::for_benchmark("/data/local/tmp/bench", "/data/local/tmp/m.pt", &c);
        assert_eq!(cmd.program, "taskset");
        assert_eq!(&cmd.args[..3], &["-a", "f0", "/data/local/tmp/bench"]);
        assert!(cmd.to_string().starts_with("taskset -a f0 /data/local/tmp/bench --model="));
    }

    #[test]
    fn test_command_line_is_deterministic() {
        let c = config(bundled());
        let a = CommandLine::for_benchmark("b", "m", &c).to_string();
        let b = CommandLine::for_benchmark("b", "m", &c.clone()).to_string();
        assert_eq!(a, b);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_captures_output() {
        let t = Arc::new(ScriptedTransport::new(&["R58M"]));
        t.script(
            Operation::Run,
            "speed_benchmark_torch",
            Scripted::Output(CommandOutput::success("Starting benchmark.\n")),
        );
        let raw = invoker(&t)
            .invoke(&DeviceHandle::new("R58M"), "/data/local/tmp/speed_benchmark_torch", &config(bundled()))
            .await
            .unwrap();
        assert_eq!(raw.stdout(), "Starting benchmark.\n");
        assert!(raw.succeeded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nonzero_exit_is_execution_error() {
        let t = Arc::new(ScriptedTransport::new(&["R58M"]));
        t.script(
            Operation::Run,
            "speed_benchmark_torch",
            Scripted::Output(CommandOutput::failure(1, "terminate called after throwing\n")),
        );
        let err = invoker(&t)
            .invoke(&DeviceHandle::new("R58M"), "/data/local/tmp/speed_benchmark_torch", &config(bundled()))
            .await
            .unwrap_err();
        match err {
            TaskError::Execution { exit_code, stderr } => {
                assert_eq!(exit_code, 1);
                assert_eq!(stderr, "terminate called after throwing");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(t.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_run_failure_is_retried() {
        let t = Arc::new(ScriptedTransport::new(&["R58M"]));
        t.script(
            Operation::Run,
            "speed_benchmark_torch",
            Scripted::Fail(BridgeError::DeviceUnavailable {
                serial: "R58M".into(),
                detail: "device offline".into(),
            }),
        );
        t.script(
            Operation::Run,
            "speed_benchmark_torch",
            Scripted::Output(CommandOutput::success("ok")),
        );
        let raw = invoker(&t)
            .invoke(&DeviceHandle::new("R58M"), "/data/local/tmp/speed_benchmark_torch", &config(bundled()))
            .await
            .unwrap();
        assert_eq!(raw.stdout(), "ok");
        assert_eq!(t.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_model_path() {
        let t = Arc::new(ScriptedTransport::new(&["R58M"]));
        let remote = invoker(&t)
            .push_model(&DeviceHandle::new("R58M"), &config(bundled()))
            .await
            .unwrap();
        assert_eq!(remote, "/data/local/tmp/mobilenet_v2.pt");
        let calls = t.calls();
        assert_eq!(calls[0].op, Operation::Push);
        assert_eq!(calls[0].detail, "models/mobilenet_v2.pt -> /data/local/tmp/mobilenet_v2.pt");
    }

    #[tokio::test(start_paused = true)]
    async fn test_provision_binary_chmods() {
        let t = Arc::new(ScriptedTransport::new(&["R58M"]));
        invoker(&t)
            .provision_binary(
                &DeviceHandle::new("R58M"),
                Path::new("build/speed_benchmark_torch"),
                "/data/local/tmp/speed_benchmark_torch",
            )
            .await
            .unwrap();
        let calls = t.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].detail, "chmod 755 /data/local/tmp/speed_benchmark_torch");
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_model_failure_is_ignored() {
        let t = Arc::new(ScriptedTransport::new(&["R58M"]));
        t.script(
            Operation::Run,
            "rm -f",
            Scripted::Output(CommandOutput::failure(1, "Read-only file system")),
        );
        invoker(&t)
            .remove_model(&DeviceHandle::new("R58M"), "/data/local/tmp/m.pt")
            .await;
        assert_eq!(t.calls()[0].detail, "rm -f /data/local/tmp/m.pt");
    }
}
