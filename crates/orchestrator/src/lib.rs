// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # orchestrator
//!
//! Runs a (model × profile) benchmark matrix on one or more Android
//! devices and collects the results.
//!
//! The orchestrator takes:
//! - A [`DeviceTransport`](device_bridge::DeviceTransport) from `device-bridge`.
//! - A list of [`BenchmarkConfig`](bench_config::BenchmarkConfig)s from `bench-config`.
//!
//! And, per task, pushes the model, invokes the benchmark binary, parses
//! the observations with `observer-parser`, and records a `RunResult`
//! from `result-aggregator`.
//!
//! # Task Pipeline
//! Each task moves through a type-state pipeline:
//! ```text
//! BenchTask<Pending> → BenchTask<Pushed> → BenchTask<Invoked> → BenchTask<Parsed> → RunResult
//! ```
//! Any transition may fail; the task then ends as a [`TaskFailure`] and
//! the run continues with the next task.
//!
//! # Concurrency
//! One worker per device processes that device's queue in order; devices
//! run in parallel. A single collector owns the result set.

mod error;
mod invoker;
mod report;
mod runner;
pub mod task;
mod worker;

pub use error::TaskError;
pub use invoker::{BenchmarkInvoker, CommandLine};
pub use report::{FailedTask, RunReport, SkippedTask};
pub use runner::{OrchestratorSettings, RunOrchestrator};
pub use task::{BenchTask, TaskFailure, TaskState};
pub use tokio_util::sync::CancellationToken;
pub use worker::TaskOutcome;
