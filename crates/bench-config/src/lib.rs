// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # bench-config
//!
//! Typed configuration for on-device PyTorch speed benchmarks.
//!
//! - [`RunProfile`] — a named set of benchmark flags (warmup, iterations,
//!   threads, input selection, CPU affinity, ...), as written in a session
//!   file.
//! - [`BenchmarkConfig`] — one immutable (model, profile) pair, the unit a
//!   task runs. It renders the remote binary's arguments in a fixed order
//!   so that invocations are reproducible and diffable.
//! - [`SessionConfig`] — the TOML session file: bridge settings, model
//!   list, devices, timeouts, retry policy, and profiles. It expands into
//!   the benchmark matrix.
//!
//! # Example
//! ```
//! use bench_config::{BenchmarkConfig, RunProfile};
//!
//! let profile = RunProfile {
//!     use_bundled_input: Some(0),
//!     ..RunProfile::named("cpu-1t")
//! };
//! let config = BenchmarkConfig::new("models/mobilenet_v2.pt", &profile).unwrap();
//! let args = config.binary_args("/data/local/tmp/mobilenet_v2.pt");
//! assert_eq!(args[0], "--model=/data/local/tmp/mobilenet_v2.pt");
//! assert_eq!(args[1], "--use_bundled_input=0");
//! ```

mod benchmark;
mod error;
mod profile;
mod session;

pub use benchmark::{BenchmarkConfig, CpuAffinity};
pub use error::ConfigError;
pub use profile::{InputSelection, RunProfile};
pub use session::{RetryConfig, SessionConfig, MODEL_EXTENSIONS};
