// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! One benchmark run's configuration and its remote command-line rendering.
//!
//! The remote binary receives `--flag=value` arguments in this order:
//!
//! ```text
//! --model  --use_bundled_input | --input_dims  --input_type  --warmup  --iter
//! --report_pep  --caffe2_threadpool_android_cap  --use_caching_allocator
//! --caffe2_threadpool_force_inline  --vulkan
//! ```
//!
//! Multi-input lists are `;`-separated. The arguments pass through the
//! device's shell, so the separator is escaped as `\;`.

use crate::profile::MAX_CPU_INDEX;
use crate::{ConfigError, InputSelection, RunProfile};
use std::fmt;
use std::path::{Path, PathBuf};

/// Separator between inputs, escaped for the remote shell.
const INPUT_SEPARATOR: &str = r"\;";

/// A set of cores the benchmark is pinned to.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct CpuAffinity(Vec<u32>);

impl CpuAffinity {
    /// Creates an affinity set; indices above 63 are rejected.
    pub fn new(cores: Vec<u32>) -> Result<Self, ConfigError> {
        if cores.is_empty() {
            return Err(ConfigError::Invalid("cpu affinity must not be empty".into()));
        }
        if let Some(bad) = cores.iter().find(|&&c| c > MAX_CPU_INDEX) {
            return Err(ConfigError::Invalid(format!(
                "cpu index {bad} exceeds {MAX_CPU_INDEX}"
            )));
        }
        Ok(Self(cores))
    }

    pub fn cores(&self) -> &[u32] {
        &self.0
    }

    /// Bit mask with bit `i` set for every pinned core `i`.
    pub fn mask(&self) -> u64 {
        self.0.iter().fold(0u64, |mask, &core| mask | (1u64 << core))
    }

    /// Arguments that prefix the benchmark command: `taskset -a <hexmask>`.
    pub fn taskset_args(&self) -> [String; 2] {
        ["-a".to_string(), format!("{:x}", self.mask())]
    }
}

/// Immutable description of one benchmark run: a model and a profile.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BenchmarkConfig {
    /// Model identifier (the model file's stem).
    pub model_id: String,
    /// Model file on the host.
    pub model_path: PathBuf,
    /// Profile identifier.
    pub profile: String,
    pub input: InputSelection,
    pub input_type: Vec<String>,
    pub warmup: u32,
    pub iter: u32,
    pub threads: u32,
    pub report_pep: bool,
    pub use_caching_allocator: bool,
    pub force_inline: bool,
    pub vulkan: bool,
    pub cpu_affinity: Option<CpuAffinity>,
}

impl BenchmarkConfig {
    /// Binds `profile` to the model at `model_path`.
    pub fn new(model_path: impl Into<PathBuf>, profile: &RunProfile) -> Result<Self, ConfigError> {
        profile.validate()?;

        let model_path = model_path.into();
        let model_id = model_stem(&model_path).ok_or_else(|| {
            ConfigError::Invalid(format!("model path '{}' has no file name", model_path.display()))
        })?;
        if let Some(name) = model_path.file_name() {
            let name = name.to_string_lossy();
            if !is_shell_safe(&name) {
                return Err(ConfigError::Invalid(format!(
                    "model file name '{name}' must only use letters, digits, '.', '_', '-' or '+'"
                )));
            }
        }

        let cpu_affinity = profile
            .cpu_affinity
            .clone()
            .map(CpuAffinity::new)
            .transpose()?;
        if let Some(affinity) = &cpu_affinity {
            if (affinity.cores().len() as u32) < profile.threads {
                tracing::warn!(
                    "profile '{}': {} threads pinned to {} cores; results may be skewed",
                    profile.name,
                    profile.threads,
                    affinity.cores().len(),
                );
            }
        }

        Ok(Self {
            model_id,
            model_path,
            profile: profile.name.clone(),
            input: profile.input_selection()?,
            input_type: profile.input_type.clone(),
            warmup: profile.warmup,
            iter: profile.iter,
            threads: profile.threads,
            report_pep: profile.report_pep,
            use_caching_allocator: profile.use_caching_allocator,
            force_inline: profile.force_inline,
            vulkan: profile.vulkan,
            cpu_affinity,
        })
    }

    /// File name of the model, as it will be named on the device.
    pub fn model_file_name(&self) -> String {
        self.model_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.model_id.clone())
    }

    /// Device path the model is pushed to.
    pub fn remote_model_path(&self, remote_dir: &str) -> String {
        format!("{}/{}", remote_dir.trim_end_matches('/'), self.model_file_name())
    }

    /// Renders the binary's arguments in their fixed order.
    pub fn binary_args(&self, remote_model: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(11);
        args.push(format!("--model={remote_model}"));
        match &self.input {
            InputSelection::Bundled(index) => args.push(format!("--use_bundled_input={index}")),
            InputSelection::Dims(dims) => {
                let rendered: Vec<String> = dims
                    .iter()
                    .map(|shape| {
                        shape
                            .iter()
                            .map(|d| d.to_string())
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .collect();
                args.push(format!("--input_dims={}", rendered.join(INPUT_SEPARATOR)));
            }
        }
        args.push(format!("--input_type={}", self.input_type.join(INPUT_SEPARATOR)));
        args.push(format!("--warmup={}", self.warmup));
        args.push(format!("--iter={}", self.iter));
        args.push(format!("--report_pep={}", self.report_pep));
        args.push(format!("--caffe2_threadpool_android_cap={}", self.threads));
        args.push(format!("--use_caching_allocator={}", self.use_caching_allocator));
        args.push(format!("--caffe2_threadpool_force_inline={}", self.force_inline));
        args.push(format!("--vulkan={}", self.vulkan));
        args
    }
}

impl fmt::Display for BenchmarkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.model_id, self.profile)
    }
}

/// The remote shell splits words, so device paths carry no quoting.
fn is_shell_safe(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+'))
}

pub(crate) fn model_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
}
