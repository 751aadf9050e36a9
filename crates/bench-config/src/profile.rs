// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Named benchmark profiles.
//!
//! # TOML Format
//! ```toml
//! [[profiles]]
//! name = "cpu-4t"
//! warmup = 10
//! iter = 50
//! threads = 4
//! cpu_affinity = [4, 5, 6, 7]
//! input_dims = [[1, 3, 224, 224]]
//! input_type = ["float"]
//! ```

use crate::ConfigError;

const DEFAULT_WARMUP: u32 = 5;
const DEFAULT_ITER: u32 = 5;
const DEFAULT_THREADS: u32 = 1;

/// Highest core index a CPU affinity mask can express.
pub(crate) const MAX_CPU_INDEX: u32 = 63;

/// A named set of flags for the remote benchmark binary.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RunProfile {
    /// Profile identifier; the configuration half of a result key.
    pub name: String,
    /// Untimed iterations before measurement.
    #[serde(default = "default_warmup")]
    pub warmup: u32,
    /// Measured iterations.
    #[serde(default = "default_iter")]
    pub iter: u32,
    /// Thread-pool cap passed as `--caffe2_threadpool_android_cap`.
    #[serde(default = "default_threads")]
    pub threads: u32,
    /// Emit per-iteration observation lines.
    #[serde(default = "default_true")]
    pub report_pep: bool,
    #[serde(default = "default_true")]
    pub use_caching_allocator: bool,
    #[serde(default)]
    pub force_inline: bool,
    #[serde(default)]
    pub vulkan: bool,
    /// Index of an input bundled with the model. Takes precedence over
    /// `input_dims`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_bundled_input: Option<u32>,
    /// Explicit input shapes, one list of dimensions per model input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_dims: Option<Vec<Vec<u64>>>,
    /// Input element types, one per model input.
    #[serde(default = "default_input_type")]
    pub input_type: Vec<String>,
    /// Cores to pin the benchmark to (0-based). Runs under `taskset`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_affinity: Option<Vec<u32>>,
}

fn default_warmup() -> u32 {
    DEFAULT_WARMUP
}

fn default_iter() -> u32 {
    DEFAULT_ITER
}

fn default_threads() -> u32 {
    DEFAULT_THREADS
}

fn default_true() -> bool {
    true
}

fn default_input_type() -> Vec<String> {
    vec!["float".to_string()]
}

/// How the benchmark obtains its model inputs.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSelection {
    /// Use the input bundled with the model at this index.
    Bundled(u32),
    /// Synthesise inputs of these shapes.
    Dims(Vec<Vec<u64>>),
}

impl RunProfile {
    /// Creates a profile with default flags and no input selection.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            warmup: DEFAULT_WARMUP,
            iter: DEFAULT_ITER,
            threads: DEFAULT_THREADS,
            report_pep: true,
            use_caching_allocator: true,
            force_inline: false,
            vulkan: false,
            use_bundled_input: None,
            input_dims: None,
            input_type: default_input_type(),
            cpu_affinity: None,
        }
    }

    /// Resolves the input selection.
    ///
    /// A bundled input wins when both are given. Explicit dimensions need
    /// one `input_type` entry per input.
    pub fn input_selection(&self) -> Result<InputSelection, ConfigError> {
        if let Some(index) = self.use_bundled_input {
            if self.input_dims.is_some() {
                tracing::debug!(
                    "profile '{}': use_bundled_input set, ignoring input_dims",
                    self.name
                );
            }
            return Ok(InputSelection::Bundled(index));
        }

        match &self.input_dims {
            Some(dims) => {
                if dims.is_empty() || dims.iter().any(|d| d.is_empty()) {
                    return Err(ConfigError::profile(&self.name, "input_dims contains an empty shape"));
                }
                if dims.len() != self.input_type.len() {
                    return Err(ConfigError::profile(
                        &self.name,
                        format!(
                            "{} input shapes but {} input types",
                            dims.len(),
                            self.input_type.len()
                        ),
                    ));
                }
                Ok(InputSelection::Dims(dims.clone()))
            }
            None => Err(ConfigError::profile(
                &self.name,
                "either use_bundled_input or input_dims must be specified",
            )),
        }
    }

    /// Checks the profile's flags without binding it to a model.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("profile name must not be empty".into()));
        }
        if self.iter == 0 {
            return Err(ConfigError::profile(&self.name, "iter must be at least 1"));
        }
        if self.threads == 0 {
            return Err(ConfigError::profile(&self.name, "threads must be at least 1"));
        }
        if self.input_type.is_empty() || self.input_type.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::profile(&self.name, "input_type must list at least one type"));
        }
        if let Some(cores) = &self.cpu_affinity {
            if cores.is_empty() {
                return Err(ConfigError::profile(&self.name, "cpu_affinity must not be empty"));
            }
            if let Some(bad) = cores.iter().find(|&&c| c > MAX_CPU_INDEX) {
                return Err(ConfigError::profile(
                    &self.name,
                    format!("cpu index {bad} exceeds {MAX_CPU_INDEX}"),
                ));
            }
        }
        self.input_selection().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_defaults() {
        let p = RunProfile::named("default");
        assert_eq!(p.warmup, 5);
        assert_eq!(p.iter, 5);
        assert_eq!(p.threads, 1);
        assert!(p.report_pep);
        assert!(p.use_caching_allocator);
        assert!(!p.vulkan);
        assert_eq!(p.input_type, vec!["float"]);
    }

    #[test]
    fn test_bundled_input_wins() {
        let p = RunProfile {
            use_bundled_input: Some(2),
            input_dims: Some(vec![vec![1, 3, 224, 224]]),
            ..RunProfile::named("p")
        };
        assert_eq!(p.input_selection().unwrap(), InputSelection::Bundled(2));
    }

    #[test]
    fn test_explicit_dims() {
        let p = RunProfile {
            input_dims: Some(vec![vec![1, 3, 224, 224], vec![1, 10]]),
            input_type: vec!["float".into(), "int64".into()],
            ..RunProfile::named("p")
        };
        assert!(matches!(p.input_selection().unwrap(), InputSelection::Dims(d) if d.len() == 2));
    }

    #[test]
    fn test_missing_input_selection() {
        let p = RunProfile::named("p");
        let err = p.input_selection().unwrap_err();
        assert!(err.to_string().contains("use_bundled_input or input_dims"));
    }

    #[test]
    fn test_dims_type_count_mismatch() {
        let p = RunProfile {
            input_dims: Some(vec![vec![1, 3], vec![1, 10]]),
            ..RunProfile::named("p")
        };
        assert!(p.input_selection().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_iter_and_bad_affinity() {
        let p = RunProfile {
            iter: 0,
            use_bundled_input: Some(0),
            ..RunProfile::named("p")
        };
        assert!(p.validate().is_err());

        let p = RunProfile {
            cpu_affinity: Some(vec![0, 64]),
            use_bundled_input: Some(0),
            ..RunProfile::named("p")
        };
        assert!(p.validate().is_err());

        let p = RunProfile {
            cpu_affinity: Some(vec![4, 5]),
            use_bundled_input: Some(0),
            ..RunProfile::named("p")
        };
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let p: RunProfile = toml::from_str("name = \"q\"\nuse_bundled_input = 0\n").unwrap();
        assert_eq!(p.warmup, 5);
        assert_eq!(p.input_type, vec!["float"]);
        assert_eq!(p.use_bundled_input, Some(0));
        assert!(p.cpu_affinity.is_none());
    }
}
