// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Session configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! adb_path = "adb"
//! remote_dir = "/data/local/tmp"
//! remote_binary = "speed_benchmark_torch"
//! local_binary = "./build_android/bin/speed_benchmark_torch"
//! models = ["./models"]
//! devices = []
//! command_timeout_secs = 600
//! transfer_timeout_secs = 120
//! strict = false
//! raw_output_dir = "./raw"
//! results_dir = "./results"
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 500
//!
//! [[profiles]]
//! name = "default"
//! use_bundled_input = 0
//! ```

use crate::benchmark::model_stem;
use crate::{BenchmarkConfig, ConfigError, RunProfile};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File extensions picked up when a model directory is listed.
pub const MODEL_EXTENSIONS: &[&str] = &["pt", "ptl"];

/// Retry settings for transient device errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Everything needed to run a benchmark matrix.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionConfig {
    /// `adb` executable (bare names are looked up on `PATH`).
    #[serde(default = "default_adb_path")]
    pub adb_path: PathBuf,
    /// Device directory models (and the binary) are pushed to.
    #[serde(default = "default_remote_dir")]
    pub remote_dir: String,
    /// Benchmark binary name inside `remote_dir`.
    #[serde(default = "default_remote_binary")]
    pub remote_binary: String,
    /// Host copy of the binary. When set, it is pushed to each device once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_binary: Option<PathBuf>,
    /// Model files, or directories of `*.pt` / `*.ptl` files.
    #[serde(default)]
    pub models: Vec<PathBuf>,
    /// Device serials to use. Empty means every online device.
    #[serde(default)]
    pub devices: Vec<String>,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default = "default_transfer_timeout_secs")]
    pub transfer_timeout_secs: u64,
    /// Exit non-zero when any task fails.
    #[serde(default)]
    pub strict: bool,
    /// Where to save each task's raw benchmark output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output_dir: Option<PathBuf>,
    /// Where to write one JSON summary per recorded task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_dir: Option<PathBuf>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default = "default_profiles")]
    pub profiles: Vec<RunProfile>,
}

fn default_adb_path() -> PathBuf {
    PathBuf::from("adb")
}

fn default_remote_dir() -> String {
    "/data/local/tmp".to_string()
}

fn default_remote_binary() -> String {
    "speed_benchmark_torch".to_string()
}

fn default_command_timeout_secs() -> u64 {
    600
}

fn default_transfer_timeout_secs() -> u64 {
    120
}

fn default_profiles() -> Vec<RunProfile> {
    vec![RunProfile {
        use_bundled_input: Some(0),
        ..RunProfile::named("default")
    }]
}

impl SessionConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }

    /// Device path of the benchmark binary.
    pub fn remote_binary_path(&self) -> String {
        format!("{}/{}", self.remote_dir.trim_end_matches('/'), self.remote_binary)
    }

    /// Checks settings that do not touch the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profiles.is_empty() {
            return Err(ConfigError::Invalid("at least one profile is required".into()));
        }
        let mut seen = HashMap::new();
        for profile in &self.profiles {
            profile.validate()?;
            if seen.insert(profile.name.as_str(), ()).is_some() {
                return Err(ConfigError::Invalid(format!(
                    "duplicate profile name '{}'",
                    profile.name
                )));
            }
        }
        if self.command_timeout_secs == 0 {
            return Err(ConfigError::Invalid("command_timeout_secs must be positive".into()));
        }
        if self.transfer_timeout_secs == 0 {
            return Err(ConfigError::Invalid("transfer_timeout_secs must be positive".into()));
        }
        if self.remote_dir.trim().is_empty() || self.remote_binary.trim().is_empty() {
            return Err(ConfigError::Invalid("remote_dir and remote_binary must be set".into()));
        }
        Ok(())
    }

    /// Expands `models` into a sorted, de-duplicated list of model files.
    pub fn discover_models(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let mut found = Vec::new();
        for entry in &self.models {
            if entry.is_dir() {
                let mut in_dir = list_model_files(entry)?;
                if in_dir.is_empty() {
                    tracing::warn!("no model files in {}", entry.display());
                }
                found.append(&mut in_dir);
            } else if entry.is_file() {
                found.push(entry.clone());
            } else {
                return Err(ConfigError::ModelNotFound(entry.display().to_string()));
            }
        }
        found.sort();
        found.dedup();
        Ok(found)
    }

    /// Builds the task matrix: every model crossed with every profile,
    /// model-major.
    pub fn benchmark_matrix(&self) -> Result<Vec<BenchmarkConfig>, ConfigError> {
        self.validate()?;
        let models = self.discover_models()?;
        if models.is_empty() {
            return Err(ConfigError::Invalid("no models to benchmark".into()));
        }

        let mut owners: HashMap<String, &Path> = HashMap::new();
        for model in &models {
            let stem = model_stem(model).unwrap_or_default();
            if let Some(other) = owners.insert(stem.clone(), model) {
                return Err(ConfigError::Invalid(format!(
                    "model id '{stem}' is shared by {} and {}",
                    other.display(),
                    model.display()
                )));
            }
        }

        let mut matrix = Vec::with_capacity(models.len() * self.profiles.len());
        for model in &models {
            for profile in &self.profiles {
                matrix.push(BenchmarkConfig::new(model.clone(), profile)?);
            }
        }
        tracing::info!(
            "benchmark matrix: {} models x {} profiles = {} tasks",
            models.len(),
            self.profiles.len(),
            matrix.len()
        );
        Ok(matrix)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb_path(),
            remote_dir: default_remote_dir(),
            remote_binary: default_remote_binary(),
            local_binary: None,
            models: Vec::new(),
            devices: Vec::new(),
            command_timeout_secs: default_command_timeout_secs(),
            transfer_timeout_secs: default_transfer_timeout_secs(),
            strict: false,
            raw_output_dir: None,
            results_dir: None,
            retry: RetryConfig::default(),
            profiles: default_profiles(),
        }
    }
}

fn list_model_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::Read {
        path: dir.display().to_string(),
        source: e,
    })?;
    Ok(entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| MODEL_EXTENSIONS.contains(&ext))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Creates a fresh directory under the system temp dir.
    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("droid_bench_test")
            .join(format!("{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default() {
        let c = SessionConfig::default();
        assert_eq!(c.remote_dir, "/data/local/tmp");
        assert_eq!(c.remote_binary_path(), "/data/local/tmp/speed_benchmark_torch");
        assert_eq!(c.retry.max_attempts, 3);
        assert_eq!(c.profiles.len(), 1);
        assert!(!c.strict);
        c.validate().unwrap();
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
adb_path = "/opt/platform-tools/adb"
models = ["/tmp/models"]
devices = ["emulator-5554"]
command_timeout_secs = 30
strict = true

[retry]
max_attempts = 5

[[profiles]]
name = "cpu-1t"
use_bundled_input = 0

[[profiles]]
name = "cpu-4t"
threads = 4
iter = 20
cpu_affinity = [4, 5, 6, 7]
input_dims = [[1, 3, 224, 224]]
"#;
        let c = SessionConfig::from_toml(toml).unwrap();
        assert_eq!(c.adb_path, PathBuf::from("/opt/platform-tools/adb"));
        assert_eq!(c.devices, vec!["emulator-5554"]);
        assert_eq!(c.command_timeout(), Duration::from_secs(30));
        assert!(c.strict);
        assert_eq!(c.retry.max_attempts, 5);
        assert_eq!(c.retry.base_delay_ms, 500);
        assert_eq!(c.profiles.len(), 2);
        assert_eq!(c.profiles[1].threads, 4);
        assert_eq!(c.profiles[1].cpu_affinity, Some(vec![4, 5, 6, 7]));
        c.validate().unwrap();
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = SessionConfig {
            raw_output_dir: Some(PathBuf::from("./raw")),
            ..Default::default()
        };
        let toml = c.to_toml().unwrap();
        let back = SessionConfig::from_toml(&toml).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            SessionConfig::from_toml("models = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_duplicate_profiles_rejected() {
        let c = SessionConfig {
            profiles: vec![
                RunProfile {
                    use_bundled_input: Some(0),
                    ..RunProfile::named("same")
                },
                RunProfile {
                    use_bundled_input: Some(1),
                    ..RunProfile::named("same")
                },
            ],
            ..Default::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let c = SessionConfig {
            transfer_timeout_secs: 0,
            ..Default::default()
        };
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("transfer_timeout_secs"));

        let c = SessionConfig {
            command_timeout_secs: 0,
            ..Default::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_discover_models_in_directory() {
        let dir = temp_dir("discover");
        for name in ["b.pt", "a.ptl", "notes.txt"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
        let c = SessionConfig {
            models: vec![dir.clone(), dir.join("b.pt")],
            ..Default::default()
        };
        let models = c.discover_models().unwrap();
        assert_eq!(models, vec![dir.join("a.ptl"), dir.join("b.pt")]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_model_path() {
        let c = SessionConfig {
            models: vec![PathBuf::from("/nonexistent/model.pt")],
            ..Default::default()
        };
        assert!(matches!(c.discover_models(), Err(ConfigError::ModelNotFound(_))));
    }

    #[test]
    fn test_benchmark_matrix_is_model_major() {
        let dir = temp_dir("matrix");
        for name in ["mobilenet.pt", "resnet.pt"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
        let c = SessionConfig {
            models: vec![dir.clone()],
            profiles: vec![
                RunProfile {
                    use_bundled_input: Some(0),
                    ..RunProfile::named("p1")
                },
                RunProfile {
                    use_bundled_input: Some(0),
                    threads: 2,
                    ..RunProfile::named("p2")
                },
            ],
            ..Default::default()
        };
        let matrix = c.benchmark_matrix().unwrap();
        let labels: Vec<String> = matrix.iter().map(|m| m.to_string()).collect();
        assert_eq!(labels, vec!["mobilenet/p1", "mobilenet/p2", "resnet/p1", "resnet/p2"]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_benchmark_matrix_rejects_duplicate_model_ids() {
        let dir = temp_dir("dupes");
        std::fs::create_dir_all(dir.join("x")).unwrap();
        std::fs::write(dir.join("m.pt"), b"x").unwrap();
        std::fs::write(dir.join("x").join("m.ptl"), b"x").unwrap();
        let c = SessionConfig {
            models: vec![dir.join("m.pt"), dir.join("x")],
            ..Default::default()
        };
        assert!(matches!(c.benchmark_matrix(), Err(ConfigError::Invalid(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
