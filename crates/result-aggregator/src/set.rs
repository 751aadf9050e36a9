// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Keyed collection of run results and its JSON export.

use crate::{AggregateError, RunResult, Summary};
use bench_config::BenchmarkConfig;
use observer_parser::MeasurementRecord;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// (model identifier, profile identifier).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct ResultKey {
    pub model: String,
    pub profile: String,
}

impl ResultKey {
    pub fn new(model: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            profile: profile.into(),
        }
    }

    pub fn for_config(config: &BenchmarkConfig) -> Self {
        Self::new(&config.model_id, &config.profile)
    }

    /// File name stem used for per-task output files.
    pub fn file_stem(&self) -> String {
        format!("{}__{}", self.model, self.profile)
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.model, self.profile)
    }
}

/// Per-task result file contents.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TaskFile {
    pub unit: Option<String>,
    pub avg: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub count: usize,
    pub iters_per_second: Option<f64>,
}

impl From<Summary> for TaskFile {
    fn from(s: Summary) -> Self {
        Self {
            unit: s.unit,
            avg: s.mean,
            std: s.std_dev,
            min: s.min,
            max: s.max,
            count: s.count,
            iters_per_second: s.iters_per_second,
        }
    }
}

#[derive(serde::Serialize)]
struct ExportedResult<'a> {
    model: &'a str,
    profile: &'a str,
    device: &'a str,
    config: &'a BenchmarkConfig,
    summary: Summary,
    records: &'a [MeasurementRecord],
}

/// One result per (model, profile). Re-recording a key replaces the
/// previous result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    results: HashMap<ResultKey, RunResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `result` under `key`, returning the result it replaced.
    pub fn merge(&mut self, key: ResultKey, result: RunResult) -> Option<RunResult> {
        let previous = self.results.insert(key, result);
        if let Some(prev) = &previous {
            tracing::debug!("replaced result for {}", prev.key());
        }
        previous
    }

    pub fn get(&self, key: &ResultKey) -> Option<&RunResult> {
        self.results.get(key)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results ordered by key.
    pub fn sorted(&self) -> Vec<(&ResultKey, &RunResult)> {
        let mut entries: Vec<_> = self.results.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// JSON array of every result, ordered by key.
    pub fn to_json(&self) -> Result<serde_json::Value, AggregateError> {
        let exported: Vec<ExportedResult<'_>> = self
            .sorted()
            .into_iter()
            .map(|(key, result)| ExportedResult {
                model: &key.model,
                profile: &key.profile,
                device: result.device(),
                config: result.config(),
                summary: result.summary(),
                records: result.records(),
            })
            .collect();
        Ok(serde_json::to_value(exported)?)
    }

    /// Writes `<model>__<profile>.json` for every result into `dir`.
    pub fn write_task_files(&self, dir: &Path) -> Result<Vec<PathBuf>, AggregateError> {
        std::fs::create_dir_all(dir).map_err(|e| AggregateError::Write {
            path: dir.display().to_string(),
            source: e,
        })?;

        let mut written = Vec::with_capacity(self.results.len());
        for (key, result) in self.sorted() {
            let path = dir.join(format!("{}.json", key.file_stem()));
            let body = serde_json::to_string_pretty(&TaskFile::from(result.summary()))?;
            std::fs::write(&path, body).map_err(|e| AggregateError::Write {
                path: path.display().to_string(),
                source: e,
            })?;
            written.push(path);
        }
        tracing::info!("wrote {} result files to {}", written.len(), dir.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_config::RunProfile;

    fn result(model: &str, profile: &str, values: &[f64]) -> RunResult {
        let p = RunProfile {
            use_bundled_input: Some(0),
            ..RunProfile::named(profile)
        };
        let config = BenchmarkConfig::new(format!("models/{model}.pt"), &p).unwrap();
        let records = values
            .iter()
            .enumerate()
            .map(|(i, &value)| MeasurementRecord {
                kind: "NET".into(),
                metric: "latency".into(),
                unit: "us".into(),
                value,
                ordinal: i,
            })
            .collect();
        RunResult::new(config, "emulator-5554", records).unwrap()
    }

    #[test]
    fn test_merge_idempotent() {
        let r = result("resnet", "cpu-1t", &[10.0, 20.0]);
        let mut set = ResultSet::new();
        set.merge(r.key(), r.clone());
        let once = set.clone();
        let replaced = set.merge(r.key(), r.clone());
        assert_eq!(replaced, Some(r));
        assert_eq!(set, once);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_merge_overwrites() {
        let mut set = ResultSet::new();
        let first = result("resnet", "cpu-1t", &[10.0]);
        let second = result("resnet", "cpu-1t", &[30.0]);
        set.merge(first.key(), first);
        set.merge(second.key(), second);
        assert_eq!(set.len(), 1);
        let key = ResultKey::new("resnet", "cpu-1t");
        assert_eq!(set.get(&key).unwrap().summary().mean, Some(30.0));
    }

    #[test]
    fn test_sorted_and_json() {
        let mut set = ResultSet::new();
        for (m, p) in [("b", "x"), ("a", "y"), ("a", "x")] {
            let r = result(m, p, &[100.0]);
            set.merge(r.key(), r);
        }
        let keys: Vec<String> = set.sorted().iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["a/x", "a/y", "b/x"]);

        let json = set.to_json().unwrap();
        assert_eq!(json[0]["model"], "a");
        assert_eq!(json[0]["summary"]["mean"], 100.0);
        assert_eq!(json[0]["records"][0]["type"], "NET");
        assert_eq!(json[2]["device"], "emulator-5554");
    }

    #[test]
    fn test_write_task_files() {
        let dir = std::env::temp_dir()
            .join("droid_bench_test")
            .join(format!("task-files-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let mut set = ResultSet::new();
        let r = result("mobilenet_v2", "cpu-1t", &[100.0, 300.0]);
        set.merge(r.key(), r);
        let empty = result("squeezenet", "cpu-1t", &[]);
        set.merge(empty.key(), empty);

        let written = set.write_task_files(&dir).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0], dir.join("mobilenet_v2__cpu-1t.json"));

        let body: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written[0]).unwrap()).unwrap();
        assert_eq!(body["unit"], "us");
        assert_eq!(body["avg"], 200.0);
        assert_eq!(body["std"], 100.0);

        let body: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written[1]).unwrap()).unwrap();
        assert!(body["avg"].is_null());
        assert_eq!(body["count"], 0);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
