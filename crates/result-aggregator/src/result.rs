// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use crate::{summarize, AggregateError, ResultKey, Summary};
use bench_config::BenchmarkConfig;
use observer_parser::MeasurementRecord;

/// The records of one invocation, bound to its configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    config: BenchmarkConfig,
    device: String,
    records: Vec<MeasurementRecord>,
}

impl RunResult {
    /// Validates and wraps the records of one run.
    ///
    /// Fails when ordinals do not count up from zero or when the records
    /// mix units.
    pub fn new(
        config: BenchmarkConfig,
        device: impl Into<String>,
        records: Vec<MeasurementRecord>,
    ) -> Result<Self, AggregateError> {
        for (expected, record) in records.iter().enumerate() {
            if record.ordinal != expected {
                return Err(AggregateError::OutOfSequence {
                    expected,
                    found: record.ordinal,
                });
            }
        }
        if let Some(first) = records.first() {
            if let Some(odd) = records.iter().find(|r| r.unit != first.unit) {
                return Err(AggregateError::MixedUnits {
                    expected: first.unit.clone(),
                    found: odd.unit.clone(),
                    ordinal: odd.ordinal,
                });
            }
        }
        Ok(Self {
            config,
            device: device.into(),
            records,
        })
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Serial of the device that produced the records.
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    /// Recomputed from the records on every call.
    pub fn summary(&self) -> Summary {
        summarize(&self.records)
    }

    pub fn key(&self) -> ResultKey {
        ResultKey::for_config(&self.config)
    }
}
