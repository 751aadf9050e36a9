// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

/// One parsed observation.
///
/// `ordinal` counts observations within a run: it starts at 0 and
/// increases by one per record.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeasurementRecord {
    /// Observation type as reported by the binary (`NET`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    pub metric: String,
    pub unit: String,
    pub value: f64,
    pub ordinal: usize,
}
