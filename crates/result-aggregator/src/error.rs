// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for result aggregation and export.

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    /// Records of one run report different units.
    #[error("record {ordinal} is in '{found}', earlier records are in '{expected}'")]
    MixedUnits {
        expected: String,
        found: String,
        ordinal: usize,
    },

    /// Record ordinals do not count up from zero.
    #[error("record ordinals out of sequence: expected {expected}, found {found}")]
    OutOfSequence { expected: usize, found: usize },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}
