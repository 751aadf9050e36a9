// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for observation parsing.

/// A recognised observation line that could not be turned into a record.
///
/// Every variant carries the 1-based line number and the offending line.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line_no}: malformed observation ({detail}): {line}")]
    Malformed {
        line_no: usize,
        line: String,
        detail: String,
    },

    #[error("line {line_no}: observation has no '{field}' field: {line}")]
    MissingField {
        line_no: usize,
        line: String,
        field: &'static str,
    },

    #[error("line {line_no}: value '{value}' is not a finite number: {line}")]
    InvalidValue {
        line_no: usize,
        line: String,
        value: String,
    },
}

impl ParseError {
    /// 1-based line number within the captured stdout.
    pub fn line_no(&self) -> usize {
        match self {
            ParseError::Malformed { line_no, .. }
            | ParseError::MissingField { line_no, .. }
            | ParseError::InvalidValue { line_no, .. } => *line_no,
        }
    }

    /// The offending line, without its line terminator.
    pub fn line(&self) -> &str {
        match self {
            ParseError::Malformed { line, .. }
            | ParseError::MissingField { line, .. }
            | ParseError::InvalidValue { line, .. } => line,
        }
    }
}
