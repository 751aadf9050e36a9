// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

/// Captured text of one benchmark invocation.
///
/// Immutable once captured, so it can be parsed any number of times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRunOutput {
    stdout: String,
    stderr: String,
    exit_code: i32,
}

impl RawRunOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Wraps text read back from a file, e.g. a saved raw output.
    pub fn from_stdout(stdout: impl Into<String>) -> Self {
        Self::new(stdout, String::new(), 0)
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}
