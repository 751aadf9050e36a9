// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for configuration loading and validation.

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The session file could not be read.
    #[error("cannot read config '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    /// The session file is not valid TOML for [`crate::SessionConfig`].
    #[error("TOML parse error: {0}")]
    Parse(String),

    #[error("TOML serialise error: {0}")]
    Serialize(String),

    /// A listed model file or directory does not exist.
    #[error("model path not found: {0}")]
    ModelNotFound(String),

    /// A profile's flags are inconsistent.
    #[error("invalid profile '{profile}': {detail}")]
    InvalidProfile { profile: String, detail: String },

    /// Any other semantic problem with the configuration.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub(crate) fn profile(profile: &str, detail: impl Into<String>) -> Self {
        ConfigError::InvalidProfile {
            profile: profile.to_string(),
            detail: detail.into(),
        }
    }
}
