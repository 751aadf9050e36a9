// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # device-bridge
//!
//! Host-side access to Android devices through the debug bridge (`adb`).
//!
//! The crate exposes the four capabilities the benchmark orchestrator
//! needs from a device, behind the [`DeviceTransport`] trait:
//!
//! - **list** — enumerate attached devices and their states.
//! - **push / pull** — copy files to and from the device filesystem.
//! - **run** — execute a remote command and capture stdout, stderr, and
//!   the exit code, bounded by a host-enforced timeout.
//!
//! # No Cached Device State
//! Every operation re-checks that the target device is reachable before
//! touching it. A device that dropped off the bus between two calls is
//! reported as [`BridgeError::DeviceUnavailable`] instead of producing a
//! confusing command failure.
//!
//! # Retries
//! [`retry_transient`] re-runs an operation under a [`RetryPolicy`] when
//! its error is transient (see [`Transient`]). The backoff sleeps on the
//! tokio clock, so tests can drive it with a paused clock.
//!
//! # Example
//! ```no_run
//! use device_bridge::{AdbTransport, DeviceTransport};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), device_bridge::BridgeError> {
//! let adb = AdbTransport::new("adb");
//! let device = adb.resolve(None).await?;
//! let out = adb
//!     .run_command(&device, "getprop", &["ro.product.model".into()], Duration::from_secs(10))
//!     .await?;
//! println!("{}: {}", device, out.stdout.trim());
//! # Ok(())
//! # }
//! ```

mod adb;
mod error;
mod handle;
pub mod mock;
mod retry;
mod transport;

pub use adb::AdbTransport;
pub use error::BridgeError;
pub use handle::{parse_device_list, DeviceEntry, DeviceHandle, DeviceState};
pub use retry::{retry_transient, RetryPolicy, Transient};
pub use transport::{CommandOutput, DeviceTransport};
