// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A scripted in-memory [`DeviceTransport`] for tests and dry runs.
//!
//! Responses are matched by operation, optional device serial, and a
//! substring of the call's description:
//!
//! - run: `"<program> <arg> <arg>..."`
//! - push: `"<local> -> <remote>"`
//! - pull: `"<remote> -> <local>"`
//!
//! Resolving a serial is logged as a [`Operation::Resolve`] call and
//! answers from the current device states.
//!
//! Each rule holds a queue of responses. Responses are consumed front to
//! back and the last one repeats. Calls with no matching rule succeed with
//! empty output. Every call is logged and per-device concurrency is
//! tracked, so tests can assert ordering and single-tenancy.

use crate::{BridgeError, CommandOutput, DeviceEntry, DeviceHandle, DeviceState, DeviceTransport};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Kind of transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Push,
    Pull,
    Run,
    Resolve,
}

/// What a scripted call does.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Return this output (for push/pull: succeed; pull writes `stdout` to
    /// the local file).
    Output(CommandOutput),
    /// Fail with this error.
    Fail(BridgeError),
    /// Never answer: the call sleeps for its whole timeout, then fails with
    /// [`BridgeError::Timeout`].
    Hang,
    /// Panic inside the call, as a buggy transport would.
    Panic(String),
}

/// A recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportCall {
    pub device: String,
    pub op: Operation,
    pub detail: String,
}

#[derive(Debug)]
struct Rule {
    op: Operation,
    device: Option<String>,
    pattern: String,
    responses: VecDeque<Scripted>,
}

#[derive(Debug, Default)]
struct ScriptState {
    devices: Vec<DeviceEntry>,
    rules: Vec<Rule>,
    calls: Vec<TransportCall>,
    in_flight: HashMap<String, usize>,
    max_in_flight: HashMap<String, usize>,
}

/// In-memory transport driven by scripted responses.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    state: Mutex<ScriptState>,
    latency: Duration,
}

impl ScriptedTransport {
    /// Creates a transport with the given online devices.
    pub fn new(serials: &[&str]) -> Self {
        let transport = Self::default();
        transport.lock().devices = serials
            .iter()
            .map(|s| DeviceEntry::new(*s, DeviceState::Device))
            .collect();
        transport
    }

    /// Adds a simulated delay (on the tokio clock) to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Adds a response for calls of `op` whose description contains
    /// `pattern`, on any device.
    pub fn script(&self, op: Operation, pattern: &str, response: Scripted) {
        self.push_rule(op, None, pattern, response);
    }

    /// Like [`script`](Self::script), restricted to one device.
    pub fn script_on(&self, serial: &str, op: Operation, pattern: &str, response: Scripted) {
        self.push_rule(op, Some(serial.to_string()), pattern, response);
    }

    /// Changes a device's connection state (e.g. to simulate an unplug).
    pub fn set_state(&self, serial: &str, state: DeviceState) {
        let mut guard = self.lock();
        match guard.devices.iter_mut().find(|d| d.serial == serial) {
            Some(entry) => entry.state = state,
            None => guard.devices.push(DeviceEntry::new(serial, state)),
        }
    }

    /// Returns every call made so far, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    /// Returns the calls made against one device, in order.
    pub fn calls_for(&self, serial: &str) -> Vec<TransportCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.device == serial)
            .cloned()
            .collect()
    }

    /// Highest number of overlapping calls observed on one device.
    pub fn max_in_flight(&self, serial: &str) -> usize {
        self.lock().max_in_flight.get(serial).copied().unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push_rule(&self, op: Operation, device: Option<String>, pattern: &str, response: Scripted) {
        let mut guard = self.lock();
        let existing = guard
            .rules
            .iter_mut()
            .find(|r| r.op == op && r.device == device && r.pattern == pattern);
        match existing {
            Some(rule) => rule.responses.push_back(response),
            None => guard.rules.push(Rule {
                op,
                device,
                pattern: pattern.to_string(),
                responses: VecDeque::from([response]),
            }),
        }
    }

    /// Records the call, checks reachability, and picks the response.
    fn begin(
        &self,
        device: &DeviceHandle,
        op: Operation,
        detail: String,
    ) -> Result<Option<Scripted>, BridgeError> {
        let mut guard = self.lock();
        guard.calls.push(TransportCall {
            device: device.serial().to_string(),
            op,
            detail: detail.clone(),
        });

        let online = guard
            .devices
            .iter()
            .any(|d| d.serial == device.serial() && d.state.is_online());
        if !online {
            return Err(BridgeError::unavailable(device.serial(), "device not found"));
        }

        let depth = {
            let n = guard.in_flight.entry(device.serial().to_string()).or_insert(0);
            *n += 1;
            *n
        };
        let max = guard.max_in_flight.entry(device.serial().to_string()).or_insert(0);
        *max = (*max).max(depth);

        let response = guard
            .rules
            .iter_mut()
            .find(|r| {
                r.op == op
                    && r.device.as_deref().map_or(true, |s| s == device.serial())
                    && detail.contains(&r.pattern)
            })
            .and_then(|rule| {
                if rule.responses.len() > 1 {
                    rule.responses.pop_front()
                } else {
                    rule.responses.front().cloned()
                }
            });
        Ok(response)
    }

    fn end(&self, device: &DeviceHandle) {
        let mut guard = self.lock();
        if let Some(n) = guard.in_flight.get_mut(device.serial()) {
            *n = n.saturating_sub(1);
        }
    }

    async fn transfer(
        &self,
        device: &DeviceHandle,
        op: Operation,
        detail: String,
    ) -> Result<Option<CommandOutput>, BridgeError> {
        let response = self.begin(device, op, detail.clone())?;
        tokio::time::sleep(self.latency).await;
        self.end(device);
        match response {
            None => Ok(None),
            Some(Scripted::Output(out)) => Ok(Some(out)),
            Some(Scripted::Fail(e)) => Err(e),
            Some(Scripted::Hang) => Err(BridgeError::Timeout {
                command: detail,
                after: self.latency,
            }),
            Some(Scripted::Panic(msg)) => panic!("{msg}"),
        }
    }
}

#[async_trait]
impl DeviceTransport for ScriptedTransport {
    async fn list_devices(&self) -> Result<Vec<DeviceEntry>, BridgeError> {
        Ok(self.lock().devices.clone())
    }

    async fn resolve(&self, serial: Option<&str>) -> Result<DeviceHandle, BridgeError> {
        let mut guard = self.lock();
        match serial {
            Some(serial) => {
                guard.calls.push(TransportCall {
                    device: serial.to_string(),
                    op: Operation::Resolve,
                    detail: format!("get-state {serial}"),
                });
                match guard.devices.iter().find(|d| d.serial == serial) {
                    Some(entry) => entry.handle().ok_or_else(|| {
                        BridgeError::unavailable(serial, format!("state is '{}'", entry.state))
                    }),
                    None => Err(BridgeError::unavailable(serial, "device not found")),
                }
            }
            None => guard
                .devices
                .iter()
                .find_map(DeviceEntry::handle)
                .ok_or(BridgeError::NoDevices),
        }
    }

    async fn push(
        &self,
        device: &DeviceHandle,
        local: &Path,
        remote: &str,
    ) -> Result<(), BridgeError> {
        let detail = format!("{} -> {remote}", local.display());
        self.transfer(device, Operation::Push, detail).await.map(|_| ())
    }

    async fn pull(
        &self,
        device: &DeviceHandle,
        remote: &str,
        local: &Path,
    ) -> Result<(), BridgeError> {
        let detail = format!("{remote} -> {}", local.display());
        if let Some(out) = self.transfer(device, Operation::Pull, detail).await? {
            std::fs::write(local, out.stdout)
                .map_err(|e| BridgeError::io("pull", format!("{}: {e}", local.display())))?;
        }
        Ok(())
    }

    async fn run_command(
        &self,
        device: &DeviceHandle,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, BridgeError> {
        let mut detail = program.to_string();
        for arg in args {
            detail.push(' ');
            detail.push_str(arg);
        }

        let response = self.begin(device, Operation::Run, detail)?;
        if let Some(Scripted::Panic(msg)) = &response {
            self.end(device);
            panic!("{msg}");
        }
        let result = match response {
            Some(Scripted::Hang) => {
                tokio::time::sleep(timeout).await;
                Err(BridgeError::Timeout {
                    command: program.to_string(),
                    after: timeout,
                })
            }
            other => {
                tokio::time::sleep(self.latency.min(timeout)).await;
                match other {
                    Some(Scripted::Output(out)) => Ok(out),
                    Some(Scripted::Fail(e)) => Err(e),
                    _ => Ok(CommandOutput::success("")),
                }
            }
        };
        self.end(device);
        result
    }
}
