// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Device identity and the `adb devices` listing.

use std::fmt;

/// Identifies one reachable device for the length of a benchmarking session.
///
/// The handle is passed explicitly into every transport call; there is no
/// ambient "current device".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DeviceHandle {
    serial: String,
}

impl DeviceHandle {
    /// Creates a handle for the given serial number or `host:port` address.
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
        }
    }

    /// Returns the serial (or network address) used to address the device.
    pub fn serial(&self) -> &str {
        &self.serial
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serial)
    }
}

/// Connection state reported by `adb devices`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum DeviceState {
    /// Connected and authorized.
    Device,
    Offline,
    /// Connected, but the host key was not accepted on the device.
    Unauthorized,
    /// Any other state string (`recovery`, `sideload`, `bootloader`, ...).
    Other(String),
}

impl DeviceState {
    fn parse(s: &str) -> Self {
        match s {
            "device" => DeviceState::Device,
            "offline" => DeviceState::Offline,
            "unauthorized" => DeviceState::Unauthorized,
            other => DeviceState::Other(other.to_string()),
        }
    }

    /// Returns `true` if commands can be sent to the device.
    pub fn is_online(&self) -> bool {
        matches!(self, DeviceState::Device)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceState::Device => f.write_str("device"),
            DeviceState::Offline => f.write_str("offline"),
            DeviceState::Unauthorized => f.write_str("unauthorized"),
            DeviceState::Other(s) => f.write_str(s),
        }
    }
}

/// One row of the device listing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DeviceEntry {
    pub serial: String,
    pub state: DeviceState,
}

impl DeviceEntry {
    pub fn new(serial: impl Into<String>, state: DeviceState) -> Self {
        Self {
            serial: serial.into(),
            state,
        }
    }

    /// Converts the entry into a handle if the device is online.
    pub fn handle(&self) -> Option<DeviceHandle> {
        self.state
            .is_online()
            .then(|| DeviceHandle::new(self.serial.clone()))
    }
}

/// Parses the output of `adb devices`.
///
/// ```text
/// * daemon not running; starting now at tcp:5037
/// List of devices attached
/// emulator-5554   device
/// R58M32ABCDE     unauthorized
/// ```
///
/// Daemon chatter (`*` lines), the header, and blank lines are skipped.
/// With `adb devices -l`, trailing `key:value` descriptors are ignored.
pub fn parse_device_list(output: &str) -> Vec<DeviceEntry> {
    output
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with('*') && !l.starts_with("List of devices"))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;
            Some(DeviceEntry::new(serial, DeviceState::parse(state)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_list() {
        let out = "* daemon not running; starting now at tcp:5037\n\
                   * daemon started successfully\n\
                   List of devices attached\n\
                   emulator-5554\tdevice\n\
                   R58M32ABCDE\tunauthorized\n\
                   192.168.1.20:5555\toffline\n\
                   \n";
        let devices = parse_device_list(out);
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0], DeviceEntry::new("emulator-5554", DeviceState::Device));
        assert_eq!(devices[1].state, DeviceState::Unauthorized);
        assert_eq!(devices[2].serial, "192.168.1.20:5555");
        assert_eq!(devices[2].state, DeviceState::Offline);
    }

    #[test]
    fn test_parse_long_listing() {
        let out = "List of devices attached\n\
                   0123456789ABCDEF       device usb:1-1 product:walleye model:Pixel_2 transport_id:1\n";
        let devices = parse_device_list(out);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].serial, "0123456789ABCDEF");
        assert!(devices[0].state.is_online());
    }

    #[test]
    fn test_parse_empty_listing() {
        assert!(parse_device_list("List of devices attached\n\n").is_empty());
        assert!(parse_device_list("").is_empty());
    }

    #[test]
    fn test_only_online_entries_yield_handles() {
        let online = DeviceEntry::new("a", DeviceState::Device);
        let recovery = DeviceEntry::new("b", DeviceState::parse("recovery"));
        assert_eq!(online.handle(), Some(DeviceHandle::new("a")));
        assert_eq!(recovery.handle(), None);
        assert_eq!(recovery.state.to_string(), "recovery");
    }

    #[test]
    fn test_handle_serde_is_plain_string() {
        let h = DeviceHandle::new("emulator-5554");
        assert_eq!(serde_json::to_string(&h).unwrap(), "\"emulator-5554\"");
        assert_eq!(h.to_string(), "emulator-5554");
    }
}
