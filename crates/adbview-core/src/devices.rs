//! Device records parsed from `adb devices` output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state column of `adb devices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
    /// Attached and authorized; the only state logcat can stream from.
    Device,
    Offline,
    Unauthorized,
    Other(String),
}

impl DeviceState {
    pub fn parse(s: &str) -> Self {
        match s {
            "device" => DeviceState::Device,
            "offline" => DeviceState::Offline,
            "unauthorized" => DeviceState::Unauthorized,
            other => DeviceState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeviceState::Device => "device",
            DeviceState::Offline => "offline",
            DeviceState::Unauthorized => "unauthorized",
            DeviceState::Other(s) => s,
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DeviceState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeviceState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(DeviceState::parse(&s))
    }
}

/// One attached device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub status: DeviceState,
}

/// Properties composed for `get-device-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub model: String,
    pub manufacturer: String,
    pub android_version: String,
}

impl DeviceInfo {
    /// Placeholder used for a property whose query failed.
    pub const UNKNOWN: &'static str = "Unknown";
}

/// Parse `adb devices` output into the list of ready devices.
///
/// The first non-blank line is the `List of devices attached` header and is
/// skipped. Remaining lines are `<serial>\t<state>`; only `device` entries
/// are kept.
pub fn parse_devices(output: &str) -> Vec<Device> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split('\t');
            let id = parts.next()?;
            let status = DeviceState::parse(parts.next()?);
            (status == DeviceState::Device).then(|| Device {
                id: id.to_string(),
                status,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_devices_fixture() {
        let output = "List of devices attached\nABC123\tdevice\nXYZ\toffline\n";
        let devices = parse_devices(output);
        assert_eq!(
            devices,
            vec![Device {
                id: "ABC123".into(),
                status: DeviceState::Device,
            }]
        );
    }

    #[test]
    fn test_parse_devices_header_only() {
        assert!(parse_devices("List of devices attached\n\n").is_empty());
        assert!(parse_devices("").is_empty());
    }

    #[test]
    fn test_parse_devices_crlf_and_blank_lines() {
        let output = "List of devices attached\r\n\r\nemulator-5554\tdevice\r\nR58M\tunauthorized\r\n";
        let devices = parse_devices(output);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "emulator-5554");
    }

    #[test]
    fn test_parse_devices_ignores_lines_without_state() {
        let output = "List of devices attached\n* daemon started successfully\nABC\tdevice\n";
        let devices = parse_devices(output);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "ABC");
    }

    #[test]
    fn test_device_serializes_status_as_literal() {
        let device = Device {
            id: "ABC123".into(),
            status: DeviceState::Device,
        };
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json, serde_json::json!({"id": "ABC123", "status": "device"}));
    }

    #[test]
    fn test_device_info_camel_case() {
        let info = DeviceInfo {
            model: "Pixel 7".into(),
            manufacturer: "Google".into(),
            android_version: "14".into(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["androidVersion"], "14");
    }
}
