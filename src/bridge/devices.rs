//! Reading the bridge's device table and recognising "no usable device"
//! diagnostics. Only health reporting and error classification look inside
//! bridge output; command results are relayed as opaque text.

use serde::Serialize;

/// One row of `adb devices [-l]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceEntry {
    pub serial: String,
    /// `device`, `offline`, `unauthorized`, `recovery`, ...
    pub state: String,
}

impl DeviceEntry {
    /// Attached, authorised and accepting commands.
    pub fn is_ready(&self) -> bool {
        self.state == "device"
    }
}

/// Parse `adb devices` output. The header line, blank lines and daemon
/// start-up chatter (`* daemon ... *`) are skipped.
pub fn parse_devices(output: &str) -> Vec<DeviceEntry> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| !l.starts_with("List of devices") && !l.starts_with('*'))
        .filter_map(|l| {
            let mut cols = l.split_whitespace();
            let serial = cols.next()?;
            let state = cols.next()?;
            Some(DeviceEntry {
                serial: serial.to_string(),
                state: state.to_string(),
            })
        })
        .collect()
}

const UNAVAILABLE_MARKERS: &[&str] = &[
    "no devices/emulators found",
    "device unauthorized",
    "device offline",
    "device still authorizing",
    "not found",
];

/// If `stderr` says the target device is missing or unusable, return the
/// matching diagnostic line.
pub fn device_unavailable_reason(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .map(str::trim)
        .find(|line| {
            let lower = line.to_ascii_lowercase();
            UNAVAILABLE_MARKERS.iter().any(|m| {
                // bare "not found" only counts when it is about a device
                if *m == "not found" {
                    lower.contains("device") && lower.contains(m)
                } else {
                    lower.contains(m)
                }
            })
        })
        .map(|l| l.trim_start_matches("adb: ").trim_start_matches("error: ").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_table() {
        let out = "* daemon not running; starting now at tcp:5037\n\
                   * daemon started successfully\n\
                   List of devices attached\n\
                   emulator-5554\tdevice product:sdk_gphone64 model:Pixel\n\
                   R58M123\tunauthorized usb:1-1\n\n";
        let devs = parse_devices(out);
        assert_eq!(devs.len(), 2);
        assert_eq!(devs[0].serial, "emulator-5554");
        assert!(devs[0].is_ready());
        assert_eq!(devs[1].state, "unauthorized");
        assert!(!devs[1].is_ready());
    }

    #[test]
    fn empty_table() {
        assert!(parse_devices("List of devices attached\n\n").is_empty());
    }

    #[test]
    fn recognises_unavailable_diagnostics() {
        assert_eq!(
            device_unavailable_reason("adb: no devices/emulators found").as_deref(),
            Some("no devices/emulators found")
        );
        assert_eq!(
            device_unavailable_reason("adb: device 'abc' not found").as_deref(),
            Some("device 'abc' not found")
        );
        assert!(device_unavailable_reason("error: device unauthorized.\nplease check").is_some());
    }

    #[test]
    fn ignores_unrelated_failures() {
        assert!(device_unavailable_reason("Error: Unknown command: frob").is_none());
        assert!(device_unavailable_reason("/system/bin/sh: foo: not found").is_none());
        assert!(device_unavailable_reason("").is_none());
    }
}
