//! Runtime settings.
//!
//! Precedence: CLI flag > environment (`ADB_RELAY_BRIDGE`, `ADB_RELAY_DEVICE`)
//! > config file (JSON, or YAML by extension) > built-in default.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::bridge::{Bridge, DEFAULT_BRIDGE, DEFAULT_TIMEOUT};
use crate::relay::Relay;

pub const ENV_BRIDGE: &str = "ADB_RELAY_BRIDGE";
pub const ENV_DEVICE: &str = "ADB_RELAY_DEVICE";

pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
pub const DEFAULT_PORT: u16 = 8000;

/// On-disk config. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub bridge: Option<String>,
    pub timeout_ms: Option<u64>,
    pub device: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub bridge: Option<String>,
    pub timeout_ms: Option<u64>,
    pub device: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bridge: String,
    pub timeout: Duration,
    pub device: Option<String>,
    pub host: IpAddr,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bridge: DEFAULT_BRIDGE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            device: None,
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
        }
    }
}

/// Read a config file; `.yaml` / `.yml` parse as YAML, anything else as JSON.
pub fn load_config_file(path: &str) -> Result<FileConfig> {
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("failed to read config: {path}"))?;
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        serde_yaml::from_str(&raw).context("failed to parse YAML config")
    } else {
        serde_json::from_str(&raw).context("failed to parse JSON config")
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Settings {
    /// Merge the layers. `env` is injected so tests need not touch the process env.
    pub fn resolve(
        cli: Overrides,
        file: Option<FileConfig>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file = file.unwrap_or_default();
        let d = Settings::default();
        if cli.timeout_ms.or(file.timeout_ms) == Some(0) {
            bail!("timeout_ms must be greater than 0");
        }
        let host = match non_blank(cli.host).or_else(|| non_blank(file.host)) {
            Some(h) => h
                .trim_start_matches('[')
                .trim_end_matches(']')
                .parse::<IpAddr>()
                .with_context(|| format!("listen host must be an IP address, got '{h}'"))?,
            None => d.host,
        };
        Ok(Self {
            bridge: non_blank(cli.bridge)
                .or_else(|| non_blank(env(ENV_BRIDGE)))
                .or_else(|| non_blank(file.bridge))
                .unwrap_or(d.bridge),
            timeout: cli
                .timeout_ms
                .or(file.timeout_ms)
                .map(Duration::from_millis)
                .unwrap_or(d.timeout),
            device: non_blank(cli.device)
                .or_else(|| non_blank(env(ENV_DEVICE)))
                .or_else(|| non_blank(file.device)),
            host,
            port: cli.port.or(file.port).unwrap_or(d.port),
        })
    }

    /// Resolve against the real process environment, loading `config_path` if set.
    pub fn load(cli: Overrides, config_path: Option<&str>) -> Result<Self> {
        let file = config_path.map(load_config_file).transpose()?;
        Self::resolve(cli, file, |k| std::env::var(k).ok())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn build_bridge(&self) -> Result<Bridge> {
        Bridge::from_command_line(&self.bridge, self.timeout)
            .with_context(|| format!("invalid bridge command: '{}'", self.bridge))
    }

    pub fn build_relay(&self) -> Result<Relay> {
        Ok(Relay::new(self.build_bridge()?).with_default_device(self.device.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_are_loopback_8000() {
        let s = Settings::resolve(Overrides::default(), None, no_env).unwrap();
        assert_eq!(s.listen_addr().to_string(), "127.0.0.1:8000");
        assert_eq!(s.bridge, "adb");
        assert_eq!(s.timeout, Duration::from_secs(10));
        assert!(s.device.is_none());
    }

    #[test]
    fn precedence_cli_env_file() {
        let file = FileConfig {
            bridge: Some("file-adb".into()),
            device: Some("file-dev".into()),
            port: Some(9000),
            timeout_ms: Some(2500),
            ..Default::default()
        };
        let env = |k: &str| match k {
            ENV_BRIDGE => Some("env-adb".to_string()),
            _ => None,
        };
        let cli = Overrides {
            device: Some("cli-dev".into()),
            ..Default::default()
        };
        let s = Settings::resolve(cli, Some(file), env).unwrap();
        assert_eq!(s.bridge, "env-adb");
        assert_eq!(s.device.as_deref(), Some("cli-dev"));
        assert_eq!(s.port, 9000);
        assert_eq!(s.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn ipv6_host_makes_a_valid_listen_addr() {
        let cli = Overrides {
            host: Some("::1".into()),
            port: Some(8080),
            ..Default::default()
        };
        let s = Settings::resolve(cli, None, no_env).unwrap();
        assert_eq!(s.listen_addr().to_string(), "[::1]:8080");

        let bracketed = Overrides {
            host: Some("[::1]".into()),
            ..Default::default()
        };
        let s = Settings::resolve(bracketed, None, no_env).unwrap();
        assert!(s.listen_addr().is_ipv6());
    }

    #[test]
    fn non_ip_host_rejected() {
        let cli = Overrides {
            host: Some("not a host".into()),
            ..Default::default()
        };
        assert!(Settings::resolve(cli, None, no_env).is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        let cli = Overrides {
            timeout_ms: Some(0),
            ..Default::default()
        };
        let err = Settings::resolve(cli, None, no_env).unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));

        let file = FileConfig {
            timeout_ms: Some(0),
            ..Default::default()
        };
        assert!(Settings::resolve(Overrides::default(), Some(file), no_env).is_err());
    }

    #[test]
    fn json_config_file() {
        let path = std::env::temp_dir().join("adb_relay_config_test.json");
        std::fs::write(&path, r#"{ "bridge": "adb -P 5038", "port": 5000 }"#).unwrap();
        let cfg = load_config_file(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.bridge.as_deref(), Some("adb -P 5038"));
        assert_eq!(cfg.port, Some(5000));
    }

    #[test]
    fn yaml_config_file() {
        let path = std::env::temp_dir().join("adb_relay_config_test.yaml");
        std::fs::write(&path, "host: 0.0.0.0\ntimeout_ms: 1500\n").unwrap();
        let cfg = load_config_file(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(cfg.timeout_ms, Some(1500));
    }

    #[test]
    fn unknown_config_key_rejected() {
        let path = std::env::temp_dir().join("adb_relay_config_bad.json");
        std::fs::write(&path, r#"{ "prot": 1 }"#).unwrap();
        assert!(load_config_file(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn bridge_command_is_split() {
        let s = Settings {
            bridge: "adb -H 10.0.0.2".into(),
            ..Default::default()
        };
        let b = s.build_bridge().unwrap();
        assert_eq!(b.program(), "adb");
        assert_eq!(b.argv(None, &[]), vec!["-H", "10.0.0.2"]);
    }
}
