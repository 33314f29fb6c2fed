//! Transport-agnostic request path:
//! lookup -> validate -> resolve argv -> run bridge -> classify.
//!
//! A `Relay` is immutable after construction and shared by reference (or
//! `Arc`) across concurrent requests; each dispatch spawns its own child.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::bridge::{
    Bridge, DeviceEntry, Outcome, SpawnError, device_unavailable_reason, parse_devices,
};
use crate::error::RelayError;
use crate::registry::{CommandSpec, Registry};
use crate::validate::{ValidatedArgs, validate};

/// Budget for the bridge probes behind `/health`.
pub const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub command: String,
    pub message: String,
    /// Captured bridge stdout, verbatim apart from trailing whitespace.
    pub output: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    pub elapsed_ms: u64,
}

/// Liveness report. `process_live` is true whenever this can be produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub process_live: bool,
    pub bridge_available: bool,
    pub device_reachable: bool,
    pub devices: Vec<DeviceEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug)]
pub struct Relay {
    registry: &'static Registry,
    bridge: Bridge,
    default_device: Option<String>,
}

impl Relay {
    pub fn new(bridge: Bridge) -> Self {
        Self {
            registry: Registry::builtin(),
            bridge,
            default_device: None,
        }
    }

    /// Serial used when a request names none.
    pub fn with_default_device(mut self, serial: Option<String>) -> Self {
        self.default_device = serial.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn registry(&self) -> &'static Registry {
        self.registry
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn lookup(&self, command: &str) -> Result<&'static CommandSpec, RelayError> {
        self.registry
            .lookup(command)
            .ok_or_else(|| RelayError::UnknownCommand {
                command: command.to_string(),
            })
    }

    /// Run one named command with untyped params.
    pub async fn dispatch(&self, command: &str, params: &Value) -> Result<Reply, RelayError> {
        let spec = self.lookup(command).inspect_err(|e| warn!(%e, "rejected request"))?;
        let args = validate(spec, params).map_err(|source| {
            let err = RelayError::Validation {
                command: command.to_string(),
                source,
            };
            warn!(command, error = %err, "validation failed");
            err
        })?;
        self.execute(spec, &args).await
    }

    /// Run an already-validated command.
    pub async fn execute(
        &self,
        spec: &CommandSpec,
        args: &ValidatedArgs,
    ) -> Result<Reply, RelayError> {
        let device = if spec.targets_device() {
            args.device().or(self.default_device.as_deref())
        } else {
            None
        };
        let command_args = spec.resolve(args);
        info!(
            command = spec.name,
            params = %args.redacted(spec),
            device = device.unwrap_or("-"),
            "dispatching"
        );
        debug!(
            command = spec.name,
            program = self.bridge.program(),
            argc = self.bridge.argv(device, &command_args).len(),
            "resolved bridge argv"
        );

        let result = self.bridge.run(device, &command_args).await.map_err(|e| {
            let err = spawn_error(spec.name, e);
            error!(command = spec.name, error = %err, "bridge could not be started");
            err
        })?;
        let elapsed_ms = result.elapsed.as_millis() as u64;

        match result.outcome {
            Outcome::Success { stdout, stderr } => {
                info!(command = spec.name, elapsed_ms, "command succeeded");
                Ok(Reply {
                    command: spec.name.to_string(),
                    message: spec.describe_success(args),
                    output: stdout,
                    stderr,
                    elapsed_ms,
                })
            }
            Outcome::ExternalFailure {
                code,
                stderr,
                stdout,
            } => {
                let err = classify_failure(spec.name, code, stderr, stdout);
                warn!(command = spec.name, elapsed_ms, error = %err, "command failed");
                Err(err)
            }
            Outcome::Timeout { after } => {
                let err = RelayError::Timeout {
                    command: spec.name.to_string(),
                    after,
                };
                warn!(command = spec.name, error = %err, "command timed out");
                Err(err)
            }
        }
    }

    /// Parsed device table.
    pub async fn devices(&self) -> Result<Vec<DeviceEntry>, RelayError> {
        let reply = self.dispatch("list_devices", &Value::Null).await?;
        Ok(parse_devices(&reply.output))
    }

    /// Never fails: unreachable bridge or devices are reported, not raised.
    pub async fn health(&self) -> Health {
        let mut health = Health {
            process_live: true,
            bridge_available: false,
            device_reachable: false,
            devices: Vec::new(),
            detail: None,
        };

        let probe = self
            .bridge
            .run_with_timeout(None, &["version".into()], HEALTH_PROBE_TIMEOUT)
            .await;
        match probe {
            Ok(res) if matches!(res.outcome, Outcome::Success { .. }) => {
                health.bridge_available = true;
            }
            Ok(res) => {
                health.detail = Some(format!("bridge version probe: {}", res.outcome.tag()));
                return health;
            }
            Err(e) => {
                health.detail = Some(spawn_error("health", e).to_string());
                return health;
            }
        }

        let listing = self
            .bridge
            .run_with_timeout(None, &["devices".into()], HEALTH_PROBE_TIMEOUT)
            .await;
        match listing {
            Ok(res) => match res.outcome {
                Outcome::Success { stdout, .. } => {
                    health.devices = parse_devices(&stdout);
                    health.device_reachable = health.devices.iter().any(DeviceEntry::is_ready);
                }
                other => {
                    health.detail = Some(format!("device listing: {}", other.tag()));
                }
            },
            Err(e) => health.detail = Some(spawn_error("health", e).to_string()),
        }
        health
    }
}

fn spawn_error(command: &str, e: SpawnError) -> RelayError {
    match e {
        SpawnError::NotFound { program } => RelayError::BridgeNotFound {
            command: command.to_string(),
            program,
        },
        SpawnError::Io { program, source } => RelayError::Spawn {
            command: command.to_string(),
            program,
            source,
        },
    }
}

fn classify_failure(
    command: &str,
    code: Option<i32>,
    stderr: String,
    stdout: String,
) -> RelayError {
    if let Some(reason) = device_unavailable_reason(&stderr) {
        return RelayError::DeviceUnavailable {
            command: command.to_string(),
            reason,
        };
    }
    let diagnostic = if stderr.is_empty() { stdout } else { stderr };
    RelayError::ExternalFailure {
        command: command.to_string(),
        code,
        diagnostic: if diagnostic.is_empty() {
            "no diagnostic output".into()
        } else {
            diagnostic
        },
    }
}
