/*!
`exec.rs`

Implements the `exec` subcommand: run a single registry command against the
device through the same `Relay` path the servers use.

Parameter injection:
  --param KEY=VALUE                (repeatable)
  --param-file params.(json|yaml)  (merged; CLI --param overrides file entries)

Values are coerced by the declared parameter type before validation, so
`--param x=540` arrives as the integer 540.

JSON Success Output:
{
  "status": "ok",
  "command": "tap",
  "message": "Tapped at (540, 1350)",
  "output": "",
  "elapsed_ms": 42
}

JSON Error Output:
{
  "status": "error",
  "command": "tap",
  "error": "validation_error",
  "message": "...",
  "field": "x"
}

Any error exits non-zero.
*/

use anyhow::{Result, bail};
use clap::Args;
use serde_json::{Value, json};

use adb_relay::RelayError;
use adb_relay::config::Settings;

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji, table};
use crate::cmd::shared::{build_params, load_param_file_into_map, parse_kv_params, runtime};

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Command name to run (see `adb-relay list`)
    #[arg(value_name = "COMMAND")]
    pub command: String,

    /// Provide parameter (KEY=VALUE), repeatable
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Load parameters from file (JSON or YAML). CLI --param overrides file entries
    #[arg(long = "param-file", value_name = "PATH")]
    pub param_file: Option<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute_exec(args: ExecArgs, settings: Settings) -> Result<()> {
    let name = args.command.trim();
    let relay = settings.build_relay()?;

    let spec = match relay.lookup(name) {
        Ok(spec) => spec,
        Err(e) => return relay_error(args.json, &e),
    };

    let mut provided = match parse_kv_params(&args.params) {
        Ok(p) => p,
        Err(e) => return output_error(args.json, name, "usage", &e.to_string(), None),
    };
    if let Some(ref pf) = args.param_file
        && let Err(e) = load_param_file_into_map(pf, &mut provided)
    {
        return output_error(args.json, name, "usage", &format!("{e:#}"), None);
    }
    let params = Value::Object(build_params(spec, &provided));

    let rt = runtime()?;
    let reply = match rt.block_on(relay.dispatch(spec.name, &params)) {
        Ok(reply) => reply,
        Err(e) => return relay_error(args.json, &e),
    };

    if args.json {
        let mut body = serde_json::to_value(&reply)?;
        if let Value::Object(ref mut map) = body {
            map.insert("status".into(), json!("ok"));
        }
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let style = StyleOptions::detect();
    println!(
        "{}",
        box_header(
            format!("{} {} ({})", emoji("success", &style), reply.message, reply.command),
            Some(format!("{} ms", reply.elapsed_ms)),
            &style,
        )
    );

    if !provided.is_empty() {
        let mut rows: Vec<Vec<String>> = match params.as_object() {
            Some(map) => map
                .iter()
                .map(|(k, v)| {
                    let shown = if spec.param_spec(k).is_some_and(|p| p.sensitive) {
                        "<redacted>".to_string()
                    } else {
                        match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        }
                    };
                    vec![k.clone(), shown]
                })
                .collect(),
            None => Vec::new(),
        };
        rows.sort_by(|a, b| a[0].cmp(&b[0]));
        println!("{}", color(Role::Accent, "Arguments:", &style));
        println!("{}", table(&["NAME", "VALUE"], &rows, &style));
    }

    if !reply.output.is_empty() {
        println!();
        println!("{}", reply.output);
    }
    if !reply.stderr.is_empty() {
        println!();
        println!("{}", color(Role::Warning, &reply.stderr, &style));
    }
    Ok(())
}

fn relay_error(json: bool, e: &RelayError) -> Result<()> {
    output_error(json, e.command(), e.kind().as_str(), &e.to_string(), e.field())
}

fn output_error(
    json: bool,
    command: &str,
    kind: &str,
    msg: &str,
    field: Option<&str>,
) -> Result<()> {
    if json {
        let mut err = json!({
            "status": "error",
            "command": command,
            "error": kind,
            "message": msg,
        });
        if let (Some(f), Value::Object(map)) = (field, &mut err) {
            map.insert("field".into(), json!(f));
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&err).unwrap_or_else(|_| err.to_string())
        );
    } else {
        let style = StyleOptions::detect();
        let title = format!("{} Exec Error [{kind}]", emoji("error", &style));
        println!("{}", box_header(title, Some(color(Role::Error, msg, &style)), &style));
        println!(
            "{} {}",
            emoji("info", &style),
            color(
                Role::Dim,
                "Re-run with --json for machine-readable output, or -v for bridge logs.",
                &style
            )
        );
    }
    bail!(msg.to_string())
}
