/*!
`get.rs`

Implements the `get` subcommand: show one command's parameters and the
JSON Schema both transports advertise for it.

JSON Output Shape:
{
  "status": "ok",
  "name": "swipe",
  "description": "...",
  "parameters": [
    { "name": "startX", "type": "integer", "required": true, "default": null, "description": "..." }
  ],
  "inputSchema": { "type": "object", ... }
}

An unknown name prints `{"status":"error", ...}` (or a message) and exits
non-zero.
*/

use anyhow::{Result, bail};
use clap::Args;
use serde_json::{Value, json};

use adb_relay::registry::{CommandSpec, ParamDefault, ParamKind, Registry};

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji, table};

/// CLI arguments for `adb-relay get <COMMAND>`
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Command name, as shown by `list`
    #[arg(value_name = "COMMAND")]
    pub command: String,

    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

pub fn execute_get(args: GetArgs) -> Result<()> {
    let name = args.command.trim();
    let Some(spec) = Registry::builtin().lookup(name) else {
        if args.json {
            println!(
                "{}",
                json!({
                    "status": "error",
                    "error": "unknown_command",
                    "requested": name,
                    "known": Registry::builtin().names(),
                })
            );
        } else {
            let style = StyleOptions::detect();
            println!(
                "{} {}",
                emoji("error", &style),
                color(Role::Error, format!("Unknown command '{name}'"), &style)
            );
        }
        bail!("unknown command: {name}");
    };

    if args.json {
        let params: Vec<Value> = spec
            .params
            .iter()
            .map(|p| {
                json!({
                    "name": p.name,
                    "type": p.type_name(),
                    "required": p.required,
                    "default": default_value(p.default),
                    "description": p.description,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "status": "ok",
                "name": spec.name,
                "description": spec.description,
                "parameters": params,
                "inputSchema": Value::Object(spec.input_schema()),
            }))?
        );
        return Ok(());
    }

    let style = StyleOptions::detect();
    println!(
        "{}",
        box_header(
            format!("{} Command: {}", emoji("info", &style), spec.name),
            None::<&str>,
            &style,
        )
    );
    println!("Description: {}", spec.description);
    if spec.params.is_empty() {
        println!("Parameters: (none)");
        return Ok(());
    }
    println!(
        "{}",
        table(
            &["NAME", "TYPE", "REQ", "CONSTRAINT", "DEFAULT", "DESCRIPTION"],
            &param_rows(spec),
            &style
        )
    );
    Ok(())
}

fn param_rows(spec: &CommandSpec) -> Vec<Vec<String>> {
    spec.params
        .iter()
        .map(|p| {
            vec![
                p.name.to_string(),
                p.type_name().to_string(),
                if p.required { "yes".into() } else { "no".into() },
                constraint(&p.kind),
                match default_value(p.default) {
                    Value::Null => "-".into(),
                    Value::String(s) => s,
                    other => other.to_string(),
                },
                p.description.to_string(),
            ]
        })
        .collect()
}

fn constraint(kind: &ParamKind) -> String {
    match kind {
        ParamKind::Integer { min, max } => format!("{min}..={max}"),
        ParamKind::Choice(allowed) => allowed.join("|"),
        ParamKind::Text { max_len, .. } => format!("1..={max_len} chars"),
    }
}

fn default_value(default: Option<ParamDefault>) -> Value {
    match default {
        Some(ParamDefault::Int(n)) => json!(n),
        Some(ParamDefault::Choice(s)) => json!(s),
        None => Value::Null,
    }
}
