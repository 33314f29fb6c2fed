/*!
shared.rs - helpers reused by the subcommands.

Focus:
  - parse_kv_params: `--param KEY=VALUE` list -> map
  - load_param_file_into_map: JSON/YAML param file merge (CLI wins)
  - build_params: schema-driven coercion of raw strings into a JSON object
  - runtime: the Tokio runtime used by the (sync) CLI entry points

Validation proper stays in the library; this layer only turns CLI strings
into the same JSON shape HTTP clients send.
*/

use adb_relay::CommandSpec;
use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Split repeated `KEY=VALUE` flags.
pub fn parse_kv_params(raw: &[String]) -> Result<HashMap<String, String>> {
    let mut provided = HashMap::new();
    for kv in raw {
        let Some((k, v)) = kv.split_once('=') else {
            bail!("invalid --param (expected KEY=VALUE): {kv}");
        };
        let key = k.trim();
        if key.is_empty() {
            bail!("invalid --param (empty key): {kv}");
        }
        provided.insert(key.to_string(), v.to_string());
    }
    Ok(provided)
}

/// Merge a JSON/YAML object file into `provided`; keys already present win.
pub fn load_param_file_into_map(path: &str, provided: &mut HashMap<String, String>) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read param file: {path}"))?;
    let lower = path.to_ascii_lowercase();

    let value: Value = if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        let yaml_v: serde_yaml::Value =
            serde_yaml::from_str(&raw).context("failed to parse YAML param file")?;
        serde_json::to_value(yaml_v).context("failed to convert YAML to JSON")?
    } else {
        serde_json::from_str(&raw).context("failed to parse JSON param file")?
    };

    let obj = value
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("param file root must be an object"))?;

    for (k, v) in obj {
        if provided.contains_key(k) {
            continue;
        }
        let s = match v {
            Value::String(sv) => sv.clone(),
            _ => v.to_string(),
        };
        provided.insert(k.clone(), s);
    }
    Ok(())
}

/// Build the params object for `spec`, coercing each declared param by type.
/// Undeclared keys pass through as strings so the validator can name them.
pub fn build_params(spec: &CommandSpec, provided: &HashMap<String, String>) -> Map<String, Value> {
    let mut out = Map::new();
    for (k, raw) in provided {
        let v = match spec.param_spec(k) {
            Some(p) => coerce_value(raw, p.type_name()),
            None => Value::String(raw.clone()),
        };
        out.insert(k.clone(), v);
    }
    out
}

/// Coerce a raw CLI string using a primitive type hint. Unparseable input
/// stays a string and is rejected later with a typed error.
pub fn coerce_value(raw: &str, type_hint: &str) -> Value {
    match type_hint {
        "integer" => raw
            .trim()
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        _ => Value::String(raw.to_string()),
    }
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")
}

#[cfg(test)]
mod tests {
    use super::*;
    use adb_relay::Registry;
    use serde_json::json;

    #[test]
    fn coerce_integer() {
        assert_eq!(coerce_value("42", "integer"), json!(42));
        assert_eq!(coerce_value(" -5 ", "integer"), json!(-5));
        assert_eq!(
            coerce_value("x42", "integer"),
            json!("x42"),
            "invalid integer remains string"
        );
    }

    #[test]
    fn strings_are_not_trimmed() {
        assert_eq!(coerce_value(" hello ", "string"), json!(" hello "));
    }

    #[test]
    fn kv_parsing() {
        let m = parse_kv_params(&["x=1".into(), "text=a=b".into()]).unwrap();
        assert_eq!(m["x"], "1");
        assert_eq!(m["text"], "a=b");
        assert!(parse_kv_params(&["novalue".into()]).is_err());
        assert!(parse_kv_params(&["=1".into()]).is_err());
    }

    #[test]
    fn build_params_uses_declared_types() {
        let spec = Registry::builtin().lookup("swipe").unwrap();
        let mut provided = HashMap::new();
        provided.insert("startX".to_string(), "10".to_string());
        provided.insert("bogus".to_string(), "7".to_string());
        let params = build_params(spec, &provided);
        assert_eq!(params["startX"], json!(10));
        assert_eq!(params["bogus"], json!("7"));
    }

    #[test]
    fn param_file_json_merge() {
        let path = std::env::temp_dir().join("adb_relay_param_test.json");
        std::fs::write(&path, r#"{ "x": 1, "y": "2" }"#).unwrap();
        let mut provided = HashMap::new();
        provided.insert("y".into(), "override".into());
        load_param_file_into_map(path.to_str().unwrap(), &mut provided).unwrap();
        assert_eq!(provided.get("x").unwrap(), "1");
        assert_eq!(provided.get("y").unwrap(), "override");
    }

    #[test]
    fn param_file_yaml() {
        let path = std::env::temp_dir().join("adb_relay_param_test.yaml");
        std::fs::write(&path, "text: hello world\n").unwrap();
        let mut provided = HashMap::new();
        load_param_file_into_map(path.to_str().unwrap(), &mut provided).unwrap();
        assert_eq!(provided.get("text").unwrap(), "hello world");
    }
}
