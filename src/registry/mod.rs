/*!
Command registry.

A closed, immutable table of `CommandSpec`s built once on first use.
Each spec carries:
  - its parameter declarations (`ParamSpec`), used both by the validator and
    to render the JSON Schema advertised over HTTP and MCP
  - an invocation template turning `ValidatedArgs` into the bridge argv
  - a success summary template

The concrete command table lives in `commands.rs`.
*/

mod commands;

use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::validate::ValidatedArgs;

/// Upper bound applied to every screen coordinate. Real bounds are per-device.
pub const COORD_MAX: i64 = 100_000;
/// Upper bound for gesture durations in milliseconds.
pub const DURATION_MAX_MS: i64 = 60_000;
/// Upper bound for free-text parameters, in characters.
pub const TEXT_MAX_LEN: usize = 1000;

/// Name of the optional device-selection parameter shared by targeted commands.
pub const DEVICE_PARAM: &str = "device";

/// Primitive shape of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// Integer within an inclusive range.
    Integer { min: i64, max: i64 },
    /// String restricted to a fixed set of values.
    Choice(&'static [&'static str]),
    /// Non-empty string up to `max_len` characters.
    Text { max_len: usize, format: TextFormat },
}

/// Character set accepted by a `Text` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    /// Any characters (still length-bounded).
    Free,
    /// `[A-Za-z0-9._:-]+` (device serials, settings keys).
    Token,
    /// Text for `input text`, which reads `%s` as a space, so a literal
    /// `%s` cannot be typed faithfully.
    InputText,
}

impl TextFormat {
    pub fn accepts(&self, s: &str) -> bool {
        match self {
            TextFormat::Free => true,
            TextFormat::Token => s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-')),
            TextFormat::InputText => !s.contains("%s"),
        }
    }

    /// Rejection reason when [`accepts`](Self::accepts) fails.
    pub fn violation(&self) -> &'static str {
        match self {
            TextFormat::Free => "contains characters outside the allowed set",
            TextFormat::Token => "may only contain [A-Za-z0-9._:-]",
            TextFormat::InputText => "must not contain '%s' (the device types it as a space)",
        }
    }

    fn pattern(&self) -> Option<&'static str> {
        match self {
            TextFormat::Free => None,
            TextFormat::Token => Some("^[A-Za-z0-9._:-]+$"),
            TextFormat::InputText => None,
        }
    }
}

/// Value substituted when an optional parameter is omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDefault {
    Int(i64),
    Choice(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<ParamDefault>,
    /// Free-text payloads that must not appear verbatim in logs.
    pub sensitive: bool,
    pub description: &'static str,
}

impl ParamSpec {
    pub fn integer(name: &'static str, min: i64, max: i64, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Integer { min, max },
            required: true,
            default: None,
            sensitive: false,
            description,
        }
    }

    pub fn choice(
        name: &'static str,
        allowed: &'static [&'static str],
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Choice(allowed),
            required: true,
            default: None,
            sensitive: false,
            description,
        }
    }

    pub fn text(name: &'static str, max_len: usize, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Text {
                max_len,
                format: TextFormat::Free,
            },
            required: true,
            default: None,
            sensitive: false,
            description,
        }
    }

    pub fn token(name: &'static str, max_len: usize, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Text {
                max_len,
                format: TextFormat::Token,
            },
            required: true,
            default: None,
            sensitive: false,
            description,
        }
    }

    /// Mark optional with no default.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Mark optional, substituting `default` when omitted.
    pub fn with_default(mut self, default: ParamDefault) -> Self {
        self.required = false;
        self.default = Some(default);
        self
    }

    /// Restrict a `Text` param to `format`; no-op for other kinds.
    pub fn with_format(mut self, format: TextFormat) -> Self {
        if let ParamKind::Text { format: f, .. } = &mut self.kind {
            *f = format;
        }
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Primitive JSON type name, as used in schemas and error messages.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ParamKind::Integer { .. } => "integer",
            ParamKind::Choice(_) | ParamKind::Text { .. } => "string",
        }
    }

    /// JSON Schema fragment for this parameter.
    pub fn schema(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), json!(self.type_name()));
        obj.insert("description".into(), json!(self.description));
        match &self.kind {
            ParamKind::Integer { min, max } => {
                obj.insert("minimum".into(), json!(min));
                obj.insert("maximum".into(), json!(max));
            }
            ParamKind::Choice(allowed) => {
                obj.insert("enum".into(), json!(allowed));
            }
            ParamKind::Text { max_len, format } => {
                obj.insert("minLength".into(), json!(1));
                obj.insert("maxLength".into(), json!(max_len));
                if let Some(p) = format.pattern() {
                    obj.insert("pattern".into(), json!(p));
                }
            }
        }
        match self.default {
            Some(ParamDefault::Int(n)) => {
                obj.insert("default".into(), json!(n));
            }
            Some(ParamDefault::Choice(s)) => {
                obj.insert("default".into(), json!(s));
            }
            None => {}
        }
        Value::Object(obj)
    }
}

/// Turns validated arguments into the bridge argv (without `-s serial`).
pub type InvocationFn = fn(&ValidatedArgs) -> Vec<String>;
/// Human-readable success message.
pub type SummaryFn = fn(&ValidatedArgs) -> String;

#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
    pub invocation: InvocationFn,
    pub summary: SummaryFn,
}

impl CommandSpec {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            params: Vec::new(),
            invocation: |_| Vec::new(),
            summary: |_| String::from("ok"),
        }
    }

    pub fn param(mut self, p: ParamSpec) -> Self {
        self.params.push(p);
        self
    }

    /// Accept the optional `device` serial selector.
    pub fn device_targeted(self) -> Self {
        self.param(
            ParamSpec::token(
                DEVICE_PARAM,
                64,
                "Device serial as shown by list_devices (optional)",
            )
            .optional(),
        )
    }

    pub fn invocation(mut self, f: InvocationFn) -> Self {
        self.invocation = f;
        self
    }

    pub fn summary(mut self, f: SummaryFn) -> Self {
        self.summary = f;
        self
    }

    pub fn targets_device(&self) -> bool {
        self.param_spec(DEVICE_PARAM).is_some()
    }

    pub fn param_spec(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Bridge argv for a validated argument set (device selector excluded).
    pub fn resolve(&self, args: &ValidatedArgs) -> Vec<String> {
        (self.invocation)(args)
    }

    pub fn describe_success(&self, args: &ValidatedArgs) -> String {
        (self.summary)(args)
    }

    /// JSON Schema (`type: object`) describing the accepted params.
    pub fn input_schema(&self) -> Map<String, Value> {
        let mut props = Map::new();
        let mut required = Vec::new();
        for p in &self.params {
            props.insert(p.name.to_string(), p.schema());
            if p.required {
                required.push(json!(p.name));
            }
        }
        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(props));
        schema.insert("required".into(), Value::Array(required));
        schema.insert("additionalProperties".into(), json!(false));
        schema
    }

    /// Short `name:type` summary, e.g. `x:integer, y:integer, device?:string`.
    pub fn param_summary(&self) -> String {
        if self.params.is_empty() {
            return "-".into();
        }
        self.params
            .iter()
            .map(|p| {
                let opt = if p.required { "" } else { "?" };
                format!("{}{}:{}", p.name, opt, p.type_name())
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Immutable name -> spec mapping.
#[derive(Debug)]
pub struct Registry {
    commands: BTreeMap<&'static str, CommandSpec>,
}

impl Registry {
    pub fn new(specs: Vec<CommandSpec>) -> Self {
        let commands = specs.into_iter().map(|s| (s.name, s)).collect();
        Self { commands }
    }

    /// The built-in command table, constructed once per process.
    pub fn builtin() -> &'static Registry {
        static BUILTIN: OnceLock<Registry> = OnceLock::new();
        BUILTIN.get_or_init(|| Registry::new(commands::builtin_commands()))
    }

    pub fn lookup(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    /// Specs in name order.
    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// `[{name, description, inputSchema}]` for self-describing endpoints.
    pub fn describe(&self) -> Value {
        Value::Array(
            self.iter()
                .map(|c| {
                    json!({
                        "name": c.name,
                        "description": c.description,
                        "inputSchema": Value::Object(c.input_schema()),
                    })
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate;

    #[test]
    fn builtin_contains_expected_commands() {
        let reg = Registry::builtin();
        for name in [
            "list_devices",
            "wifi_control",
            "bluetooth_control",
            "torch_control",
            "volume_control",
            "music_control",
            "tap",
            "long_press",
            "swipe",
            "type_text",
            "get_setting",
            "set_setting",
            "set_brightness",
            "sensor_read",
        ] {
            assert!(reg.lookup(name).is_some(), "missing command {name}");
        }
        assert_eq!(reg.len(), 14);
        assert!(reg.lookup("reboot").is_none());
    }

    #[test]
    fn lookup_is_stable_across_calls() {
        let a = Registry::builtin().lookup("swipe").unwrap() as *const CommandSpec;
        let b = Registry::builtin().lookup("swipe").unwrap() as *const CommandSpec;
        assert_eq!(a, b);
        let spec = Registry::builtin().lookup("swipe").unwrap();
        assert_eq!(
            spec.input_schema(),
            Registry::builtin().lookup("swipe").unwrap().input_schema()
        );
    }

    #[test]
    fn schema_matches_param_declarations() {
        let spec = Registry::builtin().lookup("volume_control").unwrap();
        let schema = Value::Object(spec.input_schema());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(
            schema["properties"]["action"]["enum"],
            json!(["increase", "decrease", "mute"])
        );
        assert_eq!(schema["required"], json!(["action"]));
        assert_eq!(schema["properties"]["device"]["type"], "string");
    }

    #[test]
    fn list_devices_does_not_take_device() {
        let spec = Registry::builtin().lookup("list_devices").unwrap();
        assert!(!spec.targets_device());
        assert_eq!(spec.param_summary(), "-");
    }

    #[test]
    fn tap_resolves_coordinates_as_separate_args() {
        let spec = Registry::builtin().lookup("tap").unwrap();
        let args = validate(spec, &json!({"x": 540, "y": 1350})).unwrap();
        assert_eq!(
            spec.resolve(&args),
            vec!["shell", "input", "tap", "540", "1350"]
        );
        assert_eq!(spec.describe_success(&args), "Tapped at (540, 1350)");
    }

    #[test]
    fn wifi_on_enables() {
        let spec = Registry::builtin().lookup("wifi_control").unwrap();
        let args = validate(spec, &json!({"state": "on"})).unwrap();
        assert_eq!(spec.resolve(&args), vec!["shell", "svc", "wifi", "enable"]);
        assert_eq!(spec.describe_success(&args), "WiFi enabled");
    }

    #[test]
    fn swipe_uses_default_duration() {
        let spec = Registry::builtin().lookup("swipe").unwrap();
        let args = validate(
            spec,
            &json!({"startX": 1, "startY": 2, "endX": 3, "endY": 4}),
        )
        .unwrap();
        assert_eq!(
            spec.resolve(&args),
            vec!["shell", "input", "swipe", "1", "2", "3", "4", "300"]
        );
    }

    #[test]
    fn long_press_is_a_stationary_swipe() {
        let spec = Registry::builtin().lookup("long_press").unwrap();
        let args = validate(spec, &json!({"x": 10, "y": 20, "durationMs": 1500})).unwrap();
        assert_eq!(
            spec.resolve(&args),
            vec!["shell", "input", "swipe", "10", "20", "10", "20", "1500"]
        );
    }

    #[test]
    fn type_text_quotes_for_device_shell() {
        let spec = Registry::builtin().lookup("type_text").unwrap();
        let args = validate(spec, &json!({"text": "hi; rm -rf /"})).unwrap();
        let argv = spec.resolve(&args);
        assert_eq!(argv.len(), 4);
        assert_eq!(argv[..3], ["shell", "input", "text"]);
        assert_eq!(argv[3], "'hi;%srm%s-rf%s/'");
    }

    #[test]
    fn type_text_rejects_literal_percent_s() {
        let spec = Registry::builtin().lookup("type_text").unwrap();
        let err = validate(spec, &json!({"text": "100%sure"})).unwrap_err();
        assert_eq!(err.code(), "invalid_format");
        assert!(err.to_string().contains("'%s'"));
        assert!(validate(spec, &json!({"text": "100% sure"})).is_ok());
    }

    #[test]
    fn torch_falls_back_to_su_in_one_invocation() {
        let spec = Registry::builtin().lookup("torch_control").unwrap();
        let args = validate(spec, &json!({"state": "on"})).unwrap();
        let argv = spec.resolve(&args);
        assert_eq!(argv.len(), 2);
        assert_eq!(argv[0], "shell");
        assert_eq!(
            argv[1],
            "echo 1 > /sys/class/leds/flashlight/brightness 2>/dev/null \
             || su -c 'echo 1 > /sys/class/leds/flashlight/brightness'"
        );
        assert_eq!(spec.describe_success(&args), "Torch enabled");
    }

    #[test]
    fn set_setting_keeps_value_in_one_quoted_arg() {
        let spec = Registry::builtin().lookup("set_setting").unwrap();
        let args = validate(
            spec,
            &json!({"key": "screen_off_timeout", "value": "$(whoami)"}),
        )
        .unwrap();
        assert_eq!(
            spec.resolve(&args),
            vec![
                "shell",
                "settings",
                "put",
                "system",
                "screen_off_timeout",
                "'$(whoami)'"
            ]
        );
    }

    #[test]
    fn brightness_percent_scales_to_byte() {
        let spec = Registry::builtin().lookup("set_brightness").unwrap();
        let full = validate(spec, &json!({"percent": 100})).unwrap();
        assert_eq!(spec.resolve(&full).last().map(String::as_str), Some("255"));
        let half = validate(spec, &json!({"percent": 50})).unwrap();
        assert_eq!(spec.resolve(&half).last().map(String::as_str), Some("128"));
    }

    #[test]
    fn music_actions_map_to_media_keycodes() {
        let spec = Registry::builtin().lookup("music_control").unwrap();
        let args = validate(spec, &json!({"action": "next"})).unwrap();
        assert_eq!(spec.resolve(&args), vec!["shell", "input", "keyevent", "87"]);
    }

    #[test]
    fn describe_lists_every_command() {
        let reg = Registry::builtin();
        let v = reg.describe();
        assert_eq!(v.as_array().map(|a| a.len()), Some(reg.len()));
        assert!(v[0]["inputSchema"].is_object());
    }
}
