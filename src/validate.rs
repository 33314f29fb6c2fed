//! Request validation: untyped JSON params -> `ValidatedArgs`.
//!
//! Rules applied uniformly for every command:
//!   - `params` must be an object (`null` is treated as `{}`)
//!   - unknown keys are rejected
//!   - required keys must be present and non-null; optional keys fall back to
//!     their declared default
//!   - integers must be JSON integers (or floats with no fractional part)
//!     within the declared inclusive range
//!   - strings must be non-empty, length-bounded and match the declared
//!     character set or enum

use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::registry::{CommandSpec, DEVICE_PARAM, ParamDefault, ParamKind, ParamSpec};

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Int(i64),
    Text(String),
}

/// Output of a successful [`validate`]. Holds exactly the declared params that
/// were supplied or defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidatedArgs {
    values: BTreeMap<&'static str, ArgValue>,
}

impl ValidatedArgs {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    /// Integer param; declared required/defaulted ints are always present.
    pub fn int(&self, name: &str) -> i64 {
        match self.values.get(name) {
            Some(ArgValue::Int(n)) => *n,
            _ => 0,
        }
    }

    /// String param; declared required/defaulted strings are always present.
    pub fn text(&self, name: &str) -> &str {
        match self.values.get(name) {
            Some(ArgValue::Text(s)) => s,
            _ => "",
        }
    }

    pub fn device(&self) -> Option<&str> {
        match self.values.get(DEVICE_PARAM) {
            Some(ArgValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Log-safe JSON rendering; sensitive values become `<redacted N chars>`.
    pub fn redacted(&self, spec: &CommandSpec) -> Value {
        let mut out = Map::new();
        for (name, value) in &self.values {
            let sensitive = spec.param_spec(name).is_some_and(|p| p.sensitive);
            let v = match value {
                ArgValue::Int(n) => json!(n),
                ArgValue::Text(s) if sensitive => {
                    json!(format!("<redacted {} chars>", s.chars().count()))
                }
                ArgValue::Text(s) => json!(s),
            };
            out.insert((*name).to_string(), v);
        }
        Value::Object(out)
    }
}

/// Apply `spec`'s parameter schema to `raw`.
pub fn validate(spec: &CommandSpec, raw: &Value) -> Result<ValidatedArgs, ValidationError> {
    let empty = Map::new();
    let obj = match raw {
        Value::Object(m) => m,
        Value::Null => &empty,
        _ => return Err(ValidationError::NotAnObject),
    };

    if let Some(unknown) = obj.keys().find(|k| spec.param_spec(k).is_none()) {
        return Err(ValidationError::UnknownField {
            field: unknown.clone(),
        });
    }

    let mut values = BTreeMap::new();
    for p in &spec.params {
        match obj.get(p.name) {
            Some(v) if !v.is_null() => {
                values.insert(p.name, check_param(p, v)?);
            }
            _ => {
                if let Some(d) = p.default {
                    values.insert(p.name, default_value(d));
                } else if p.required {
                    return Err(ValidationError::MissingField {
                        field: p.name.to_string(),
                    });
                }
            }
        }
    }
    Ok(ValidatedArgs { values })
}

fn default_value(d: ParamDefault) -> ArgValue {
    match d {
        ParamDefault::Int(n) => ArgValue::Int(n),
        ParamDefault::Choice(s) => ArgValue::Text(s.to_string()),
    }
}

fn check_param(p: &ParamSpec, v: &Value) -> Result<ArgValue, ValidationError> {
    let field = || p.name.to_string();
    match &p.kind {
        ParamKind::Integer { min, max } => {
            let n = as_integer(v).ok_or_else(|| ValidationError::WrongType {
                field: field(),
                expected: "an integer",
            })?;
            if n < i128::from(*min) || n > i128::from(*max) {
                return Err(ValidationError::OutOfRange {
                    field: field(),
                    value: n,
                    min: *min,
                    max: *max,
                });
            }
            // in range, so it fits
            Ok(ArgValue::Int(n as i64))
        }
        ParamKind::Choice(allowed) => {
            let s = v.as_str().ok_or_else(|| ValidationError::WrongType {
                field: field(),
                expected: "a string",
            })?;
            if !allowed.contains(&s) {
                return Err(ValidationError::NotInEnum {
                    field: field(),
                    value: s.to_string(),
                    allowed: allowed.to_vec(),
                });
            }
            Ok(ArgValue::Text(s.to_string()))
        }
        ParamKind::Text { max_len, format } => {
            let s = v.as_str().ok_or_else(|| ValidationError::WrongType {
                field: field(),
                expected: "a string",
            })?;
            let len = s.chars().count();
            if len == 0 {
                return Err(ValidationError::InvalidFormat {
                    field: field(),
                    reason: "must not be empty".into(),
                });
            }
            if len > *max_len {
                return Err(ValidationError::InvalidFormat {
                    field: field(),
                    reason: format!("longer than {max_len} characters"),
                });
            }
            if s.contains('\0') {
                return Err(ValidationError::InvalidFormat {
                    field: field(),
                    reason: "contains a NUL character".into(),
                });
            }
            if !format.accepts(s) {
                return Err(ValidationError::InvalidFormat {
                    field: field(),
                    reason: format.violation().into(),
                });
            }
            Ok(ArgValue::Text(s.to_string()))
        }
    }
}

/// Whole numbers of any magnitude; values beyond `i128` saturate, which still
/// lands them outside every declared range.
fn as_integer(v: &Value) -> Option<i128> {
    if let Some(n) = v.as_i64() {
        return Some(n.into());
    }
    if let Some(n) = v.as_u64() {
        return Some(n.into());
    }
    let f = v.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 {
        Some(f as i128)
    } else {
        None
    }
}
