//! Feature records exchanged between inference stages.
//!
//! A feature record is a `{name, type, value}` triple. The gateway never runs
//! inference itself, but backends and tooling share these types so that a
//! payload can be checked against its declared kind before and after a stage.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared kind of a feature value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// Base64-encoded image bytes.
    Image,
    /// Any JSON number.
    Float,
    /// Integral JSON number.
    Int,
    /// Free text.
    String,
    /// Object with equal-length numeric `x`/`y` arrays and string axis labels.
    Plot,
}

impl FeatureKind {
    /// All supported kinds.
    pub const ALL: [FeatureKind; 5] = [
        FeatureKind::Image,
        FeatureKind::Float,
        FeatureKind::Int,
        FeatureKind::String,
        FeatureKind::Plot,
    ];

    /// Parse a kind from its wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(Self::Image),
            "float" => Some(Self::Float),
            "int" => Some(Self::Int),
            "string" => Some(Self::String),
            "plot" => Some(Self::Plot),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Float => "float",
            Self::Int => "int",
            Self::String => "string",
            Self::Plot => "plot",
        }
    }
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised when a record does not honour its declared kind.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("Missing '{0}' key in row")]
    MissingKey(&'static str),
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),
    #[error("Value for '{name}' does not match type '{kind}': {reason}")]
    InvalidValue {
        name: String,
        kind: FeatureKind,
        reason: String,
    },
}

/// A single typed feature value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FeatureKind,
    pub value: Value,
}

impl FeatureRecord {
    pub fn new(name: impl Into<String>, kind: FeatureKind, value: Value) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
        }
    }

    /// Check that the runtime shape of `value` matches `kind`.
    pub fn validate(&self) -> Result<(), FeatureError> {
        check_value(self.kind, &self.value).map_err(|reason| FeatureError::InvalidValue {
            name: self.name.clone(),
            kind: self.kind,
            reason,
        })
    }
}

/// Validate a list of untyped wire records and convert them into typed ones.
///
/// Every row must carry `name`, `type` and `value`; checking stops at the
/// first offending row.
pub fn validate_records(rows: &[Value]) -> Result<Vec<FeatureRecord>, FeatureError> {
    rows.iter().map(parse_record).collect()
}

fn parse_record(row: &Value) -> Result<FeatureRecord, FeatureError> {
    let kind = row.get("type").ok_or(FeatureError::MissingKey("type"))?;
    let name = row.get("name").ok_or(FeatureError::MissingKey("name"))?;
    let value = row.get("value").ok_or(FeatureError::MissingKey("value"))?;

    let kind = kind
        .as_str()
        .and_then(FeatureKind::parse)
        .ok_or_else(|| FeatureError::UnsupportedType(display_value(kind)))?;
    let name = name.as_str().map(str::to_string).unwrap_or_else(|| display_value(name));

    let record = FeatureRecord::new(name, kind, value.clone());
    record.validate()?;
    Ok(record)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn check_value(kind: FeatureKind, value: &Value) -> Result<(), String> {
    match kind {
        FeatureKind::Image => {
            let encoded = value
                .as_str()
                .ok_or_else(|| format!("expected a base64 string, got {}", json_type(value)))?;
            STANDARD
                .decode(encoded)
                .map(|_| ())
                .map_err(|e| format!("invalid base64 encoding for image: {}", e))
        }
        FeatureKind::Float => match value {
            Value::Number(_) => Ok(()),
            other => Err(format!("expected a number, got {}", json_type(other))),
        },
        FeatureKind::Int => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(()),
            other => Err(format!("expected an integer, got {}", json_type(other))),
        },
        FeatureKind::String => match value {
            Value::String(_) => Ok(()),
            other => Err(format!("expected a string, got {}", json_type(other))),
        },
        FeatureKind::Plot => check_plot(value),
    }
}

fn check_plot(value: &Value) -> Result<(), String> {
    let plot = value
        .as_object()
        .ok_or_else(|| format!("expected an object, got {}", json_type(value)))?;

    for key in ["x", "y", "x_label", "y_label"] {
        if !plot.contains_key(key) {
            return Err("plot must contain keys: x, y, x_label, y_label".to_string());
        }
    }

    let x = numeric_series(&plot["x"]).ok_or("the 'x' value in plot must be a list of numbers")?;
    let y = numeric_series(&plot["y"]).ok_or("the 'y' value in plot must be a list of numbers")?;
    if x != y {
        return Err("the 'x' and 'y' lists in plot must be of the same length".to_string());
    }
    if !plot["x_label"].is_string() {
        return Err("the 'x_label' value in plot must be a string".to_string());
    }
    if !plot["y_label"].is_string() {
        return Err("the 'y_label' value in plot must be a string".to_string());
    }
    Ok(())
}

/// Length of a numeric array, or `None` if it is not one.
fn numeric_series(value: &Value) -> Option<usize> {
    let items = value.as_array()?;
    items.iter().all(Value::is_number).then_some(items.len())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
