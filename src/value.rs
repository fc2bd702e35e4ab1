//! The runtime cell value produced for a single column in a single record.

use serde::Serialize;
use std::fmt;

/// A single generated cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL-style absence of a value.
    Null,
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// Text, already rendered to its final form.
    Str(String),
}

impl Value {
    /// Renders this value the way it appears in a CSV field (empty for `Null`).
    pub fn to_csv_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_renders_as_empty_csv_field() {
        assert_eq!(Value::Null.to_csv_field(), "");
    }

    #[test]
    fn serializes_untagged_for_json() {
        assert_eq!(serde_json::to_string(&Value::Int(5)).unwrap(), "5");
        assert_eq!(serde_json::to_string(&Value::Str("x".to_owned())).unwrap(), "\"x\"");
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
    }
}
