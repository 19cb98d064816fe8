//! Universal value type for node and relationship attributes.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute value.
///
/// Covers what the project exporter can emit:
/// - Scalars: Bool, Int, Float, String
/// - Containers: List, Map
///
/// Serialized untagged so query results read as plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

// ============================================================================
// Accessors
// ============================================================================

impl Value {
    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    /// Attempt to extract as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Attempt to extract as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Attempt to extract as &str
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Numeric components of a scalar or a list of numbers.
    ///
    /// `None` when any element is non-numeric.
    pub fn numeric_components(&self) -> Option<Vec<f64>> {
        match self {
            Value::Int(_) | Value::Float(_) => self.as_float().map(|f| vec![f]),
            Value::List(items) if !items.is_empty() => {
                items.iter().map(Value::as_float).collect()
            }
            _ => None,
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<usize> for Value { fn from(v: usize) -> Self { Value::Int(v as i64) } }
impl From<f32> for Value { fn from(v: f32) -> Self { Value::Float(v as f64) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self { Value::List(v.into_iter().map(Into::into).collect()) }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

/// Exporter JSON → attribute value. Integral numbers stay integers.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

// ============================================================================
// Comparison
// ============================================================================

impl Value {
    /// Ordered comparison. Returns None for incompatible types (SQL NULL behavior).
    pub fn compare(&self, other: &Value) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }

    /// Equality used by property filters: numbers compare across Int/Float.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.compare(other) == Some(std::cmp::Ordering::Equal)
            }
            _ => self == other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from("hello"), Value::String("hello".into()));
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from(2.5), Value::Float(2.5));
        assert_eq!(Value::from(true), Value::Bool(true));
    }

    #[test]
    fn test_from_json_keeps_integers() {
        let v = Value::from(serde_json::json!({"w": 1920, "fps": 29.97, "pos": [960, 540.5]}));
        let Value::Map(m) = v else { panic!("expected map") };
        assert_eq!(m["w"], Value::Int(1920));
        assert_eq!(m["fps"], Value::Float(29.97));
        assert_eq!(m["pos"], Value::List(vec![Value::Int(960), Value::Float(540.5)]));
    }

    #[test]
    fn test_null_comparison() {
        assert_eq!(Value::Null.compare(&Value::Null), None);
        assert_eq!(Value::Null.compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_numeric_comparison() {
        assert_eq!(
            Value::Int(1).compare(&Value::Float(1.5)),
            Some(std::cmp::Ordering::Less)
        );
        assert!(Value::Int(30).loosely_equals(&Value::Float(30.0)));
        assert!(!Value::Int(30).loosely_equals(&Value::String("30".into())));
    }

    #[test]
    fn test_numeric_components() {
        assert_eq!(Value::Int(3).numeric_components(), Some(vec![3.0]));
        assert_eq!(Value::from(vec![1.0, 2.0]).numeric_components(), Some(vec![1.0, 2.0]));
        assert_eq!(Value::from(vec!["a"]).numeric_components(), None);
        assert_eq!(Value::Null.numeric_components(), None);
    }

    #[test]
    fn test_untagged_serialization() {
        let json = serde_json::to_string(&Value::from(vec![1, 2])).unwrap();
        assert_eq!(json, "[1,2]");
    }
}
