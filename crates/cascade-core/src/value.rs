//! Concrete value types
//!
//! The value universe globals evaluate into: scalars (string, integer,
//! float, bool, null), lists, and ordered objects. Values are plain data
//! with structural equality; they never alias configuration sources.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// A fully evaluated configuration value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
#[derive(Default)]
pub enum Value {
    /// Null value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value, exact up to i64
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value (UTF-8, indexed by code points)
    String(String),
    /// List of values
    List(Vec<Value>),
    /// Ordered mapping of string keys to values
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as boolean if this is a Bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float or Integer
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as str if this is a String
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as slice if this is a List
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Get as mapping if this is an Object
    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Returns the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "number",
            Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    /// Convert this value to its interpolation string form
    ///
    /// Scalars have a canonical string form: null, true/false, decimal
    /// numbers without trailing zeros, strings as themselves. List and
    /// Object have no string form; composing them into a template is an
    /// evaluation error.
    pub fn stringify(&self) -> Result<String> {
        match self {
            Value::Null => Ok("null".to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::String(s) => Ok(s.clone()),
            Value::List(_) | Value::Object(_) => Err(Error::global_eval(format!(
                "value of type {} cannot be converted to string",
                self.type_name()
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::List(list) => {
                write!(f, "[")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Object(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(m: IndexMap<String, Value>) -> Self {
        Value::Object(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_checks() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Integer(42).as_i64(), Some(42));
        assert_eq!(Value::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::Integer(42).as_f64(), Some(42.0));
        assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
        assert!(Value::List(vec![]).as_list().is_some());
        assert!(Value::Object(IndexMap::new()).as_object().is_some());
    }

    #[test]
    fn test_structural_equality() {
        let a: Value = vec!["x", "y"].into();
        let b: Value = vec!["x", "y"].into();
        assert_eq!(a, b);

        // Integer and Float are distinct even when numerically equal
        assert_ne!(Value::Integer(1), Value::Float(1.0));
    }

    #[test]
    fn test_stringify_scalars() {
        assert_eq!(Value::Null.stringify().unwrap(), "null");
        assert_eq!(Value::Bool(true).stringify().unwrap(), "true");
        assert_eq!(Value::Bool(false).stringify().unwrap(), "false");
        assert_eq!(Value::Integer(666).stringify().unwrap(), "666");
        assert_eq!(Value::Integer(-7).stringify().unwrap(), "-7");
        assert_eq!(Value::String("hi".into()).stringify().unwrap(), "hi");
    }

    #[test]
    fn test_stringify_float_no_trailing_zeros() {
        assert_eq!(Value::Float(2.5).stringify().unwrap(), "2.5");
        assert_eq!(Value::Float(666.0).stringify().unwrap(), "666");
    }

    #[test]
    fn test_stringify_integer_extremes() {
        assert_eq!(
            Value::Integer(i64::MAX).stringify().unwrap(),
            "9223372036854775807"
        );
        assert_eq!(
            Value::Integer(i64::MIN).stringify().unwrap(),
            "-9223372036854775808"
        );
    }

    #[test]
    fn test_stringify_composites_fail() {
        let list: Value = vec!["aaa"].into();
        assert!(list.stringify().is_err());

        let mut map = IndexMap::new();
        map.insert("members".to_string(), vec!["aaa"].into());
        let obj = Value::Object(map);
        let err = obj.stringify().unwrap_err();
        assert!(err.to_string().contains("object"));
    }

    #[test]
    fn test_display() {
        let mut map = IndexMap::new();
        map.insert("members".to_string(), vec!["aaa"].into());
        let obj = Value::Object(map);
        assert_eq!(format!("{}", obj), "{members: [aaa]}");
    }

    #[test]
    fn test_clone_is_deep() {
        let mut map = IndexMap::new();
        map.insert("k".to_string(), Value::Integer(1));
        let a = Value::Object(map);
        let mut b = a.clone();
        if let Value::Object(m) = &mut b {
            m.insert("k".to_string(), Value::Integer(2));
        }
        assert_eq!(a.as_object().unwrap()["k"], Value::Integer(1));
    }
}
