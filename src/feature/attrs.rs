use std::sync::Arc;

use serde_json::{json, Value};

/// A single attribute value carried through the pipeline unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(Arc<str>),
}

impl AttrValue {
    /// Convert a JSON property value.  Arrays and objects are kept as their
    /// JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n.as_i64().map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            Value::String(s) => Self::Text(s.as_str().into()),
            other => Self::Text(other.to_string().into()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => json!(b),
            Self::Int(i) => json!(i),
            Self::Float(f) if f.is_finite() => json!(f),
            Self::Float(_) => Value::Null,
            Self::Text(s) => json!(s.as_ref()),
        }
    }
}

impl From<bool> for AttrValue { fn from(v: bool) -> Self { Self::Bool(v) } }
impl From<i64> for AttrValue { fn from(v: i64) -> Self { Self::Int(v) } }
impl From<u32> for AttrValue { fn from(v: u32) -> Self { Self::Int(v as i64) } }
impl From<usize> for AttrValue { fn from(v: usize) -> Self { Self::Int(v as i64) } }
impl From<f64> for AttrValue { fn from(v: f64) -> Self { Self::Float(v) } }
impl From<&str> for AttrValue { fn from(v: &str) -> Self { Self::Text(v.into()) } }
impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(v: Option<T>) -> Self { v.map_or(Self::Null, Into::into) }
}

/// Ordered attribute fields of a feature.  Field order from the source is
/// preserved; setting an existing name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(Arc<str>, AttrValue)>);

impl Attributes {
    #[inline] pub fn new() -> Self { Self::default() }

    #[inline] pub fn len(&self) -> usize { self.0.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.iter().find(|(k, _)| k.as_ref() == name).map(|(_, v)| v)
    }

    pub fn set(&mut self, name: &str, value: impl Into<AttrValue>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k.as_ref() == name) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((name.into(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_ref(), v))
    }

    /// Build from a JSON `properties` object.
    pub fn from_json(properties: &serde_json::Map<String, Value>) -> Self {
        Self(properties.iter().map(|(k, v)| (k.as_str().into(), AttrValue::from_json(v))).collect())
    }

    pub fn to_json(&self) -> serde_json::Map<String, Value> {
        self.0.iter().map(|(k, v)| (k.to_string(), v.to_json())).collect()
    }
}
