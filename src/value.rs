//! The dynamic property model exchanged with the engine.
//!
//! A [`PropertyValue`] is the loosely-typed form of a resource property. The
//! engine sends property maps as JSON objects; [`unmarshal_properties`] and
//! [`marshal_properties`] convert between the two, honoring the engine's
//! sentinel for values that are not known yet.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

use crate::error::ProviderError;

/// The string the engine uses on the wire for a value that is not yet known.
pub const UNKNOWN_SENTINEL: &str = "04da6b54-80e4-46f7-96ec-b56ff0331ba9";

/// An object's entries, keyed by property name.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// A dynamically-typed property value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PropertyValue {
    /// An absent value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A number. Every numeric kind travels as an `f64`.
    Number(f64),
    /// A string.
    String(String),
    /// An ordered sequence of values.
    Array(Vec<PropertyValue>),
    /// A string-keyed collection of values.
    Object(PropertyMap),
    /// A value that will exist once a remote operation completes.
    Computed,
}

impl PropertyValue {
    /// The name of this value's kind, as used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Computed => "computed",
        }
    }

    /// Returns true for [`PropertyValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true for [`PropertyValue::Computed`].
    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed)
    }

    /// The elements of an array, or an empty slice for any other kind.
    pub fn array_elements(&self) -> &[PropertyValue] {
        match self {
            Self::Array(elements) => elements,
            _ => &[],
        }
    }

    /// The entries of an object, if this is one.
    pub fn as_object(&self) -> Option<&PropertyMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(value: Vec<PropertyValue>) -> Self {
        Self::Array(value)
    }
}

impl From<PropertyMap> for PropertyValue {
    fn from(value: PropertyMap) -> Self {
        Self::Object(value)
    }
}

/// Options controlling conversion between wire JSON and property values.
#[derive(Debug, Clone, Default)]
pub struct MarshalOptions {
    /// Prefix for marshal error messages, usually the handler label.
    pub label: String,
    /// Keep unknown values as [`PropertyValue::Computed`] instead of dropping them.
    pub keep_unknowns: bool,
    /// Drop object entries whose value is null.
    pub skip_nulls: bool,
}

impl MarshalOptions {
    /// Options used by the provider handlers: keep unknowns, skip nulls.
    pub fn provider(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            keep_unknowns: true,
            skip_nulls: true,
        }
    }

    fn error(&self, message: impl std::fmt::Display) -> ProviderError {
        if self.label.is_empty() {
            ProviderError::Marshal(message.to_string())
        } else {
            ProviderError::Marshal(format!("{}: {}", self.label, message))
        }
    }
}

/// Convert a wire JSON object into a property map.
pub fn unmarshal_properties(
    value: &Value,
    opts: &MarshalOptions,
) -> Result<PropertyMap, ProviderError> {
    match value {
        Value::Object(object) => Ok(unmarshal_object(object, opts)),
        // An absent property bag is an empty one.
        Value::Null => Ok(PropertyMap::new()),
        other => Err(opts.error(format!(
            "properties must be an object, not {}",
            json_type_name(other)
        ))),
    }
}

fn unmarshal_object(object: &Map<String, Value>, opts: &MarshalOptions) -> PropertyMap {
    let mut map = PropertyMap::new();
    for (key, value) in object {
        match unmarshal_value(value, opts) {
            Some(PropertyValue::Null) if opts.skip_nulls => {},
            Some(v) => {
                map.insert(key.clone(), v);
            },
            None => {},
        }
    }
    map
}

/// Returns `None` for an unknown that should be dropped.
fn unmarshal_value(value: &Value, opts: &MarshalOptions) -> Option<PropertyValue> {
    let v = match value {
        Value::Null => PropertyValue::Null,
        Value::Bool(b) => PropertyValue::Bool(*b),
        Value::Number(n) => PropertyValue::Number(n.as_f64().unwrap_or_default()),
        Value::String(s) if s == UNKNOWN_SENTINEL => {
            if !opts.keep_unknowns {
                return None;
            }
            PropertyValue::Computed
        },
        Value::String(s) => PropertyValue::String(s.clone()),
        Value::Array(elements) => PropertyValue::Array(
            elements
                .iter()
                .map(|e| unmarshal_value(e, opts).unwrap_or(PropertyValue::Null))
                .collect(),
        ),
        Value::Object(object) => PropertyValue::Object(unmarshal_object(object, opts)),
    };
    Some(v)
}

/// Convert a property map into a wire JSON object.
pub fn marshal_properties(
    map: &PropertyMap,
    opts: &MarshalOptions,
) -> Result<Value, ProviderError> {
    marshal_object(map, opts).map(Value::Object)
}

fn marshal_object(
    map: &PropertyMap,
    opts: &MarshalOptions,
) -> Result<Map<String, Value>, ProviderError> {
    let mut object = Map::new();
    for (key, value) in map {
        if value.is_null() && opts.skip_nulls {
            continue;
        }
        if let Some(v) = marshal_value(key, value, opts)? {
            object.insert(key.clone(), v);
        }
    }
    Ok(object)
}

/// Returns `Ok(None)` for an unknown that should be dropped.
fn marshal_value(
    key: &str,
    value: &PropertyValue,
    opts: &MarshalOptions,
) -> Result<Option<Value>, ProviderError> {
    let v = match value {
        PropertyValue::Null => Value::Null,
        PropertyValue::Bool(b) => Value::Bool(*b),
        PropertyValue::Number(n) => match Number::from_f64(*n) {
            Some(number) => Value::Number(number),
            None => return Err(opts.error(format!("{} is not a finite number ({})", key, n))),
        },
        PropertyValue::String(s) => Value::String(s.clone()),
        PropertyValue::Array(elements) => {
            let mut array = Vec::with_capacity(elements.len());
            for element in elements {
                array.push(marshal_value(key, element, opts)?.unwrap_or(Value::Null));
            }
            Value::Array(array)
        },
        PropertyValue::Object(map) => Value::Object(marshal_object(map, opts)?),
        PropertyValue::Computed => {
            if !opts.keep_unknowns {
                return Ok(None);
            }
            Value::String(UNKNOWN_SENTINEL.to_string())
        },
    };
    Ok(Some(v))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
