//! Validation of property values against a schema.
//!
//! Checking collects every failure it can find instead of stopping at the
//! first one, so the engine can report all per-property problems at once.
//! Only a malformed schema aborts the call.
//!
//! # Example
//!
//! ```
//! use openfaas_provider::check::check_properties;
//! use openfaas_provider::schema::{FieldDescriptor, RecordSchema, SchemaType};
//! use openfaas_provider::value::{PropertyMap, PropertyValue};
//!
//! let schema = SchemaType::inline_record(
//!     RecordSchema::builder("Function")
//!         .field(FieldDescriptor::new("service", SchemaType::String).force_new())
//!         .field(FieldDescriptor::new("image", SchemaType::String))
//!         .build()
//!         .unwrap(),
//! );
//!
//! let mut news = PropertyMap::new();
//! news.insert("image".to_string(), PropertyValue::from("v1"));
//!
//! let failures = check_properties(&news, &schema).unwrap();
//! assert_eq!(failures.len(), 1);
//! assert_eq!(failures[0].property, "service");
//! assert_eq!(failures[0].reason, "missing required property service");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::path;
use crate::schema::{ensure_string_keys, Record, SchemaType};
use crate::value::{PropertyMap, PropertyValue};

/// A property that does not conform to its schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    /// The path of the offending property.
    pub property: String,
    /// Why the property is invalid.
    pub reason: String,
}

impl CheckFailure {
    /// A value of the wrong kind.
    pub fn type_mismatch(path: &str, expected: &str, actual: &PropertyValue) -> Self {
        Self {
            property: path.to_string(),
            reason: format!(
                "expected a {} value, received a {}",
                expected,
                actual.type_name()
            ),
        }
    }

    /// A required record field that is absent or null.
    pub fn missing_required(parent: &str, name: &str) -> Self {
        Self {
            property: path::field(parent, name),
            reason: format!("missing required property {}", name),
        }
    }
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.property.is_empty() {
            f.write_str(&self.reason)
        } else {
            write!(f, "{}: {}", self.property, self.reason)
        }
    }
}

impl From<CheckFailure> for ProviderError {
    fn from(failure: CheckFailure) -> Self {
        ProviderError::InvalidProperty(failure)
    }
}

/// Check a property map against a schema.
///
/// Returns the failures found, in traversal order. An empty list means the
/// properties conform.
pub fn check_properties(
    map: &PropertyMap,
    schema: &SchemaType,
) -> Result<Vec<CheckFailure>, ProviderError> {
    check(&PropertyValue::Object(map.clone()), schema)
}

/// Check a property map against the schema of record type `T`.
pub fn check_record<T: Record>(map: &PropertyMap) -> Result<Vec<CheckFailure>, ProviderError> {
    check_properties(map, &T::schema_type())
}

/// Check a single value against a schema.
pub fn check(
    value: &PropertyValue,
    schema: &SchemaType,
) -> Result<Vec<CheckFailure>, ProviderError> {
    let mut failures = Vec::new();
    check_property("", value, schema, &mut failures)?;
    Ok(failures)
}

fn check_property(
    path: &str,
    value: &PropertyValue,
    schema: &SchemaType,
    failures: &mut Vec<CheckFailure>,
) -> Result<(), ProviderError> {
    // An unknown value cannot be validated yet.
    if value.is_computed() {
        return Ok(());
    }

    match schema {
        SchemaType::Bool => {
            if !matches!(value, PropertyValue::Bool(_)) {
                failures.push(CheckFailure::type_mismatch(path, "bool", value));
            }
        },
        SchemaType::Number => {
            if !matches!(value, PropertyValue::Number(_)) {
                failures.push(CheckFailure::type_mismatch(path, "number", value));
            }
        },
        SchemaType::String => {
            if !matches!(value, PropertyValue::String(_)) {
                failures.push(CheckFailure::type_mismatch(path, "string", value));
            }
        },
        SchemaType::Array(element_type) => {
            if !matches!(value, PropertyValue::Array(_)) {
                failures.push(CheckFailure::type_mismatch(path, "array", value));
            }
            for (i, element) in value.array_elements().iter().enumerate() {
                check_property(&path::index(path, i), element, element_type, failures)?;
            }
        },
        SchemaType::Map {
            key,
            value: value_type,
        } => {
            ensure_string_keys(key)?;
            match value.as_object() {
                Some(entries) => {
                    for (k, entry) in entries {
                        check_property(&path::field(path, k), entry, value_type, failures)?;
                    }
                },
                None => failures.push(CheckFailure::type_mismatch(path, "object", value)),
            }
        },
        SchemaType::Record(record) => {
            let schema = record.resolve()?;
            let Some(entries) = value.as_object() else {
                failures.push(CheckFailure::type_mismatch(path, "object", value));
                return Ok(());
            };
            for field in schema.fields() {
                match entries.get(&field.name) {
                    None | Some(PropertyValue::Null) => {
                        if !field.optional {
                            failures.push(CheckFailure::missing_required(path, &field.name));
                        }
                    },
                    Some(entry) => {
                        let field_path = path::field(path, &field.name);
                        check_property(&field_path, entry, &field.value_type, failures)?;
                    },
                }
            }
        },
        SchemaType::Optional(inner) => {
            if !value.is_null() {
                check_property(path, value, inner, failures)?;
            }
        },
    }

    Ok(())
}
