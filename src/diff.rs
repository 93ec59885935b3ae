//! Structural comparison of old and new property values.
//!
//! A diff walks the whole value even after it has found a change, because
//! every changed `forceNew` field must be reported as a replacement. Both
//! sides are expected to conform to the schema already; a kind mismatch is
//! a hard error here rather than a check failure.
//!
//! A new value that is still unknown always counts as a change. The old
//! value is never unknown: it was applied by a previous operation, so an
//! unknown there means the caller passed the wrong properties.

use crate::check::CheckFailure;
use crate::error::ProviderError;
use crate::path;
use crate::schema::{ensure_string_keys, Record, SchemaType};
use crate::value::{PropertyMap, PropertyValue};

/// The outcome of a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Whether anything differs.
    pub changed: bool,
    /// Paths of changed fields that force replacement, in traversal order.
    pub replaces: Vec<String>,
}

/// Diff two property maps against a schema.
pub fn diff_properties(
    olds: &PropertyMap,
    news: &PropertyMap,
    schema: &SchemaType,
) -> Result<DiffResult, ProviderError> {
    diff(
        &PropertyValue::Object(olds.clone()),
        &PropertyValue::Object(news.clone()),
        schema,
    )
}

/// Diff two property maps against the schema of record type `T`.
pub fn diff_record<T: Record>(
    olds: &PropertyMap,
    news: &PropertyMap,
) -> Result<DiffResult, ProviderError> {
    diff_properties(olds, news, &T::schema_type())
}

/// Diff two values against a schema.
pub fn diff(
    old: &PropertyValue,
    new: &PropertyValue,
    schema: &SchemaType,
) -> Result<DiffResult, ProviderError> {
    let mut replaces = Vec::new();
    let changed = diff_property("", old, new, schema, &mut replaces)?;
    Ok(DiffResult { changed, replaces })
}

fn expect_kind(
    path: &str,
    expected: &str,
    value: &PropertyValue,
    matches: bool,
) -> Result<(), ProviderError> {
    if matches {
        Ok(())
    } else {
        Err(CheckFailure::type_mismatch(path, expected, value).into())
    }
}

fn diff_property(
    path: &str,
    old: &PropertyValue,
    new: &PropertyValue,
    schema: &SchemaType,
    replaces: &mut Vec<String>,
) -> Result<bool, ProviderError> {
    if old.is_computed() {
        return Err(ProviderError::ComputedOldValue(path.to_string()));
    }
    if new.is_computed() {
        return Ok(true);
    }

    match schema {
        SchemaType::Bool => match (old, new) {
            (PropertyValue::Bool(o), PropertyValue::Bool(n)) => Ok(o != n),
            (PropertyValue::Bool(_), other) | (other, _) => {
                Err(CheckFailure::type_mismatch(path, "bool", other).into())
            },
        },
        SchemaType::Number => match (old, new) {
            (PropertyValue::Number(o), PropertyValue::Number(n)) => Ok(o != n),
            (PropertyValue::Number(_), other) | (other, _) => {
                Err(CheckFailure::type_mismatch(path, "number", other).into())
            },
        },
        SchemaType::String => match (old, new) {
            (PropertyValue::String(o), PropertyValue::String(n)) => Ok(o != n),
            (PropertyValue::String(_), other) | (other, _) => {
                Err(CheckFailure::type_mismatch(path, "string", other).into())
            },
        },
        SchemaType::Array(element_type) => {
            expect_kind(path, "array", old, matches!(old, PropertyValue::Array(_)))?;
            expect_kind(path, "array", new, matches!(new, PropertyValue::Array(_)))?;
            let (olds, news) = (old.array_elements(), new.array_elements());

            let mut changed = olds.len() != news.len();
            for (i, (o, n)) in olds.iter().zip(news).enumerate() {
                changed |= diff_property(&path::index(path, i), o, n, element_type, replaces)?;
            }
            Ok(changed)
        },
        SchemaType::Map {
            key,
            value: value_type,
        } => {
            ensure_string_keys(key)?;
            let (Some(olds), Some(news)) = (old.as_object(), new.as_object()) else {
                let offender = if old.as_object().is_none() { old } else { new };
                return Err(CheckFailure::type_mismatch(path, "object", offender).into());
            };

            let mut changed = false;
            for (k, o) in olds {
                match news.get(k) {
                    Some(n) => {
                        let entry_path = path::field(path, k);
                        changed |= diff_property(&entry_path, o, n, value_type, replaces)?;
                    },
                    None => changed = true,
                }
            }
            changed |= news.keys().any(|k| !olds.contains_key(k));
            Ok(changed)
        },
        SchemaType::Record(record) => {
            let schema = record.resolve()?;
            let (Some(olds), Some(news)) = (old.as_object(), new.as_object()) else {
                let offender = if old.as_object().is_none() { old } else { new };
                return Err(CheckFailure::type_mismatch(path, "object", offender).into());
            };

            let mut changed = false;
            for field in schema.fields() {
                let field_path = path::field(path, &field.name);
                let field_changed = match (olds.get(&field.name), news.get(&field.name)) {
                    (None, None) => false,
                    (Some(o), Some(n)) => {
                        diff_property(&field_path, o, n, &field.value_type, replaces)?
                    },
                    _ => true,
                };
                if field_changed && field.force_new {
                    replaces.push(field_path);
                }
                changed |= field_changed;
            }
            Ok(changed)
        },
        SchemaType::Optional(inner) => match (old.is_null(), new.is_null()) {
            (true, true) => Ok(false),
            (false, false) => diff_property(path, old, new, inner, replaces),
            _ => Ok(true),
        },
    }
}
