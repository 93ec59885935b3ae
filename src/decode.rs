//! Conversion from property values into typed structures.
//!
//! Decoding stops at the first error: the caller needs one fully populated
//! value or none at all. A required record field that is absent is an error
//! here, while an absent optional field takes its type's default.
//!
//! Every numeric target accepts the `f64` carrier. Integer targets truncate
//! toward zero and saturate at their bounds; NaN decodes as zero.

use std::collections::{BTreeMap, HashMap};

use crate::check::CheckFailure;
use crate::error::ProviderError;
use crate::path;
use crate::schema::{record_schema, FieldDescriptor, Record};
use crate::value::{PropertyMap, PropertyValue};

/// Types that can be decoded from a property value.
pub trait Decode: Sized {
    /// Decode `value`, reporting errors at `path`.
    fn decode(path: &str, value: &PropertyValue) -> Result<Self, ProviderError>;
}

/// Decode a property map into `dest`.
///
/// `dest` is only written once the whole map has decoded successfully.
pub fn decode_properties<T: Decode>(map: &PropertyMap, dest: &mut T) -> Result<(), ProviderError> {
    *dest = T::decode("", &PropertyValue::Object(map.clone()))?;
    Ok(())
}

/// Decode an object into record type `T`.
pub fn decode_record<T: Record>(path: &str, value: &PropertyValue) -> Result<T, ProviderError> {
    let schema = record_schema::<T>()?;
    match value.as_object() {
        Some(object) => T::decode_fields(path, object, &schema),
        None => Err(mismatch(path, "object", value)),
    }
}

/// Decode one record field from its parent object.
pub fn decode_field<T: Decode + Default>(
    parent: &str,
    object: &PropertyMap,
    field: &FieldDescriptor,
) -> Result<T, ProviderError> {
    match object.get(&field.name) {
        None | Some(PropertyValue::Null) => {
            if field.optional {
                Ok(T::default())
            } else {
                Err(CheckFailure::missing_required(parent, &field.name).into())
            }
        },
        Some(value) => T::decode(&path::field(parent, &field.name), value),
    }
}

fn mismatch(path: &str, expected: &str, actual: &PropertyValue) -> ProviderError {
    CheckFailure::type_mismatch(path, expected, actual).into()
}

impl Decode for bool {
    fn decode(path: &str, value: &PropertyValue) -> Result<Self, ProviderError> {
        match value {
            PropertyValue::Bool(b) => Ok(*b),
            other => Err(mismatch(path, "bool", other)),
        }
    }
}

macro_rules! decode_number {
    ($($t:ty),*) => {
        $(
            impl Decode for $t {
                #[allow(clippy::unnecessary_cast)]
                fn decode(path: &str, value: &PropertyValue) -> Result<Self, ProviderError> {
                    match value {
                        PropertyValue::Number(n) => Ok(*n as $t),
                        other => Err(mismatch(path, "number", other)),
                    }
                }
            }
        )*
    };
}

decode_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl Decode for String {
    fn decode(path: &str, value: &PropertyValue) -> Result<Self, ProviderError> {
        match value {
            PropertyValue::String(s) => Ok(s.clone()),
            other => Err(mismatch(path, "string", other)),
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(path: &str, value: &PropertyValue) -> Result<Self, ProviderError> {
        let PropertyValue::Array(elements) = value else {
            return Err(mismatch(path, "array", value));
        };
        elements
            .iter()
            .enumerate()
            .map(|(i, e)| T::decode(&path::index(path, i), e))
            .collect()
    }
}

impl<T: Decode> Decode for HashMap<String, T> {
    fn decode(path: &str, value: &PropertyValue) -> Result<Self, ProviderError> {
        let Some(entries) = value.as_object() else {
            return Err(mismatch(path, "object", value));
        };
        entries
            .iter()
            .map(|(k, e)| Ok((k.clone(), T::decode(&path::field(path, k), e)?)))
            .collect()
    }
}

impl<T: Decode> Decode for BTreeMap<String, T> {
    fn decode(path: &str, value: &PropertyValue) -> Result<Self, ProviderError> {
        let Some(entries) = value.as_object() else {
            return Err(mismatch(path, "object", value));
        };
        entries
            .iter()
            .map(|(k, e)| Ok((k.clone(), T::decode(&path::field(path, k), e)?)))
            .collect()
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(path: &str, value: &PropertyValue) -> Result<Self, ProviderError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::decode(path, value).map(Some)
        }
    }
}

impl<T: Decode> Decode for Box<T> {
    fn decode(path: &str, value: &PropertyValue) -> Result<Self, ProviderError> {
        T::decode(path, value).map(Box::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::value::{unmarshal_properties, MarshalOptions};
    use serde_json::json;

    crate::property_record! {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct Limits {
            #[property("memory")]
            memory: String,
            #[property("cpu,optional")]
            cpu: Option<f64>,
        }
    }

    crate::property_record! {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct Function {
            #[property("service,forceNew")]
            service: String,
            #[property("image")]
            image: String,
            #[property("envVars,optional")]
            env_vars: HashMap<String, String>,
            #[property("replicas,optional")]
            replicas: u32,
            #[property("limits,optional")]
            limits: Option<Limits>,
            #[property("secrets,optional")]
            secrets: Vec<String>,
            #[property("-")]
            revision: u64,
        }
    }

    crate::property_record! {
        #[allow(dead_code)]
        #[derive(Debug, Default)]
        struct Broken {
            #[property("name,sometimes")]
            name: String,
        }
    }

    fn props(value: serde_json::Value) -> PropertyMap {
        unmarshal_properties(&value, &MarshalOptions::provider("test")).unwrap()
    }

    #[test]
    fn test_decode_full_record() {
        let map = props(json!({
            "service": "a",
            "image": "v1",
            "envVars": {"K": "V"},
            "replicas": 3,
            "limits": {"memory": "128Mi", "cpu": 0.5},
            "secrets": ["s1", "s2"],
        }));

        let mut f = Function::default();
        decode_properties(&map, &mut f).unwrap();

        assert_eq!(f.service, "a");
        assert_eq!(f.image, "v1");
        assert_eq!(f.env_vars.get("K").map(String::as_str), Some("V"));
        assert_eq!(f.replicas, 3);
        assert_eq!(
            f.limits,
            Some(Limits {
                memory: "128Mi".to_string(),
                cpu: Some(0.5),
            })
        );
        assert_eq!(f.secrets, vec!["s1".to_string(), "s2".to_string()]);
    }

    #[test]
    fn test_decode_optional_fields_default() {
        let mut f = Function {
            replicas: 9,
            revision: 7,
            ..Default::default()
        };
        decode_properties(&props(json!({"service": "a", "image": "v1"})), &mut f).unwrap();

        assert_eq!(f.replicas, 0);
        assert!(f.env_vars.is_empty());
        assert!(f.limits.is_none());
        // Fields outside the schema are left at their default.
        assert_eq!(f.revision, 0);
    }

    #[test]
    fn test_decode_missing_required_is_error() {
        let mut f = Function::default();
        let err = decode_properties(&props(json!({"image": "v1"})), &mut f).unwrap_err();
        assert_eq!(err.to_string(), "service: missing required property service");
        assert_eq!(f, Function::default());
    }

    #[test]
    fn test_decode_nested_missing_required() {
        let mut f = Function::default();
        let err = decode_properties(
            &props(json!({"service": "a", "image": "v1", "limits": {"cpu": 1}})),
            &mut f,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "limits.memory: missing required property memory");
    }

    #[test]
    fn test_decode_type_mismatch_stops_at_first_error() {
        let mut f = Function::default();
        let err = decode_properties(
            &props(json!({"service": 1, "image": 2, "secrets": ["ok", 3]})),
            &mut f,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "service: expected a string value, received a number"
        );

        let err = decode_properties(
            &props(json!({"service": "a", "image": "v1", "secrets": ["ok", 3]})),
            &mut f,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "secrets[1]: expected a string value, received a number"
        );
    }

    #[test]
    fn test_decode_computed_is_mismatch() {
        let mut map = props(json!({"service": "a"}));
        map.insert("image".to_string(), PropertyValue::Computed);
        let mut f = Function::default();
        let err = decode_properties(&map, &mut f).unwrap_err();
        assert_eq!(
            err.to_string(),
            "image: expected a string value, received a computed"
        );
    }

    #[test]
    fn test_decode_numeric_conversions() {
        assert_eq!(i32::decode("", &PropertyValue::Number(3.9)).unwrap(), 3);
        assert_eq!(i32::decode("", &PropertyValue::Number(-3.9)).unwrap(), -3);
        assert_eq!(u8::decode("", &PropertyValue::Number(300.0)).unwrap(), 255);
        assert_eq!(u32::decode("", &PropertyValue::Number(-1.0)).unwrap(), 0);
        assert_eq!(i64::decode("", &PropertyValue::Number(f64::NAN)).unwrap(), 0);
        assert_eq!(f32::decode("", &PropertyValue::Number(0.5)).unwrap(), 0.5);
    }

    #[test]
    fn test_decode_option_and_box() {
        assert_eq!(Option::<String>::decode("", &PropertyValue::Null).unwrap(), None);
        assert_eq!(
            Option::<String>::decode("", &PropertyValue::from("x")).unwrap(),
            Some("x".to_string())
        );
        assert!(*Box::<bool>::decode("", &PropertyValue::Bool(true)).unwrap());
    }

    #[test]
    fn test_decode_btree_map() {
        let mut entries = PropertyMap::new();
        entries.insert("b".to_string(), PropertyValue::Number(2.0));
        entries.insert("a".to_string(), PropertyValue::Number(1.0));
        let decoded =
            BTreeMap::<String, i32>::decode("labels", &PropertyValue::Object(entries)).unwrap();
        assert_eq!(decoded.into_iter().collect::<Vec<_>>(), vec![
            ("a".to_string(), 1),
            ("b".to_string(), 2)
        ]);

        let err = BTreeMap::<String, i32>::decode("labels", &PropertyValue::Bool(true))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "labels: expected a object value, received a bool"
        );
    }

    #[test]
    fn test_checked_properties_always_decode() {
        let with_nulls = MarshalOptions {
            keep_unknowns: true,
            ..Default::default()
        };
        let inputs = vec![
            json!({"service": "echo", "image": "alpine"}),
            json!({
                "service": "echo",
                "image": "alpine",
                "envVars": {"A": "1"},
                "replicas": 3,
                "limits": {"memory": "128Mi", "cpu": 0.5},
                "secrets": ["db"],
            }),
            json!({
                "service": "echo",
                "image": "alpine",
                "limits": {"memory": "64Mi", "cpu": null},
            }),
            json!({
                "service": "echo",
                "image": "alpine",
                "limits": null,
                "envVars": null,
                "secrets": null,
            }),
            json!({"service": "echo", "image": "alpine", "unrelated": {"ignored": true}}),
        ];

        for input in inputs {
            let map = unmarshal_properties(&input, &with_nulls).unwrap();
            let failures = crate::check::check_record::<Function>(&map).unwrap();
            assert!(failures.is_empty(), "{}: {:?}", input, failures);

            let mut f = Function::default();
            assert!(decode_properties(&map, &mut f).is_ok(), "{}", input);
            assert_eq!(f.service, "echo");
        }
    }

    #[test]
    fn test_decode_schema_error_is_hard_error() {
        let mut b = Broken::default();
        let err = decode_properties(&props(json!({"name": "x"})), &mut b).unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Schema(SchemaError::UnknownOption { .. })
        ));
    }
}
