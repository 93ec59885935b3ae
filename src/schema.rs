//! Static schema descriptions for resource properties.
//!
//! A [`SchemaType`] describes the shape a [`PropertyValue`](crate::value::PropertyValue)
//! must take. Record types are described by an ordered list of
//! [`FieldDescriptor`]s; every operation visits fields in that order so that
//! diagnostics, encoded objects and replacement lists are deterministic.
//!
//! Typed records are usually declared with [`property_record!`](crate::property_record),
//! which derives the record schema from per-field tags:
//!
//! ```
//! use openfaas_provider::property_record;
//! use openfaas_provider::schema::record_schema;
//!
//! property_record! {
//!     #[derive(Debug, Default)]
//!     pub struct Route {
//!         #[property("host,forceNew")]
//!         pub host: String,
//!         #[property(",optional")]
//!         pub path_prefix: Option<String>,
//!     }
//! }
//!
//! let schema = record_schema::<Route>().unwrap();
//! assert_eq!(schema.fields()[0].name, "host");
//! assert!(schema.fields()[0].force_new);
//! assert!(schema.fields()[1].optional);
//! ```

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use tracing::trace;

use crate::decode::Decode;
use crate::encode::Encode;
use crate::error::{ProviderError, SchemaError};
use crate::value::PropertyMap;

/// The shape of a property value.
#[derive(Debug, Clone)]
pub enum SchemaType {
    /// A boolean.
    Bool,
    /// A number of any width.
    Number,
    /// A string.
    String,
    /// An ordered sequence of elements of one type.
    Array(Box<SchemaType>),
    /// A keyed collection of values of one type. Keys must be strings.
    Map {
        /// The key type.
        key: Box<SchemaType>,
        /// The value type.
        value: Box<SchemaType>,
    },
    /// A record with a fixed, ordered set of fields.
    Record(RecordRef),
    /// A value that may be null.
    Optional(Box<SchemaType>),
}

impl SchemaType {
    /// Create an array type.
    pub fn array(element_type: SchemaType) -> Self {
        Self::Array(Box::new(element_type))
    }

    /// Create a string-keyed map type.
    pub fn map(value_type: SchemaType) -> Self {
        Self::map_with_key(SchemaType::String, value_type)
    }

    /// Create a map type with an explicit key type.
    pub fn map_with_key(key_type: SchemaType, value_type: SchemaType) -> Self {
        Self::Map {
            key: Box::new(key_type),
            value: Box::new(value_type),
        }
    }

    /// Create an optional type.
    pub fn optional(inner: SchemaType) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Refer to the schema of a typed record.
    pub fn record<T: Record>() -> Self {
        Self::Record(RecordRef::of::<T>())
    }

    /// Wrap a hand-built record schema.
    pub fn inline_record(schema: RecordSchema) -> Self {
        Self::Record(RecordRef::Inline(Arc::new(schema)))
    }
}

/// Reject map schemas whose key type is not a string.
pub(crate) fn ensure_string_keys(key: &SchemaType) -> Result<(), SchemaError> {
    match key {
        SchemaType::String => Ok(()),
        _ => Err(SchemaError::NonStringMapKey),
    }
}

/// A reference to a record schema.
///
/// Typed records are resolved lazily through the schema cache, which keeps
/// self-referential records finite.
#[derive(Clone)]
pub enum RecordRef {
    /// A record declared as a Rust type.
    Typed {
        /// The Rust type name.
        name: &'static str,
        /// Resolves the memoized schema.
        resolve: fn() -> Result<Arc<RecordSchema>, SchemaError>,
    },
    /// A hand-built schema.
    Inline(Arc<RecordSchema>),
}

impl RecordRef {
    /// Refer to the schema of `T`.
    pub fn of<T: Record>() -> Self {
        Self::Typed {
            name: std::any::type_name::<T>(),
            resolve: record_schema::<T>,
        }
    }

    /// Resolve the referenced schema.
    pub fn resolve(&self) -> Result<Arc<RecordSchema>, SchemaError> {
        match self {
            Self::Typed { resolve, .. } => resolve(),
            Self::Inline(schema) => Ok(Arc::clone(schema)),
        }
    }

    /// The referenced record's name.
    pub fn name(&self) -> &str {
        match self {
            Self::Typed { name, .. } => name,
            Self::Inline(schema) => schema.name(),
        }
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordRef").field(&self.name()).finish()
    }
}

/// Per-field schema metadata.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// The declared field identifier.
    pub ident: String,
    /// The property name on the wire.
    pub name: String,
    /// Absence or null is not a validation failure.
    pub optional: bool,
    /// A change to this field requires replacing the resource.
    pub force_new: bool,
    /// The field's value type.
    pub value_type: SchemaType,
}

impl FieldDescriptor {
    /// Create a required field whose identifier and wire name are the same.
    pub fn new(name: impl Into<String>, value_type: SchemaType) -> Self {
        let name = name.into();
        Self {
            ident: name.clone(),
            name,
            optional: false,
            force_new: false,
            value_type,
        }
    }

    /// Mark the field as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Mark the field as forcing replacement when changed.
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Parse a field tag of the form `name[,optional][,forceNew]`.
    ///
    /// An empty name derives the wire name from `ident`. The tag `-` excludes
    /// the field from the schema and yields `Ok(None)`.
    pub fn from_tag(
        ident: &str,
        tag: &str,
        value_type: SchemaType,
    ) -> Result<Option<Self>, SchemaError> {
        if tag == "-" {
            return Ok(None);
        }
        let ident = raw_ident(ident);

        let mut opts = tag.split(',');
        let name = match opts.next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => compute_name(ident),
        };

        let mut desc = Self {
            ident: ident.to_string(),
            name,
            optional: false,
            force_new: false,
            value_type,
        };
        for opt in opts {
            match opt {
                "optional" => desc.optional = true,
                "forceNew" => desc.force_new = true,
                other => {
                    return Err(SchemaError::UnknownOption {
                        option: other.to_string(),
                        field: ident.to_string(),
                    })
                },
            }
        }
        Ok(Some(desc))
    }
}

// `r#type` is declared as `type`.
fn raw_ident(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}

/// Derive a wire name from a field identifier by lowercasing its first character.
pub fn compute_name(ident: &str) -> String {
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The ordered field list of a record type.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl RecordSchema {
    /// Start building a record schema.
    pub fn builder(name: impl Into<String>) -> RecordSchemaBuilder {
        RecordSchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            error: None,
        }
    }

    /// The record type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fields, in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field by its declared identifier.
    pub fn field(&self, ident: &str) -> Option<&FieldDescriptor> {
        let ident = raw_ident(ident);
        self.fields.iter().find(|f| f.ident == ident)
    }
}

/// Builder for [`RecordSchema`]. The first tag error is reported by [`build`](Self::build).
#[derive(Debug)]
pub struct RecordSchemaBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
    error: Option<SchemaError>,
}

impl RecordSchemaBuilder {
    /// Add a field described by a tag. See [`FieldDescriptor::from_tag`].
    pub fn tagged(mut self, ident: &str, tag: &str, value_type: SchemaType) -> Self {
        if self.error.is_some() {
            return self;
        }
        match FieldDescriptor::from_tag(ident, tag, value_type) {
            Ok(Some(desc)) => self.fields.push(desc),
            Ok(None) => {},
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Add a field.
    pub fn field(mut self, desc: FieldDescriptor) -> Self {
        self.fields.push(desc);
        self
    }

    /// Finish the schema.
    pub fn build(self) -> Result<RecordSchema, SchemaError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyFieldName {
                    record: self.name.clone(),
                });
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    record: self.name.clone(),
                    name: field.name.clone(),
                });
            }
        }

        Ok(RecordSchema {
            name: self.name,
            fields: self.fields,
        })
    }
}

/// Types with a static schema.
pub trait Schematic {
    /// The schema type describing values of `Self`.
    fn schema_type() -> SchemaType;
}

/// A typed record: a struct whose fields are described by a [`RecordSchema`].
///
/// Implemented by [`property_record!`](crate::property_record).
pub trait Record: Schematic + Decode + Encode + Default + 'static {
    /// Derive the record schema. Called once per type; see [`record_schema`].
    fn describe() -> Result<RecordSchema, SchemaError>;

    /// Build a record from an object's entries.
    fn decode_fields(
        path: &str,
        object: &PropertyMap,
        schema: &RecordSchema,
    ) -> Result<Self, ProviderError>;

    /// Encode the record's fields into an object.
    fn encode_fields(&self, schema: &RecordSchema) -> Result<PropertyMap, ProviderError>;
}

static RECORD_SCHEMAS: OnceLock<RwLock<HashMap<TypeId, Arc<RecordSchema>>>> = OnceLock::new();

/// The memoized schema of record type `T`.
///
/// Derivation is pure, so a failed derivation is simply repeated on the next
/// call rather than cached.
pub fn record_schema<T: Record>() -> Result<Arc<RecordSchema>, SchemaError> {
    let cache = RECORD_SCHEMAS.get_or_init(Default::default);
    let key = TypeId::of::<T>();

    if let Ok(schemas) = cache.read() {
        if let Some(schema) = schemas.get(&key) {
            return Ok(Arc::clone(schema));
        }
    }

    let schema = Arc::new(T::describe()?);
    trace!(
        record = schema.name(),
        fields = schema.fields().len(),
        "Derived record schema"
    );
    if let Ok(mut schemas) = cache.write() {
        return Ok(Arc::clone(schemas.entry(key).or_insert(schema)));
    }
    Ok(schema)
}

impl Schematic for bool {
    fn schema_type() -> SchemaType {
        SchemaType::Bool
    }
}

macro_rules! number_schematic {
    ($($t:ty),*) => {
        $(
            impl Schematic for $t {
                fn schema_type() -> SchemaType {
                    SchemaType::Number
                }
            }
        )*
    };
}

number_schematic!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl Schematic for String {
    fn schema_type() -> SchemaType {
        SchemaType::String
    }
}

impl<T: Schematic> Schematic for Vec<T> {
    fn schema_type() -> SchemaType {
        SchemaType::array(T::schema_type())
    }
}

impl<T: Schematic> Schematic for HashMap<String, T> {
    fn schema_type() -> SchemaType {
        SchemaType::map(T::schema_type())
    }
}

impl<T: Schematic> Schematic for BTreeMap<String, T> {
    fn schema_type() -> SchemaType {
        SchemaType::map(T::schema_type())
    }
}

impl<T: Schematic> Schematic for Option<T> {
    fn schema_type() -> SchemaType {
        SchemaType::optional(T::schema_type())
    }
}

impl<T: Schematic> Schematic for Box<T> {
    fn schema_type() -> SchemaType {
        T::schema_type()
    }
}

/// Declare a struct whose fields form a resource record schema.
///
/// Every field starts with `#[property("<tag>")]`, where the tag is
/// `name[,optional][,forceNew]`; an empty name derives one from the field
/// identifier, and `"-"` leaves the field out of the schema. Other attributes
/// (including doc comments) follow the `property` attribute. The struct must
/// implement [`Default`].
#[macro_export]
macro_rules! property_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                #[property($tag:literal)]
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::schema::Schematic for $name {
            fn schema_type() -> $crate::schema::SchemaType {
                $crate::schema::SchemaType::record::<Self>()
            }
        }

        impl $crate::schema::Record for $name {
            fn describe() -> ::std::result::Result<
                $crate::schema::RecordSchema,
                $crate::error::SchemaError,
            > {
                $crate::schema::RecordSchema::builder(stringify!($name))
                    $(
                        .tagged(
                            stringify!($field),
                            $tag,
                            <$ty as $crate::schema::Schematic>::schema_type(),
                        )
                    )*
                    .build()
            }

            fn decode_fields(
                path: &str,
                object: &$crate::value::PropertyMap,
                schema: &$crate::schema::RecordSchema,
            ) -> ::std::result::Result<Self, $crate::error::ProviderError> {
                #[allow(unused_mut)]
                let mut record = <Self as ::std::default::Default>::default();
                $(
                    if let ::std::option::Option::Some(field) = schema.field(stringify!($field)) {
                        record.$field = $crate::decode::decode_field(path, object, field)?;
                    }
                )*
                ::std::result::Result::Ok(record)
            }

            fn encode_fields(
                &self,
                schema: &$crate::schema::RecordSchema,
            ) -> ::std::result::Result<$crate::value::PropertyMap, $crate::error::ProviderError> {
                #[allow(unused_mut)]
                let mut object = $crate::value::PropertyMap::new();
                $(
                    if let ::std::option::Option::Some(field) = schema.field(stringify!($field)) {
                        object.insert(
                            field.name.clone(),
                            $crate::encode::Encode::encode(&self.$field)?,
                        );
                    }
                )*
                ::std::result::Result::Ok(object)
            }
        }

        impl $crate::decode::Decode for $name {
            fn decode(
                path: &str,
                value: &$crate::value::PropertyValue,
            ) -> ::std::result::Result<Self, $crate::error::ProviderError> {
                $crate::decode::decode_record(path, value)
            }
        }

        impl $crate::encode::Encode for $name {
            fn encode(
                &self,
            ) -> ::std::result::Result<$crate::value::PropertyValue, $crate::error::ProviderError> {
                $crate::encode::encode_record(self)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PropertyValue;

    property_record! {
        #[allow(non_snake_case, dead_code)]
        #[derive(Debug, Default)]
        struct Container {
            #[property("Name,forceNew")]
            name: String,
            #[property("")]
            Image: String,
            #[property(",optional")]
            Ports: Vec<u16>,
            #[property("-")]
            cached: bool,
        }
    }

    property_record! {
        #[derive(Debug, Default)]
        struct BadTag {
            #[property("name,computed")]
            name: String,
        }
    }

    property_record! {
        #[derive(Debug, Default)]
        struct Duplicated {
            #[property("name")]
            first: String,
            #[property("name")]
            second: String,
        }
    }

    property_record! {
        #[derive(Debug, Default, PartialEq)]
        struct Trigger {
            #[property(",optional")]
            r#type: String,
        }
    }

    property_record! {
        /// A record that refers to itself.
        #[derive(Debug, Default)]
        struct Node {
            #[property("value")]
            value: i64,
            #[property("next,optional")]
            next: Option<Box<Node>>,
        }
    }

    #[test]
    fn test_compute_name() {
        assert_eq!(compute_name("EnvVars"), "envVars");
        assert_eq!(compute_name("Service"), "service");
        assert_eq!(compute_name("image"), "image");
        assert_eq!(compute_name("URL"), "uRL");
    }

    #[test]
    fn test_from_tag() {
        let desc = FieldDescriptor::from_tag("Service", "service,forceNew", SchemaType::String)
            .unwrap()
            .unwrap();
        assert_eq!(desc.name, "service");
        assert_eq!(desc.ident, "Service");
        assert!(desc.force_new);
        assert!(!desc.optional);

        let desc = FieldDescriptor::from_tag("EnvVars", ",optional", SchemaType::String)
            .unwrap()
            .unwrap();
        assert_eq!(desc.name, "envVars");
        assert!(desc.optional);

        let desc = FieldDescriptor::from_tag("Image", "", SchemaType::String)
            .unwrap()
            .unwrap();
        assert_eq!(desc.name, "image");

        assert!(FieldDescriptor::from_tag("internal", "-", SchemaType::String)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_from_tag_rejects_unknown_option() {
        let err = FieldDescriptor::from_tag("Image", "image,required", SchemaType::String)
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownOption {
                option: "required".to_string(),
                field: "Image".to_string(),
            }
        );
    }

    #[test]
    fn test_macro_derives_ordered_descriptors() {
        let schema = record_schema::<Container>().unwrap();
        assert_eq!(schema.name(), "Container");

        let names: Vec<_> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Name", "image", "ports"]);
        assert!(schema.fields()[0].force_new);
        assert!(schema.fields()[2].optional);
        assert!(matches!(schema.fields()[2].value_type, SchemaType::Array(_)));
        assert!(schema.field("cached").is_none());
    }

    #[test]
    fn test_record_schema_is_memoized() {
        let first = record_schema::<Container>().unwrap();
        let second = record_schema::<Container>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_record_schema_reports_tag_errors() {
        let err = record_schema::<BadTag>().unwrap_err();
        assert!(matches!(err, SchemaError::UnknownOption { .. }));
        // Still an error on the second derivation.
        assert!(record_schema::<BadTag>().is_err());
    }

    #[test]
    fn test_builder_rejects_duplicate_names() {
        let err = record_schema::<Duplicated>().unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateField {
                record: "Duplicated".to_string(),
                name: "name".to_string(),
            }
        );
    }

    #[test]
    fn test_builder_rejects_empty_names() {
        let err = RecordSchema::builder("Empty")
            .field(FieldDescriptor::new("", SchemaType::String))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::EmptyFieldName {
                record: "Empty".to_string(),
            }
        );
    }

    #[test]
    fn test_raw_identifier_wire_name() {
        let schema = record_schema::<Trigger>().unwrap();
        assert_eq!(schema.fields()[0].name, "type");
        assert_eq!(schema.fields()[0].ident, "type");
        assert!(schema.field("r#type").is_some());

        let mut object = PropertyMap::new();
        object.insert("type".to_string(), PropertyValue::String("cron".to_string()));
        let mut trigger = Trigger::default();
        crate::decode::decode_properties(&object, &mut trigger).unwrap();
        assert_eq!(trigger.r#type, "cron");
        assert_eq!(crate::encode::encode_properties(&trigger).unwrap(), object);
    }

    #[test]
    fn test_self_referential_record() {
        let schema = record_schema::<Node>().unwrap();
        match &schema.fields()[1].value_type {
            SchemaType::Optional(inner) => match inner.as_ref() {
                SchemaType::Record(r) => {
                    let nested = r.resolve().unwrap();
                    assert!(Arc::ptr_eq(&nested, &schema));
                },
                other => panic!("expected record, got {:?}", other),
            },
            other => panic!("expected optional, got {:?}", other),
        }
    }

    #[test]
    fn test_schematic_impls() {
        assert!(matches!(bool::schema_type(), SchemaType::Bool));
        assert!(matches!(u8::schema_type(), SchemaType::Number));
        assert!(matches!(f32::schema_type(), SchemaType::Number));
        assert!(matches!(Option::<String>::schema_type(), SchemaType::Optional(_)));
        match HashMap::<String, i32>::schema_type() {
            SchemaType::Map { key, value } => {
                assert!(matches!(*key, SchemaType::String));
                assert!(matches!(*value, SchemaType::Number));
            },
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_inline_record() {
        let schema = RecordSchema::builder("Inline")
            .field(FieldDescriptor::new("a", SchemaType::String).optional())
            .build()
            .unwrap();
        let ty = SchemaType::inline_record(schema);
        match ty {
            SchemaType::Record(r) => {
                assert_eq!(r.name(), "Inline");
                assert_eq!(r.resolve().unwrap().fields().len(), 1);
            },
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_ensure_string_keys() {
        assert!(ensure_string_keys(&SchemaType::String).is_ok());
        assert_eq!(
            ensure_string_keys(&SchemaType::Number),
            Err(SchemaError::NonStringMapKey)
        );
    }
}
