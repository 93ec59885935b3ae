//! OpenFaaS resource provider
//!
//! This crate implements a resource provider that manages OpenFaaS functions
//! for an infrastructure-as-code engine. At its core is a schema-driven
//! property engine that translates between the engine's loosely-typed
//! property maps and statically described Rust records.
//!
//! # Overview
//!
//! - **Property model** ([`value`]): dynamic values, including values that are
//!   not known yet, and their JSON wire form
//! - **Schemas** ([`schema`]): record descriptions declared with [`property_record!`]
//! - **Check / Diff / Decode / Encode**: four traversals of a value and its schema
//! - **Provider** ([`provider`], [`function`]): the RPC handler surface and the
//!   `openfaas:system:Function` resource
//! - **Logging** ([`logging`]): `tracing` subscriber setup
//!
//! # Quick Start
//!
//! ```
//! use openfaas_provider::check::check_record;
//! use openfaas_provider::diff::diff_record;
//! use openfaas_provider::function::Function;
//! use openfaas_provider::value::{unmarshal_properties, MarshalOptions};
//! use serde_json::json;
//!
//! let opts = MarshalOptions::provider("example");
//! let olds = unmarshal_properties(&json!({"service": "a", "image": "v1"}), &opts).unwrap();
//! let news = unmarshal_properties(&json!({"service": "b", "image": "v1"}), &opts).unwrap();
//!
//! assert!(check_record::<Function>(&news).unwrap().is_empty());
//!
//! let diff = diff_record::<Function>(&olds, &news).unwrap();
//! assert!(diff.changed);
//! assert_eq!(diff.replaces, vec!["service".to_string()]);
//! ```
//!
//! # Failures and errors
//!
//! Check reports non-conforming properties as [`CheckFailure`]s and keeps
//! going. Decode, Encode and Diff stop at the first problem and return a
//! [`ProviderError`]; so does any traversal that meets a malformed schema.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod check;
pub mod client;
pub mod config;
pub mod decode;
pub mod diff;
pub mod encode;
pub mod error;
pub mod function;
pub mod logging;
pub mod path;
pub mod provider;
pub mod schema;
pub mod testing;
pub mod types;
pub mod value;

// Re-export main types at crate root
pub use check::{check_properties, check_record, CheckFailure};
pub use client::{ClientFactory, FunctionClient, FunctionSpec};
pub use config::ProviderConfig;
pub use decode::{decode_properties, Decode};
pub use diff::{diff_properties, diff_record, DiffResult};
pub use encode::{encode_properties, Encode};
pub use error::{ProviderError, SchemaError};
pub use function::{FaasProvider, Function, FUNCTION_TYPE};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::ResourceProvider;
pub use schema::{record_schema, FieldDescriptor, Record, RecordSchema, SchemaType, Schematic};
pub use types::{
    CheckResponse, CreateResponse, DiffChanges, DiffResponse, PluginInfo, ReadResponse,
    UpdateResponse, Urn,
};
pub use value::{
    marshal_properties, unmarshal_properties, MarshalOptions, PropertyMap, PropertyValue,
};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tonic;
pub use tracing;
