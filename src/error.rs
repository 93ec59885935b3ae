//! Error types for the OpenFaaS provider.

use thiserror::Error;

use crate::check::CheckFailure;

/// A malformed static schema.
///
/// These indicate a bug in a record definition rather than bad input, so they
/// abort whichever operation encounters them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A field tag carried a modifier other than `optional` or `forceNew`.
    #[error("unknown option '{option}' in tag for struct field {field}")]
    UnknownOption {
        /// The offending modifier.
        option: String,
        /// The declared field identifier.
        field: String,
    },

    /// Two fields of one record share a wire name.
    #[error("duplicate property '{name}' in record {record}")]
    DuplicateField {
        /// The record type name.
        record: String,
        /// The repeated wire name.
        name: String,
    },

    /// A field of a record has an empty wire name.
    #[error("empty property name in record {record}")]
    EmptyFieldName {
        /// The record type name.
        record: String,
    },

    /// A map schema whose key type is not a string.
    #[error("map schema must have string keys")]
    NonStringMapKey,
}

/// Errors that can occur while serving the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The static schema is malformed.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A property does not have the shape its schema requires.
    #[error("{0}")]
    InvalidProperty(CheckFailure),

    /// A previously applied value was still marked unknown.
    #[error("old properties must not be computed (at '{0}')")]
    ComputedOldValue(String),

    /// A typed value did not encode to an object.
    #[error("encoded properties must be a map, not a {0}")]
    NotAnObject(&'static str),

    /// Wire properties could not be converted.
    #[error("Marshal error: {0}")]
    Marshal(String),

    /// A resource URN could not be parsed.
    #[error("Invalid URN: {0}")]
    InvalidUrn(String),

    /// The requested resource type is not served by this provider.
    #[error("unknown resource type {0}")]
    UnknownResource(String),

    /// A required configuration variable was not supplied.
    #[error("required configuration keys were missing: {key} ({description})")]
    MissingConfiguration {
        /// The fully-qualified configuration key.
        key: String,
        /// What the key configures.
        description: String,
    },

    /// A resource operation ran before `configure`.
    #[error("provider is not configured")]
    NotConfigured,

    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Resource already exists (create conflict).
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// The remote API answered with a failure status.
    #[error("{status} response from server ({body})")]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The response body.
        body: String,
    },

    /// The operation was cancelled by the engine.
    #[error("operation cancelled")]
    Cancelled,

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        let message = err.to_string();
        match err {
            ProviderError::InvalidProperty(_)
            | ProviderError::InvalidUrn(_)
            | ProviderError::MissingConfiguration { .. } => {
                tonic::Status::invalid_argument(message)
            },
            ProviderError::Schema(_)
            | ProviderError::ComputedOldValue(_)
            | ProviderError::NotAnObject(_)
            | ProviderError::Marshal(_) => tonic::Status::internal(message),
            ProviderError::UnknownResource(_) | ProviderError::NotFound(_) => {
                tonic::Status::not_found(message)
            },
            ProviderError::NotConfigured => tonic::Status::failed_precondition(message),
            ProviderError::AlreadyExists(_) => tonic::Status::already_exists(message),
            ProviderError::Api { .. } => tonic::Status::unavailable(message),
            ProviderError::Cancelled => tonic::Status::cancelled(message),
            ProviderError::Unimplemented(_) => tonic::Status::unimplemented(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::UnknownResource("openfaas:system:Volume".to_string());
        assert_eq!(format!("{}", err), "unknown resource type openfaas:system:Volume");

        let err = ProviderError::NotAnObject("string");
        assert_eq!(
            format!("{}", err),
            "encoded properties must be a map, not a string"
        );

        let err = ProviderError::Api {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(format!("{}", err), "500 response from server (boom)");
    }

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::UnknownOption {
            option: "computed".to_string(),
            field: "Image".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "unknown option 'computed' in tag for struct field Image"
        );

        let err: ProviderError = SchemaError::NonStringMapKey.into();
        assert_eq!(format!("{}", err), "Schema error: map schema must have string keys");
    }

    #[test]
    fn test_invalid_property_renders_failure() {
        let err = ProviderError::InvalidProperty(CheckFailure::missing_required("", "service"));
        assert_eq!(
            format!("{}", err),
            "service: missing required property service"
        );
    }

    #[test]
    fn test_error_to_status() {
        let err = ProviderError::InvalidProperty(CheckFailure::missing_required("", "image"));
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let err = ProviderError::MissingConfiguration {
            key: "openfaas:config:endpoint".to_string(),
            description: "the endpoint of the OpenFaaS API gateway".to_string(),
        };
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let err: ProviderError = SchemaError::NonStringMapKey.into();
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::Internal);

        let err = ProviderError::NotFound("fn".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let status: tonic::Status = ProviderError::NotConfigured.into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::Cancelled.into();
        assert_eq!(status.code(), tonic::Code::Cancelled);
    }

    #[test]
    fn test_remaining_variants_to_status() {
        let err = ProviderError::AlreadyExists("fn".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::AlreadyExists);

        let err = ProviderError::Api {
            status: 502,
            body: String::new(),
        };
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::Unavailable);

        let err = ProviderError::Unimplemented("Invoke".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::Unimplemented);
        assert_eq!(status.message(), "Unimplemented: Invoke");
    }
}
