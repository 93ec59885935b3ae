//! The resource provider handler surface.
//!
//! Each method corresponds to one engine RPC. Property documents are passed
//! in their wire form (JSON objects, with unknown values encoded as the
//! engine's sentinel string) and returned the same way.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::ProviderError;
use crate::types::{
    CheckResponse, CreateResponse, DiffResponse, PluginInfo, ReadResponse, UpdateResponse,
};

/// Trait that resource providers implement.
///
/// # Example
///
/// ```ignore
/// use openfaas_provider::provider::ResourceProvider;
///
/// struct MyProvider;
///
/// #[async_trait::async_trait]
/// impl ResourceProvider for MyProvider {
///     async fn plugin_info(&self) -> Result<PluginInfo, ProviderError> {
///         Ok(PluginInfo { version: "0.1.0".to_string() })
///     }
///
///     // ... implement the resource operations
/// }
/// ```
#[async_trait::async_trait]
pub trait ResourceProvider: Send + Sync + 'static {
    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Report information about the plugin.
    async fn plugin_info(&self) -> Result<PluginInfo, ProviderError>;

    /// Configure the provider from the engine's configuration variables.
    async fn configure(&self, variables: HashMap<String, String>) -> Result<(), ProviderError>;

    /// Abort in-flight operations. Operations started afterwards fail too.
    async fn cancel(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Execute a provider function.
    async fn invoke(&self, token: &str, args: Value) -> Result<Value, ProviderError> {
        let _ = args;
        Err(ProviderError::Unimplemented(format!("Invoke({})", token)))
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's inputs.
    async fn check(
        &self,
        urn: &str,
        olds: Value,
        news: Value,
    ) -> Result<CheckResponse, ProviderError>;

    /// Compare a resource's old and new properties.
    async fn diff(
        &self,
        id: &str,
        urn: &str,
        olds: Value,
        news: Value,
    ) -> Result<DiffResponse, ProviderError>;

    /// Create a resource.
    async fn create(&self, urn: &str, properties: Value) -> Result<CreateResponse, ProviderError>;

    /// Read the live state of a resource.
    async fn read(
        &self,
        id: &str,
        urn: &str,
        properties: Value,
    ) -> Result<ReadResponse, ProviderError>;

    /// Update a resource in place.
    async fn update(
        &self,
        id: &str,
        urn: &str,
        olds: Value,
        news: Value,
    ) -> Result<UpdateResponse, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, id: &str, urn: &str, properties: Value) -> Result<(), ProviderError>;
}
