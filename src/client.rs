//! The OpenFaaS API collaborator.
//!
//! The provider never talks HTTP itself. It hands decoded functions to a
//! [`FunctionClient`], which is built from the provider configuration by a
//! [`ClientFactory`] when the engine calls `configure`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;
use crate::error::ProviderError;

/// A function definition as the OpenFaaS API represents it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    /// The function name.
    pub service: String,
    /// The network to attach to.
    #[serde(default)]
    pub network: String,
    /// The container image.
    pub image: String,
    /// The process to run inside the container.
    #[serde(default)]
    pub env_process: String,
    /// Environment variables.
    #[serde(default)]
    pub env_vars: HashMap<String, String>,
    /// Labels.
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Annotations.
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    /// Names of secrets to mount.
    #[serde(default)]
    pub secrets: Vec<String>,
    /// Credentials for pulling from a private registry.
    #[serde(default)]
    pub registry_auth: String,
}

/// Operations on deployed functions.
///
/// A function that does not exist is reported as [`ProviderError::NotFound`];
/// any other failure status as [`ProviderError::Api`].
#[async_trait::async_trait]
pub trait FunctionClient: Send + Sync {
    /// Deploy a new function.
    async fn create_function(&self, function: &FunctionSpec) -> Result<(), ProviderError>;

    /// Fetch the function with the given name.
    async fn get_function(&self, name: &str) -> Result<FunctionSpec, ProviderError>;

    /// Replace the definition of an existing function.
    async fn update_function(&self, function: &FunctionSpec) -> Result<(), ProviderError>;

    /// Remove the function with the given name.
    async fn delete_function(&self, name: &str) -> Result<(), ProviderError>;
}

/// Builds a [`FunctionClient`] once the provider has been configured.
pub trait ClientFactory: Send + Sync + 'static {
    /// Create a client for the configured gateway.
    fn connect(&self, config: &ProviderConfig) -> Result<Arc<dyn FunctionClient>, ProviderError>;
}

impl<F> ClientFactory for F
where
    F: Fn(&ProviderConfig) -> Result<Arc<dyn FunctionClient>, ProviderError>
        + Send
        + Sync
        + 'static,
{
    fn connect(&self, config: &ProviderConfig) -> Result<Arc<dyn FunctionClient>, ProviderError> {
        self(config)
    }
}
