//! Provider configuration.
//!
//! The engine passes configuration as a flat map of fully-qualified keys,
//! e.g. `openfaas:config:endpoint`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// The key prefix shared by every configuration variable of this provider.
pub const CONFIG_NAMESPACE: &str = "openfaas:config:";

/// Connection settings for the OpenFaaS API gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the API gateway.
    pub endpoint: String,
    /// Basic-auth user name. Empty disables authentication.
    #[serde(default)]
    pub username: String,
    /// Basic-auth password.
    #[serde(default)]
    pub password: String,
}

impl ProviderConfig {
    /// Read the configuration from the engine's variables.
    ///
    /// `endpoint` is required; the credentials default to empty strings.
    pub fn from_variables(vars: &HashMap<String, String>) -> Result<Self, ProviderError> {
        let lookup = |name: &str| vars.get(&format!("{}{}", CONFIG_NAMESPACE, name)).cloned();

        let endpoint = lookup("endpoint").ok_or_else(|| ProviderError::MissingConfiguration {
            key: format!("{}endpoint", CONFIG_NAMESPACE),
            description: "the endpoint of the OpenFaaS API gateway".to_string(),
        })?;

        Ok(Self {
            endpoint,
            username: lookup("username").unwrap_or_default(),
            password: lookup("password").unwrap_or_default(),
        })
    }

    /// Whether requests should carry credentials.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}
