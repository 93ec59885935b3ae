//! Testing utilities for provider implementations.
//!
//! This module provides an in-memory stand-in for the OpenFaaS API and a
//! harness to drive a [`ResourceProvider`] without an engine.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use openfaas_provider::function::{FaasProvider, FUNCTION_TYPE};
//! use openfaas_provider::testing::{urn, InMemoryClient, ProviderTester};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_function() {
//!     let client = Arc::new(InMemoryClient::new());
//!     let tester = ProviderTester::new(FaasProvider::new("openfaas", "0.1.0", client.factory()));
//!
//!     tester.configure(&[("openfaas:config:endpoint", "http://gateway:8080")]).await.unwrap();
//!
//!     let created = tester.create(&urn(FUNCTION_TYPE, "echo"), json!({
//!         "service": "echo",
//!         "image": "functions/alpine:latest",
//!     })).await.unwrap();
//!
//!     assert_eq!(created.id, "echo");
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::client::{ClientFactory, FunctionClient, FunctionSpec};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::provider::ResourceProvider;
use crate::types::{
    CheckResponse, CreateResponse, DiffChanges, DiffResponse, ReadResponse, UpdateResponse,
};

/// Build a URN for a resource in the `test` stack of the `test` project.
pub fn urn(resource_type: &str, name: &str) -> String {
    format!("urn:pulumi:test::test::{}::{}", resource_type, name)
}

/// A [`FunctionClient`] that keeps functions in memory.
#[derive(Debug, Default)]
pub struct InMemoryClient {
    functions: Mutex<HashMap<String, FunctionSpec>>,
}

impl InMemoryClient {
    /// Create an empty client.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory that hands out this client regardless of configuration.
    pub fn factory(self: &Arc<Self>) -> impl ClientFactory {
        let client = Arc::clone(self);
        move |_: &ProviderConfig| -> Result<Arc<dyn FunctionClient>, ProviderError> {
            let client: Arc<dyn FunctionClient> = client.clone();
            Ok(client)
        }
    }

    /// The stored definition of a function, if it exists.
    pub async fn function(&self, name: &str) -> Option<FunctionSpec> {
        self.functions.lock().await.get(name).cloned()
    }

    /// The number of stored functions.
    pub async fn len(&self) -> usize {
        self.functions.lock().await.len()
    }

    /// Whether no functions are stored.
    pub async fn is_empty(&self) -> bool {
        self.functions.lock().await.is_empty()
    }
}

#[async_trait::async_trait]
impl FunctionClient for InMemoryClient {
    async fn create_function(&self, function: &FunctionSpec) -> Result<(), ProviderError> {
        let mut functions = self.functions.lock().await;
        if functions.contains_key(&function.service) {
            return Err(ProviderError::AlreadyExists(function.service.clone()));
        }
        functions.insert(function.service.clone(), function.clone());
        Ok(())
    }

    async fn get_function(&self, name: &str) -> Result<FunctionSpec, ProviderError> {
        self.function(name)
            .await
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))
    }

    async fn update_function(&self, function: &FunctionSpec) -> Result<(), ProviderError> {
        let mut functions = self.functions.lock().await;
        match functions.get_mut(&function.service) {
            Some(existing) => {
                *existing = function.clone();
                Ok(())
            },
            None => Err(ProviderError::NotFound(function.service.clone())),
        }
    }

    async fn delete_function(&self, name: &str) -> Result<(), ProviderError> {
        self.functions
            .lock()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))
    }
}

/// A test harness for provider implementations.
///
/// Methods take the URN first and accept property documents as JSON, the
/// same form the engine sends.
pub struct ProviderTester<P: ResourceProvider> {
    provider: P,
}

impl<P: ResourceProvider> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Configure the provider from key/value pairs.
    pub async fn configure(&self, variables: &[(&str, &str)]) -> Result<(), ProviderError> {
        let variables = variables
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.provider.configure(variables).await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate new inputs.
    pub async fn check(&self, urn: &str, news: Value) -> Result<CheckResponse, ProviderError> {
        self.provider.check(urn, Value::Null, news).await
    }

    /// Compare old and new properties.
    pub async fn diff(
        &self,
        urn: &str,
        id: &str,
        olds: Value,
        news: Value,
    ) -> Result<DiffResponse, ProviderError> {
        self.provider.diff(id, urn, olds, news).await
    }

    /// Create a resource.
    pub async fn create(
        &self,
        urn: &str,
        properties: Value,
    ) -> Result<CreateResponse, ProviderError> {
        self.provider.create(urn, properties).await
    }

    /// Read a resource by ID.
    pub async fn read(&self, urn: &str, id: &str) -> Result<ReadResponse, ProviderError> {
        self.provider.read(id, urn, Value::Null).await
    }

    /// Update a resource.
    pub async fn update(
        &self,
        urn: &str,
        id: &str,
        olds: Value,
        news: Value,
    ) -> Result<UpdateResponse, ProviderError> {
        self.provider.update(id, urn, olds, news).await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        urn: &str,
        id: &str,
        properties: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(id, urn, properties).await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Run a full create lifecycle: check → create → read.
    ///
    /// The first check failure aborts the lifecycle as an error.
    pub async fn lifecycle_create(
        &self,
        urn: &str,
        inputs: Value,
    ) -> Result<ReadResponse, ProviderError> {
        let checked = self.check(urn, inputs).await?;
        if let Some(failure) = checked.failures.into_iter().next() {
            return Err(failure.into());
        }

        let created = self.create(urn, checked.inputs).await?;
        self.read(urn, &created.id).await
    }

    /// Run a full update lifecycle: check → diff → update → read.
    ///
    /// The update is skipped when the diff finds no changes.
    pub async fn lifecycle_update(
        &self,
        urn: &str,
        id: &str,
        olds: Value,
        news: Value,
    ) -> Result<ReadResponse, ProviderError> {
        let checked = self.check(urn, news).await?;
        if let Some(failure) = checked.failures.into_iter().next() {
            return Err(failure.into());
        }

        let diff = self.diff(urn, id, olds.clone(), checked.inputs.clone()).await?;
        if diff.changes == DiffChanges::Some {
            self.update(urn, id, olds, checked.inputs).await?;
        }
        self.read(urn, id).await
    }

    /// Run a full CRUD lifecycle: create → read → update → read → delete.
    ///
    /// Returns the state after the update (before delete).
    pub async fn lifecycle_crud(
        &self,
        urn: &str,
        initial: Value,
        updated: Value,
    ) -> Result<ReadResponse, ProviderError> {
        let created = self.lifecycle_create(urn, initial.clone()).await?;
        let state = self
            .lifecycle_update(urn, &created.id, initial, updated.clone())
            .await?;
        self.delete(urn, &state.id, updated).await?;
        Ok(state)
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a check found no invalid properties.
///
/// # Panics
///
/// Panics if the response carries any failure.
pub fn assert_no_failures(resp: &CheckResponse) {
    assert!(
        resp.failures.is_empty(),
        "Expected no failures, but got {} failure(s): {:?}",
        resp.failures.len(),
        resp.failures.iter().map(|f| f.to_string()).collect::<Vec<_>>()
    );
}

/// Assert that a check reported a failure for a specific property path.
///
/// # Panics
///
/// Panics if no failure names the given property.
pub fn assert_failure(resp: &CheckResponse, property: &str) {
    let found = resp.failures.iter().any(|f| f.property == property);
    assert!(
        found,
        "Expected a failure for property '{}', but none was reported. Failures: {:?}",
        property,
        resp.failures.iter().map(|f| &f.property).collect::<Vec<_>>()
    );
}

/// Assert that a diff found changes and replaces exactly the given paths.
///
/// # Panics
///
/// Panics if the diff found no changes or the replacement list differs.
pub fn assert_replaces(resp: &DiffResponse, paths: &[&str]) {
    assert_eq!(
        resp.changes,
        DiffChanges::Some,
        "Expected changes, but the diff found none"
    );
    assert_eq!(
        resp.replaces, paths,
        "Expected replacements {:?}, but got {:?}",
        paths, resp.replaces
    );
}

/// Assert that a diff found no changes.
///
/// # Panics
///
/// Panics if the diff found changes or replacements.
pub fn assert_no_changes(resp: &DiffResponse) {
    assert!(
        resp.changes == DiffChanges::None && resp.replaces.is_empty(),
        "Expected no changes, but got {:?} with replacements {:?}",
        resp.changes,
        resp.replaces
    );
}
