//! The `openfaas:system:Function` resource and its provider.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::check::check_record;
use crate::client::{ClientFactory, FunctionClient, FunctionSpec};
use crate::config::ProviderConfig;
use crate::decode::decode_properties;
use crate::diff::diff_record;
use crate::encode::encode_properties;
use crate::error::ProviderError;
use crate::provider::ResourceProvider;
use crate::types::{
    CheckResponse, CreateResponse, DiffChanges, DiffResponse, PluginInfo, ReadResponse,
    UpdateResponse, Urn,
};
use crate::value::{marshal_properties, unmarshal_properties, MarshalOptions, PropertyMap};

/// The type token of the function resource.
pub const FUNCTION_TYPE: &str = "openfaas:system:Function";

crate::property_record! {
    /// The input properties of a function resource.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Function {
        #[property("service,forceNew")]
        /// The function name. Renaming a function replaces it.
        pub service: String,
        #[property("network,optional")]
        /// The network to attach the function to.
        pub network: String,
        #[property("image")]
        /// The container image to deploy.
        pub image: String,
        #[property("envProcess,optional")]
        /// The process the watchdog forks for each request.
        pub env_process: String,
        #[property("envVars,optional")]
        /// Environment variables.
        pub env_vars: HashMap<String, String>,
        #[property("labels,optional")]
        /// Labels.
        pub labels: HashMap<String, String>,
        #[property("annotations,optional")]
        /// Annotations.
        pub annotations: HashMap<String, String>,
        #[property("secrets,optional")]
        /// Names of secrets to mount.
        pub secrets: Vec<String>,
        #[property("registryAuth,optional")]
        /// Credentials for a private registry.
        pub registry_auth: String,
    }
}

impl From<Function> for FunctionSpec {
    fn from(f: Function) -> Self {
        Self {
            service: f.service,
            network: f.network,
            image: f.image,
            env_process: f.env_process,
            env_vars: f.env_vars,
            labels: f.labels,
            annotations: f.annotations,
            secrets: f.secrets,
            registry_auth: f.registry_auth,
        }
    }
}

impl From<FunctionSpec> for Function {
    fn from(spec: FunctionSpec) -> Self {
        Self {
            service: spec.service,
            network: spec.network,
            image: spec.image,
            env_process: spec.env_process,
            env_vars: spec.env_vars,
            labels: spec.labels,
            annotations: spec.annotations,
            secrets: spec.secrets,
            registry_auth: spec.registry_auth,
        }
    }
}

/// A resource provider managing OpenFaaS functions.
pub struct FaasProvider<F: ClientFactory> {
    name: String,
    version: String,
    factory: F,
    client: RwLock<Option<Arc<dyn FunctionClient>>>,
    cancel: watch::Sender<bool>,
}

impl<F: ClientFactory> FaasProvider<F> {
    /// Create an unconfigured provider. `factory` builds the API client
    /// when the engine calls `configure`.
    pub fn new(name: impl Into<String>, version: impl Into<String>, factory: F) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            name: name.into(),
            version: version.into(),
            factory,
            client: RwLock::new(None),
            cancel,
        }
    }

    fn label(&self) -> String {
        format!("Provider[{}]", self.name)
    }

    /// Parse `urn` and make sure it names a function.
    fn function_urn(&self, urn: &str) -> Result<Urn, ProviderError> {
        let urn: Urn = urn.parse()?;
        if urn.resource_type() != FUNCTION_TYPE {
            return Err(ProviderError::UnknownResource(urn.resource_type().to_string()));
        }
        Ok(urn)
    }

    fn unmarshal(&self, value: &Value, label: String) -> Result<PropertyMap, ProviderError> {
        unmarshal_properties(value, &MarshalOptions::provider(label))
    }

    async fn client(&self) -> Result<Arc<dyn FunctionClient>, ProviderError> {
        self.client
            .read()
            .await
            .clone()
            .ok_or(ProviderError::NotConfigured)
    }

    /// Run a client call, giving up as soon as the provider is cancelled.
    async fn cancellable<T>(
        &self,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        let mut rx = self.cancel.subscribe();
        let cancelled = async move {
            let _ = rx.wait_for(|cancelled| *cancelled).await;
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(ProviderError::Cancelled),
            result = call => result,
        }
    }

    /// Whether `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}

#[async_trait::async_trait]
impl<F: ClientFactory> ResourceProvider for FaasProvider<F> {
    async fn plugin_info(&self) -> Result<PluginInfo, ProviderError> {
        Ok(PluginInfo {
            version: self.version.clone(),
        })
    }

    #[instrument(skip(self, variables), name = "provider.configure")]
    async fn configure(&self, variables: HashMap<String, String>) -> Result<(), ProviderError> {
        debug!(variables = variables.len(), "Configure called");

        let config = ProviderConfig::from_variables(&variables).inspect_err(|e| {
            error!(error = %e, "Configure failed");
        })?;
        let client = self.factory.connect(&config)?;
        *self.client.write().await = Some(client);

        info!(
            endpoint = %config.endpoint,
            authenticated = config.has_credentials(),
            "Provider configured"
        );
        Ok(())
    }

    async fn cancel(&self) -> Result<(), ProviderError> {
        self.cancel.send_replace(true);
        info!(provider = %self.name, "Cancellation requested");
        Ok(())
    }

    #[instrument(skip(self, _olds, news), name = "provider.check")]
    async fn check(
        &self,
        urn: &str,
        _olds: Value,
        news: Value,
    ) -> Result<CheckResponse, ProviderError> {
        let urn = self.function_urn(urn)?;
        let label = format!("{}.Check({})", self.label(), urn);
        debug!("{} executing", label);

        let props = self.unmarshal(&news, format!("{}.news", label))?;
        let failures = check_record::<Function>(&props).inspect_err(|e| {
            error!(error = %e, "Check failed");
        })?;

        for failure in &failures {
            warn!(property = %failure.property, reason = %failure.reason, "Invalid property");
        }
        info!(failures = failures.len(), "Check completed");

        Ok(CheckResponse {
            inputs: news,
            failures,
        })
    }

    #[instrument(skip(self, olds, news), name = "provider.diff")]
    async fn diff(
        &self,
        id: &str,
        urn: &str,
        olds: Value,
        news: Value,
    ) -> Result<DiffResponse, ProviderError> {
        let urn = self.function_urn(urn)?;
        let label = format!("{}.Diff({})", self.label(), urn);
        debug!("{} executing", label);

        let olds = self.unmarshal(&olds, format!("{}.olds", label))?;
        let news = self.unmarshal(&news, format!("{}.news", label))?;
        let result = diff_record::<Function>(&olds, &news).inspect_err(|e| {
            error!(error = %e, "Diff failed");
        })?;

        let response = DiffResponse {
            changes: DiffChanges::from(result.changed),
            replaces: result.replaces,
            stables: Vec::new(),
            delete_before_replace: false,
        };
        if response.requires_replace() {
            info!(replaces = ?response.replaces, "Diff requires replacement");
        } else {
            info!(changed = result.changed, "Diff completed");
        }
        Ok(response)
    }

    #[instrument(skip(self, properties), name = "provider.create")]
    async fn create(&self, urn: &str, properties: Value) -> Result<CreateResponse, ProviderError> {
        let urn = self.function_urn(urn)?;
        let label = format!("{}.Create({})", self.label(), urn);
        debug!("{} executing", label);

        let inputs = self.unmarshal(&properties, format!("{}.properties", label))?;
        let mut function = Function::default();
        decode_properties(&inputs, &mut function)?;

        let client = self.client().await?;
        let id = function.service.clone();
        self.cancellable(client.create_function(&FunctionSpec::from(function)))
            .await
            .inspect_err(|e| error!(service = %id, error = %e, "Create failed"))?;

        info!(service = %id, "Function created");
        Ok(CreateResponse { id, properties })
    }

    #[instrument(skip(self, _properties), name = "provider.read")]
    async fn read(
        &self,
        id: &str,
        urn: &str,
        _properties: Value,
    ) -> Result<ReadResponse, ProviderError> {
        let urn = self.function_urn(urn)?;
        let label = format!("{}.Read({})", self.label(), urn);
        debug!("{} executing", label);

        let client = self.client().await?;
        let spec = self
            .cancellable(client.get_function(id))
            .await
            .inspect_err(|e| error!(service = %id, error = %e, "Read failed"))?;

        let function = Function::from(spec);
        let props = encode_properties(&function)?;
        let opts = MarshalOptions::provider(format!("{}.outputs", label));
        let outputs = marshal_properties(&props, &opts)?;

        debug!(service = %function.service, properties = props.len(), "Read completed");
        Ok(ReadResponse {
            id: function.service,
            properties: outputs,
        })
    }

    #[instrument(skip(self, _olds, news), name = "provider.update")]
    async fn update(
        &self,
        id: &str,
        urn: &str,
        _olds: Value,
        news: Value,
    ) -> Result<UpdateResponse, ProviderError> {
        let urn = self.function_urn(urn)?;
        let label = format!("{}.Update({})", self.label(), urn);
        debug!("{} executing", label);

        let inputs = self.unmarshal(&news, format!("{}.news", label))?;
        let mut function = Function::default();
        decode_properties(&inputs, &mut function)?;

        let client = self.client().await?;
        self.cancellable(client.update_function(&FunctionSpec::from(function)))
            .await
            .inspect_err(|e| error!(service = %id, error = %e, "Update failed"))?;

        info!(service = %id, "Function updated");
        Ok(UpdateResponse { properties: news })
    }

    #[instrument(skip(self, _properties), name = "provider.delete")]
    async fn delete(&self, id: &str, urn: &str, _properties: Value) -> Result<(), ProviderError> {
        let urn = self.function_urn(urn)?;
        debug!("{}.Delete({}) executing", self.label(), urn);

        let client = self.client().await?;
        self.cancellable(client.delete_function(id))
            .await
            .inspect_err(|e| error!(service = %id, error = %e, "Delete failed"))?;

        info!(service = %id, "Function deleted");
        Ok(())
    }
}
