//! Provider surface: configuration plus dispatch of resource and data source
//! operations by type name.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use ad_connector::config::ConnectorConfig;
use ad_connector::traits::{Connector, Directory};
use ad_connector_ldap::{ActiveDirectoryConfig, LdapDirectory};

use crate::client::AdClient;
use crate::data::ResourceData;
use crate::data_sources::{self, DataSource};
use crate::error::{ProviderError, ProviderResult};
use crate::plan::{compute_plan, PlanResult};
use crate::resources::{self, Resource};
use crate::schema::{Attribute, AttributeType, ProviderSchema, Schema};

/// Operations a provider host drives, on JSON values keyed by type name.
#[async_trait]
pub trait ProviderService: Send + Sync {
    /// Schemas of the provider configuration, resources and data sources.
    fn schema(&self) -> ProviderSchema;

    /// Apply provider configuration and connect.
    async fn configure(&self, config: Value) -> ProviderResult<()>;

    /// Compute what applying `proposed` would change.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed: Value,
    ) -> ProviderResult<PlanResult>;

    /// Create a resource and return its new state.
    async fn create(&self, resource_type: &str, planned_state: Value) -> ProviderResult<Value>;

    /// Refresh a resource. `None` when it no longer exists.
    async fn read(&self, resource_type: &str, current_state: Value)
        -> ProviderResult<Option<Value>>;

    /// Update a resource in place and return its new state.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> ProviderResult<Value>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value) -> ProviderResult<()>;

    /// Read a data source and return its values.
    async fn read_data_source(&self, data_source_type: &str, config: Value)
        -> ProviderResult<Value>;
}

/// The Active Directory provider.
pub struct AdProvider {
    resources: BTreeMap<&'static str, Box<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Box<dyn DataSource>>,
    client: RwLock<Option<AdClient>>,
}

impl AdProvider {
    /// Unconfigured provider; call [`ProviderService::configure`] first.
    pub fn new() -> Self {
        Self {
            resources: resources::all()
                .into_iter()
                .map(|r| (r.type_name(), r))
                .collect(),
            data_sources: data_sources::all()
                .into_iter()
                .map(|s| (s.type_name(), s))
                .collect(),
            client: RwLock::new(None),
        }
    }

    /// Provider already bound to `directory`.
    pub fn with_directory(directory: Arc<dyn Directory>, use_ssl: bool) -> Self {
        Self {
            client: RwLock::new(Some(AdClient::new(directory, use_ssl))),
            ..Self::new()
        }
    }

    /// Schema of the provider configuration block.
    pub fn config_schema() -> Schema {
        Schema::new()
            .with_description("Connection to an Active Directory domain controller")
            .with_attribute(
                "domain",
                Attribute::required_string()
                    .with_description("The AD domain, e.g. example.com")
                    .with_env_default("AD_DOMAIN"),
            )
            .with_attribute(
                "ip",
                Attribute::required_string()
                    .with_description("The IP address or host name of the domain controller")
                    .with_env_default("AD_IP"),
            )
            .with_attribute(
                "user",
                Attribute::required_string()
                    .with_description("The user name to bind as")
                    .with_env_default("AD_USER"),
            )
            .with_attribute(
                "password",
                Attribute::required_string()
                    .with_description("The password of the bind user")
                    .with_env_default("AD_PASSWORD")
                    .sensitive(),
            )
            .with_attribute(
                "ssl",
                Attribute::optional(AttributeType::Bool)
                    .with_description("Connect with LDAPS")
                    .with_env_default("AD_SSL")
                    .with_default(true),
            )
            .with_attribute(
                "port",
                Attribute::optional(AttributeType::Int)
                    .with_description("Server port, 636 with SSL and 389 without when unset")
                    .with_env_default("AD_PORT"),
            )
            .with_attribute(
                "insecure",
                Attribute::optional(AttributeType::Bool)
                    .with_description("Skip TLS certificate verification")
                    .with_env_default("AD_INSECURE")
                    .with_default(false),
            )
            .with_attribute(
                "timeout",
                Attribute::optional(AttributeType::Int)
                    .with_description("Connection timeout in seconds")
                    .with_env_default("AD_TIMEOUT")
                    .with_default(30),
            )
    }

    /// Build the directory configuration from validated provider values.
    pub fn directory_config(values: &Map<String, Value>) -> ProviderResult<ActiveDirectoryConfig> {
        let text = |key: &str| values.get(key).and_then(Value::as_str).unwrap_or_default();
        let flag = |key: &str| values.get(key).and_then(Value::as_bool).unwrap_or(false);

        let mut config = ActiveDirectoryConfig::from_domain(text("domain"), text("user"), text("password"))
            .with_host(text("ip"))
            .with_ssl(flag("ssl"));

        if let Some(port) = values.get("port").and_then(Value::as_i64) {
            let port = u16::try_from(port)
                .ok()
                .filter(|p| *p > 0)
                .ok_or_else(|| {
                    ProviderError::invalid_attribute("port", format!("{port} is not a valid port"))
                })?;
            config = config.with_port(port);
        }

        if flag("insecure") {
            config = config.with_insecure_tls();
        }

        if let Some(timeout) = values.get("timeout").and_then(Value::as_i64) {
            let secs = u64::try_from(timeout).ok().filter(|s| *s > 0).ok_or_else(|| {
                ProviderError::invalid_attribute("timeout", "must be a positive number of seconds")
            })?;
            config = config.with_timeout(secs);
        }

        config.validate()?;
        Ok(config)
    }

    async fn client(&self) -> ProviderResult<AdClient> {
        self.client
            .read()
            .await
            .clone()
            .ok_or(ProviderError::NotConfigured)
    }

    fn resource(&self, resource_type: &str) -> ProviderResult<&dyn Resource> {
        self.resources
            .get(resource_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResourceType(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> ProviderResult<&dyn DataSource> {
        self.data_sources
            .get(data_source_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownDataSource(data_source_type.to_string()))
    }

    /// Close the directory connection.
    pub async fn shutdown(&self) -> ProviderResult<()> {
        if let Some(client) = self.client.write().await.take() {
            client.directory().dispose().await?;
        }
        Ok(())
    }
}

impl Default for AdProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AdProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdProvider")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("data_sources", &self.data_sources.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn into_object(value: Value, what: &str) -> ProviderResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ProviderError::invalid_attribute(
            what,
            format!("expected an object, got {other}"),
        )),
    }
}

#[async_trait]
impl ProviderService for AdProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema {
            provider: Self::config_schema(),
            resources: self
                .resources
                .iter()
                .map(|(name, r)| ((*name).to_string(), r.schema()))
                .collect(),
            data_sources: self
                .data_sources
                .iter()
                .map(|(name, s)| ((*name).to_string(), s.schema()))
                .collect(),
        }
    }

    #[instrument(skip(self, config))]
    async fn configure(&self, config: Value) -> ProviderResult<()> {
        let mut values = into_object(config, "provider")?;
        let schema = Self::config_schema();
        schema.apply_defaults(&mut values);
        schema.validate(&values)?;

        let config = Self::directory_config(&values)?;
        info!(config = ?config.redacted(), "Configuring provider");

        let use_ssl = config.ldap.use_ssl;
        let directory = LdapDirectory::new(config)?;
        directory.test_connection().await?;

        *self.client.write().await = Some(AdClient::new(Arc::new(directory), use_ssl));
        info!("Provider configured");
        Ok(())
    }

    #[instrument(skip(self, prior_state, proposed))]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed: Value,
    ) -> ProviderResult<PlanResult> {
        let resource = self.resource(resource_type)?;
        let schema = resource.schema();

        let mut values = into_object(proposed, resource_type)?;
        schema.apply_defaults_with(&mut values, |_| None);
        schema.validate(&values)?;

        let plan = compute_plan(&schema, prior_state.as_ref(), &Value::Object(values));
        debug!(action = %plan.action, changes = ?plan.changed_attributes(), "Planned");
        Ok(plan)
    }

    #[instrument(skip(self, planned_state))]
    async fn create(&self, resource_type: &str, planned_state: Value) -> ProviderResult<Value> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;

        let mut d = ResourceData::from_state(planned_state)?;
        d.clear_id();
        resource.create(&client, &mut d).await?;

        if d.id().is_empty() {
            return Err(ProviderError::not_found(resource_type, "object after create"));
        }
        Ok(d.to_state())
    }

    #[instrument(skip(self, current_state))]
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> ProviderResult<Option<Value>> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;

        let mut d = ResourceData::from_state(current_state)?;
        resource.read(&client, &mut d).await?;

        Ok((!d.id().is_empty()).then(|| d.to_state()))
    }

    #[instrument(skip(self, prior_state, planned_state))]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> ProviderResult<Value> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;

        let prior = ResourceData::from_state(prior_state)?;
        let mut d = ResourceData::from_state(planned_state)?.with_prior(&prior);
        resource.update(&client, &mut d).await?;

        if d.id().is_empty() {
            return Err(ProviderError::not_found(resource_type, "object after update"));
        }
        Ok(d.to_state())
    }

    #[instrument(skip(self, current_state))]
    async fn delete(&self, resource_type: &str, current_state: Value) -> ProviderResult<()> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;

        let mut d = ResourceData::from_state(current_state)?;
        resource.delete(&client, &mut d).await
    }

    #[instrument(skip(self, config))]
    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> ProviderResult<Value> {
        let data_source = self.data_source(data_source_type)?;
        let client = self.client().await?;

        let schema = data_source.schema();
        let mut values = into_object(config, data_source_type)?;
        schema.apply_defaults_with(&mut values, |_| None);
        schema.validate(&values)?;

        let mut d = ResourceData::from_config(values);
        data_source.read(&client, &mut d).await?;
        Ok(d.to_state())
    }
}
