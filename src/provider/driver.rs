//! # Provider Driver
//!
//! Owns one plugin process per region alias and exposes a single synchronous
//! hydration operation, [`ProviderDriver::read_resource`], on top of it.
//!
//! A [`ProviderClient`] for an alias is created lazily on its first read:
//! launch the plugin, fetch the resource schemas (cached after the first
//! alias), build the typed configuration value and send `Configure`. The
//! alias map and the schema cache live behind one async mutex, so concurrent
//! first reads of the same alias configure exactly once and later reads only
//! pay a map lookup. A failed configuration leaves the alias unconfigured and
//! surfaces the error; the next read for that alias starts over.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::client::{
    ProviderClient, ProviderLauncher, ReadResourceArgs, ResourceReader, SchemaMap, StructuredValue,
};
use super::config::ProviderConfig;
use super::error::ProviderError;

/// Attribute key carrying a per-call region override. Consumed by the driver;
/// never part of the prior state sent to the plugin.
pub const ALIAS_ATTRIBUTE: &str = "alias";

const READ_RESOURCE_ATTEMPTS: u32 = 3;
const READ_RESOURCE_BACKOFF: Duration = Duration::from_millis(100);

struct DriverState {
    clients: HashMap<String, Arc<dyn ProviderClient>>,
    schemas: Option<SchemaMap>,
}

/// Drives the external provider plugin processes, one per region alias.
pub struct ProviderDriver {
    launcher: Arc<dyn ProviderLauncher>,
    config: ProviderConfig,
    state: Mutex<DriverState>,
}

impl ProviderDriver {
    pub fn new(launcher: Arc<dyn ProviderLauncher>, config: ProviderConfig) -> Self {
        Self {
            launcher,
            config,
            state: Mutex::new(DriverState {
                clients: HashMap::new(),
                schemas: None,
            }),
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Eagerly configures the default alias. Optional: the first read would
    /// do the same lazily.
    pub async fn init(&self) -> Result<(), ProviderError> {
        let alias = self.config.default_alias.clone();
        self.client_for(&alias).await.map(|_| ())
    }

    /// Returns the configured client for `alias`, configuring it first if
    /// this is the alias's first use.
    async fn client_for(&self, alias: &str) -> Result<Arc<dyn ProviderClient>, ProviderError> {
        let mut state = self.state.lock().await;
        if let Some(client) = state.clients.get(alias) {
            return Ok(Arc::clone(client));
        }

        debug!(alias, "starting provider RPC client");
        let client = self.launcher.launch(alias).await?;

        if state.schemas.is_none() {
            state.schemas = Some(client.schema().await?);
        }

        let diagnostics = client.configure(self.config.config_value(alias)).await?;
        if diagnostics.has_errors() {
            return Err(ProviderError::Configure {
                alias: alias.to_string(),
                diagnostics,
            });
        }

        debug!(name = %self.config.name, alias, "provider configured");
        state.clients.insert(alias.to_string(), Arc::clone(&client));
        Ok(client)
    }

    /// Reads the live state of one resource through the plugin, retrying
    /// transient failures. Returns `Ok(None)` when the plugin reports the
    /// resource no longer exists.
    #[instrument(skip_all, fields(ty = %args.ty, id = %args.id))]
    pub async fn read_resource(
        &self,
        mut args: ReadResourceArgs,
    ) -> Result<Option<StructuredValue>, ProviderError> {
        debug!(attrs = ?args.attributes, "reading cloud resource");

        let alias = match args.attributes.remove(ALIAS_ATTRIBUTE) {
            Some(alias) if !alias.is_empty() => alias,
            _ => self.config.default_alias.clone(),
        };

        let client = self.client_for(&alias).await?;

        {
            let state = self.state.lock().await;
            let known = state
                .schemas
                .as_ref()
                .map(|schemas| schemas.contains_key(&args.ty))
                .unwrap_or(false);
            if !known {
                return Err(ProviderError::UnsupportedType(args.ty));
            }
        }

        let prior_state = prior_state_value(&args);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match read_once(client.as_ref(), &args.ty, prior_state.clone()).await {
                Ok(new_state) => return Ok(new_state),
                Err(err) if attempt < READ_RESOURCE_ATTEMPTS => {
                    debug!(error = %err, attempt, "ReadResource attempt failed, retrying");
                    tokio::time::sleep(READ_RESOURCE_BACKOFF).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Closes every plugin process. Called on normal shutdown and from the
    /// interrupt handler so child processes are never leaked.
    pub async fn cleanup(&self) {
        let mut state = self.state.lock().await;
        for (alias, client) in state.clients.drain() {
            debug!(%alias, "closing provider RPC client");
            client.close().await;
        }
    }
}

async fn read_once(
    client: &dyn ProviderClient,
    ty: &str,
    prior_state: StructuredValue,
) -> Result<Option<StructuredValue>, ProviderError> {
    let response = client.read_resource(ty, prior_state).await?;
    if response.diagnostics.has_errors() {
        return Err(ProviderError::Read {
            diagnostics: response.diagnostics,
        });
    }
    match response.new_state {
        Some(Value::Null) | None => {
            if response.diagnostics.is_empty() {
                // The resource vanished between listing and hydration.
                Ok(None)
            } else {
                Err(ProviderError::NullState {
                    diagnostics: response.diagnostics,
                })
            }
        }
        state => Ok(state),
    }
}

/// Builds the prior state sent to the plugin from the stub's identity and
/// addressing attributes.
fn prior_state_value(args: &ReadResourceArgs) -> StructuredValue {
    let mut state = Map::new();
    state.insert("id".to_string(), Value::String(args.id.clone()));
    for (key, value) in &args.attributes {
        state.insert(key.clone(), Value::String(value.clone()));
    }
    Value::Object(state)
}

#[async_trait]
impl ResourceReader for ProviderDriver {
    async fn read_resource(
        &self,
        args: ReadResourceArgs,
    ) -> Result<Option<StructuredValue>, ProviderError> {
        ProviderDriver::read_resource(self, args).await
    }
}

/// Best-effort warning for drivers dropped with live plugin processes.
impl Drop for ProviderDriver {
    fn drop(&mut self) {
        if let Ok(state) = self.state.try_lock() {
            if !state.clients.is_empty() {
                warn!(
                    count = state.clients.len(),
                    "provider driver dropped with live plugin clients, call cleanup() before shutdown"
                );
            }
        }
    }
}
