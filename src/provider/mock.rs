//! # Mock Provider
//!
//! In-memory [`ProviderClient`] and [`ProviderLauncher`] implementations for
//! tests. The mock client records every `Configure` and `ReadResource` call
//! and replays scripted outcomes per `(type, id)`, which keeps tests
//! deterministic even when reads run concurrently. When a script queue is
//! exhausted the client falls back to echoing the prior state as the new
//! state, so identity round-trips work without any setup.
//!
//! ```
//! use driftscan::provider::mock::{MockProviderClient, ReadScript};
//!
//! let client = MockProviderClient::new(vec!["aws_instance"]);
//! client.push_read_script("aws_instance", "i-1", ReadScript::Missing);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use super::client::{
    Diagnostics, ProviderClient, ProviderLauncher, ProviderSchema, ReadResourceResponse, SchemaMap,
    StructuredValue,
};
use super::error::ProviderError;

/// One scripted `ReadResource` outcome.
#[derive(Debug, Clone)]
pub enum ReadScript {
    /// Return this state.
    Success(StructuredValue),
    /// Null state with clean diagnostics: the resource no longer exists.
    Missing,
    /// Null state with a non-fatal diagnostic: transient, retryable.
    MissingWithWarning(String),
    /// Error diagnostics in the response.
    Error(String),
    /// Transport-level RPC failure.
    Transport(String),
}

#[derive(Default)]
struct MockState {
    configure_failures: VecDeque<String>,
    configs: Vec<StructuredValue>,
    reads: Vec<(String, StructuredValue)>,
    scripts: HashMap<(String, String), VecDeque<ReadScript>>,
}

/// Scriptable in-memory plugin client.
pub struct MockProviderClient {
    schema_types: Vec<String>,
    state: Mutex<MockState>,
    configure_calls: AtomicUsize,
    closed: AtomicBool,
}

impl MockProviderClient {
    pub fn new(schema_types: Vec<&str>) -> Self {
        Self {
            schema_types: schema_types.into_iter().map(str::to_string).collect(),
            state: Mutex::new(MockState::default()),
            configure_calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Queues a scripted outcome for the next read of `(ty, id)`. Scripts for
    /// one identity are consumed in order; once empty the default echo
    /// behavior applies.
    pub fn push_read_script(&self, ty: &str, id: &str, script: ReadScript) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .scripts
            .entry((ty.to_string(), id.to_string()))
            .or_default()
            .push_back(script);
    }

    /// Makes the next `Configure` call fail with error diagnostics.
    pub fn push_configure_failure(&self, summary: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.configure_failures.push_back(summary.to_string());
    }

    pub fn configure_calls(&self) -> usize {
        self.configure_calls.load(Ordering::SeqCst)
    }

    /// Every configuration value received, in call order.
    pub fn seen_configs(&self) -> Vec<StructuredValue> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.configs.clone()
    }

    /// Every `(type_name, prior_state)` pair received, in call order.
    pub fn seen_reads(&self) -> Vec<(String, StructuredValue)> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.reads.clone()
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for MockProviderClient {
    async fn schema(&self) -> Result<SchemaMap, ProviderError> {
        Ok(self
            .schema_types
            .iter()
            .map(|ty| {
                (
                    ty.clone(),
                    ProviderSchema {
                        version: 0,
                        block: json!({}),
                    },
                )
            })
            .collect())
    }

    async fn configure(&self, config: StructuredValue) -> Result<Diagnostics, ProviderError> {
        self.configure_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.configs.push(config);
        match state.configure_failures.pop_front() {
            Some(summary) => Ok(Diagnostics::error(summary)),
            None => Ok(Diagnostics::new()),
        }
    }

    async fn read_resource(
        &self,
        type_name: &str,
        prior_state: StructuredValue,
    ) -> Result<ReadResourceResponse, ProviderError> {
        let script = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.reads.push((type_name.to_string(), prior_state.clone()));
            let id = prior_state
                .get("id")
                .and_then(StructuredValue::as_str)
                .unwrap_or_default()
                .to_string();
            state
                .scripts
                .get_mut(&(type_name.to_string(), id))
                .and_then(VecDeque::pop_front)
        };

        match script {
            None => Ok(ReadResourceResponse {
                new_state: Some(prior_state),
                diagnostics: Diagnostics::new(),
            }),
            Some(ReadScript::Success(state)) => Ok(ReadResourceResponse {
                new_state: Some(state),
                diagnostics: Diagnostics::new(),
            }),
            Some(ReadScript::Missing) => Ok(ReadResourceResponse {
                new_state: None,
                diagnostics: Diagnostics::new(),
            }),
            Some(ReadScript::MissingWithWarning(summary)) => Ok(ReadResourceResponse {
                new_state: None,
                diagnostics: Diagnostics::warning(summary),
            }),
            Some(ReadScript::Error(summary)) => Ok(ReadResourceResponse {
                new_state: None,
                diagnostics: Diagnostics::error(summary),
            }),
            Some(ReadScript::Transport(reason)) => Err(ProviderError::Transport(reason)),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Launcher handing out [`MockProviderClient`]s, one per alias.
pub struct MockProviderLauncher {
    schema_types: Vec<String>,
    clients: Mutex<HashMap<String, Arc<MockProviderClient>>>,
    launches: AtomicUsize,
}

impl MockProviderLauncher {
    pub fn new(schema_types: Vec<&str>) -> Self {
        Self {
            schema_types: schema_types.into_iter().map(str::to_string).collect(),
            clients: Mutex::new(HashMap::new()),
            launches: AtomicUsize::new(0),
        }
    }

    /// Preregisters a scripted client for `alias`.
    pub fn with_client(self, alias: &str, client: MockProviderClient) -> Self {
        {
            let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
            clients.insert(alias.to_string(), Arc::new(client));
        }
        self
    }

    /// Number of `launch` calls made by the driver.
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// The client serving `alias`, once launched (or preregistered).
    pub fn client_for(&self, alias: &str) -> Option<Arc<MockProviderClient>> {
        let clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        clients.get(alias).cloned()
    }
}

#[async_trait]
impl ProviderLauncher for MockProviderLauncher {
    async fn launch(&self, alias: &str) -> Result<Arc<dyn ProviderClient>, ProviderError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        let client = clients
            .entry(alias.to_string())
            .or_insert_with(|| {
                Arc::new(MockProviderClient::new(
                    self.schema_types.iter().map(String::as_str).collect(),
                ))
            })
            .clone();
        Ok(client)
    }
}
