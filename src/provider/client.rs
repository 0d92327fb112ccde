//! The capability interface over the provider plugin's RPC protocol.
//!
//! The concrete wire transport (an out-of-process plugin speaking gRPC or
//! similar) stays behind [`ProviderClient`] so the driver's locking and retry
//! logic can be exercised against mocks and the transport swapped without
//! touching anything above it. Wire types never leak past this module: state
//! travels as an opaque [`StructuredValue`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::ProviderError;

/// Opaque typed value exchanged with the plugin. The acquisition core never
/// inspects its internals beyond handing it to the deserializer.
pub type StructuredValue = serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One diagnostic message returned by a plugin RPC.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
}

/// The diagnostics attached to a plugin RPC response.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(summary: impl Into<String>) -> Self {
        Self(vec![Diagnostic {
            severity: Severity::Error,
            summary: summary.into(),
        }])
    }

    pub fn warning(summary: impl Into<String>) -> Self {
        Self(vec![Diagnostic {
            severity: Severity::Warning,
            summary: summary.into(),
        }])
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "no diagnostics");
        }
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            match d.severity {
                Severity::Warning => write!(f, "warning: {}", d.summary)?,
                Severity::Error => write!(f, "error: {}", d.summary)?,
            }
        }
        Ok(())
    }
}

/// Schema of one resource type, opaque to the core. Its presence is what the
/// driver checks before building a prior state for that type.
#[derive(Debug, Clone)]
pub struct ProviderSchema {
    pub version: i64,
    pub block: StructuredValue,
}

pub type SchemaMap = HashMap<String, ProviderSchema>;

/// Arguments for one hydration call.
///
/// `attributes` are disambiguating keys copied from the stub (a parent id, a
/// composite key component). The reserved `alias` key routes the call to a
/// non-default region and is consumed by the driver, never sent to the plugin.
#[derive(Debug, Clone)]
pub struct ReadResourceArgs {
    pub ty: String,
    pub id: String,
    pub attributes: HashMap<String, String>,
}

impl ReadResourceArgs {
    pub fn new(ty: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            id: id.into(),
            attributes: HashMap::new(),
        }
    }
}

/// Response of the plugin's `ReadResource` RPC.
#[derive(Debug, Clone)]
pub struct ReadResourceResponse {
    /// `None` when the plugin reports the resource no longer exists.
    pub new_state: Option<StructuredValue>,
    pub diagnostics: Diagnostics,
}

/// One live plugin process, already connected but not necessarily configured.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Fetches the plugin's resource-type schemas.
    async fn schema(&self) -> Result<SchemaMap, ProviderError>;

    /// Sends the provider configuration. Transport failures surface as `Err`;
    /// protocol-level rejections come back as error diagnostics.
    async fn configure(&self, config: StructuredValue) -> Result<Diagnostics, ProviderError>;

    /// Reads the live state of one resource.
    async fn read_resource(
        &self,
        type_name: &str,
        prior_state: StructuredValue,
    ) -> Result<ReadResourceResponse, ProviderError>;

    /// Shuts the plugin process down.
    async fn close(&self);
}

/// Locates and launches the plugin binary for one region alias, returning a
/// connected (unconfigured) client.
#[async_trait]
pub trait ProviderLauncher: Send + Sync {
    async fn launch(&self, alias: &str) -> Result<Arc<dyn ProviderClient>, ProviderError>;
}

/// The one-method capability hydrators depend on: a synchronous-looking read
/// over the whole per-alias plugin machinery.
#[async_trait]
pub trait ResourceReader: Send + Sync {
    /// Returns the resource's full state, or `None` when it no longer exists.
    async fn read_resource(
        &self,
        args: ReadResourceArgs,
    ) -> Result<Option<StructuredValue>, ProviderError>;
}
