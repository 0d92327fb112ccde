//! # Remote Acquisition Contracts
//!
//! The two-trait contract every resource type's pipeline is built from:
//!
//! - [`ResourceLister`] cheaply lists resource identities through a
//!   repository (no hydration), producing stub resources.
//! - [`ResourceHydrator`] fetches one stub's full configuration, usually
//!   through [`GenericHydrator`] which drives the provider plugin and the
//!   deserializer.
//!
//! A [`RemoteLibrary`] registers the listers for a provider plus, per
//! resource type, at most one hydrator; the scanner dispatches through it.

pub mod alerts;
pub mod aws;
pub mod error;

pub use error::{BoxError, ScanError};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::provider::{ReadResourceArgs, ResourceReader};
use crate::resource::{Deserializer, Resource};

/// Lists the live identities of one resource type.
#[async_trait]
pub trait ResourceLister: Send + Sync {
    fn supported_type(&self) -> &str;

    /// Returns stub resources: identity plus the addressing attributes a
    /// later hydration needs.
    async fn list(&self) -> Result<Vec<Resource>, ScanError>;
}

/// Fetches the full configuration of one stub resource.
#[async_trait]
pub trait ResourceHydrator: Send + Sync {
    /// `Ok(None)` is a soft miss: the resource vanished between listing and
    /// hydration and must simply be excluded from the output.
    async fn read_details(&self, stub: &Resource) -> Result<Option<Resource>, ScanError>;
}

/// Hydrator over the provider plugin: builds the read arguments from the
/// stub, reads through the [`ResourceReader`] capability and deserializes the
/// returned state.
pub struct GenericHydrator {
    reader: Arc<dyn ResourceReader>,
    deserializer: Deserializer,
}

impl GenericHydrator {
    pub fn new(reader: Arc<dyn ResourceReader>, deserializer: Deserializer) -> Self {
        Self {
            reader,
            deserializer,
        }
    }
}

#[async_trait]
impl ResourceHydrator for GenericHydrator {
    async fn read_details(&self, stub: &Resource) -> Result<Option<Resource>, ScanError> {
        let ty = stub.resource_type();
        let id = stub.resource_id();
        let args = ReadResourceArgs {
            ty: ty.to_string(),
            id: id.to_string(),
            attributes: stub.addressing_attributes(),
        };

        let state = self
            .reader
            .read_resource(args)
            .await
            .map_err(|err| ScanError::details(err, ty, id))?;

        let Some(state) = state else {
            debug!(ty, id, "resource no longer exists, excluding from output");
            return Ok(None);
        };

        let resource =
            self.deserializer
                .deserialize_one(ty, state)
                .map_err(|source| ScanError::Deserialization {
                    resource_type: ty.to_string(),
                    resource_id: id.to_string(),
                    source,
                })?;
        Ok(Some(resource))
    }
}

/// Registry of every lister and hydrator available for a scan.
#[derive(Default)]
pub struct RemoteLibrary {
    listers: Vec<Arc<dyn ResourceLister>>,
    hydrators: HashMap<String, Arc<dyn ResourceHydrator>>,
}

impl RemoteLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_lister(&mut self, lister: Arc<dyn ResourceLister>) {
        self.listers.push(lister);
    }

    pub fn add_hydrator(&mut self, ty: impl Into<String>, hydrator: Arc<dyn ResourceHydrator>) {
        self.hydrators.insert(ty.into(), hydrator);
    }

    pub fn listers(&self) -> &[Arc<dyn ResourceLister>] {
        &self.listers
    }

    pub fn hydrator(&self, ty: &str) -> Option<Arc<dyn ResourceHydrator>> {
        self.hydrators.get(ty).cloned()
    }
}
