//! Repository traits over the cloud SDK, plus a read-through cache decorator.
//!
//! Enumerators never talk to the SDK directly; they depend on these narrow
//! traits so tests can script listings without any network.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::cache::Cache;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The credentials in use are not allowed to perform this listing.
    #[error("AccessDenied: {operation}")]
    AccessDenied { operation: String },
    #[error("{operation}: {message}")]
    Api { operation: String, message: String },
}

impl RepositoryError {
    pub fn access_denied(operation: impl Into<String>) -> Self {
        Self::AccessDenied {
            operation: operation.into(),
        }
    }

    pub fn api(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstanceSummary {
    pub id: String,
    pub availability_zone: String,
}

#[derive(Debug, Clone)]
pub struct RouteSummary {
    /// Destination block (CIDR or prefix list id), part of the route's
    /// composite identity.
    pub destination: String,
}

#[derive(Debug, Clone)]
pub struct RouteTableSummary {
    pub id: String,
    pub routes: Vec<RouteSummary>,
}

#[derive(Debug, Clone)]
pub struct AddressSummary {
    pub allocation_id: String,
}

#[derive(Debug, Clone)]
pub struct BucketSummary {
    pub name: String,
}

#[async_trait]
pub trait Ec2Repository: Send + Sync {
    async fn list_all_instances(&self) -> Result<Vec<InstanceSummary>, RepositoryError>;
    async fn list_all_route_tables(&self) -> Result<Vec<RouteTableSummary>, RepositoryError>;
    async fn list_all_addresses(&self) -> Result<Vec<AddressSummary>, RepositoryError>;
}

#[async_trait]
pub trait S3Repository: Send + Sync {
    async fn list_all_buckets(&self) -> Result<Vec<BucketSummary>, RepositoryError>;

    /// Returns the region the bucket lives in.
    async fn get_bucket_location(&self, bucket: &str) -> Result<String, RepositoryError>;
}

/// Read-through cache over an [`S3Repository`]. Bucket locations are asked
/// once per hydrated bucket as well as once per listing, so caching them
/// saves one API call per bucket and scan.
pub struct CachingS3Repository {
    inner: Arc<dyn S3Repository>,
    locations: Cache<String>,
}

impl CachingS3Repository {
    pub fn new(inner: Arc<dyn S3Repository>) -> Self {
        Self {
            inner,
            locations: Cache::new(100),
        }
    }
}

#[async_trait]
impl S3Repository for CachingS3Repository {
    async fn list_all_buckets(&self) -> Result<Vec<BucketSummary>, RepositoryError> {
        self.inner.list_all_buckets().await
    }

    async fn get_bucket_location(&self, bucket: &str) -> Result<String, RepositoryError> {
        let key = format!("s3GetBucketLocation_{bucket}");
        if let Some(location) = self.locations.get(&key) {
            return Ok(location);
        }
        let location = self.inner.get_bucket_location(bucket).await?;
        self.locations.put(key, location.clone());
        Ok(location)
    }
}
