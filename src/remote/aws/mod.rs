//! AWS resource pipelines: listers over the EC2 and S3 repositories, wired
//! together with generic hydrators by [`register`].

pub mod repository;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::alerter::Alerter;
use crate::provider::{ResourceReader, ALIAS_ATTRIBUTE};
use crate::remote::alerts::send_enumeration_alert;
use crate::remote::{GenericHydrator, RemoteLibrary, ResourceLister, ScanError};
use crate::resource::{Attributes, Deserializer, Resource, ResourceFactory};

use repository::{Ec2Repository, S3Repository};

pub const AWS_INSTANCE_TYPE: &str = "aws_instance";
pub const AWS_ROUTE_TABLE_TYPE: &str = "aws_route_table";
pub const AWS_ROUTE_TYPE: &str = "aws_route";
pub const AWS_EIP_TYPE: &str = "aws_eip";
pub const AWS_S3_BUCKET_TYPE: &str = "aws_s3_bucket";

pub struct Ec2InstanceEnumerator {
    repository: Arc<dyn Ec2Repository>,
}

impl Ec2InstanceEnumerator {
    pub fn new(repository: Arc<dyn Ec2Repository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl ResourceLister for Ec2InstanceEnumerator {
    fn supported_type(&self) -> &str {
        AWS_INSTANCE_TYPE
    }

    async fn list(&self) -> Result<Vec<Resource>, ScanError> {
        let instances = self
            .repository
            .list_all_instances()
            .await
            .map_err(|err| ScanError::listing(err, AWS_INSTANCE_TYPE))?;

        Ok(instances
            .into_iter()
            .map(|instance| {
                let mut attrs = Attributes::new();
                attrs.insert(
                    "availability_zone".to_string(),
                    Value::String(instance.availability_zone),
                );
                Resource::new(AWS_INSTANCE_TYPE, instance.id, attrs)
            })
            .collect())
    }
}

pub struct Ec2RouteTableEnumerator {
    repository: Arc<dyn Ec2Repository>,
}

impl Ec2RouteTableEnumerator {
    pub fn new(repository: Arc<dyn Ec2Repository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl ResourceLister for Ec2RouteTableEnumerator {
    fn supported_type(&self) -> &str {
        AWS_ROUTE_TABLE_TYPE
    }

    async fn list(&self) -> Result<Vec<Resource>, ScanError> {
        let tables = self
            .repository
            .list_all_route_tables()
            .await
            .map_err(|err| ScanError::listing(err, AWS_ROUTE_TABLE_TYPE))?;

        Ok(tables
            .into_iter()
            .map(|table| Resource::new(AWS_ROUTE_TABLE_TYPE, table.id, Attributes::new()))
            .collect())
    }
}

/// Routes have no listing API of their own; they are carried by their route
/// table, so a failure here is blamed on the route table listing.
pub struct Ec2RouteEnumerator {
    repository: Arc<dyn Ec2Repository>,
}

impl Ec2RouteEnumerator {
    pub fn new(repository: Arc<dyn Ec2Repository>) -> Self {
        Self { repository }
    }
}

/// A route is addressed by its owning table and destination block.
pub fn route_id(table_id: &str, destination: &str) -> String {
    format!("r-{table_id}_{destination}")
}

#[async_trait]
impl ResourceLister for Ec2RouteEnumerator {
    fn supported_type(&self) -> &str {
        AWS_ROUTE_TYPE
    }

    async fn list(&self) -> Result<Vec<Resource>, ScanError> {
        let tables = self
            .repository
            .list_all_route_tables()
            .await
            .map_err(|err| {
                ScanError::listing_with_type(err, AWS_ROUTE_TYPE, AWS_ROUTE_TABLE_TYPE)
            })?;

        let mut routes = Vec::new();
        for table in tables {
            for route in table.routes {
                let mut attrs = Attributes::new();
                attrs.insert(
                    "route_table_id".to_string(),
                    Value::String(table.id.clone()),
                );
                attrs.insert(
                    "destination_cidr_block".to_string(),
                    Value::String(route.destination.clone()),
                );
                routes.push(Resource::new(
                    AWS_ROUTE_TYPE,
                    route_id(&table.id, &route.destination),
                    attrs,
                ));
            }
        }
        Ok(routes)
    }
}

/// Elastic IPs are listed for existence only; nothing hydrates them.
pub struct Ec2EipEnumerator {
    repository: Arc<dyn Ec2Repository>,
}

impl Ec2EipEnumerator {
    pub fn new(repository: Arc<dyn Ec2Repository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl ResourceLister for Ec2EipEnumerator {
    fn supported_type(&self) -> &str {
        AWS_EIP_TYPE
    }

    async fn list(&self) -> Result<Vec<Resource>, ScanError> {
        let addresses = self
            .repository
            .list_all_addresses()
            .await
            .map_err(|err| ScanError::listing(err, AWS_EIP_TYPE))?;

        Ok(addresses
            .into_iter()
            .map(|address| Resource::new(AWS_EIP_TYPE, address.allocation_id, Attributes::new()))
            .collect())
    }
}

/// Buckets are listed account-wide but live in a single region each. A bucket
/// outside the default region gets an `alias` attribute so its hydration is
/// routed to a client configured for that region.
pub struct S3BucketEnumerator {
    repository: Arc<dyn S3Repository>,
    default_alias: String,
    alerter: Arc<dyn Alerter>,
}

impl S3BucketEnumerator {
    pub fn new(
        repository: Arc<dyn S3Repository>,
        default_alias: impl Into<String>,
        alerter: Arc<dyn Alerter>,
    ) -> Self {
        Self {
            repository,
            default_alias: default_alias.into(),
            alerter,
        }
    }
}

#[async_trait]
impl ResourceLister for S3BucketEnumerator {
    fn supported_type(&self) -> &str {
        AWS_S3_BUCKET_TYPE
    }

    async fn list(&self) -> Result<Vec<Resource>, ScanError> {
        let buckets = self
            .repository
            .list_all_buckets()
            .await
            .map_err(|err| ScanError::listing(err, AWS_S3_BUCKET_TYPE))?;

        let mut resources = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            // A bucket whose region cannot be resolved is alerted and
            // skipped instead of failing the whole listing.
            let location = match self.repository.get_bucket_location(&bucket.name).await {
                Ok(location) => location,
                Err(err) => {
                    let err = ScanError::scanning(err, AWS_S3_BUCKET_TYPE, &bucket.name);
                    send_enumeration_alert(self.alerter.as_ref(), &err);
                    continue;
                }
            };

            let mut attrs = Attributes::new();
            if location != self.default_alias {
                attrs.insert(ALIAS_ATTRIBUTE.to_string(), Value::String(location));
            }
            resources.push(Resource::new(AWS_S3_BUCKET_TYPE, bucket.name, attrs));
        }
        Ok(resources)
    }
}

/// Registers every AWS lister plus a hydrator for each type the provider
/// plugin can read back in full.
#[allow(clippy::too_many_arguments)]
pub fn register(
    library: &mut RemoteLibrary,
    ec2: Arc<dyn Ec2Repository>,
    s3: Arc<dyn S3Repository>,
    factory: Arc<dyn ResourceFactory>,
    reader: Arc<dyn ResourceReader>,
    default_alias: &str,
    alerter: Arc<dyn Alerter>,
) {
    library.add_lister(Arc::new(Ec2InstanceEnumerator::new(Arc::clone(&ec2))));
    library.add_lister(Arc::new(Ec2RouteTableEnumerator::new(Arc::clone(&ec2))));
    library.add_lister(Arc::new(Ec2RouteEnumerator::new(Arc::clone(&ec2))));
    library.add_lister(Arc::new(Ec2EipEnumerator::new(ec2)));
    library.add_lister(Arc::new(S3BucketEnumerator::new(
        s3,
        default_alias,
        alerter,
    )));

    for ty in [
        AWS_INSTANCE_TYPE,
        AWS_ROUTE_TABLE_TYPE,
        AWS_ROUTE_TYPE,
        AWS_S3_BUCKET_TYPE,
    ] {
        library.add_hydrator(
            ty,
            Arc::new(GenericHydrator::new(
                Arc::clone(&reader),
                Deserializer::new(Arc::clone(&factory)),
            )),
        );
    }
}
