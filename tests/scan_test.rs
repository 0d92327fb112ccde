//! End-to-end scans over the full pipeline: AWS listers backed by fake
//! repositories, hydration through the provider driver and a scripted mock
//! plugin.

use std::sync::Arc;

use async_trait::async_trait;
use driftscan::alerter::{Alerter, InMemoryAlerter};
use driftscan::provider::mock::{MockProviderClient, MockProviderLauncher, ReadScript};
use driftscan::provider::{ProviderConfig, ProviderDriver, ResourceReader, ALIAS_ATTRIBUTE};
use driftscan::remote::aws::repository::{
    AddressSummary, BucketSummary, Ec2Repository, InstanceSummary, RepositoryError,
    RouteTableSummary, S3Repository,
};
use driftscan::remote::aws::{self, AWS_EIP_TYPE, AWS_INSTANCE_TYPE, AWS_S3_BUCKET_TYPE};
use driftscan::remote::RemoteLibrary;
use driftscan::resource::DefaultResourceFactory;
use driftscan::scanner::{FailurePolicy, Scanner, ScannerOptions};

const DEFAULT_REGION: &str = "us-east-1";

const SCHEMA_TYPES: &[&str] = &[
    "aws_instance",
    "aws_route_table",
    "aws_route",
    "aws_s3_bucket",
];

#[derive(Default)]
struct FakeEc2 {
    instances: Vec<InstanceSummary>,
    deny_addresses: bool,
}

#[async_trait]
impl Ec2Repository for FakeEc2 {
    async fn list_all_instances(&self) -> Result<Vec<InstanceSummary>, RepositoryError> {
        Ok(self.instances.clone())
    }

    async fn list_all_route_tables(&self) -> Result<Vec<RouteTableSummary>, RepositoryError> {
        Ok(Vec::new())
    }

    async fn list_all_addresses(&self) -> Result<Vec<AddressSummary>, RepositoryError> {
        if self.deny_addresses {
            return Err(RepositoryError::access_denied("DescribeAddresses"));
        }
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct FakeS3 {
    /// `(bucket name, region)` pairs.
    buckets: Vec<(String, String)>,
}

#[async_trait]
impl S3Repository for FakeS3 {
    async fn list_all_buckets(&self) -> Result<Vec<BucketSummary>, RepositoryError> {
        Ok(self
            .buckets
            .iter()
            .map(|(name, _)| BucketSummary { name: name.clone() })
            .collect())
    }

    async fn get_bucket_location(&self, bucket: &str) -> Result<String, RepositoryError> {
        self.buckets
            .iter()
            .find(|(name, _)| name == bucket)
            .map(|(_, region)| region.clone())
            .ok_or_else(|| RepositoryError::api("GetBucketLocation", "no such bucket"))
    }
}

struct Pipeline {
    scanner: Scanner,
    launcher: Arc<MockProviderLauncher>,
    driver: Arc<ProviderDriver>,
    alerter: Arc<InMemoryAlerter>,
}

fn pipeline(
    ec2: FakeEc2,
    s3: FakeS3,
    launcher: MockProviderLauncher,
    options: ScannerOptions,
) -> Pipeline {
    let launcher = Arc::new(launcher);
    let driver = Arc::new(ProviderDriver::new(
        Arc::clone(&launcher) as _,
        ProviderConfig::new("aws", DEFAULT_REGION),
    ));
    let alerter = Arc::new(InMemoryAlerter::new());

    let mut library = RemoteLibrary::new();
    aws::register(
        &mut library,
        Arc::new(ec2),
        Arc::new(s3),
        Arc::new(DefaultResourceFactory),
        Arc::clone(&driver) as Arc<dyn ResourceReader>,
        DEFAULT_REGION,
        Arc::clone(&alerter) as Arc<dyn Alerter>,
    );

    Pipeline {
        scanner: Scanner::new(library, Arc::clone(&alerter) as Arc<dyn Alerter>, options),
        launcher,
        driver,
        alerter,
    }
}

fn instance(id: &str) -> InstanceSummary {
    InstanceSummary {
        id: id.to_string(),
        availability_zone: format!("{DEFAULT_REGION}a"),
    }
}

#[tokio::test]
async fn deep_scan_excludes_resources_that_vanished_mid_scan() {
    let default_client = MockProviderClient::new(SCHEMA_TYPES.to_vec());
    default_client.push_read_script(AWS_INSTANCE_TYPE, "i-2", ReadScript::Missing);
    let launcher =
        MockProviderLauncher::new(SCHEMA_TYPES.to_vec()).with_client(DEFAULT_REGION, default_client);

    let ec2 = FakeEc2 {
        instances: vec![instance("i-1"), instance("i-2")],
        ..FakeEc2::default()
    };
    let pipe = pipeline(
        ec2,
        FakeS3::default(),
        launcher,
        ScannerOptions {
            deep: true,
            ..ScannerOptions::default()
        },
    );

    let resources = pipe.scanner.resources().await.expect("scan succeeds");
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].resource_id(), "i-1");
    // Hydration carried the stub's addressing attributes through the plugin.
    assert_eq!(
        resources[0].attribute_str("availability_zone"),
        Some("us-east-1a")
    );

    pipe.driver.cleanup().await;
    let client = pipe.launcher.client_for(DEFAULT_REGION).expect("launched");
    assert!(client.closed());
}

#[tokio::test]
async fn denied_listing_is_alerted_and_the_rest_of_the_scan_survives() {
    let ec2 = FakeEc2 {
        instances: vec![instance("i-1")],
        deny_addresses: true,
    };
    let s3 = FakeS3 {
        buckets: vec![("logs".to_string(), DEFAULT_REGION.to_string())],
    };
    let pipe = pipeline(
        ec2,
        s3,
        MockProviderLauncher::new(SCHEMA_TYPES.to_vec()),
        ScannerOptions {
            failure_policy: FailurePolicy::AlertAndContinue,
            ..ScannerOptions::default()
        },
    );

    let resources = pipe.scanner.resources().await.expect("scan continues");
    let mut kinds: Vec<&str> = resources.iter().map(|r| r.resource_type()).collect();
    kinds.sort_unstable();
    assert_eq!(kinds, vec![AWS_INSTANCE_TYPE, AWS_S3_BUCKET_TYPE]);

    let messages = pipe.alerter.messages_for(AWS_EIP_TYPE);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Listing aws_eip is forbidden"));
}

#[tokio::test]
async fn cross_region_buckets_are_hydrated_through_their_own_region() {
    let s3 = FakeS3 {
        buckets: vec![
            ("local".to_string(), DEFAULT_REGION.to_string()),
            ("remote".to_string(), "eu-west-1".to_string()),
        ],
    };
    let pipe = pipeline(
        FakeEc2::default(),
        s3,
        MockProviderLauncher::new(SCHEMA_TYPES.to_vec()),
        ScannerOptions {
            deep: true,
            ..ScannerOptions::default()
        },
    );

    let resources = pipe.scanner.resources().await.expect("scan succeeds");
    assert_eq!(resources.len(), 2);
    assert_eq!(pipe.launcher.launches(), 2);

    let remote_client = pipe
        .launcher
        .client_for("eu-west-1")
        .expect("second region launched");
    assert_eq!(remote_client.seen_configs()[0]["region"], "eu-west-1");

    let reads = remote_client.seen_reads();
    assert_eq!(reads.len(), 1);
    let (ty, prior) = &reads[0];
    assert_eq!(ty, AWS_S3_BUCKET_TYPE);
    assert_eq!(prior["id"], "remote");
    // The routing attribute is consumed by the driver, never sent over RPC.
    assert!(prior.get(ALIAS_ATTRIBUTE).is_none());

    let default_client = pipe.launcher.client_for(DEFAULT_REGION).expect("launched");
    let default_reads = default_client.seen_reads();
    assert_eq!(default_reads.len(), 1);
    assert_eq!(default_reads[0].1["id"], "local");
}
