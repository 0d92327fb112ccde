//! # Scanner
//!
//! Two-phase acquisition pipeline. Phase one lists every registered resource
//! type in parallel and yields stub resources. Phase two, when deep scanning
//! is enabled, hydrates each stub through the type's registered hydrator.
//! Both phases share one global concurrency bound.
//!
//! The failure policy decides what an access-denied listing or read does:
//! under [`FailurePolicy::FailFast`] it aborts the scan, under
//! [`FailurePolicy::AlertAndContinue`] it is recorded as an alert and the
//! affected resources are left out of the result.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, instrument};

use crate::alerter::Alerter;
use crate::parallel::{ParallelRunner, RunnerHandle};
use crate::remote::alerts::{send_details_fetching_alert, send_enumeration_alert};
use crate::remote::{RemoteLibrary, ScanError};
use crate::resource::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The first listing or read error aborts the whole scan.
    FailFast,
    /// Access-denied errors raise an alert and the scan carries on without
    /// the affected resources. Any other error still aborts.
    AlertAndContinue,
}

#[derive(Debug, Clone)]
pub struct ScannerOptions {
    /// Hydrate every stub through the provider after enumeration.
    pub deep: bool,
    pub failure_policy: FailurePolicy,
    pub max_concurrency: usize,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            deep: false,
            failure_policy: FailurePolicy::FailFast,
            max_concurrency: 10,
        }
    }
}

pub struct Scanner {
    library: RemoteLibrary,
    alerter: Arc<dyn Alerter>,
    options: ScannerOptions,
    active: Mutex<Vec<RunnerHandle<ScanError>>>,
}

impl Scanner {
    pub fn new(library: RemoteLibrary, alerter: Arc<dyn Alerter>, options: ScannerOptions) -> Self {
        Self {
            library,
            alerter,
            options,
            active: Mutex::new(Vec::new()),
        }
    }

    /// Runs a full scan and returns every acquired resource.
    ///
    /// Output order is unspecified. Resources that vanished between listing
    /// and hydration are excluded silently; stubs of types without a
    /// hydrator pass through as-is.
    #[instrument(skip(self), fields(deep = self.options.deep))]
    pub async fn resources(&self) -> Result<Vec<Resource>, ScanError> {
        let stubs = self.enumerate().await?;
        info!(count = stubs.len(), "enumeration done");

        if !self.options.deep {
            self.clear_active();
            return Ok(stubs);
        }

        let resources = self.hydrate(stubs).await?;
        info!(count = resources.len(), "details fetching done");
        self.clear_active();
        Ok(resources)
    }

    /// Interrupts an in-flight scan: queued work is dropped and the pending
    /// `resources` call returns [`ScanError::Interrupted`].
    pub fn stop(&self) {
        let handles = self.active.lock().unwrap_or_else(|e| e.into_inner());
        for handle in handles.iter() {
            handle.stop(ScanError::Interrupted);
        }
    }

    async fn enumerate(&self) -> Result<Vec<Resource>, ScanError> {
        let runner: ParallelRunner<Vec<Resource>, ScanError> =
            ParallelRunner::new(self.options.max_concurrency);
        self.track(runner.handle());

        for lister in self.library.listers() {
            let lister = Arc::clone(lister);
            let alerter = Arc::clone(&self.alerter);
            let policy = self.options.failure_policy;
            runner.run(async move {
                debug!(ty = lister.supported_type(), "listing resource type");
                match lister.list().await {
                    Ok(stubs) => Ok(stubs),
                    Err(err)
                        if policy == FailurePolicy::AlertAndContinue
                            && err.is_access_denied() =>
                    {
                        send_enumeration_alert(alerter.as_ref(), &err);
                        Ok(Vec::new())
                    }
                    Err(err) => Err(err),
                }
            });
        }

        let listed = runner.wait().await?;
        Ok(listed.into_iter().flatten().collect())
    }

    async fn hydrate(&self, stubs: Vec<Resource>) -> Result<Vec<Resource>, ScanError> {
        let mut by_type: HashMap<String, Vec<Resource>> = HashMap::new();
        for stub in stubs {
            by_type
                .entry(stub.resource_type().to_string())
                .or_default()
                .push(stub);
        }

        // The root runner holds the global bound; one child per resource
        // type shares it.
        let root: ParallelRunner<Option<Resource>, ScanError> =
            ParallelRunner::new(self.options.max_concurrency);
        self.track(root.handle());

        let mut resources = Vec::new();
        let mut children = Vec::new();
        for (ty, stubs) in by_type {
            let Some(hydrator) = self.library.hydrator(&ty) else {
                debug!(ty, count = stubs.len(), "no hydrator, keeping stubs");
                resources.extend(stubs);
                continue;
            };

            let child: ParallelRunner<Option<Resource>, ScanError> = root.sub_runner();
            self.track(child.handle());
            for stub in stubs {
                let hydrator = Arc::clone(&hydrator);
                let alerter = Arc::clone(&self.alerter);
                let policy = self.options.failure_policy;
                child.run(async move {
                    match hydrator.read_details(&stub).await {
                        Ok(resource) => Ok(resource),
                        Err(err)
                            if policy == FailurePolicy::AlertAndContinue
                                && err.is_access_denied() =>
                        {
                            send_details_fetching_alert(alerter.as_ref(), &err);
                            Ok(None)
                        }
                        Err(err) => Err(err),
                    }
                });
            }
            children.push(child);
        }

        for child in children {
            resources.extend(child.wait().await?.into_iter().flatten());
        }
        Ok(resources)
    }

    fn track(&self, handle: RunnerHandle<ScanError>) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(handle);
    }

    fn clear_active(&self) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerter::InMemoryAlerter;
    use crate::remote::{ResourceHydrator, ResourceLister};
    use crate::resource::Attributes;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedLister {
        ty: &'static str,
        ids: Vec<&'static str>,
    }

    #[async_trait]
    impl ResourceLister for FixedLister {
        fn supported_type(&self) -> &str {
            self.ty
        }

        async fn list(&self) -> Result<Vec<Resource>, ScanError> {
            Ok(self
                .ids
                .iter()
                .map(|id| Resource::new(self.ty, *id, Attributes::new()))
                .collect())
        }
    }

    struct FailingLister {
        ty: &'static str,
        message: &'static str,
    }

    #[async_trait]
    impl ResourceLister for FailingLister {
        fn supported_type(&self) -> &str {
            self.ty
        }

        async fn list(&self) -> Result<Vec<Resource>, ScanError> {
            Err(ScanError::listing(
                std::io::Error::other(self.message),
                self.ty,
            ))
        }
    }

    /// Hydrator that tags each resource, misses `gone-*` ids and denies
    /// `forbidden-*` ids.
    struct ScriptedHydrator;

    #[async_trait]
    impl ResourceHydrator for ScriptedHydrator {
        async fn read_details(&self, stub: &Resource) -> Result<Option<Resource>, ScanError> {
            let id = stub.resource_id();
            if id.starts_with("gone") {
                return Ok(None);
            }
            if id.starts_with("forbidden") {
                return Err(ScanError::details(
                    crate::provider::ProviderError::Transport("Error 403".to_string()),
                    stub.resource_type(),
                    id,
                ));
            }
            let mut attrs = Attributes::new();
            attrs.insert("hydrated".to_string(), serde_json::json!(true));
            Ok(Some(Resource::new(stub.resource_type(), id, attrs)))
        }
    }

    fn scanner(library: RemoteLibrary, options: ScannerOptions) -> (Scanner, Arc<InMemoryAlerter>) {
        let alerter = Arc::new(InMemoryAlerter::new());
        (
            Scanner::new(library, Arc::clone(&alerter) as Arc<dyn Alerter>, options),
            alerter,
        )
    }

    #[tokio::test]
    async fn shallow_scan_returns_stubs_from_every_lister() {
        let mut library = RemoteLibrary::new();
        library.add_lister(Arc::new(FixedLister {
            ty: "aws_instance",
            ids: vec!["i-1", "i-2"],
        }));
        library.add_lister(Arc::new(FixedLister {
            ty: "aws_eip",
            ids: vec!["eipalloc-1"],
        }));

        let (scanner, _) = scanner(library, ScannerOptions::default());
        let resources = scanner.resources().await.expect("scan succeeds");
        assert_eq!(resources.len(), 3);
        assert!(resources
            .iter()
            .all(|r| r.attribute_str("hydrated").is_none()));
    }

    #[tokio::test]
    async fn deep_scan_hydrates_and_excludes_vanished_resources() {
        let mut library = RemoteLibrary::new();
        library.add_lister(Arc::new(FixedLister {
            ty: "aws_instance",
            ids: vec!["i-1", "gone-2"],
        }));
        library.add_hydrator("aws_instance", Arc::new(ScriptedHydrator));

        let (scanner, _) = scanner(
            library,
            ScannerOptions {
                deep: true,
                ..ScannerOptions::default()
            },
        );
        let resources = scanner.resources().await.expect("scan succeeds");
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].resource_id(), "i-1");
        assert_eq!(resources[0].attribute_str("hydrated"), None);
        assert_eq!(
            resources[0].attributes().get("hydrated"),
            Some(&serde_json::json!(true))
        );
    }

    #[tokio::test]
    async fn types_without_a_hydrator_pass_through_deep_scans() {
        let mut library = RemoteLibrary::new();
        library.add_lister(Arc::new(FixedLister {
            ty: "aws_eip",
            ids: vec!["eipalloc-1"],
        }));

        let (scanner, _) = scanner(
            library,
            ScannerOptions {
                deep: true,
                ..ScannerOptions::default()
            },
        );
        let resources = scanner.resources().await.expect("scan succeeds");
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].resource_id(), "eipalloc-1");
    }

    #[tokio::test]
    async fn fail_fast_aborts_on_a_listing_error() {
        let mut library = RemoteLibrary::new();
        library.add_lister(Arc::new(FixedLister {
            ty: "aws_instance",
            ids: vec!["i-1"],
        }));
        library.add_lister(Arc::new(FailingLister {
            ty: "aws_eip",
            message: "AccessDenied: DescribeAddresses",
        }));

        let (scanner, alerter) = scanner(library, ScannerOptions::default());
        let err = scanner.resources().await.expect_err("scan aborts");
        assert_eq!(err.resource(), "aws_eip");
        assert!(alerter.is_empty());
    }

    #[tokio::test]
    async fn alert_and_continue_keeps_the_other_types() {
        let mut library = RemoteLibrary::new();
        library.add_lister(Arc::new(FixedLister {
            ty: "aws_instance",
            ids: vec!["i-1"],
        }));
        library.add_lister(Arc::new(FailingLister {
            ty: "aws_eip",
            message: "AccessDenied: DescribeAddresses",
        }));

        let (scanner, alerter) = scanner(
            library,
            ScannerOptions {
                failure_policy: FailurePolicy::AlertAndContinue,
                ..ScannerOptions::default()
            },
        );
        let resources = scanner.resources().await.expect("scan continues");
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].resource_type(), "aws_instance");
        assert_eq!(alerter.messages_for("aws_eip").len(), 1);
    }

    #[tokio::test]
    async fn alert_and_continue_does_not_swallow_other_errors() {
        let mut library = RemoteLibrary::new();
        library.add_lister(Arc::new(FailingLister {
            ty: "aws_instance",
            message: "connection reset by peer",
        }));

        let (scanner, _) = scanner(
            library,
            ScannerOptions {
                failure_policy: FailurePolicy::AlertAndContinue,
                ..ScannerOptions::default()
            },
        );
        scanner.resources().await.expect_err("non-403 still aborts");
    }

    #[tokio::test]
    async fn denied_details_reads_are_alerted_and_dropped() {
        let mut library = RemoteLibrary::new();
        library.add_lister(Arc::new(FixedLister {
            ty: "aws_instance",
            ids: vec!["i-1", "forbidden-2"],
        }));
        library.add_hydrator("aws_instance", Arc::new(ScriptedHydrator));

        let (scanner, alerter) = scanner(
            library,
            ScannerOptions {
                deep: true,
                failure_policy: FailurePolicy::AlertAndContinue,
                ..ScannerOptions::default()
            },
        );
        let resources = scanner.resources().await.expect("scan continues");
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].resource_id(), "i-1");
        assert_eq!(
            alerter.messages_for("aws_instance.forbidden-2").len(),
            1
        );
    }

    struct SlowLister {
        ty: &'static str,
    }

    #[async_trait]
    impl ResourceLister for SlowLister {
        fn supported_type(&self) -> &str {
            self.ty
        }

        async fn list(&self) -> Result<Vec<Resource>, ScanError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(vec![Resource::new(self.ty, "slow", Attributes::new())])
        }
    }

    #[tokio::test]
    async fn stop_interrupts_an_in_flight_scan() {
        let mut library = RemoteLibrary::new();
        for _ in 0..8 {
            library.add_lister(Arc::new(SlowLister { ty: "aws_instance" }));
        }

        let (scanner, _) = scanner(
            library,
            ScannerOptions {
                max_concurrency: 1,
                ..ScannerOptions::default()
            },
        );
        let scanner = Arc::new(scanner);

        let scan = tokio::spawn({
            let scanner = Arc::clone(&scanner);
            async move { scanner.resources().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        scanner.stop();

        let err = scan
            .await
            .expect("scan task not panicked")
            .expect_err("interrupted scan fails");
        assert!(matches!(err, ScanError::Interrupted));
    }
}
