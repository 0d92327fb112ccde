//! # Alerter
//!
//! Non-fatal findings raised while scanning (an unreadable bucket location, a
//! forbidden listing that the caller chose to skip instead of abort) are
//! reported as alerts rather than errors. The [`Alerter`] trait is the
//! capability the acquisition pipeline depends on; [`InMemoryAlerter`] is the
//! collecting implementation handed to callers and to tests.

use std::collections::HashMap;
use std::sync::Mutex;

/// A single non-fatal finding.
pub trait Alert: Send + Sync {
    fn message(&self) -> String;

    /// Whether the resource the alert relates to should be dropped from the
    /// scan output entirely.
    fn should_ignore_resource(&self) -> bool {
        false
    }
}

/// Capability for reporting alerts, keyed by `type.id` (or just `type` for
/// alerts about a whole resource type).
pub trait Alerter: Send + Sync {
    fn send_alert(&self, key: String, alert: Box<dyn Alert>);
}

/// Collects alerts in memory for later inspection.
#[derive(Default)]
pub struct InMemoryAlerter {
    alerts: Mutex<HashMap<String, Vec<Box<dyn Alert>>>>,
}

impl InMemoryAlerter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All alert messages recorded under `key`.
    pub fn messages_for(&self, key: &str) -> Vec<String> {
        let alerts = self.alerts.lock().unwrap_or_else(|e| e.into_inner());
        alerts
            .get(key)
            .map(|list| list.iter().map(|a| a.message()).collect())
            .unwrap_or_default()
    }

    /// Every recorded alert message, in no particular order.
    pub fn messages(&self) -> Vec<String> {
        let alerts = self.alerts.lock().unwrap_or_else(|e| e.into_inner());
        alerts
            .values()
            .flat_map(|list| list.iter().map(|a| a.message()))
            .collect()
    }

    pub fn len(&self) -> usize {
        let alerts = self.alerts.lock().unwrap_or_else(|e| e.into_inner());
        alerts.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Alerter for InMemoryAlerter {
    fn send_alert(&self, key: String, alert: Box<dyn Alert>) {
        let mut alerts = self.alerts.lock().unwrap_or_else(|e| e.into_inner());
        alerts.entry(key).or_default().push(alert);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestAlert(String);

    impl Alert for TestAlert {
        fn message(&self) -> String {
            self.0.clone()
        }
    }

    #[test]
    fn groups_alerts_by_key() {
        let alerter = InMemoryAlerter::new();
        alerter.send_alert(
            "aws_s3_bucket.b1".to_string(),
            Box::new(TestAlert("unreadable location".to_string())),
        );
        alerter.send_alert(
            "aws_s3_bucket.b1".to_string(),
            Box::new(TestAlert("second finding".to_string())),
        );
        alerter.send_alert(
            "aws_instance".to_string(),
            Box::new(TestAlert("listing forbidden".to_string())),
        );

        assert_eq!(alerter.len(), 3);
        assert_eq!(
            alerter.messages_for("aws_s3_bucket.b1"),
            vec!["unreadable location", "second finding"]
        );
        assert_eq!(alerter.messages_for("aws_instance"), vec!["listing forbidden"]);
        assert!(alerter.messages_for("missing").is_empty());
    }
}
