//! Access-denied alerts raised while scanning.
//!
//! When the caller opted into alert-and-continue semantics, a forbidden
//! listing or read is converted into one of these alerts and the affected
//! resource type simply contributes nothing to the scan output.

use tracing::warn;

use crate::alerter::{Alert, Alerter};

use super::error::ScanError;

/// Which acquisition phase the failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanningPhase {
    Enumeration,
    DetailsFetching,
}

/// Alert for a permission failure the caller chose not to abort on.
pub struct RemoteAccessDeniedAlert {
    message: String,
}

impl RemoteAccessDeniedAlert {
    pub fn new(err: &ScanError, phase: ScanningPhase) -> Self {
        let message = match phase {
            ScanningPhase::Enumeration => format!(
                "Ignoring {} from drift calculation: Listing {} is forbidden: {}",
                err.resource(),
                err.listed_type(),
                err.root_cause(),
            ),
            ScanningPhase::DetailsFetching => format!(
                "Ignoring {} from drift calculation: Reading details of {} is forbidden: {}",
                err.resource(),
                err.listed_type(),
                err.root_cause(),
            ),
        };
        Self { message }
    }
}

impl Alert for RemoteAccessDeniedAlert {
    fn message(&self) -> String {
        self.message.clone()
    }

    fn should_ignore_resource(&self) -> bool {
        true
    }
}

pub fn send_enumeration_alert(alerter: &dyn Alerter, err: &ScanError) {
    let alert = RemoteAccessDeniedAlert::new(err, ScanningPhase::Enumeration);
    warn!(message = %alert.message(), "enumeration access denied");
    alerter.send_alert(err.resource(), Box::new(alert));
}

pub fn send_details_fetching_alert(alerter: &dyn Alerter, err: &ScanError) {
    let alert = RemoteAccessDeniedAlert::new(err, ScanningPhase::DetailsFetching);
    warn!(message = %alert.message(), "details fetching access denied");
    alerter.send_alert(err.resource(), Box::new(alert));
}
