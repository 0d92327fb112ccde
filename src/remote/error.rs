//! Scan error taxonomy.
//!
//! Every failure produced while acquiring resources is annotated with the
//! resource type it concerns, and for dependent listings also with the
//! prerequisite type that actually failed, so a caller can tell "I can't list
//! myself" apart from "I can't list my prerequisite".

use thiserror::Error;

use crate::provider::ProviderError;
use crate::resource::DeserializeError;

/// Foreign error entering the scan from an SDK or repository.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ScanError {
    /// Listing the resource type itself failed.
    #[error("error listing resources of type {resource_type}")]
    Listing {
        resource_type: String,
        #[source]
        source: BoxError,
    },

    /// Listing a prerequisite type failed while enumerating another.
    #[error("error enumerating {resource_type}: listing {listed_type} failed")]
    ListingDependency {
        resource_type: String,
        listed_type: String,
        #[source]
        source: BoxError,
    },

    /// Scanning one specific resource failed mid-enumeration.
    #[error("error scanning resource {resource_type}.{resource_id}")]
    Scanning {
        resource_type: String,
        resource_id: String,
        #[source]
        source: BoxError,
    },

    /// Hydrating one resource through the provider failed.
    #[error("error reading details of {resource_type}.{resource_id}")]
    DetailsFetching {
        resource_type: String,
        resource_id: String,
        #[source]
        source: ProviderError,
    },

    /// The hydrated state could not be deserialized.
    #[error("error deserializing {resource_type}.{resource_id}")]
    Deserialization {
        resource_type: String,
        resource_id: String,
        #[source]
        source: DeserializeError,
    },

    /// The scan was stopped cooperatively.
    #[error("scan interrupted")]
    Interrupted,
}

impl ScanError {
    pub fn listing(source: impl Into<BoxError>, resource_type: impl Into<String>) -> Self {
        Self::Listing {
            resource_type: resource_type.into(),
            source: source.into(),
        }
    }

    pub fn listing_with_type(
        source: impl Into<BoxError>,
        resource_type: impl Into<String>,
        listed_type: impl Into<String>,
    ) -> Self {
        Self::ListingDependency {
            resource_type: resource_type.into(),
            listed_type: listed_type.into(),
            source: source.into(),
        }
    }

    pub fn scanning(
        source: impl Into<BoxError>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self::Scanning {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            source: source.into(),
        }
    }

    pub fn details(
        source: ProviderError,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self::DetailsFetching {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            source,
        }
    }

    /// The resource (or resource type) this error concerns, as an alert key.
    pub fn resource(&self) -> String {
        match self {
            Self::Listing { resource_type, .. } | Self::ListingDependency { resource_type, .. } => {
                resource_type.clone()
            }
            Self::Scanning {
                resource_type,
                resource_id,
                ..
            }
            | Self::DetailsFetching {
                resource_type,
                resource_id,
                ..
            }
            | Self::Deserialization {
                resource_type,
                resource_id,
                ..
            } => format!("{resource_type}.{resource_id}"),
            Self::Interrupted => "scan".to_string(),
        }
    }

    /// The type whose listing or read actually failed. For dependent listings
    /// this is the prerequisite, not the enumerated type.
    pub fn listed_type(&self) -> &str {
        match self {
            Self::ListingDependency { listed_type, .. } => listed_type,
            Self::Listing { resource_type, .. }
            | Self::Scanning { resource_type, .. }
            | Self::DetailsFetching { resource_type, .. }
            | Self::Deserialization { resource_type, .. } => resource_type,
            Self::Interrupted => "scan",
        }
    }

    /// Root-cause message, for alert bodies.
    pub fn root_cause(&self) -> String {
        match self {
            Self::Listing { source, .. }
            | Self::ListingDependency { source, .. }
            | Self::Scanning { source, .. } => source.to_string(),
            Self::DetailsFetching { source, .. } => source.to_string(),
            Self::Deserialization { source, .. } => source.to_string(),
            Self::Interrupted => self.to_string(),
        }
    }

    /// Whether the root cause looks like a permission failure. Cloud SDKs and
    /// RPC stacks disagree on the shape, so this matches the message the way
    /// the error actually arrives.
    pub fn is_access_denied(&self) -> bool {
        let cause = match self {
            Self::Interrupted => return false,
            other => other.root_cause(),
        };
        cause.contains("AccessDenied")
            || cause.contains("PermissionDenied")
            || cause.contains("Error 403")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("ListRouteTables failed: AccessDenied: not authorized")]
    struct FakeSdkError;

    #[test]
    fn dependency_error_names_both_types() {
        let err = ScanError::listing_with_type(FakeSdkError, "aws_route", "aws_route_table");
        assert_eq!(err.resource(), "aws_route");
        assert_eq!(err.listed_type(), "aws_route_table");
        let message = err.to_string();
        assert!(message.contains("aws_route"));
        assert!(message.contains("aws_route_table"));
    }

    #[test]
    fn access_denied_is_detected_from_the_root_cause() {
        let denied = ScanError::listing(FakeSdkError, "aws_route_table");
        assert!(denied.is_access_denied());

        let other = ScanError::listing(
            std::io::Error::new(std::io::ErrorKind::TimedOut, "request timed out"),
            "aws_route_table",
        );
        assert!(!other.is_access_denied());
        assert!(!ScanError::Interrupted.is_access_denied());
    }
}
