//! # Resource Model
//!
//! The normalized representation of a cloud resource: a type name, an id and
//! an ordered attribute map. Identity is `(type, id)` and is unique within one
//! enumeration run of that type; equality compares identity only. Resources
//! are immutable once produced and owned by the caller of the scan.
//!
//! Enumerators first produce **stub** resources (identity plus the few
//! addressing attributes a later hydration needs, such as a parent id or a
//! region alias); hydration replaces them with fully attributed resources via
//! the [`Deserializer`].

mod deserializer;

pub use deserializer::{DeserializeError, Deserializer};

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Ordered attribute map. Insertion order is preserved.
pub type Attributes = serde_json::Map<String, Value>;

/// A normalized cloud resource.
#[derive(Debug, Clone)]
pub struct Resource {
    ty: String,
    id: String,
    attrs: Attributes,
}

impl Resource {
    pub fn new(ty: impl Into<String>, id: impl Into<String>, attrs: Attributes) -> Self {
        Self {
            ty: ty.into(),
            id: id.into(),
            attrs,
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.ty
    }

    pub fn resource_id(&self) -> &str {
        &self.id
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attrs
    }

    /// A string attribute, if present and actually a string.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    /// The string-valued attributes of a stub, used to address a hydration
    /// call. Non-string attributes are not addressing material and are
    /// skipped.
    pub fn addressing_attributes(&self) -> HashMap<String, String> {
        self.attrs
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect()
    }
}

impl PartialEq for Resource {
    /// Resources compare by identity, not by attributes.
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.id == other.id
    }
}

impl Eq for Resource {}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.ty, self.id)
    }
}

/// Identity-only projection of a [`Resource`] for downstream reporting.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SerializableResource {
    pub id: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl From<&Resource> for SerializableResource {
    fn from(res: &Resource) -> Self {
        Self {
            id: res.resource_id().to_string(),
            ty: res.resource_type().to_string(),
        }
    }
}

/// Creates [`Resource`] values for enumerators and the deserializer.
///
/// Abstract resources are tracked by identity and whatever attributes the
/// enumerator chose to keep; they never go through schema-driven hydration.
pub trait ResourceFactory: Send + Sync {
    fn create_abstract_resource(&self, ty: &str, id: &str, data: Attributes) -> Resource;
}

/// The plain factory used in production: attributes pass through untouched.
#[derive(Debug, Default, Clone)]
pub struct DefaultResourceFactory;

impl ResourceFactory for DefaultResourceFactory {
    fn create_abstract_resource(&self, ty: &str, id: &str, data: Attributes) -> Resource {
        Resource::new(ty, id, data)
    }
}
