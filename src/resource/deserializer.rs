//! Converts raw provider state values into normalized [`Resource`]s.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use super::{Resource, ResourceFactory};

#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("expected an object state for {ty}, got {found}")]
    NotAnObject { ty: String, found: &'static str },
    #[error("state for {ty} is missing a string `id` attribute")]
    MissingId { ty: String },
}

/// Turns the opaque state values returned by a provider plugin into
/// [`Resource`]s through a [`ResourceFactory`].
#[derive(Clone)]
pub struct Deserializer {
    factory: Arc<dyn ResourceFactory>,
}

impl Deserializer {
    pub fn new(factory: Arc<dyn ResourceFactory>) -> Self {
        Self { factory }
    }

    /// Deserializes one state value. Failures are fatal for this resource
    /// only and are non-retryable.
    pub fn deserialize_one(&self, ty: &str, value: Value) -> Result<Resource, DeserializeError> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(DeserializeError::NotAnObject {
                    ty: ty.to_string(),
                    found: json_kind(&other),
                })
            }
        };
        let id = map
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| DeserializeError::MissingId { ty: ty.to_string() })?
            .to_string();
        Ok(self.factory.create_abstract_resource(ty, &id, map))
    }

    /// Deserializes a batch. A malformed item is logged and skipped so a
    /// single bad state cannot abort the rest of the batch.
    pub fn deserialize(&self, ty: &str, values: Vec<Value>) -> Vec<Resource> {
        values
            .into_iter()
            .filter_map(|value| match self.deserialize_one(ty, value) {
                Ok(res) => Some(res),
                Err(err) => {
                    warn!(ty, error = %err, "skipping resource state that failed to deserialize");
                    None
                }
            })
            .collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::DefaultResourceFactory;
    use serde_json::json;

    fn deserializer() -> Deserializer {
        Deserializer::new(Arc::new(DefaultResourceFactory))
    }

    #[test]
    fn deserializes_state_into_resource() {
        let res = deserializer()
            .deserialize_one("aws_instance", json!({"id": "i-1", "image_id": "ami-1"}))
            .expect("valid state");
        assert_eq!(res.resource_type(), "aws_instance");
        assert_eq!(res.resource_id(), "i-1");
        assert_eq!(res.attribute_str("image_id"), Some("ami-1"));
    }

    #[test]
    fn missing_id_is_an_error() {
        let err = deserializer()
            .deserialize_one("aws_instance", json!({"image_id": "ami-1"}))
            .expect_err("id is required");
        assert!(matches!(err, DeserializeError::MissingId { .. }));
    }

    #[test]
    fn batch_skips_malformed_items() {
        let resources = deserializer().deserialize(
            "aws_instance",
            vec![
                json!({"id": "i-1"}),
                json!("not an object"),
                json!({"no_id_here": true}),
                json!({"id": "i-2"}),
            ],
        );
        let ids: Vec<_> = resources.iter().map(Resource::resource_id).collect();
        assert_eq!(ids, vec!["i-1", "i-2"]);
    }
}
