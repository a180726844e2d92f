//! The `Resource` carrier: a concrete data instance moving through the
//! system.

use serde::{Deserialize, Serialize};

use crate::engine::{AdapterError, Value};
use crate::version::Version;

/// A concrete data object — e.g. JSON representing a dashboard.
///
/// The payload is opaque to the core; the constraint engine compiles it on
/// use. Operations never mutate a resource in place; they return fresh ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// JSON text of the instance.
    pub payload: String,
    /// Optional name, used to label diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Resource {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            name: None,
        }
    }

    pub fn named(payload: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            name: Some(name.into()),
        }
    }

    /// The name used in diagnostics.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("resource")
    }

    /// The instance's embedded `version: [major, minor]` field, if present.
    ///
    /// Only this accessor and [`crate::lineage::Lineage::translate`] know
    /// where the version lives in an instance.
    pub fn embedded_version(&self) -> Option<Version> {
        let parsed: serde_json::Value = serde_json::from_str(&self.payload).ok()?;
        serde_json::from_value(parsed.get("version")?.clone()).ok()
    }

    pub(crate) fn compile(&self) -> Result<Value, AdapterError> {
        Value::compile_json(&self.payload, self.display_name())
    }

    /// A fresh resource carrying this one's name and a new payload.
    pub(crate) fn with_payload(&self, payload: String) -> Resource {
        Resource {
            payload,
            name: self.name.clone(),
        }
    }
}
