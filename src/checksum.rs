//! Content checksums sealing bound lineages.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::engine::Value;
use crate::version::Version;

/// SHA-256 identity of a bound lineage's content.
///
/// The digest covers the lineage name and the rendered constraint of every
/// schema in version order. Schema content is sealed at bind time, so two
/// binds of the same source always agree and any divergence in sealed
/// content shows up as a different identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Seal a lineage: its name plus each `(version, schema)` pair, in
    /// version order.
    pub fn seal<'a>(
        name: &str,
        schemas: impl IntoIterator<Item = (Version, &'a Value)>,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        for (version, schema) in schemas {
            hasher.update(format!("\n{version} {schema}").as_bytes());
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the given lineage content seals to this checksum.
    pub fn matches<'a>(
        &self,
        name: &str,
        schemas: impl IntoIterator<Item = (Version, &'a Value)>,
    ) -> bool {
        *self == Self::seal(name, schemas)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Value {
        Value::struct_of([("a", Value::string_type())])
    }

    #[test]
    fn test_seal_is_stable() {
        let s = schema();
        let a = Checksum::seal("playlist", [(Version::new(0, 0), &s)]);
        let b = Checksum::seal("playlist", [(Version::new(0, 0), &s)]);
        assert_eq!(a, b);
        assert!(a.matches("playlist", [(Version::new(0, 0), &s)]));
    }

    #[test]
    fn test_seal_covers_name_version_and_content() {
        let s = schema();
        let widened = Value::struct_of([("a", Value::int_type())]);
        let sealed = Checksum::seal("playlist", [(Version::new(0, 0), &s)]);

        assert_ne!(sealed, Checksum::seal("dashboard", [(Version::new(0, 0), &s)]));
        assert_ne!(sealed, Checksum::seal("playlist", [(Version::new(1, 0), &s)]));
        assert_ne!(
            sealed,
            Checksum::seal("playlist", [(Version::new(0, 0), &widened)])
        );
        assert!(!sealed.matches("playlist", [(Version::new(0, 0), &widened)]));
    }
}
