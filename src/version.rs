//! Schema version numbers.
//!
//! Versions are structural: the major number is a schema's sequence position
//! within the lineage and the minor number its position within the sequence,
//! both 0-indexed. Authors never choose version numbers.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A `(major, minor)` schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Whether this is the first version of any valid lineage.
    pub fn is_first(&self) -> bool {
        self.major == 0 && self.minor == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .split_once('.')
            .ok_or_else(|| format!("invalid version {s:?}: expected major.minor"))?;
        let parse = |part: &str| {
            part.parse::<u32>()
                .map_err(|e| format!("invalid version {s:?}: {e}"))
        };
        Ok(Self::new(parse(major)?, parse(minor)?))
    }
}

// The wire form is `[major, minor]`.
impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.major, self.minor].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parts = <Vec<u32>>::deserialize(deserializer)?;
        match parts.as_slice() {
            [major, minor] => Ok(Self::new(*major, *minor)),
            _ => Err(D::Error::custom("expected [major, minor]")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_display_and_parse() {
        let v = Version::new(1, 4);
        assert_eq!(v.to_string(), "1.4");
        assert_eq!("1.4".parse::<Version>().unwrap(), v);
        assert!("1".parse::<Version>().is_err());
        assert!("a.b".parse::<Version>().is_err());
    }

    #[test]
    fn test_version_ordering() {
        assert!(Version::new(0, 9) < Version::new(1, 0));
        assert!(Version::new(1, 0) < Version::new(1, 1));
    }

    #[test]
    fn test_wire_form_is_a_pair() {
        let v = Version::new(2, 3);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "[2,3]");
        assert_eq!(serde_json::from_str::<Version>(&json).unwrap(), v);
        assert!(serde_json::from_str::<Version>("[1]").is_err());
    }

    #[test]
    fn test_first_version() {
        assert!(Version::new(0, 0).is_first());
        assert!(!Version::new(0, 1).is_first());
    }
}
