//! Lacuna records: declared, structured gaps in a translation.
//!
//! A lacuna is a report, not an error: translation succeeded, but something
//! about the mapping deserves the consumer's attention — a default that
//! changed underneath a value, a field filled with a placeholder, a field
//! dropped on the floor.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A field involved in a translation gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRef {
    /// Dotted path to the field.
    pub path: String,
    /// The field's value at the relevant end of the translation.
    pub value: serde_json::Value,
}

impl FieldRef {
    pub fn new(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }
}

/// A structured record of one translation gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lacuna {
    /// Fields on the source side of the gap.
    #[serde(default)]
    pub source_fields: Vec<FieldRef>,
    /// Fields on the target side of the gap.
    #[serde(default)]
    pub target_fields: Vec<FieldRef>,
    /// Human-readable description.
    pub message: String,
    /// Which kind of gap this is.
    #[serde(rename = "type")]
    pub kind: LacunaKind,
}

impl Lacuna {
    pub fn new(kind: LacunaKind, message: impl Into<String>) -> Self {
        Self {
            source_fields: Vec::new(),
            target_fields: Vec::new(),
            message: message.into(),
            kind,
        }
    }

    pub fn with_source_field(mut self, field: FieldRef) -> Self {
        self.source_fields.push(field);
        self
    }

    pub fn with_target_field(mut self, field: FieldRef) -> Self {
        self.target_fields.push(field);
        self
    }
}

/// The closed set of lacuna types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LacunaKind {
    /// The source value was the source schema's default and became the
    /// target schema's (different) default.
    ChangedDefault,
    /// A target field was filled with a placeholder value.
    Placeholder,
    /// A source field has no target counterpart and was dropped.
    Dropped,
    /// A field's name changed between source and target.
    Renamed,
    /// Anything else the lens author wants to surface.
    Other,
}

impl fmt::Display for LacunaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LacunaKind::ChangedDefault => "ChangedDefault",
            LacunaKind::Placeholder => "Placeholder",
            LacunaKind::Dropped => "Dropped",
            LacunaKind::Renamed => "Renamed",
            LacunaKind::Other => "Other",
        };
        write!(f, "{name}")
    }
}

impl FromStr for LacunaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ChangedDefault" => Ok(LacunaKind::ChangedDefault),
            "Placeholder" => Ok(LacunaKind::Placeholder),
            "Dropped" => Ok(LacunaKind::Dropped),
            "Renamed" => Ok(LacunaKind::Renamed),
            "Other" => Ok(LacunaKind::Other),
            _ => Err(format!("unknown lacuna type {s:?}")),
        }
    }
}
