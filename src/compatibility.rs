//! Schema compatibility checking.
//!
//! Defines what "backwards compatible" means for adjacent schemas: every
//! concrete instance valid under the predecessor must be valid under the
//! successor. Within a sequence that property is required; across a sequence
//! boundary its negation is required.

use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

use crate::engine::{Kind, Value};

/// Result of a compatibility check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityResult {
    /// Whether the successor admits every instance the predecessor admits.
    pub is_compatible: bool,
    /// Whether this is a breaking change.
    pub is_breaking: bool,
    /// List of changes detected.
    pub changes: Vec<SchemaChange>,
    /// Summary of the compatibility check.
    pub summary: String,
}

impl CompatibilityResult {
    fn compatible(changes: Vec<SchemaChange>) -> Self {
        let summary = if changes.is_empty() {
            "no changes detected".to_string()
        } else {
            format!("{} compatible changes detected", changes.len())
        };
        Self {
            is_compatible: true,
            is_breaking: false,
            changes,
            summary,
        }
    }

    fn incompatible(changes: Vec<SchemaChange>, reason: impl Into<String>) -> Self {
        Self {
            is_compatible: false,
            is_breaking: true,
            changes,
            summary: reason.into(),
        }
    }

    /// The changes that break compatibility.
    pub fn breaking_changes(&self) -> impl Iterator<Item = &SchemaChange> {
        self.changes.iter().filter(|c| c.is_breaking)
    }
}

/// A detected change between adjacent schemas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaChange {
    /// Type of change.
    pub change_type: ChangeType,
    /// Path to the changed field (e.g. "spec.title").
    pub path: String,
    /// Old constraint (if applicable), rendered.
    pub old_value: Option<String>,
    /// New constraint (if applicable), rendered.
    pub new_value: Option<String>,
    /// Whether this change is breaking.
    pub is_breaking: bool,
    /// Human-readable description.
    pub description: String,
}

/// Type of schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// A new field was added.
    FieldAdded,
    /// A field was removed.
    FieldRemoved,
    /// A field's constraint changed.
    TypeChanged,
    /// A field's optionality changed (required <-> optional).
    OptionalityChanged,
    /// Default value changed, added, or removed.
    DefaultChanged,
    /// Other change.
    Other,
}

/// Compatibility checker for adjacent schema versions.
pub struct CompatibilityChecker {
    /// Strict mode - any change is considered breaking.
    strict_mode: bool,
}

impl CompatibilityChecker {
    pub fn new() -> Self {
        Self { strict_mode: false }
    }

    /// Enable strict mode.
    pub fn strict(mut self) -> Self {
        self.strict_mode = true;
        self
    }

    /// Check whether `new` is backwards compatible with `old`.
    pub fn check(&self, old: &Value, new: &Value) -> CompatibilityResult {
        let mut changes = Vec::new();

        if old.kind() == Kind::Struct && new.kind() == Kind::Struct {
            detect_struct_changes(old, new, "", &mut changes);
        } else {
            detect_value_changes(old, new, &mut changes);
        }

        let breaking_count = changes.iter().filter(|c| c.is_breaking).count();

        if self.strict_mode && !changes.is_empty() {
            CompatibilityResult::incompatible(
                changes,
                "strict mode: schemas differ".to_string(),
            )
        } else if breaking_count > 0 {
            let detail: Vec<&str> = changes
                .iter()
                .filter(|c| c.is_breaking)
                .map(|c| c.description.as_str())
                .collect();
            CompatibilityResult::incompatible(
                changes.clone(),
                format!(
                    "{breaking_count} breaking changes detected ({})",
                    detail.join("; ")
                ),
            )
        } else {
            CompatibilityResult::compatible(changes)
        }
    }
}

impl Default for CompatibilityChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn field_path(path: &str, label: &str) -> String {
    if path.is_empty() {
        label.to_string()
    } else {
        format!("{path}.{label}")
    }
}

fn detect_struct_changes(old: &Value, new: &Value, path: &str, changes: &mut Vec<SchemaChange>) {
    let (Ok(old_fields), Ok(new_fields)) = (old.fields(true), new.fields(true)) else {
        return;
    };

    for (label, old_val, old_opt) in &old_fields {
        let p = field_path(path, label);
        let Some((_, new_val, new_opt)) = new_fields.iter().find(|(l, _, _)| l == label) else {
            changes.push(SchemaChange {
                change_type: ChangeType::FieldRemoved,
                path: p,
                old_value: Some(old_val.to_string()),
                new_value: None,
                is_breaking: true,
                description: format!("field '{label}' was removed"),
            });
            continue;
        };

        detect_optionality_change(label, &p, *old_opt, new_val, *new_opt, changes);
        detect_default_change(label, &p, old_val, new_val, changes);

        if old_val.kind() == Kind::Struct && new_val.kind() == Kind::Struct {
            detect_struct_changes(old_val, new_val, &p, changes);
        } else if !new_val.subsumes(old_val) {
            changes.push(SchemaChange {
                change_type: ChangeType::TypeChanged,
                path: p,
                old_value: Some(old_val.to_string()),
                new_value: Some(new_val.to_string()),
                is_breaking: true,
                description: format!("field '{label}' was narrowed"),
            });
        } else if !old_val.subsumes(new_val) {
            changes.push(SchemaChange {
                change_type: ChangeType::TypeChanged,
                path: p,
                old_value: Some(old_val.to_string()),
                new_value: Some(new_val.to_string()),
                is_breaking: false,
                description: format!("field '{label}' was widened"),
            });
        }
    }

    for (label, new_val, new_opt) in &new_fields {
        if old_fields.iter().any(|(l, _, _)| l == label) {
            continue;
        }
        let has_default = new_val.default_of().is_some();
        changes.push(SchemaChange {
            change_type: ChangeType::FieldAdded,
            path: field_path(path, label),
            old_value: None,
            new_value: Some(new_val.to_string()),
            is_breaking: !new_opt && !has_default,
            description: if *new_opt {
                format!("optional field '{label}' was added")
            } else if has_default {
                format!("field '{label}' was added with a default")
            } else {
                format!("required field '{label}' was added without a default (breaking)")
            },
        });
    }
}

fn detect_optionality_change(
    label: &str,
    path: &str,
    old_opt: bool,
    new_val: &Value,
    new_opt: bool,
    changes: &mut Vec<SchemaChange>,
) {
    if old_opt == new_opt {
        return;
    }
    if old_opt && !new_opt {
        // Instances that omitted the field only stay valid if a default
        // now fills it.
        let has_default = new_val.default_of().is_some();
        changes.push(SchemaChange {
            change_type: ChangeType::OptionalityChanged,
            path: path.to_string(),
            old_value: None,
            new_value: None,
            is_breaking: !has_default,
            description: format!("field '{label}' became required"),
        });
    } else {
        changes.push(SchemaChange {
            change_type: ChangeType::OptionalityChanged,
            path: path.to_string(),
            old_value: None,
            new_value: None,
            is_breaking: false,
            description: format!("field '{label}' became optional"),
        });
    }
}

fn detect_default_change(
    label: &str,
    path: &str,
    old_val: &Value,
    new_val: &Value,
    changes: &mut Vec<SchemaChange>,
) {
    match (old_val.default_of(), new_val.default_of()) {
        (Some(old_default), Some(new_default)) => {
            let equal =
                old_default.subsumes(&new_default) && new_default.subsumes(&old_default);
            if !equal {
                changes.push(SchemaChange {
                    change_type: ChangeType::DefaultChanged,
                    path: path.to_string(),
                    old_value: Some(old_default.to_string()),
                    new_value: Some(new_default.to_string()),
                    is_breaking: true,
                    description: format!(
                        "default of field '{label}' changed from {old_default} to {new_default}"
                    ),
                });
            }
        }
        (Some(old_default), None) => {
            changes.push(SchemaChange {
                change_type: ChangeType::DefaultChanged,
                path: path.to_string(),
                old_value: Some(old_default.to_string()),
                new_value: None,
                is_breaking: true,
                description: format!("default of field '{label}' was removed"),
            });
        }
        (None, Some(new_default)) => {
            changes.push(SchemaChange {
                change_type: ChangeType::DefaultChanged,
                path: path.to_string(),
                old_value: None,
                new_value: Some(new_default.to_string()),
                is_breaking: false,
                description: format!("field '{label}' gained default {new_default}"),
            });
        }
        (None, None) => {}
    }
}

/// Fallback for non-struct schemas: a subsumption check, with a rendered
/// line diff of the two constraints for the report.
fn detect_value_changes(old: &Value, new: &Value, changes: &mut Vec<SchemaChange>) {
    if new.subsumes(old) {
        if !old.subsumes(new) {
            changes.push(SchemaChange {
                change_type: ChangeType::Other,
                path: String::new(),
                old_value: Some(old.to_string()),
                new_value: Some(new.to_string()),
                is_breaking: false,
                description: "constraint was widened".to_string(),
            });
        }
        return;
    }

    let old_text = old.to_string();
    let new_text = new.to_string();
    let diff = TextDiff::from_lines(&old_text, &new_text);
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Delete => changes.push(SchemaChange {
                change_type: ChangeType::Other,
                path: String::new(),
                old_value: Some(change.value().trim_end().to_string()),
                new_value: None,
                is_breaking: true,
                description: "constraint no longer admitted".to_string(),
            }),
            ChangeTag::Insert => changes.push(SchemaChange {
                change_type: ChangeType::Other,
                path: String::new(),
                old_value: None,
                new_value: Some(change.value().trim_end().to_string()),
                is_breaking: false,
                description: "constraint added".to_string(),
            }),
            ChangeTag::Equal => {}
        }
    }
}
