//! Instance utilities: applying schema defaults to a resource and trimming
//! them back out.
//!
//! Both walks recurse on the schema's shape. For structs the schema drives
//! iteration so optional fields are seen; for lists each element picks the
//! disjunction branch of the schema's element type that it concretely
//! satisfies.

use crate::engine::{AdapterError, Kind, Value};
use crate::error::Result;
use crate::lineage::Schema;
use crate::resource::Resource;

/// A fresh resource in which every field that the schema specifies and the
/// input omits is filled with the schema's default.
pub fn apply_defaults(resource: &Resource, schema: &Value) -> Result<Resource> {
    let instance = resource.compile()?;
    let filled = apply_value(&instance, schema)?;
    Ok(resource.with_payload(filled.marshal_json()?))
}

/// A fresh resource from which every field equal to its schema default is
/// removed. Fields the schema does not mention are retained verbatim.
pub fn trim_defaults(resource: &Resource, schema: &Value) -> Result<Resource> {
    let instance = resource.compile()?;
    let (trimmed, _) = trim_value(schema, &instance)?;
    Ok(resource.with_payload(trimmed.marshal_json()?))
}

impl Schema {
    /// [`apply_defaults`] against this schema.
    pub fn apply_defaults(&self, resource: &Resource) -> Result<Resource> {
        apply_defaults(resource, self.value())
    }

    /// [`trim_defaults`] against this schema.
    pub fn trim_defaults(&self, resource: &Resource) -> Result<Resource> {
        trim_defaults(resource, self.value())
    }
}

pub(crate) fn apply_value(input: &Value, schema: &Value) -> Result<Value> {
    match schema.kind() {
        Kind::List => {
            let Some(elem) = schema.any_element() else {
                // No element type to drive recursion; unify whole lists.
                return Ok(input.unify(schema));
            };
            if elem.kind() == Kind::Bottom {
                return Err(AdapterError::new(
                    "apply-defaults",
                    "cannot determine the element type of the list",
                )
                .into());
            }
            let elems = input.list_elements().map_err(|_| {
                AdapterError::new("apply-defaults", "input is not a concrete list")
            })?;
            let mut out = Vec::with_capacity(elems.len());
            for elem_value in elems {
                let branch = disjunction_branch(&elem, &elem_value)?;
                // Elements the schema cannot complete are passed over.
                if let Ok(filled) = apply_value(&elem_value, &branch) {
                    out.push(filled);
                }
            }
            Ok(Value::list(out))
        }

        Kind::Struct => {
            if input.kind() != Kind::Struct {
                return Ok(input.unify(schema));
            }
            let mut out = input.clone();
            for (label, schema_field, optional) in schema.fields(true)? {
                match input.lookup(&label) {
                    Some(input_field) => {
                        if let Ok(filled) = apply_value(&input_field, &schema_field) {
                            out = out.with_field(&label, filled)?;
                        }
                    }
                    None if !optional => {
                        out = out.with_field(&label, schema_field.eval_defaults())?;
                    }
                    None => {}
                }
            }
            Ok(out)
        }

        _ => Ok(input.unify(schema)),
    }
}

pub(crate) fn trim_value(schema: &Value, input: &Value) -> Result<(Value, bool)> {
    match schema.kind() {
        Kind::Struct => {
            if input.kind() != Kind::Struct {
                return Ok((input.clone(), false));
            }
            let mut out = Value::empty_struct();
            let schema_fields = schema.fields(true)?;
            for (label, schema_field, _) in &schema_fields {
                if let Some(input_field) = input.lookup(label) {
                    if let Ok((trimmed, equal)) = trim_value(schema_field, &input_field) {
                        if !equal {
                            out = out.with_field(label, trimmed)?;
                        }
                    }
                }
            }
            // Labels the schema does not define are retained verbatim.
            for (label, input_field, _) in input.fields(false)? {
                if !schema_fields.iter().any(|(l, _, _)| *l == label) {
                    out = out.with_field(&label, input_field)?;
                }
            }
            Ok((out, false))
        }

        Kind::List => {
            if equals_default(schema, input) {
                return Ok((input.clone(), true));
            }
            let Some(elem) = schema.any_element() else {
                return Ok((input.clone(), false));
            };
            if elem.kind() == Kind::Bottom {
                return Ok((input.clone(), true));
            }
            let Ok(elems) = input.list_elements() else {
                return Ok((input.clone(), true));
            };
            let mut out = Vec::with_capacity(elems.len());
            for elem_value in elems {
                let trimmed = disjunction_branch(&elem, &elem_value)
                    .and_then(|branch| trim_value(&branch, &elem_value));
                match trimmed {
                    Ok((re, false)) => out.push(re),
                    // Elements can't be dropped positionally; equal-to-default
                    // and failing elements stay as they were.
                    _ => out.push(elem_value),
                }
            }
            Ok((Value::list(out), false))
        }

        Kind::Disjunction => {
            if equals_default(schema, input) {
                return Ok((input.clone(), true));
            }
            match disjunction_branch(schema, input) {
                Ok(branch) => trim_value(&branch, input),
                Err(_) => Ok((input.clone(), false)),
            }
        }

        _ => Ok((input.clone(), equals_default(schema, input))),
    }
}

/// The branch of a disjunctive schema that the concrete value satisfies; a
/// non-disjunctive schema is its own branch.
fn disjunction_branch(schema: &Value, concrete: &Value) -> Result<Value> {
    let Some(branches) = schema.branches() else {
        return Ok(schema.clone());
    };
    for branch in branches {
        if branch.accepts(concrete).is_ok() {
            return Ok(branch);
        }
    }
    Err(AdapterError::new(
        "branch-select",
        format!("no disjunction branch admits {concrete}"),
    )
    .into())
}

fn equals_default(schema: &Value, input: &Value) -> bool {
    match schema.default_of() {
        Some(default) => default.subsumes(input) && input.subsumes(&default),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StructBuilder;

    fn schema_with_default() -> Value {
        StructBuilder::new()
            .field("a", Value::string_type())
            .field(
                "b",
                Value::disj_default(vec![Value::int(42), Value::int_type()], 0),
            )
            .build()
    }

    #[test]
    fn test_apply_fills_missing_defaults() {
        let r = Resource::new(r#"{"a":"hi"}"#);
        let out = apply_defaults(&r, &schema_with_default()).unwrap();
        assert_eq!(out.payload, r#"{"a":"hi","b":42}"#);
    }

    #[test]
    fn test_apply_keeps_present_values() {
        let r = Resource::new(r#"{"a":"hi","b":7}"#);
        let out = apply_defaults(&r, &schema_with_default()).unwrap();
        assert_eq!(out.payload, r#"{"a":"hi","b":7}"#);
    }

    #[test]
    fn test_apply_leaves_absent_optional_fields_absent() {
        let schema = StructBuilder::new()
            .field("a", Value::string_type())
            .optional("b", Value::int_type())
            .build();
        let r = Resource::new(r#"{"a":"hi"}"#);
        let out = apply_defaults(&r, &schema).unwrap();
        assert_eq!(out.payload, r#"{"a":"hi"}"#);
    }

    #[test]
    fn test_trim_removes_values_equal_to_default() {
        let r = Resource::new(r#"{"a":"hi","b":42}"#);
        let out = trim_defaults(&r, &schema_with_default()).unwrap();
        assert_eq!(out.payload, r#"{"a":"hi"}"#);
    }

    #[test]
    fn test_trim_keeps_values_differing_from_default() {
        let r = Resource::new(r#"{"a":"hi","b":7}"#);
        let out = trim_defaults(&r, &schema_with_default()).unwrap();
        assert_eq!(out.payload, r#"{"a":"hi","b":7}"#);
    }

    #[test]
    fn test_trim_retains_unknown_labels_verbatim() {
        let r = Resource::new(r#"{"a":"hi","b":42,"extra":true}"#);
        let out = trim_defaults(&r, &schema_with_default()).unwrap();
        assert_eq!(out.payload, r#"{"a":"hi","extra":true}"#);
    }

    #[test]
    fn test_trim_drops_list_equal_to_default() {
        let schema = Value::struct_of([(
            "tags",
            Value::disj_default(
                vec![
                    Value::list(vec![Value::string("x")]),
                    Value::list_of(Value::string_type()),
                ],
                0,
            ),
        )]);
        let r = Resource::new(r#"{"tags":["x"]}"#);
        let out = trim_defaults(&r, &schema).unwrap();
        assert_eq!(out.payload, "{}");
    }

    #[test]
    fn test_apply_recurses_into_typed_lists() {
        let schema = Value::struct_of([(
            "items",
            Value::list_of(StructBuilder::new()
                .field("name", Value::string_type())
                .field(
                    "on",
                    Value::disj_default(vec![Value::bool(true), Value::bool_type()], 0),
                )
                .build()),
        )]);
        let r = Resource::new(r#"{"items":[{"name":"a"},{"name":"b","on":false}]}"#);
        let out = apply_defaults(&r, &schema).unwrap();
        assert_eq!(
            out.payload,
            r#"{"items":[{"name":"a","on":true},{"name":"b","on":false}]}"#
        );
    }

    #[test]
    fn test_apply_then_trim_restores_trimmed_form() {
        let schema = schema_with_default();
        let r = Resource::new(r#"{"a":"hi"}"#);
        let applied = apply_defaults(&r, &schema).unwrap();
        let trimmed = trim_defaults(&applied, &schema).unwrap();
        assert_eq!(trimmed.payload, trim_defaults(&r, &schema).unwrap().payload);
    }
}
