//! JSON compile and marshal for concrete values.

use serde_json::{Map, Number};

use super::value::{ListVal, Val, Value};
use super::AdapterError;

/// Parse JSON text into a concrete value.
pub(crate) fn compile(source: &str, filename: &str) -> Result<Value, AdapterError> {
    let parsed: serde_json::Value = serde_json::from_str(source)
        .map_err(|e| AdapterError::new("compile", format!("{filename}: {e}")))?;
    Ok(from_json(&parsed))
}

fn from_json(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::null(),
        serde_json::Value::Bool(b) => Value::bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::int(i),
            None => Value::float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::string(s.clone()),
        serde_json::Value::Array(elems) => Value::list(elems.iter().map(from_json).collect()),
        serde_json::Value::Object(fields) => {
            Value::struct_of(fields.iter().map(|(k, v)| (k.clone(), from_json(v))))
        }
    }
}

/// Marshal a value to JSON text. Defaults are resolved first; struct fields
/// are emitted in stable (sorted) order, and `<`, `>`, `&` pass through
/// unescaped.
pub(crate) fn marshal(v: &Value) -> Result<String, AdapterError> {
    let resolved = v.eval_defaults();
    let json = to_json(&resolved)?;
    serde_json::to_string(&json).map_err(|e| AdapterError::new("marshal", e.to_string()))
}

fn to_json(v: &Value) -> Result<serde_json::Value, AdapterError> {
    match v.val() {
        Val::Null => Ok(serde_json::Value::Null),
        Val::Bool(Some(b)) => Ok(serde_json::Value::Bool(*b)),
        Val::Int(Some(i)) => Ok(serde_json::Value::Number((*i).into())),
        Val::Float(Some(x)) => Number::from_f64(*x)
            .map(serde_json::Value::Number)
            .ok_or_else(|| {
                AdapterError::new("marshal", format!("{x} is not representable in JSON"))
            }),
        Val::Str(Some(s)) => Ok(serde_json::Value::String(s.clone())),
        Val::Struct(fields) => {
            let mut out = Map::new();
            for (label, field) in fields {
                if field.optional && !field.value.is_concrete() {
                    continue;
                }
                let encoded = to_json(&field.value).map_err(|e| {
                    AdapterError::new("marshal", format!("field {label}: {}", e.message))
                })?;
                out.insert(label.clone(), encoded);
            }
            Ok(serde_json::Value::Object(out))
        }
        Val::List(ListVal::Elems(elems)) => Ok(serde_json::Value::Array(
            elems.iter().map(to_json).collect::<Result<_, _>>()?,
        )),
        Val::Bytes(Some(_)) => Err(AdapterError::new(
            "marshal",
            "bytes values are not representable in JSON",
        )),
        _ => Err(AdapterError::new(
            "marshal",
            format!("value is not concrete: {v}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StructBuilder;

    #[test]
    fn compile_then_marshal_roundtrips() {
        let v = compile(r#"{"b":1,"a":"hi","l":[true,null]}"#, "test").unwrap();
        assert_eq!(marshal(&v).unwrap(), r#"{"a":"hi","b":1,"l":[true,null]}"#);
    }

    #[test]
    fn compile_reports_the_filename() {
        let err = compile("{nope", "dashboard.json").unwrap_err();
        assert!(err.message.starts_with("dashboard.json:"));
    }

    #[test]
    fn marshal_resolves_defaults() {
        let v = StructBuilder::new()
            .field("a", Value::string("hi"))
            .field(
                "b",
                Value::disj_default(vec![Value::int(42), Value::int_type()], 0),
            )
            .build();
        assert_eq!(marshal(&v).unwrap(), r#"{"a":"hi","b":42}"#);
    }

    #[test]
    fn marshal_omits_nonconcrete_optional_fields() {
        let v = StructBuilder::new()
            .field("a", Value::string("hi"))
            .optional("b", Value::int_type())
            .build();
        assert_eq!(marshal(&v).unwrap(), r#"{"a":"hi"}"#);
    }

    #[test]
    fn marshal_fails_on_nonconcrete_required_field() {
        let v = Value::struct_of([("a", Value::string_type())]);
        let err = marshal(&v).unwrap_err();
        assert!(err.message.contains("field a"));
    }

    #[test]
    fn marshal_does_not_escape_html() {
        let v = Value::struct_of([("q", Value::string("a<b>&c"))]);
        assert_eq!(marshal(&v).unwrap(), r#"{"q":"a<b>&c"}"#);
    }
}
