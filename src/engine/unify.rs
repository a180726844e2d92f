//! Unification: the greatest lower bound of two values.

use std::collections::BTreeMap;

use super::value::{DisjVal, Field, ListVal, Val, Value};

pub(crate) fn unify(a: &Value, b: &Value) -> Value {
    match (a.val(), b.val()) {
        (Val::Bottom(_), _) => a.clone(),
        (_, Val::Bottom(_)) => b.clone(),
        (Val::Top, _) => b.clone(),
        (_, Val::Top) => a.clone(),
        (Val::Expr(_), _) | (_, Val::Expr(_)) => {
            Value::bottom("cannot unify an unresolved expression")
        }
        (Val::Disj(d), _) => unify_disj(d, b, true),
        (_, Val::Disj(d)) => unify_disj(d, a, false),
        (Val::Null, Val::Null) => a.clone(),
        (Val::Bool(x), Val::Bool(y)) => prim(x, y, Val::Bool),
        (Val::Int(x), Val::Int(y)) => prim(x, y, Val::Int),
        (Val::Float(x), Val::Float(y)) => prim(x, y, Val::Float),
        // An int instance satisfies a float constraint.
        (Val::Float(None), Val::Int(Some(i))) | (Val::Int(Some(i)), Val::Float(None)) => {
            Value::from_val(Val::Float(Some(*i as f64)))
        }
        (Val::Str(x), Val::Str(y)) => prim(x, y, Val::Str),
        (Val::Bytes(x), Val::Bytes(y)) => prim(x, y, Val::Bytes),
        (Val::Struct(x), Val::Struct(y)) => unify_structs(x, y),
        (Val::List(x), Val::List(y)) => unify_lists(x, y),
        _ => Value::bottom(format!(
            "conflicting types {} and {}",
            a.kind_name(),
            b.kind_name()
        )),
    }
}

fn prim<T: Clone + PartialEq + std::fmt::Debug>(
    x: &Option<T>,
    y: &Option<T>,
    wrap: fn(Option<T>) -> Val,
) -> Value {
    match (x, y) {
        (None, None) => Value::from_val(wrap(None)),
        (Some(v), None) | (None, Some(v)) => Value::from_val(wrap(Some(v.clone()))),
        (Some(v), Some(w)) if v == w => Value::from_val(wrap(Some(v.clone()))),
        (Some(v), Some(w)) => Value::bottom(format!("conflicting values {v:?} and {w:?}")),
    }
}

fn unify_disj(d: &DisjVal, other: &Value, disj_on_left: bool) -> Value {
    let mut branches = Vec::new();
    let mut default = None;
    for (i, branch) in d.branches.iter().enumerate() {
        let unified = if disj_on_left {
            unify(branch, other)
        } else {
            unify(other, branch)
        };
        if unified.bottom_reason().is_some() {
            continue;
        }
        if d.default == Some(i) {
            default = Some(branches.len());
        }
        branches.push(unified);
    }
    match branches.len() {
        0 => Value::bottom("no disjunction branch is satisfiable"),
        1 => branches.remove(0),
        _ => Value::disj_raw(branches, default),
    }
}

fn unify_structs(x: &BTreeMap<String, Field>, y: &BTreeMap<String, Field>) -> Value {
    let mut out = BTreeMap::new();
    for (label, fx) in x {
        match y.get(label) {
            None => {
                out.insert(label.clone(), fx.clone());
            }
            Some(fy) => {
                let unified = unify(&fx.value, &fy.value);
                if let Some(reason) = unified.bottom_reason() {
                    return Value::bottom(format!("field {label}: {reason}"));
                }
                out.insert(
                    label.clone(),
                    Field {
                        value: unified,
                        optional: fx.optional && fy.optional,
                    },
                );
            }
        }
    }
    for (label, fy) in y {
        if !x.contains_key(label) {
            out.insert(label.clone(), fy.clone());
        }
    }
    Value::from_val(Val::Struct(out))
}

fn unify_lists(x: &ListVal, y: &ListVal) -> Value {
    match (x, y) {
        (ListVal::Elems(xs), ListVal::Elems(ys)) => {
            if xs.len() != ys.len() {
                return Value::bottom(format!(
                    "conflicting list lengths {} and {}",
                    xs.len(),
                    ys.len()
                ));
            }
            unify_elems(xs.iter().zip(ys).map(|(a, b)| unify(a, b)))
        }
        (ListVal::Elems(xs), ListVal::ElemType(elem))
        | (ListVal::ElemType(elem), ListVal::Elems(xs)) => {
            unify_elems(xs.iter().map(|e| unify(e, elem)))
        }
        (ListVal::ElemType(a), ListVal::ElemType(b)) => {
            let elem = unify(a, b);
            if let Some(reason) = elem.bottom_reason() {
                return Value::bottom(format!("list element: {reason}"));
            }
            Value::list_of(elem)
        }
    }
}

fn unify_elems(iter: impl Iterator<Item = Value>) -> Value {
    let mut out = Vec::new();
    for (i, unified) in iter.enumerate() {
        if let Some(reason) = unified.bottom_reason() {
            return Value::bottom(format!("list element {i}: {reason}"));
        }
        out.push(unified);
    }
    Value::list(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StructBuilder;

    #[test]
    fn concrete_against_type_yields_concrete() {
        assert_eq!(
            unify(&Value::string("hi"), &Value::string_type()),
            Value::string("hi")
        );
    }

    #[test]
    fn conflicting_concretes_are_bottom() {
        let u = unify(&Value::int(1), &Value::int(2));
        assert!(u.bottom_reason().is_some());
    }

    #[test]
    fn conflicting_kinds_are_bottom() {
        let u = unify(&Value::int(1), &Value::string("x"));
        assert!(u.bottom_reason().unwrap().contains("conflicting types"));
    }

    #[test]
    fn struct_unification_merges_and_recurses() {
        let a = Value::struct_of([("a", Value::string("hi"))]);
        let b = StructBuilder::new()
            .field("a", Value::string_type())
            .field("b", Value::int_type())
            .build();
        let u = unify(&a, &b);
        assert_eq!(u.lookup("a"), Some(Value::string("hi")));
        assert_eq!(u.lookup("b"), Some(Value::int_type()));
    }

    #[test]
    fn struct_field_conflict_names_the_field() {
        let a = Value::struct_of([("a", Value::int(1))]);
        let b = Value::struct_of([("a", Value::int(2))]);
        assert!(unify(&a, &b).bottom_reason().unwrap().starts_with("field a"));
    }

    #[test]
    fn disjunction_collapses_to_matching_branch() {
        let schema = Value::disj_default(
            vec![
                Value::string("foo"),
                Value::string("bar"),
                Value::string("baz"),
            ],
            0,
        );
        assert_eq!(unify(&schema, &Value::string("baz")), Value::string("baz"));
        assert!(unify(&schema, &Value::string("qux"))
            .bottom_reason()
            .is_some());
    }

    #[test]
    fn open_list_accepts_each_element() {
        let schema = Value::list_of(Value::int_type());
        let inst = Value::list(vec![Value::int(1), Value::int(2)]);
        assert_eq!(unify(&schema, &inst), inst);
    }

    #[test]
    fn unification_is_commutative() {
        let a = Value::struct_of([("a", Value::string("hi"))]);
        let b = Value::struct_of([("b", Value::int(3))]);
        assert_eq!(unify(&a, &b), unify(&b, &a));
    }
}
