//! Subsumption: a preorder on values. `subsumes(broad, narrow)` holds when
//! every concrete datum admitted by `narrow` is admitted by `broad`.

use super::value::{ListVal, Val, Value};

pub(crate) fn subsumes(broad: &Value, narrow: &Value) -> bool {
    match (broad.val(), narrow.val()) {
        (Val::Top, _) => true,
        (_, Val::Bottom(_)) => true,
        (Val::Bottom(_), _) => false,
        (Val::Expr(_), _) | (_, Val::Expr(_)) => false,
        // Default marks are irrelevant to subsumption; only branch sets count.
        (_, Val::Disj(dn)) => dn.branches.iter().all(|b| subsumes(broad, b)),
        (Val::Disj(db), _) => db.branches.iter().any(|b| subsumes(b, narrow)),
        (Val::Null, Val::Null) => true,
        (Val::Bool(None), Val::Bool(_)) => true,
        (Val::Bool(Some(x)), Val::Bool(Some(y))) => x == y,
        (Val::Int(None), Val::Int(_)) => true,
        (Val::Int(Some(x)), Val::Int(Some(y))) => x == y,
        (Val::Float(None), Val::Float(_) | Val::Int(_)) => true,
        (Val::Float(Some(x)), Val::Float(Some(y))) => x == y,
        (Val::Str(None), Val::Str(_)) => true,
        (Val::Str(Some(x)), Val::Str(Some(y))) => x == y,
        (Val::Bytes(None), Val::Bytes(_)) => true,
        (Val::Bytes(Some(x)), Val::Bytes(Some(y))) => x == y,
        (Val::Struct(fb), Val::Struct(fnar)) => fb.iter().all(|(label, f)| {
            match fnar.get(label) {
                Some(g) if !f.optional && g.optional => false,
                Some(g) => subsumes(&f.value, &g.value),
                None => f.optional,
            }
        }),
        (Val::List(ListVal::ElemType(e)), Val::List(ListVal::Elems(xs))) => {
            xs.iter().all(|x| subsumes(e, x))
        }
        (Val::List(ListVal::ElemType(a)), Val::List(ListVal::ElemType(b))) => subsumes(a, b),
        (Val::List(ListVal::Elems(a)), Val::List(ListVal::Elems(b))) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| subsumes(x, y))
        }
        _ => false,
    }
}
