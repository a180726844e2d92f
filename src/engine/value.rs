//! The value algebra: one representation for schemas and instances.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::json;
use super::subsume::subsumes;
use super::unify::unify;
use super::{AdapterError, Kind, Path, PrimitiveKind};

/// An opaque constraint-language value.
///
/// A `Value` is either a type ("string"), a concrete datum (`"foo"`), or a
/// composite of the two: open structs whose fields may be optional, lists
/// that are concrete or element-typed, and disjunctions that may mark one
/// branch as the default. Cloning is cheap; values are immutable.
#[derive(Clone, PartialEq)]
pub struct Value(Arc<Val>);

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Val {
    Top,
    Bottom(String),
    Null,
    Bool(Option<bool>),
    Int(Option<i64>),
    Float(Option<f64>),
    Str(Option<String>),
    Bytes(Option<Vec<u8>>),
    Struct(BTreeMap<String, Field>),
    List(ListVal),
    Disj(DisjVal),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Field {
    pub value: Value,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ListVal {
    /// A concrete, fixed-length list.
    Elems(Vec<Value>),
    /// An open list typed by its element.
    ElemType(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DisjVal {
    pub branches: Vec<Value>,
    pub default: Option<usize>,
}

/// A deferred expression, resolved against a scope at translation time.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Ref(Path),
    If {
        path: Path,
        op: CmpOp,
        rhs: Value,
        then: Value,
        or_else: Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
}

impl Value {
    pub(crate) fn from_val(val: Val) -> Self {
        Self(Arc::new(val))
    }

    pub(crate) fn val(&self) -> &Val {
        &self.0
    }

    // --- constructors ---

    pub fn top() -> Self {
        Self::from_val(Val::Top)
    }

    pub(crate) fn bottom(reason: impl Into<String>) -> Self {
        Self::from_val(Val::Bottom(reason.into()))
    }

    pub fn null() -> Self {
        Self::from_val(Val::Null)
    }

    pub fn bool(b: bool) -> Self {
        Self::from_val(Val::Bool(Some(b)))
    }

    pub fn bool_type() -> Self {
        Self::from_val(Val::Bool(None))
    }

    pub fn int(i: i64) -> Self {
        Self::from_val(Val::Int(Some(i)))
    }

    pub fn int_type() -> Self {
        Self::from_val(Val::Int(None))
    }

    pub fn float(f: f64) -> Self {
        Self::from_val(Val::Float(Some(f)))
    }

    pub fn float_type() -> Self {
        Self::from_val(Val::Float(None))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::from_val(Val::Str(Some(s.into())))
    }

    pub fn string_type() -> Self {
        Self::from_val(Val::Str(None))
    }

    pub fn bytes(b: Vec<u8>) -> Self {
        Self::from_val(Val::Bytes(Some(b)))
    }

    pub fn bytes_type() -> Self {
        Self::from_val(Val::Bytes(None))
    }

    /// A struct with the given required fields.
    pub fn struct_of<L: Into<String>>(fields: impl IntoIterator<Item = (L, Value)>) -> Self {
        let mut b = StructBuilder::new();
        for (label, value) in fields {
            b = b.field(label, value);
        }
        b.build()
    }

    pub fn empty_struct() -> Self {
        Self::from_val(Val::Struct(BTreeMap::new()))
    }

    /// A concrete list of the given elements.
    pub fn list(elems: Vec<Value>) -> Self {
        Self::from_val(Val::List(ListVal::Elems(elems)))
    }

    /// An open list whose elements satisfy `elem`.
    pub fn list_of(elem: Value) -> Self {
        Self::from_val(Val::List(ListVal::ElemType(elem)))
    }

    /// A disjunction with no default mark.
    pub fn disj(branches: Vec<Value>) -> Self {
        Self::from_val(Val::Disj(DisjVal {
            branches,
            default: None,
        }))
    }

    /// A disjunction whose branch at `default` is the marked default.
    pub fn disj_default(branches: Vec<Value>, default: usize) -> Self {
        Self::from_val(Val::Disj(DisjVal {
            branches,
            default: Some(default),
        }))
    }

    pub(crate) fn disj_raw(branches: Vec<Value>, default: Option<usize>) -> Self {
        Self::from_val(Val::Disj(DisjVal { branches, default }))
    }

    /// A deferred reference to a dotted path in the resolution scope.
    pub fn reference(path: &str) -> Self {
        Self::from_val(Val::Expr(Expr::Ref(Path::parse(path))))
    }

    /// A deferred conditional: `then` when the scope value at `path` equals
    /// `rhs`, otherwise `or_else`.
    pub fn when_eq(path: &str, rhs: Value, then: Value, or_else: Value) -> Self {
        Self::from_val(Val::Expr(Expr::If {
            path: Path::parse(path),
            op: CmpOp::Eq,
            rhs,
            then,
            or_else,
        }))
    }

    /// The negated counterpart of [`Value::when_eq`].
    pub fn when_ne(path: &str, rhs: Value, then: Value, or_else: Value) -> Self {
        Self::from_val(Val::Expr(Expr::If {
            path: Path::parse(path),
            op: CmpOp::Ne,
            rhs,
            then,
            or_else,
        }))
    }

    // --- inspection ---

    pub fn kind(&self) -> Kind {
        match self.val() {
            Val::Top => Kind::Top,
            Val::Bottom(_) => Kind::Bottom,
            Val::Null => Kind::Null,
            Val::Bool(_) => Kind::Primitive(PrimitiveKind::Bool),
            Val::Int(_) => Kind::Primitive(PrimitiveKind::Int),
            Val::Float(_) => Kind::Primitive(PrimitiveKind::Float),
            Val::Str(_) => Kind::Primitive(PrimitiveKind::String),
            Val::Bytes(_) => Kind::Primitive(PrimitiveKind::Bytes),
            Val::Struct(_) => Kind::Struct,
            Val::List(_) => Kind::List,
            Val::Disj(_) => Kind::Disjunction,
            Val::Expr(_) => Kind::Deferred,
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self.val() {
            Val::Top => "top",
            Val::Bottom(_) => "bottom",
            Val::Null => "null",
            Val::Bool(_) => "bool",
            Val::Int(_) => "int",
            Val::Float(_) => "float",
            Val::Str(_) => "string",
            Val::Bytes(_) => "bytes",
            Val::Struct(_) => "struct",
            Val::List(_) => "list",
            Val::Disj(_) => "disjunction",
            Val::Expr(_) => "deferred expression",
        }
    }

    /// The reason this value is unsatisfiable, if it is.
    pub fn bottom_reason(&self) -> Option<&str> {
        match self.val() {
            Val::Bottom(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.val() {
            Val::Str(Some(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.val() {
            Val::Int(Some(i)) => Some(*i),
            _ => None,
        }
    }

    /// Whether the value denotes exactly one concrete datum. Optional struct
    /// fields do not block concreteness.
    pub fn is_concrete(&self) -> bool {
        match self.val() {
            Val::Top | Val::Bottom(_) | Val::Disj(_) | Val::Expr(_) => false,
            Val::Null => true,
            Val::Bool(v) => v.is_some(),
            Val::Int(v) => v.is_some(),
            Val::Float(v) => v.is_some(),
            Val::Str(v) => v.is_some(),
            Val::Bytes(v) => v.is_some(),
            Val::Struct(fields) => fields
                .values()
                .all(|f| f.optional || f.value.is_concrete()),
            Val::List(ListVal::Elems(elems)) => elems.iter().all(Value::is_concrete),
            Val::List(ListVal::ElemType(_)) => false,
        }
    }

    // --- structural access ---

    /// The fields of a struct as `(label, value, optional)` triples.
    pub fn fields(
        &self,
        include_optional: bool,
    ) -> Result<Vec<(String, Value, bool)>, AdapterError> {
        match self.val() {
            Val::Struct(fields) => Ok(fields
                .iter()
                .filter(|(_, f)| include_optional || !f.optional)
                .map(|(label, f)| (label.clone(), f.value.clone(), f.optional))
                .collect()),
            _ => Err(AdapterError::new(
                "fields",
                format!("cannot iterate fields of {}", self.kind_name()),
            )),
        }
    }

    /// Look up a dotted path through nested structs.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        self.lookup_path(&Path::parse(path))
    }

    pub fn lookup_path(&self, path: &Path) -> Option<Value> {
        let mut cur = self.clone();
        for seg in path.segments() {
            let next = match cur.val() {
                Val::Struct(fields) => fields.get(seg).map(|f| f.value.clone()),
                _ => None,
            };
            cur = next?;
        }
        Some(cur)
    }

    /// A copy of this struct with `label` set to `value` (as a required
    /// field).
    pub fn with_field(&self, label: &str, value: Value) -> Result<Value, AdapterError> {
        match self.val() {
            Val::Struct(fields) => {
                let mut fields = fields.clone();
                fields.insert(
                    label.to_owned(),
                    Field {
                        value,
                        optional: false,
                    },
                );
                Ok(Value::from_val(Val::Struct(fields)))
            }
            _ => Err(AdapterError::new(
                "fill",
                format!("cannot set field {label} on {}", self.kind_name()),
            )),
        }
    }

    /// The elements of a concrete list.
    pub fn list_elements(&self) -> Result<Vec<Value>, AdapterError> {
        match self.val() {
            Val::List(ListVal::Elems(elems)) => Ok(elems.clone()),
            _ => Err(AdapterError::new(
                "list",
                format!("cannot iterate elements of {}", self.kind_name()),
            )),
        }
    }

    /// The element type of an open list, if any.
    pub fn any_element(&self) -> Option<Value> {
        match self.val() {
            Val::List(ListVal::ElemType(elem)) => Some(elem.clone()),
            _ => None,
        }
    }

    /// The branches of a disjunction, if this is one.
    pub fn branches(&self) -> Option<Vec<Value>> {
        match self.val() {
            Val::Disj(d) => Some(d.branches.clone()),
            _ => None,
        }
    }

    // --- defaults ---

    /// The explicitly marked default, if one exists.
    ///
    /// An open list never reports `[]` merely because its element type would
    /// permit an empty list; only a disjunction branch that is literally an
    /// empty list counts as an explicit empty default.
    pub fn default_of(&self) -> Option<Value> {
        match self.val() {
            Val::Disj(d) => {
                let marked = d.branches.get(d.default?)?;
                let dv = marked.eval_defaults();
                if is_empty_concrete_list(&dv)
                    && !d.branches.iter().any(|b| is_empty_concrete_list(b))
                {
                    return None;
                }
                Some(dv)
            }
            _ => None,
        }
    }

    /// Eagerly resolve default marks throughout the value.
    pub fn eval_defaults(&self) -> Value {
        match self.val() {
            Val::Disj(d) => match d.default {
                Some(i) => d.branches[i].eval_defaults(),
                None => self.clone(),
            },
            Val::Struct(fields) => {
                let fields = fields
                    .iter()
                    .map(|(label, f)| {
                        (
                            label.clone(),
                            Field {
                                value: f.value.eval_defaults(),
                                optional: f.optional,
                            },
                        )
                    })
                    .collect();
                Value::from_val(Val::Struct(fields))
            }
            Val::List(ListVal::Elems(elems)) => {
                Value::list(elems.iter().map(Value::eval_defaults).collect())
            }
            _ => self.clone(),
        }
    }

    // --- algebra ---

    /// The unification (greatest lower bound) of two values. An
    /// unsatisfiable result is Bottom, carrying the conflict reason.
    pub fn unify(&self, other: &Value) -> Value {
        unify(self, other)
    }

    /// Whether every concrete datum admitted by `narrow` is admitted by
    /// `self`.
    pub fn subsumes(&self, narrow: &Value) -> bool {
        subsumes(self, narrow)
    }

    /// Validate a concrete instance against this value-as-schema: the
    /// unification must be satisfiable and, after default resolution,
    /// concrete.
    pub fn accepts(&self, instance: &Value) -> Result<(), String> {
        let unified = self.unify(instance);
        if let Some(reason) = unified.bottom_reason() {
            return Err(reason.to_owned());
        }
        let resolved = unified.eval_defaults();
        if !resolved.is_concrete() {
            return Err(format!("value is not concrete: {resolved}"));
        }
        Ok(())
    }

    // --- deferred expressions ---

    /// Replace every deferred expression with its value under `scope`.
    /// References to paths absent from the scope are adapter errors.
    pub fn resolve(&self, scope: &Value) -> Result<Value, AdapterError> {
        match self.val() {
            Val::Expr(Expr::Ref(path)) => scope.lookup_path(path).ok_or_else(|| {
                AdapterError::new("resolve", format!("reference to undefined path {path}"))
            }),
            Val::Expr(Expr::If {
                path,
                op,
                rhs,
                then,
                or_else,
            }) => {
                let lhs = scope.lookup_path(path).ok_or_else(|| {
                    AdapterError::new("resolve", format!("reference to undefined path {path}"))
                })?;
                let equal = values_equal(&lhs, rhs);
                let taken = match (op, equal) {
                    (CmpOp::Eq, true) | (CmpOp::Ne, false) => then,
                    _ => or_else,
                };
                taken.resolve(scope)
            }
            Val::Struct(fields) => {
                let mut out = BTreeMap::new();
                for (label, f) in fields {
                    out.insert(
                        label.clone(),
                        Field {
                            value: f.value.resolve(scope)?,
                            optional: f.optional,
                        },
                    );
                }
                Ok(Value::from_val(Val::Struct(out)))
            }
            Val::List(ListVal::Elems(elems)) => {
                let elems = elems
                    .iter()
                    .map(|e| e.resolve(scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::list(elems))
            }
            Val::List(ListVal::ElemType(elem)) => Ok(Value::list_of(elem.resolve(scope)?)),
            Val::Disj(d) => {
                let branches = d
                    .branches
                    .iter()
                    .map(|b| b.resolve(scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::disj_raw(branches, d.default))
            }
            _ => Ok(self.clone()),
        }
    }

    /// Every path referenced by deferred expressions anywhere in the value,
    /// including branches that resolution might not take.
    pub fn deferred_refs(&self) -> Vec<Path> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs(&self, out: &mut Vec<Path>) {
        match self.val() {
            Val::Expr(Expr::Ref(path)) => out.push(path.clone()),
            Val::Expr(Expr::If {
                path,
                rhs,
                then,
                or_else,
                ..
            }) => {
                out.push(path.clone());
                rhs.collect_refs(out);
                then.collect_refs(out);
                or_else.collect_refs(out);
            }
            Val::Struct(fields) => {
                for f in fields.values() {
                    f.value.collect_refs(out);
                }
            }
            Val::List(ListVal::Elems(elems)) => {
                for e in elems {
                    e.collect_refs(out);
                }
            }
            Val::List(ListVal::ElemType(elem)) => elem.collect_refs(out),
            Val::Disj(d) => {
                for b in &d.branches {
                    b.collect_refs(out);
                }
            }
            _ => {}
        }
    }

    // --- JSON ---

    /// Compile JSON text into a concrete value. `filename` labels
    /// diagnostics.
    pub fn compile_json(source: &str, filename: &str) -> Result<Value, AdapterError> {
        json::compile(source, filename)
    }

    /// Marshal to JSON with default resolution, deterministic field order,
    /// and no HTML escaping. Fails if the value is not concrete.
    pub fn marshal_json(&self) -> Result<String, AdapterError> {
        json::marshal(self)
    }
}

/// Equality via mutual subsumption.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    subsumes(a, b) && subsumes(b, a)
}

fn is_empty_concrete_list(v: &Value) -> bool {
    matches!(v.val(), Val::List(ListVal::Elems(elems)) if elems.is_empty())
}

/// Builder for struct values mixing required and optional fields.
pub struct StructBuilder {
    fields: BTreeMap<String, Field>,
}

impl StructBuilder {
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    pub fn field(mut self, label: impl Into<String>, value: Value) -> Self {
        self.fields.insert(
            label.into(),
            Field {
                value,
                optional: false,
            },
        );
        self
    }

    pub fn optional(mut self, label: impl Into<String>, value: Value) -> Self {
        self.fields.insert(
            label.into(),
            Field {
                value,
                optional: true,
            },
        );
        self
    }

    pub fn build(self) -> Value {
        Value::from_val(Val::Struct(self.fields))
    }
}

impl Default for StructBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.val() {
            Val::Top => write!(f, "_"),
            Val::Bottom(reason) => write!(f, "_|_({reason})"),
            Val::Null => write!(f, "null"),
            Val::Bool(None) => write!(f, "bool"),
            Val::Bool(Some(b)) => write!(f, "{b}"),
            Val::Int(None) => write!(f, "int"),
            Val::Int(Some(i)) => write!(f, "{i}"),
            Val::Float(None) => write!(f, "float"),
            Val::Float(Some(x)) => write!(f, "{x}"),
            Val::Str(None) => write!(f, "string"),
            Val::Str(Some(s)) => write!(f, "{s:?}"),
            Val::Bytes(None) => write!(f, "bytes"),
            Val::Bytes(Some(b)) => write!(f, "bytes({})", b.len()),
            Val::Struct(fields) => {
                write!(f, "{{")?;
                for (i, (label, field)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    let mark = if field.optional { "?" } else { "" };
                    write!(f, "{label}{mark}: {}", field.value)?;
                }
                write!(f, "}}")
            }
            Val::List(ListVal::Elems(elems)) => {
                write!(f, "[")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            }
            Val::List(ListVal::ElemType(elem)) => write!(f, "[...{elem}]"),
            Val::Disj(d) => {
                for (i, b) in d.branches.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    if d.default == Some(i) {
                        write!(f, "*")?;
                    }
                    write!(f, "{b}")?;
                }
                Ok(())
            }
            Val::Expr(Expr::Ref(path)) => write!(f, "{path}"),
            Val::Expr(Expr::If {
                path,
                op,
                rhs,
                then,
                or_else,
            }) => {
                let op = match op {
                    CmpOp::Eq => "==",
                    CmpOp::Ne => "!=",
                };
                write!(f, "if {path} {op} {rhs} then {then} else {or_else}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjunction_default_is_reported() {
        let v = Value::disj_default(
            vec![Value::string("foo"), Value::string("bar")],
            0,
        );
        assert_eq!(v.default_of(), Some(Value::string("foo")));
        assert!(!v.is_concrete());
        assert_eq!(v.eval_defaults(), Value::string("foo"));
    }

    #[test]
    fn open_list_reports_no_default() {
        let v = Value::list_of(Value::int_type());
        assert_eq!(v.default_of(), None);
    }

    #[test]
    fn explicit_empty_list_default_is_reported() {
        let v = Value::disj_default(
            vec![Value::list(vec![]), Value::list_of(Value::int_type())],
            0,
        );
        assert_eq!(v.default_of(), Some(Value::list(vec![])));
    }

    #[test]
    fn struct_concreteness_ignores_optional_fields() {
        let v = StructBuilder::new()
            .field("a", Value::string("x"))
            .optional("b", Value::int_type())
            .build();
        assert!(v.is_concrete());
    }

    #[test]
    fn lookup_walks_nested_structs() {
        let v = Value::struct_of([(
            "outer",
            Value::struct_of([("inner", Value::int(7))]),
        )]);
        assert_eq!(v.lookup("outer.inner"), Some(Value::int(7)));
        assert_eq!(v.lookup("outer.missing"), None);
    }

    #[test]
    fn resolve_substitutes_references() {
        let scope = Value::struct_of([(
            "input",
            Value::struct_of([("a", Value::string("hi"))]),
        )]);
        let rel = Value::struct_of([("a", Value::reference("input.a"))]);
        let out = rel.resolve(&scope).unwrap();
        assert_eq!(out.lookup("a"), Some(Value::string("hi")));
    }

    #[test]
    fn resolve_rejects_undefined_reference() {
        let scope = Value::struct_of([("input", Value::empty_struct())]);
        let err = Value::reference("input.anion").resolve(&scope).unwrap_err();
        assert!(err.message.contains("input.anion"));
    }

    #[test]
    fn conditional_takes_the_matching_branch() {
        let scope = Value::struct_of([(
            "input",
            Value::struct_of([("u", Value::string("foo"))]),
        )]);
        let expr = Value::when_eq(
            "input.u",
            Value::string("foo"),
            Value::string("bar"),
            Value::reference("input.u"),
        );
        assert_eq!(expr.resolve(&scope).unwrap(), Value::string("bar"));
    }

    #[test]
    fn deferred_refs_cover_untaken_branches() {
        let expr = Value::when_eq(
            "input.aunion",
            Value::string("bar"),
            Value::string("foo"),
            Value::reference("input.anion"),
        );
        let refs: Vec<String> = expr.deferred_refs().iter().map(|p| p.to_string()).collect();
        assert!(refs.contains(&"input.aunion".to_owned()));
        assert!(refs.contains(&"input.anion".to_owned()));
    }
}
