//! Constraint engine
//!
//! The one dependency the lineage core cannot purge is a notion of "schema as
//! a predicate over concrete data". This module provides it: an opaque
//! [`Value`] covering both schemas (open structs, optional fields, typed
//! lists, disjunctions with default marks) and concrete instances, together
//! with the operations the rest of the crate is written against — compile,
//! unify, subsume, field iteration, default extraction, and deterministic
//! JSON marshalling.
//!
//! Nothing outside this module depends on the representation. Swapping the
//! evaluator for a different engine only requires preserving the algebraic
//! laws the core leans on: unification is commutative and associative,
//! subsumption is a preorder, and defaults are stable under re-evaluation.

mod json;
mod subsume;
mod unify;
mod value;

pub use value::{StructBuilder, Value};

use std::fmt;

use thiserror::Error;

/// Error raised by a constraint-engine operation, carrying the underlying
/// diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("constraint engine {op} failed: {message}")]
pub struct AdapterError {
    /// The operation that failed (e.g. `compile`, `resolve`, `marshal`).
    pub op: &'static str,
    /// Underlying diagnostic.
    pub message: String,
}

impl AdapterError {
    pub(crate) fn new(op: &'static str, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
        }
    }
}

/// The coarse shape of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Top,
    Bottom,
    Null,
    Primitive(PrimitiveKind),
    Struct,
    List,
    Disjunction,
    /// A deferred expression (reference or conditional) awaiting resolution
    /// against a scope.
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Bool,
    Int,
    Float,
    String,
    Bytes,
}

/// A dotted field path, e.g. `input.aunion`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path(Vec<String>);

impl Path {
    pub fn parse(path: &str) -> Self {
        Self(path.split('.').map(str::to_owned).collect())
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}
