//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::sync::Once;

use strata::{BindConfig, Lineage, StructBuilder, Value};

static INIT: Once = Once::new();

/// Install the test tracing subscriber once; `RUST_LOG` controls output.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Bind a lineage source that the test expects to be valid.
pub fn bind(source: &Value) -> Lineage {
    init_tracing();
    Lineage::bind(source, &BindConfig::default()).expect("lineage should bind")
}

// Source-value assembly, mirroring the shape of the lineage source format.

pub fn lineage_source(name: &str, sequences: Vec<Value>) -> Value {
    Value::struct_of([
        ("name", Value::string(name)),
        ("sequences", Value::list(sequences)),
    ])
}

pub fn sequence(schemas: Vec<Value>) -> Value {
    Value::struct_of([("schemas", Value::list(schemas))])
}

pub fn sequence_with_lens(schemas: Vec<Value>, forward: Value, reverse: Value) -> Value {
    Value::struct_of([
        ("schemas", Value::list(schemas)),
        (
            "lens",
            Value::struct_of([("forward", forward), ("reverse", reverse)]),
        ),
    ])
}

pub fn lens_dir(from: (i64, i64), to: (i64, i64), rel: Value, lacunas: Vec<Value>) -> Value {
    let version =
        |(major, minor): (i64, i64)| Value::list(vec![Value::int(major), Value::int(minor)]);
    let mut builder = StructBuilder::new()
        .field("from", version(from))
        .field("to", version(to))
        .field("rel", rel);
    if !lacunas.is_empty() {
        builder = builder.field("lacunas", Value::list(lacunas));
    }
    builder.build()
}

pub fn lacuna_source(kind: &str, message: &str, condition: Option<Value>) -> Value {
    let mut builder = StructBuilder::new()
        .field("type", Value::string(kind))
        .field("message", Value::string(message));
    if let Some(condition) = condition {
        builder = builder.field("condition", condition);
    }
    builder.build()
}
