//! Exemplar lineages.
//!
//! Small, complete lineage sources exercising each evolution pattern the
//! crate supports. They are used throughout the documentation and tests;
//! bind one with [`crate::lineage::Lineage::bind`].

use crate::engine::{StructBuilder, Value};

/// One sequence, one schema. The smallest valid lineage.
pub fn single() -> Value {
    lineage(
        "single",
        vec![sequence(vec![Value::struct_of([(
            "astring",
            Value::string_type(),
        )])])],
    )
}

/// One sequence, two schemas: the successor adds a field with a default,
/// the canonical non-breaking change.
pub fn additive() -> Value {
    lineage(
        "additive",
        vec![sequence(vec![
            Value::struct_of([("astring", Value::string_type())]),
            StructBuilder::new()
                .field("astring", Value::string_type())
                .field(
                    "anint",
                    Value::disj_default(vec![Value::int(42), Value::int_type()], 0),
                )
                .build(),
        ])],
    )
}

/// Two sequences: the second adds a required field with no default, the
/// canonical breaking change. The forward lens fills the new field with a
/// placeholder; the reverse lens drops it.
pub fn expand() -> Value {
    let forward = lens_dir(
        (0, 0),
        (1, 0),
        Value::struct_of([
            ("astring", Value::reference("input.astring")),
            ("anint", Value::int(-1)),
        ]),
        vec![lacuna(
            "Placeholder",
            "anint was filled with a placeholder value",
            None,
            vec![],
            vec![("anint", Value::int(-1))],
        )],
    );
    let reverse = lens_dir(
        (1, 0),
        (0, 0),
        Value::struct_of([("astring", Value::reference("input.astring"))]),
        vec![lacuna(
            "Dropped",
            "anint has no equivalent and was dropped",
            None,
            vec![("anint", Value::null())],
            vec![],
        )],
    );
    lineage(
        "expand",
        vec![
            sequence(vec![Value::struct_of([("astring", Value::string_type())])]),
            sequence_with_lens(
                vec![Value::struct_of([
                    ("astring", Value::string_type()),
                    ("anint", Value::int_type()),
                ])],
                forward,
                reverse,
            ),
        ],
    )
}

/// Two sequences that differ only in which disjunction branch is the
/// default — a breaking change with an interesting lens: instances carrying
/// the old default are rewritten to the new one, with a `ChangedDefault`
/// lacuna reporting the rewrite.
///
/// The reverse mapping's fallthrough branch references `input.anion`, which
/// the source schema does not define. The reference is kept as-is: binding
/// records it as a diagnostic, and evaluating that branch fails with an
/// adapter error rather than guessing at what was meant.
pub fn defaultchange() -> Value {
    let union = |default: usize| {
        Value::disj_default(
            vec![
                Value::string("foo"),
                Value::string("bar"),
                Value::string("baz"),
            ],
            default,
        )
    };

    let forward = lens_dir(
        (0, 0),
        (1, 0),
        Value::struct_of([(
            "aunion",
            Value::when_eq(
                "input.aunion",
                Value::string("foo"),
                Value::string("bar"),
                Value::reference("input.aunion"),
            ),
        )]),
        vec![lacuna(
            "ChangedDefault",
            "aunion was the source default, \"foo\", and was changed to the target default, \"bar\"",
            Some(Value::struct_of([("aunion", Value::string("foo"))])),
            vec![("aunion", Value::string("foo"))],
            vec![("aunion", Value::string("bar"))],
        )],
    );
    let reverse = lens_dir(
        (1, 0),
        (0, 0),
        Value::struct_of([(
            "aunion",
            Value::when_eq(
                "input.aunion",
                Value::string("bar"),
                Value::string("foo"),
                Value::reference("input.anion"),
            ),
        )]),
        vec![lacuna(
            "ChangedDefault",
            "aunion was the target default, \"bar\", and was changed to the source default, \"foo\"",
            Some(Value::struct_of([("aunion", Value::string("bar"))])),
            vec![("aunion", Value::string("bar"))],
            vec![("aunion", Value::string("foo"))],
        )],
    );

    lineage(
        "defaultchange",
        vec![
            sequence(vec![Value::struct_of([("aunion", union(0))])]),
            sequence_with_lens(
                vec![Value::struct_of([("aunion", union(1))])],
                forward,
                reverse,
            ),
        ],
    )
}

fn lineage(name: &str, sequences: Vec<Value>) -> Value {
    Value::struct_of([
        ("name", Value::string(name)),
        ("sequences", Value::list(sequences)),
    ])
}

fn sequence(schemas: Vec<Value>) -> Value {
    Value::struct_of([("schemas", Value::list(schemas))])
}

fn sequence_with_lens(schemas: Vec<Value>, forward: Value, reverse: Value) -> Value {
    Value::struct_of([
        ("schemas", Value::list(schemas)),
        (
            "lens",
            Value::struct_of([("forward", forward), ("reverse", reverse)]),
        ),
    ])
}

fn lens_dir(from: (i64, i64), to: (i64, i64), rel: Value, lacunas: Vec<Value>) -> Value {
    let version = |(major, minor): (i64, i64)| {
        Value::list(vec![Value::int(major), Value::int(minor)])
    };
    let mut builder = StructBuilder::new()
        .field("from", version(from))
        .field("to", version(to))
        .field("rel", rel);
    if !lacunas.is_empty() {
        builder = builder.field("lacunas", Value::list(lacunas));
    }
    builder.build()
}

fn lacuna(
    kind: &str,
    message: &str,
    condition: Option<Value>,
    source_fields: Vec<(&str, Value)>,
    target_fields: Vec<(&str, Value)>,
) -> Value {
    let mut builder = StructBuilder::new()
        .field("type", Value::string(kind))
        .field("message", Value::string(message));
    if let Some(condition) = condition {
        builder = builder.field("condition", condition);
    }
    if !source_fields.is_empty() {
        builder = builder.field("sourceFields", field_refs(source_fields));
    }
    if !target_fields.is_empty() {
        builder = builder.field("targetFields", field_refs(target_fields));
    }
    builder.build()
}

fn field_refs(fields: Vec<(&str, Value)>) -> Value {
    Value::list(
        fields
            .into_iter()
            .map(|(path, value)| {
                Value::struct_of([("path", Value::string(path)), ("value", value)])
            })
            .collect(),
    )
}
