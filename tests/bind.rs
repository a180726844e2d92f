//! Binding and validation of lineages: structure checks, compatibility
//! laws, lens verification, and bind diagnostics.

mod common;

use common::{bind, init_tracing, lens_dir, lineage_source, sequence, sequence_with_lens};
use strata::{
    exemplars, BindConfig, Error, Lineage, Schema, StructBuilder, Value, Version,
};

#[test]
fn exemplars_all_bind() {
    for source in [
        exemplars::single(),
        exemplars::additive(),
        exemplars::expand(),
        exemplars::defaultchange(),
    ] {
        bind(&source);
    }
}

#[test]
fn single_lineage_has_one_schema_at_origin() {
    let lineage = bind(&exemplars::single());
    assert_eq!(lineage.name(), "single");
    assert_eq!(lineage.first().version(), Version::new(0, 0));
    assert_eq!(lineage.first(), lineage.last());
    assert!(lineage.first().version().is_first());
}

#[test]
fn schemas_are_linked_in_version_order() {
    let lineage = bind(&exemplars::expand());
    let versions: Vec<Version> = lineage.schemas().iter().map(Schema::version).collect();
    assert_eq!(versions, vec![Version::new(0, 0), Version::new(1, 0)]);

    let first = lineage.first();
    let last = lineage.last();
    assert_eq!(first.successor(), Some(last.clone()));
    assert_eq!(last.predecessor(), Some(first.clone()));
    assert_eq!(first.predecessor(), None);
    assert_eq!(last.successor(), None);
}

#[test]
fn missing_name_is_rejected() {
    init_tracing();
    let source = Value::struct_of([(
        "sequences",
        Value::list(vec![sequence(vec![Value::struct_of([(
            "a",
            Value::string_type(),
        )])])]),
    )]);
    assert!(matches!(
        Lineage::bind(&source, &BindConfig::default()),
        Err(Error::MissingName)
    ));

    let source = lineage_source("", vec![sequence(vec![Value::empty_struct()])]);
    assert!(matches!(
        Lineage::bind(&source, &BindConfig::default()),
        Err(Error::MissingName)
    ));
}

#[test]
fn empty_sequences_are_rejected() {
    init_tracing();
    let source = lineage_source("empty", vec![]);
    assert!(matches!(
        Lineage::bind(&source, &BindConfig::default()),
        Err(Error::EmptySequences)
    ));
}

#[test]
fn empty_schemas_are_rejected() {
    init_tracing();
    let source = lineage_source("empty", vec![sequence(vec![])]);
    assert!(matches!(
        Lineage::bind(&source, &BindConfig::default()),
        Err(Error::EmptySchemas { major: 0 })
    ));
}

#[test]
fn declared_version_must_match_position() {
    init_tracing();
    let schema = Value::struct_of([
        ("a", Value::string_type()),
        (
            "version",
            Value::list(vec![Value::int(0), Value::int(1)]),
        ),
    ]);
    let source = lineage_source("declared", vec![sequence(vec![schema])]);
    match Lineage::bind(&source, &BindConfig::default()) {
        Err(Error::VersionMismatch { declared, actual }) => {
            assert_eq!(declared, Version::new(0, 1));
            assert_eq!(actual, Version::new(0, 0));
        }
        other => panic!("expected VersionMismatch, got {other:?}"),
    }
}

// A successor that adds a required field without a default admits fewer
// instances than its predecessor, which a sequence forbids.
#[test]
fn incompatible_successor_is_rejected() {
    init_tracing();
    let source = lineage_source(
        "invalid",
        vec![sequence(vec![
            Value::struct_of([("a", Value::string_type())]),
            Value::struct_of([("a", Value::string_type()), ("b", Value::int_type())]),
        ])],
    );
    match Lineage::bind(&source, &BindConfig::default()) {
        Err(Error::IncompatibleSuccessor { version, report }) => {
            assert_eq!(version, Version::new(0, 1));
            assert!(report.summary.contains("'b'"), "summary: {}", report.summary);
            assert!(report.breaking_changes().count() >= 1);
        }
        other => panic!("expected IncompatibleSuccessor, got {other:?}"),
    }
}

// Identical schemas on either side of a sequence boundary mean the author
// started a new sequence without breaking anything.
#[test]
fn non_breaking_boundary_is_rejected() {
    init_tracing();
    let schema = || Value::struct_of([("a", Value::string_type())]);
    let source = lineage_source(
        "nonbreaking",
        vec![
            sequence(vec![schema()]),
            sequence_with_lens(
                vec![schema()],
                lens_dir((0, 0), (1, 0), Value::empty_struct(), vec![]),
                lens_dir((1, 0), (0, 0), Value::empty_struct(), vec![]),
            ),
        ],
    );
    match Lineage::bind(&source, &BindConfig::default()) {
        Err(Error::NonBreakingSequenceBoundary { from, to }) => {
            assert_eq!(from, Version::new(0, 0));
            assert_eq!(to, Version::new(1, 0));
        }
        other => panic!("expected NonBreakingSequenceBoundary, got {other:?}"),
    }
}

#[test]
fn missing_lens_is_rejected() {
    init_tracing();
    let source = lineage_source(
        "lensless",
        vec![
            sequence(vec![Value::struct_of([("a", Value::string_type())])]),
            sequence(vec![Value::struct_of([
                ("a", Value::string_type()),
                ("b", Value::int_type()),
            ])]),
        ],
    );
    assert!(matches!(
        Lineage::bind(&source, &BindConfig::default()),
        Err(Error::MissingLens { major: 1, .. })
    ));
}

#[test]
fn lens_endpoints_must_match_the_boundary() {
    init_tracing();
    let source = lineage_source(
        "skewed",
        vec![
            sequence(vec![Value::struct_of([("a", Value::string_type())])]),
            sequence_with_lens(
                vec![Value::struct_of([
                    ("a", Value::string_type()),
                    ("b", Value::int_type()),
                ])],
                lens_dir(
                    (0, 3),
                    (1, 0),
                    Value::struct_of([
                        ("a", Value::reference("input.a")),
                        ("b", Value::int(-1)),
                    ]),
                    vec![],
                ),
                lens_dir(
                    (1, 0),
                    (0, 0),
                    Value::struct_of([("a", Value::reference("input.a"))]),
                    vec![],
                ),
            ),
        ],
    );
    assert!(matches!(
        Lineage::bind(&source, &BindConfig::default()),
        Err(Error::LensResultInvalid { major: 1, .. })
    ));
}

// The defaultchange exemplar's reverse mapping references `input.anion`,
// which its source schema does not define. Binding keeps the lineage usable
// but records the ambiguity instead of guessing what was meant.
#[test]
fn ambiguous_lens_reference_becomes_a_diagnostic() {
    let lineage = bind(&exemplars::defaultchange());
    let diagnostics = lineage.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.contains("input.anion"));
    assert_eq!(diagnostics[0].major, 1);
}

#[test]
fn strict_bind_rejects_ambiguous_lens_reference() {
    init_tracing();
    let result = Lineage::bind(&exemplars::defaultchange(), &BindConfig::default().strict());
    match result {
        Err(Error::Adapter(err)) => assert!(err.message.contains("input.anion")),
        other => panic!("expected an adapter error, got {other:?}"),
    }
}

#[test]
fn clean_lineages_have_no_diagnostics() {
    for source in [exemplars::single(), exemplars::additive(), exemplars::expand()] {
        assert!(bind(&source).diagnostics().is_empty());
    }
}

#[test]
fn checksum_is_stable_across_binds() {
    let a = bind(&exemplars::expand());
    let b = bind(&exemplars::expand());
    assert_eq!(a.checksum(), b.checksum());
    assert_ne!(a.checksum(), bind(&exemplars::additive()).checksum());
}

#[test]
fn lens_smoke_test_catches_unsatisfiable_mappings() {
    init_tracing();
    // The forward mapping pins `aunion` to a value outside the target union,
    // so evaluating the lens against the source default must fail the bind.
    let union = |default: usize| {
        Value::disj_default(
            vec![Value::string("foo"), Value::string("bar")],
            default,
        )
    };
    let source = lineage_source(
        "unsatisfiable",
        vec![
            sequence(vec![Value::struct_of([("aunion", union(0))])]),
            sequence_with_lens(
                vec![Value::struct_of([("aunion", union(1))])],
                lens_dir(
                    (0, 0),
                    (1, 0),
                    Value::struct_of([("aunion", Value::string("qux"))]),
                    vec![],
                ),
                lens_dir(
                    (1, 0),
                    (0, 0),
                    Value::struct_of([("aunion", Value::reference("input.aunion"))]),
                    vec![],
                ),
            ),
        ],
    );
    assert!(matches!(
        Lineage::bind(&source, &BindConfig::default()),
        Err(Error::LensResultInvalid { .. })
    ));
}

#[test]
fn bound_lineages_are_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Lineage>();
    assert_send_sync::<Schema>();
}

#[test]
fn optional_fields_participate_in_compatibility() {
    // Adding an optional field is the other sanctioned non-breaking change.
    let source = lineage_source(
        "optional",
        vec![sequence(vec![
            Value::struct_of([("a", Value::string_type())]),
            StructBuilder::new()
                .field("a", Value::string_type())
                .optional("note", Value::string_type())
                .build(),
        ])],
    );
    bind(&source);
}
