//! The lineage model and its validator.
//!
//! A lineage is bound once from a compiled source value. Binding runs every
//! structural and compatibility check; afterwards the lineage is an
//! immutable, cheaply clonable handle that all other operations read from.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::checksum::Checksum;
use crate::compatibility::CompatibilityChecker;
use crate::config::BindConfig;
use crate::engine::{AdapterError, Value};
use crate::error::{Error, Result};
use crate::lacuna::{FieldRef, Lacuna};
use crate::translate::Direction;
use crate::version::Version;

/// A lineage: the complete version history of one kind of object, with
/// lenses across its breaking boundaries.
#[derive(Clone)]
pub struct Lineage {
    inner: Arc<LineageInner>,
}

/// One schema in a lineage, addressed by `(major, minor)`.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<LineageInner>,
    version: Version,
}

pub(crate) struct LineageInner {
    name: String,
    sequences: Vec<SequenceData>,
    /// `lenses[i]` connects sequence `i` to sequence `i + 1`.
    lenses: Vec<LensData>,
    checksum: Checksum,
    bound_at: DateTime<Utc>,
    diagnostics: Vec<BindDiagnostic>,
}

struct SequenceData {
    schemas: Vec<Value>,
}

pub(crate) struct LensData {
    pub forward: LensDir,
    pub reverse: LensDir,
}

pub(crate) struct LensDir {
    pub from: Version,
    pub to: Version,
    pub rel: Value,
    pub lacunas: Vec<LensLacuna>,
}

pub(crate) struct LensLacuna {
    /// Emitted only when this value subsumes the concrete input instance.
    pub condition: Option<Value>,
    pub record: Lacuna,
}

/// A non-fatal problem noticed while binding, e.g. a lens mapping branch
/// that references a path the source schema does not define.
#[derive(Debug, Clone)]
pub struct BindDiagnostic {
    pub major: u32,
    pub direction: Direction,
    pub message: String,
}

impl fmt::Display for BindDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lens into sequence {}: {}",
            self.direction, self.major, self.message
        )
    }
}

impl Lineage {
    /// Bind a lineage from a compiled source value, running the full
    /// validator. The returned lineage is immutable.
    pub fn bind(source: &Value, config: &BindConfig) -> Result<Lineage> {
        let name = source
            .lookup("name")
            .and_then(|v| v.as_str().map(str::to_owned))
            .filter(|n| !n.is_empty())
            .ok_or(Error::MissingName)?;

        let sequences = parse_sequences(source)?;
        debug!(name = %name, sequences = sequences.len(), "binding lineage");

        check_versions(&sequences)?;
        check_sequence_compatibility(&sequences)?;

        let mut lenses = Vec::new();
        let mut diagnostics = Vec::new();
        let boundary_sources = source
            .lookup("sequences")
            .map(|s| s.list_elements())
            .transpose()?
            .unwrap_or_default();

        for major in 1..sequences.len() {
            let prev = &sequences[major - 1];
            let next = &sequences[major];
            let from = Version::new((major - 1) as u32, (prev.schemas.len() - 1) as u32);
            let to = Version::new(major as u32, 0);

            let boundary = CompatibilityChecker::new().check(
                &prev.schemas[prev.schemas.len() - 1],
                &next.schemas[0],
            );
            if !boundary.is_breaking {
                return Err(Error::NonBreakingSequenceBoundary { from, to });
            }

            let lens_val = boundary_sources[major].lookup("lens").ok_or(Error::MissingLens {
                major: major as u32,
                direction: Direction::Forward,
            })?;
            let forward =
                parse_lens_dir(&lens_val, Direction::Forward, major as u32, from, to)?;
            let reverse =
                parse_lens_dir(&lens_val, Direction::Reverse, major as u32, to, from)?;

            if config.verify_lenses {
                let from_schema = &prev.schemas[prev.schemas.len() - 1];
                let to_schema = &next.schemas[0];
                verify_lens_dir(&forward, from_schema, to_schema, config, &mut diagnostics)?;
                verify_lens_dir(&reverse, to_schema, from_schema, config, &mut diagnostics)?;
            }

            lenses.push(LensData { forward, reverse });
        }

        for diagnostic in &diagnostics {
            warn!(lineage = %name, %diagnostic, "bind diagnostic");
        }

        let checksum = Checksum::seal(
            &name,
            sequences.iter().enumerate().flat_map(|(major, seq)| {
                seq.schemas.iter().enumerate().map(move |(minor, schema)| {
                    (Version::new(major as u32, minor as u32), schema)
                })
            }),
        );
        debug!(name = %name, %checksum, "lineage bound");

        Ok(Lineage {
            inner: Arc::new(LineageInner {
                name,
                sequences,
                lenses,
                checksum,
                bound_at: Utc::now(),
                diagnostics,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The first schema, always at version 0.0.
    pub fn first(&self) -> Schema {
        Schema {
            inner: self.inner.clone(),
            version: Version::new(0, 0),
        }
    }

    /// The schema with the highest version.
    pub fn last(&self) -> Schema {
        let major = self.inner.sequences.len() - 1;
        let minor = self.inner.sequences[major].schemas.len() - 1;
        Schema {
            inner: self.inner.clone(),
            version: Version::new(major as u32, minor as u32),
        }
    }

    /// The schema at `version`, if the lineage contains it.
    pub fn schema(&self, version: Version) -> Option<Schema> {
        let seq = self.inner.sequences.get(version.major as usize)?;
        seq.schemas.get(version.minor as usize)?;
        Some(Schema {
            inner: self.inner.clone(),
            version,
        })
    }

    /// All schemas in ascending version order.
    pub fn schemas(&self) -> Vec<Schema> {
        let mut out = Vec::new();
        let mut cur = Some(self.first());
        while let Some(s) = cur {
            cur = s.successor();
            out.push(s);
        }
        out
    }

    /// Checksum of the bound content; stable across binds of the same
    /// source.
    pub fn checksum(&self) -> &Checksum {
        &self.inner.checksum
    }

    pub fn bound_at(&self) -> DateTime<Utc> {
        self.inner.bound_at
    }

    /// Non-fatal problems noticed at bind time.
    pub fn diagnostics(&self) -> &[BindDiagnostic] {
        &self.inner.diagnostics
    }

    pub(crate) fn from_inner(inner: Arc<LineageInner>) -> Lineage {
        Lineage { inner }
    }
}

impl Schema {
    pub fn version(&self) -> Version {
        self.version
    }

    /// The lineage this schema belongs to.
    pub fn lineage(&self) -> Lineage {
        Lineage::from_inner(self.inner.clone())
    }

    /// The underlying constraint value.
    pub fn value(&self) -> &Value {
        &self.inner.sequences[self.version.major as usize].schemas[self.version.minor as usize]
    }

    /// The next schema in the lineage's version order, if any.
    pub fn successor(&self) -> Option<Schema> {
        let Version { major, minor } = self.version;
        let seq = &self.inner.sequences[major as usize];
        let version = if (minor as usize) + 1 < seq.schemas.len() {
            Version::new(major, minor + 1)
        } else if (major as usize) + 1 < self.inner.sequences.len() {
            Version::new(major + 1, 0)
        } else {
            return None;
        };
        Some(Schema {
            inner: self.inner.clone(),
            version,
        })
    }

    /// The previous schema in the lineage's version order, if any.
    pub fn predecessor(&self) -> Option<Schema> {
        let Version { major, minor } = self.version;
        let version = if minor > 0 {
            Version::new(major, minor - 1)
        } else if major > 0 {
            let prev = &self.inner.sequences[(major - 1) as usize];
            Version::new(major - 1, (prev.schemas.len() - 1) as u32)
        } else {
            return None;
        };
        Some(Schema {
            inner: self.inner.clone(),
            version,
        })
    }

    /// The lens crossing from sequence `major` to `major + 1`.
    pub(crate) fn lens_after(&self) -> &LensData {
        &self.inner.lenses[self.version.major as usize]
    }

    /// The lens crossing from sequence `major - 1` to `major`.
    pub(crate) fn lens_before(&self) -> &LensData {
        &self.inner.lenses[(self.version.major - 1) as usize]
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) && self.version == other.version
    }
}

impl fmt::Debug for Lineage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lineage")
            .field("name", &self.inner.name)
            .field("sequences", &self.inner.sequences.len())
            .finish()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Schema({} {})", self.inner.name, self.version)
    }
}

// --- binding helpers ---

fn bind_error(message: impl Into<String>) -> Error {
    Error::Adapter(AdapterError::new("bind", message.into()))
}

fn parse_sequences(source: &Value) -> Result<Vec<SequenceData>> {
    let seq_list = source.lookup("sequences").ok_or(Error::EmptySequences)?;
    let seq_values = seq_list.list_elements().map_err(Error::from)?;
    if seq_values.is_empty() {
        return Err(Error::EmptySequences);
    }

    let mut sequences = Vec::with_capacity(seq_values.len());
    for (major, seq_value) in seq_values.iter().enumerate() {
        let schemas = seq_value
            .lookup("schemas")
            .map(|s| s.list_elements())
            .transpose()?
            .unwrap_or_default();
        if schemas.is_empty() {
            return Err(Error::EmptySchemas {
                major: major as u32,
            });
        }
        sequences.push(SequenceData { schemas });
    }
    Ok(sequences)
}

/// Versions are assigned by position; a schema that declares one explicitly
/// must agree.
fn check_versions(sequences: &[SequenceData]) -> Result<()> {
    for (major, seq) in sequences.iter().enumerate() {
        for (minor, schema) in seq.schemas.iter().enumerate() {
            let actual = Version::new(major as u32, minor as u32);
            if let Some(declared) = declared_version(schema) {
                if declared != actual {
                    return Err(Error::VersionMismatch { declared, actual });
                }
            }
        }
    }
    Ok(())
}

fn declared_version(schema: &Value) -> Option<Version> {
    version_of_value(&schema.lookup("version")?)
}

fn version_of_value(v: &Value) -> Option<Version> {
    let parts = v.list_elements().ok()?;
    match parts.as_slice() {
        [major, minor] => Some(Version::new(
            u32::try_from(major.as_int()?).ok()?,
            u32::try_from(minor.as_int()?).ok()?,
        )),
        _ => None,
    }
}

fn check_sequence_compatibility(sequences: &[SequenceData]) -> Result<()> {
    let checker = CompatibilityChecker::new();
    for (major, seq) in sequences.iter().enumerate() {
        for (minor, pair) in seq.schemas.windows(2).enumerate() {
            let report = checker.check(&pair[0], &pair[1]);
            if !report.is_compatible {
                return Err(Error::IncompatibleSuccessor {
                    version: Version::new(major as u32, (minor + 1) as u32),
                    report,
                });
            }
        }
    }
    Ok(())
}

fn parse_lens_dir(
    lens: &Value,
    direction: Direction,
    major: u32,
    expected_from: Version,
    expected_to: Version,
) -> Result<LensDir> {
    let key = match direction {
        Direction::Forward => "forward",
        Direction::Reverse => "reverse",
    };
    let dir = lens
        .lookup(key)
        .ok_or(Error::MissingLens { major, direction })?;

    let from = dir
        .lookup("from")
        .and_then(|v| version_of_value(&v))
        .ok_or_else(|| bind_error(format!("{direction} lens of sequence {major} has no usable 'from' version")))?;
    let to = dir
        .lookup("to")
        .and_then(|v| version_of_value(&v))
        .ok_or_else(|| bind_error(format!("{direction} lens of sequence {major} has no usable 'to' version")))?;
    if from != expected_from || to != expected_to {
        return Err(Error::LensResultInvalid {
            major,
            direction,
            detail: format!(
                "lens endpoints {from} -> {to} do not match the boundary {expected_from} -> {expected_to}"
            ),
        });
    }

    let rel = dir
        .lookup("rel")
        .ok_or_else(|| bind_error(format!("{direction} lens of sequence {major} has no 'rel' mapping")))?;

    let lacunas = match dir.lookup("lacunas") {
        Some(list) => list
            .list_elements()
            .map_err(Error::from)?
            .iter()
            .map(parse_lacuna)
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(LensDir {
        from,
        to,
        rel,
        lacunas,
    })
}

fn parse_lacuna(v: &Value) -> Result<LensLacuna> {
    let kind = v
        .lookup("type")
        .and_then(|k| k.as_str().map(str::to_owned))
        .ok_or_else(|| bind_error("lacuna has no 'type'"))?
        .parse()
        .map_err(bind_error)?;
    let message = v
        .lookup("message")
        .and_then(|m| m.as_str().map(str::to_owned))
        .ok_or_else(|| bind_error("lacuna has no 'message'"))?;
    let source_fields = parse_field_refs(v.lookup("sourceFields"))?;
    let target_fields = parse_field_refs(v.lookup("targetFields"))?;
    let condition = v.lookup("condition");

    Ok(LensLacuna {
        condition,
        record: Lacuna {
            source_fields,
            target_fields,
            message,
            kind,
        },
    })
}

fn parse_field_refs(list: Option<Value>) -> Result<Vec<FieldRef>> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    list.list_elements()
        .map_err(Error::from)?
        .iter()
        .map(|field| {
            let path = field
                .lookup("path")
                .and_then(|p| p.as_str().map(str::to_owned))
                .ok_or_else(|| bind_error("lacuna field has no 'path'"))?;
            let value = field
                .lookup("value")
                .ok_or_else(|| bind_error(format!("lacuna field {path} has no 'value'")))?;
            let json = serde_json::from_str(&value.marshal_json()?)
                .map_err(|e| bind_error(format!("lacuna field {path}: {e}")))?;
            Ok(FieldRef { path, value: json })
        })
        .collect()
}

/// Smoke-test one lens direction: statically check that every deferred
/// reference in `rel` resolves within the source schema, then, when the
/// source schema's defaults form a concrete instance, evaluate the lens
/// against it and check the result.
fn verify_lens_dir(
    dir: &LensDir,
    from_schema: &Value,
    to_schema: &Value,
    config: &BindConfig,
    diagnostics: &mut Vec<BindDiagnostic>,
) -> Result<()> {
    let direction = if dir.from < dir.to {
        Direction::Forward
    } else {
        Direction::Reverse
    };
    let major = dir.from.major.max(dir.to.major);

    for path in dir.rel.deferred_refs() {
        let text = path.to_string();
        let resolvable = text == "input"
            || text
                .strip_prefix("input.")
                .is_some_and(|rest| from_schema.lookup(rest).is_some());
        if !resolvable {
            let err = AdapterError::new(
                "resolve",
                format!("reference to undefined path {path}"),
            );
            if config.strict {
                return Err(err.into());
            }
            diagnostics.push(BindDiagnostic {
                major,
                direction,
                message: err.to_string(),
            });
        }
    }

    let probe = from_schema.eval_defaults();
    if !probe.is_concrete() {
        debug!(%direction, major, "lens smoke test skipped: source schema has no concrete default instance");
        return Ok(());
    }
    let scope = Value::struct_of([("input", probe)]);
    let resolved = match dir.rel.resolve(&scope) {
        Ok(v) => v,
        Err(err) => {
            if config.strict {
                return Err(err.into());
            }
            diagnostics.push(BindDiagnostic {
                major,
                direction,
                message: err.to_string(),
            });
            return Ok(());
        }
    };
    let translated = to_schema.unify(&resolved).eval_defaults();
    if let Some(reason) = translated.bottom_reason() {
        return Err(Error::LensResultInvalid {
            major,
            direction,
            detail: reason.to_owned(),
        });
    }
    if !translated.is_concrete() {
        return Err(Error::LensResultNonConcrete {
            major,
            direction,
            detail: translated.to_string(),
        });
    }
    Ok(())
}
