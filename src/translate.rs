//! The translation engine: moving a validated instance across schema
//! versions, one step or many, collecting lacunas along the way.
//!
//! Within a sequence the successor is backwards compatible, so a forward
//! step is unification plus default resolution and produces no lacunas.
//! Across a sequence boundary the author's lens does the work: its `rel`
//! mapping is evaluated with `input` bound to the instance, unified with the
//! target schema, and required to come out concrete.

use std::fmt;

use tracing::{debug, trace};

use crate::defaults::apply_value;
use crate::engine::Value;
use crate::error::{Error, Result, SearchAttempt, TranslationErrorKind};
use crate::lacuna::Lacuna;
use crate::lineage::{LensDir, Lineage, Schema};
use crate::resource::Resource;
use crate::version::Version;

/// Which way a translation moves through the version order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Reverse => write!(f, "reverse"),
        }
    }
}

/// The outcome of a single translation step.
#[derive(Debug, Clone)]
pub struct Step {
    pub resource: Resource,
    /// The schema the resource now conforms to; `None` means there was no
    /// schema to move to — the input was already at the end of the lineage
    /// in the requested direction, and was returned untouched.
    pub schema: Option<Schema>,
    pub lacunas: Vec<Lacuna>,
}

/// The outcome of a completed multi-step translation.
#[derive(Debug, Clone)]
pub struct Translated {
    pub resource: Resource,
    pub schema: Schema,
    /// Lacunas in the order the steps emitted them.
    pub lacunas: Vec<Lacuna>,
}

enum StepKind<'a> {
    Terminal,
    WithinSequence(Schema),
    AcrossBoundary(Schema, &'a LensDir),
    ReverseWithinSequence,
}

impl Schema {
    /// Check that the resource is correct with respect to this schema.
    pub fn validate(&self, resource: &Resource) -> Result<()> {
        let instance = resource.compile()?;
        self.validate_value(&instance)
    }

    pub(crate) fn validate_value(&self, instance: &Value) -> Result<()> {
        self.value()
            .accepts(instance)
            .map_err(|diagnostic| Error::ValidationFailed {
                version: self.version(),
                diagnostics: vec![diagnostic],
            })
    }

    fn step_kind(&self, direction: Direction) -> StepKind<'_> {
        match direction {
            Direction::Forward => match self.successor() {
                None => StepKind::Terminal,
                Some(next) if next.version().major == self.version().major => {
                    StepKind::WithinSequence(next)
                }
                Some(next) => StepKind::AcrossBoundary(next, &self.lens_after().forward),
            },
            Direction::Reverse => match self.predecessor() {
                None => StepKind::Terminal,
                Some(prev) if prev.version().major == self.version().major => {
                    StepKind::ReverseWithinSequence
                }
                Some(prev) => StepKind::AcrossBoundary(prev, &self.lens_before().reverse),
            },
        }
    }

    /// Move the resource one version in `direction`.
    ///
    /// The input is validated against this schema first, and is never
    /// mutated: failure leaves the caller holding exactly what it passed in.
    pub fn translate_once(&self, resource: &Resource, direction: Direction) -> Result<Step> {
        let instance = resource.compile()?;
        self.validate_value(&instance)?;

        match self.step_kind(direction) {
            StepKind::Terminal => {
                trace!(at = %self.version(), %direction, "nothing to translate to");
                Ok(Step {
                    resource: resource.clone(),
                    schema: None,
                    lacunas: Vec::new(),
                })
            }

            StepKind::ReverseWithinSequence => Err(Error::TranslationFailed {
                at: self.version(),
                reason: TranslationErrorKind::UnsupportedDirection,
                lacunas: Vec::new(),
            }),

            StepKind::WithinSequence(next) => {
                debug!(from = %self.version(), to = %next.version(), "translating within sequence");
                let filled = apply_value(&instance, next.value())?;
                let payload = filled.marshal_json().map_err(|e| Error::TranslationFailed {
                    at: self.version(),
                    reason: TranslationErrorKind::UnificationBottom(e.message),
                    lacunas: Vec::new(),
                })?;
                Ok(Step {
                    resource: resource.with_payload(payload),
                    schema: Some(next),
                    lacunas: Vec::new(),
                })
            }

            StepKind::AcrossBoundary(next, lens) => {
                debug!(from = %self.version(), to = %next.version(), "translating across sequence boundary");
                let scope = Value::struct_of([("input", instance.clone())]);
                let resolved =
                    lens.rel
                        .resolve(&scope)
                        .map_err(|e| Error::TranslationFailed {
                            at: self.version(),
                            reason: TranslationErrorKind::LensEvalError(e.to_string()),
                            lacunas: Vec::new(),
                        })?;

                let translated = next.value().unify(&resolved).eval_defaults();
                if let Some(reason) = translated.bottom_reason() {
                    return Err(Error::TranslationFailed {
                        at: self.version(),
                        reason: TranslationErrorKind::UnificationBottom(reason.to_owned()),
                        lacunas: Vec::new(),
                    });
                }
                if !translated.is_concrete() {
                    return Err(Error::TranslationFailed {
                        at: self.version(),
                        reason: TranslationErrorKind::LensEvalError(format!(
                            "lens produced a non-concrete result: {translated}"
                        )),
                        lacunas: Vec::new(),
                    });
                }

                let lacunas = lens
                    .lacunas
                    .iter()
                    .filter(|l| match &l.condition {
                        None => true,
                        Some(condition) => condition.subsumes(&instance),
                    })
                    .map(|l| l.record.clone())
                    .collect();

                let payload = translated.marshal_json()?;
                Ok(Step {
                    resource: resource.with_payload(payload),
                    schema: Some(next),
                    lacunas,
                })
            }
        }
    }

    /// Compose [`Schema::translate_once`] steps until `target` is reached.
    ///
    /// Lacunas accumulate in step order. On failure the error carries the
    /// lacunas of the steps that had completed; the input resource is
    /// untouched.
    pub fn translate_to(&self, resource: &Resource, target: Version) -> Result<Translated> {
        if self.lineage().schema(target).is_none() {
            return Err(Error::Programmer(format!(
                "target version {target} is not in lineage {}",
                self.lineage().name()
            )));
        }

        let direction = if target >= self.version() {
            Direction::Forward
        } else {
            Direction::Reverse
        };

        let mut schema = self.clone();
        let mut current = resource.clone();
        let mut lacunas = Vec::new();

        if schema.version() == target {
            schema.validate(&current)?;
        }

        while schema.version() != target {
            match schema.translate_once(&current, direction) {
                Ok(step) => match step.schema {
                    Some(next) => {
                        lacunas.extend(step.lacunas);
                        current = step.resource;
                        schema = next;
                    }
                    None => {
                        return Err(Error::Programmer(format!(
                            "ran out of schemas at {} before reaching {target}",
                            schema.version()
                        )));
                    }
                },
                Err(Error::TranslationFailed {
                    at,
                    reason,
                    lacunas: step_lacunas,
                }) => {
                    lacunas.extend(step_lacunas);
                    return Err(Error::TranslationFailed {
                        at,
                        reason,
                        lacunas,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Translated {
            resource: current,
            schema,
            lacunas,
        })
    }
}

impl Lineage {
    /// Locate the schema a resource of unknown version validates against.
    ///
    /// Walks from the newest schema to the oldest and returns the first that
    /// accepts the instance; when several would, the newest wins. Exhaustion
    /// returns every version's diagnostic, deduplicated by message.
    pub fn search_and_validate(&self, resource: &Resource) -> Result<Schema> {
        let instance = resource.compile()?;
        let mut attempts: Vec<SearchAttempt> = Vec::new();

        let mut cursor = Some(self.last());
        while let Some(schema) = cursor {
            match schema.value().accepts(&instance) {
                Ok(()) => {
                    trace!(version = %schema.version(), "resource validated");
                    return Ok(schema);
                }
                Err(diagnostic) => {
                    match attempts.iter().position(|a| a.diagnostic == diagnostic) {
                        Some(i) => attempts[i].versions.push(schema.version()),
                        None => attempts.push(SearchAttempt {
                            versions: vec![schema.version()],
                            diagnostic,
                        }),
                    }
                }
            }
            cursor = schema.predecessor();
        }

        Err(Error::SearchExhausted { attempts })
    }

    /// Translate a resource to `target`, locating its current schema from
    /// the embedded `version` field when present and by search otherwise.
    pub fn translate(&self, resource: &Resource, target: Version) -> Result<Translated> {
        let from = match resource.embedded_version() {
            Some(version) => self.schema(version).ok_or_else(|| Error::ValidationFailed {
                version,
                diagnostics: vec![format!(
                    "embedded version {version} is not in lineage {}",
                    self.name()
                )],
            })?,
            None => self.search_and_validate(resource)?,
        };
        from.translate_to(resource, target)
    }
}
