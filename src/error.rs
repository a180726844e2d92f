//! Error types for lineage binding, search, and translation.

use std::fmt;

use thiserror::Error;

use crate::compatibility::CompatibilityResult;
use crate::engine::AdapterError;
use crate::lacuna::Lacuna;
use crate::translate::Direction;
use crate::version::Version;

/// Result type for lineage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Lineage errors. The set is closed: every failure a caller can observe is
/// one of these, and nothing is recovered silently.
#[derive(Error, Debug)]
pub enum Error {
    #[error("lineage has no name")]
    MissingName,

    #[error("lineage has no sequences")]
    EmptySequences,

    #[error("sequence {major} has no schemas")]
    EmptySchemas { major: u32 },

    #[error("schema declares version {declared} but sits at position {actual}")]
    VersionMismatch { declared: Version, actual: Version },

    #[error("schema {version} is not backwards compatible with its predecessor: {}", report.summary)]
    IncompatibleSuccessor {
        version: Version,
        report: CompatibilityResult,
    },

    #[error("schemas {from} and {to} are backwards compatible; a new sequence must introduce a breaking change")]
    NonBreakingSequenceBoundary { from: Version, to: Version },

    #[error("sequence {major} is missing its {direction} lens")]
    MissingLens { major: u32, direction: Direction },

    #[error("{direction} lens into sequence {major} produced a non-concrete result: {detail}")]
    LensResultNonConcrete {
        major: u32,
        direction: Direction,
        detail: String,
    },

    #[error("{direction} lens into sequence {major} is invalid: {detail}")]
    LensResultInvalid {
        major: u32,
        direction: Direction,
        detail: String,
    },

    #[error("resource failed validation against schema {version}: {}", diagnostics.join("; "))]
    ValidationFailed {
        version: Version,
        diagnostics: Vec<String>,
    },

    #[error("translation failed at {at}: {reason}")]
    TranslationFailed {
        at: Version,
        reason: TranslationErrorKind,
        /// Lacunas collected by the steps that completed before the failure.
        lacunas: Vec<Lacuna>,
    },

    #[error("resource does not validate against any schema in the lineage: {}", fmt_attempts(attempts))]
    SearchExhausted { attempts: Vec<SearchAttempt> },

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("programming error: {0}")]
    Programmer(String),
}

/// Why a translation step failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationErrorKind {
    #[error("lens evaluation failed: {0}")]
    LensEvalError(String),

    #[error("unification with the target schema is unsatisfiable: {0}")]
    UnificationBottom(String),

    #[error("reverse translation within a sequence is not supported")]
    UnsupportedDirection,
}

/// One deduplicated validation diagnostic from a search, with every version
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchAttempt {
    pub versions: Vec<Version>,
    pub diagnostic: String,
}

impl fmt::Display for SearchAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let versions: Vec<String> = self.versions.iter().map(Version::to_string).collect();
        write!(f, "{}: {}", versions.join(", "), self.diagnostic)
    }
}

fn fmt_attempts(attempts: &[SearchAttempt]) -> String {
    attempts
        .iter()
        .map(SearchAttempt::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
