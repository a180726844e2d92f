//! Strata Schema Lineages
//!
//! A lineage is the complete evolutionary history of the schema for one kind
//! of object: every version that has ever existed, organized into sequences
//! of backwards-compatible schemas, with author-written lenses translating
//! concrete instances across the breaking boundaries between sequences.
//! Producers and consumers of data can then release on their own cadence: a
//! producer writing version X and a consumer pinned to version Y always have
//! a defined translation between them — possibly lossy, but always explicit,
//! with every declared gap reported as a *lacuna*.
//!
//! ## Features
//!
//! - **Validated binding**: a lineage is checked once, at bind time —
//!   structure, positional version numbering, backwards compatibility within
//!   sequences, breaking changes across them, lens presence and sanity
//! - **Immutable Lineages**: a bound lineage is a cheaply clonable,
//!   `Send + Sync` handle; every operation afterwards is a pure read
//! - **Version Search**: latest, latest-in-major, and exact-version
//!   traversal from any starting schema
//! - **Translation**: single- and multi-step, forward and reverse, with
//!   lacunas accumulated in step order and no torn writes on failure
//! - **Instance Utilities**: applying schema defaults to an instance and
//!   trimming them back out
//!
//! ## Architecture
//!
//! ```text
//! lineage source (constraint value)
//!   └── Lineage::bind ── validator ──> Lineage (immutable, checksummed)
//!         ├── Schema (major, minor) ── find / successor / predecessor
//!         ├── translate_once / translate_to ──> Translated + [Lacuna]
//!         └── search_and_validate ──> Schema
//! ```

pub mod checksum;
pub mod compatibility;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod exemplars;
pub mod lacuna;
pub mod lineage;
pub mod resource;
pub mod search;
pub mod translate;
pub mod version;

pub use checksum::Checksum;
pub use compatibility::{ChangeType, CompatibilityChecker, CompatibilityResult, SchemaChange};
pub use config::BindConfig;
pub use defaults::{apply_defaults, trim_defaults};
pub use engine::{AdapterError, Kind, StructBuilder, Value};
pub use error::{Error, Result, SearchAttempt, TranslationErrorKind};
pub use lacuna::{FieldRef, Lacuna, LacunaKind};
pub use lineage::{BindDiagnostic, Lineage, Schema};
pub use resource::Resource;
pub use search::SearchOption;
pub use translate::{Direction, Step, Translated};
pub use version::Version;
