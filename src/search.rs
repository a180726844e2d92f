//! Version search over a lineage.
//!
//! Traversal starts at a schema and only ever walks forward through the
//! version order. Because the option is an enum and searches start from a
//! schema handle, the classic misuses — no option, several options, a nil
//! start — cannot be expressed.

use crate::lineage::Schema;
use crate::version::Version;

/// How far along the chain of schemas a search should proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOption {
    /// Continue to the newest schema in the newest sequence.
    Latest,
    /// The newest schema within the given major version. `None` when the
    /// major lies beyond the end of the lineage, or behind the start schema.
    LatestInMajor(u32),
    /// The newest schema within the start schema's own major version.
    LatestInCurrentMajor,
    /// The schema with exactly this version.
    Exact(Version),
}

impl Schema {
    /// Walk successors from this schema until the search option is
    /// satisfied. `Latest` and `LatestInCurrentMajor` always succeed.
    pub fn find(&self, option: SearchOption) -> Option<Schema> {
        match option {
            SearchOption::Latest => {
                let mut schema = self.clone();
                while let Some(next) = schema.successor() {
                    schema = next;
                }
                Some(schema)
            }

            SearchOption::LatestInCurrentMajor => {
                self.find(SearchOption::LatestInMajor(self.version().major))
            }

            SearchOption::LatestInMajor(major) => {
                if self.version().major > major {
                    return None;
                }
                let mut schema = self.clone();
                loop {
                    match schema.successor() {
                        None => {
                            return (schema.version().major == major).then_some(schema);
                        }
                        Some(next) => {
                            if next.version().major > major {
                                return Some(schema);
                            }
                            schema = next;
                        }
                    }
                }
            }

            SearchOption::Exact(version) => {
                let mut cursor = Some(self.clone());
                while let Some(schema) = cursor {
                    if schema.version() == version {
                        return Some(schema);
                    }
                    cursor = schema.successor();
                }
                None
            }
        }
    }
}
