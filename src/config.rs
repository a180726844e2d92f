//! Configuration for lineage binding.
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (strata.toml)
//! - Environment variables (STRATA_*)
//!
//! ## Example config file (strata.toml):
//! ```toml
//! verify_lenses = true
//! strict = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Options controlling how a lineage is bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindConfig {
    /// Smoke-test every lens direction at bind time (static reference check
    /// plus an evaluation against the source schema's default instance when
    /// one exists).
    #[serde(default = "default_verify_lenses")]
    pub verify_lenses: bool,

    /// Treat bind diagnostics as errors.
    #[serde(default)]
    pub strict: bool,
}

fn default_verify_lenses() -> bool {
    true
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            verify_lenses: true,
            strict: false,
        }
    }
}

impl BindConfig {
    /// Load configuration from file and environment, falling back to
    /// defaults for anything unset.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("strata").required(false))
            .add_source(Environment::with_prefix("STRATA"))
            .build()?;
        config.try_deserialize()
    }

    /// Strict binding: diagnostics fail the bind.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BindConfig::default();
        assert!(config.verify_lenses);
        assert!(!config.strict);
    }

    #[test]
    fn test_load_without_sources_uses_defaults() {
        let config = BindConfig::load().unwrap();
        assert!(config.verify_lenses);
    }
}
