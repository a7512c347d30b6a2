//! Router configuration.
//!
//! ```toml
//! binding_timeout_ms = 2000
//! trailing_slash = true
//!
//! [patterns]
//! id = "[0-9]+"
//! slug = "[a-z0-9-]+"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::constraint::{Constraint, ConstraintSet};
use crate::error::{Result, RouterError};

/// Settings that apply to a whole route table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Upper bound on a single binding lookup, in milliseconds. `0` disables
    /// the bound; a caller deadline still applies.
    pub binding_timeout_ms: u64,
    /// Ignore one trailing `/` on request paths.
    pub trailing_slash: bool,
    /// Global regex constraints, by parameter name.
    pub patterns: BTreeMap<String, String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            binding_timeout_ms: 5_000,
            trailing_slash: true,
            patterns: BTreeMap::new(),
        }
    }
}

impl RouterConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::ConfigParse`] if the document is not valid TOML or
    /// has unknown keys.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::ConfigIo`] if the file cannot be read and
    /// [`RouterError::ConfigParse`] if it does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| RouterError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// The binding timeout, if one is configured.
    pub fn binding_timeout(&self) -> Option<Duration> {
        (self.binding_timeout_ms > 0).then(|| Duration::from_millis(self.binding_timeout_ms))
    }

    /// Compiles [`RouterConfig::patterns`].
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidConstraint`] for a pattern that is not a valid regex.
    pub fn compile_patterns(&self) -> Result<ConstraintSet> {
        let mut set = ConstraintSet::new();
        for (param, source) in &self.patterns {
            set.insert(param.clone(), Constraint::regex(param, source)?);
        }
        Ok(set)
    }
}
