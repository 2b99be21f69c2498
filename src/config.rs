//! Compiler configuration.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// How a conditional treats a null test value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullTest {
    /// Take the alternate branch.
    #[default]
    Alternate,
    /// Fail with a null access error.
    Error,
}

/// Settings for compilation and the compilation cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Maximum number of input signatures a cache memoizes (None = unlimited)
    pub cache_limit: Option<usize>,
    /// Log every compiled program listing at debug level
    pub dump_programs: bool,
    pub null_test: NullTest,
}

impl CompilerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::internal(format!("failed to parse compiler config: {}", e)))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::internal(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}
