//! FILENAME: core/formula/src/options.rs
//! PURPOSE: Engine configuration.
//! CONTEXT: Options can be built in code or loaded from JSON. Missing fields
//! fall back to their defaults.

use crate::error::FormulaResult;
use serde::{Deserialize, Serialize};

/// Nesting budget used when no options are given.
pub const DEFAULT_MAX_DEPTH: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Maximum nesting depth of a parsed expression.
    pub max_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EngineOptions {
    pub fn from_json(json: &str) -> FormulaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
