//! # View Configuration
//!
//! Tunables for view graph construction. Missing fields take the defaults from
//! [`crate::primitives`].

use crate::primitives;
use serde::{Deserialize, Serialize};

/// Settings applied by `Session::build_view_graph`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Upper bound of person nodes during initial population.
    pub max_person_nodes: usize,
    /// Years per generation step for age estimation.
    pub years_per_generation: i64,
    /// Display language for name resolution.
    pub language: Option<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            max_person_nodes: primitives::DEFAULT_MAX_PERSON_NODES,
            years_per_generation: primitives::YEARS_PER_GENERATION,
            language: None,
        }
    }
}
