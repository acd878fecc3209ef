//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use kindred_core::{
    DatasetMetrics, FamilyView, KindredError, PersonId, PopulateReport, SnapshotJson, ViewMode,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl From<&KindredError> for ErrorResponse {
    fn from(error: &KindredError) -> Self {
        Self::new(error.to_string())
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Dataset counts plus a summary of the live view, if one was built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub metrics: DatasetMetrics,
    pub view: Option<ViewSummary>,
}

/// Size of the live view graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSummary {
    pub start: PersonId,
    pub node_count: usize,
    pub link_count: usize,
    pub etc_count: usize,
}

// =============================================================================
// FAMILIES RESPONSE
// =============================================================================

/// Derived families around one person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamiliesResponse {
    pub person: PersonId,
    pub as_parent: Vec<FamilyView>,
    pub as_child: Vec<FamilyView>,
}

// =============================================================================
// VIEW REQUEST/RESPONSE
// =============================================================================

/// Build a fresh view graph around `start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildViewRequest {
    pub start: u64,
    #[serde(default)]
    pub mode: ViewMode,
}

/// Show or hide the family behind a node of the live view.
///
/// `view_id` must name a `family` or `etc` node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FamilyActionRequest {
    pub view_id: u64,
}

/// The live view after an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewResponse {
    /// False when a show/hide request was a no-op.
    pub changed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<PopulateReport>,
    pub snapshot: SnapshotJson,
}
