//! # Engine Primitives
//!
//! Hardcoded constants for the Kindred engine.
//!
//! Values that a deployment may want to tune (node budget, years per
//! generation) are only defaults here; `ViewConfig` carries the effective
//! values.

/// Years added per generation step by the age heuristic.
pub const YEARS_PER_GENERATION: i64 = 25;

/// Default upper bound of person nodes for the initial view population.
///
/// Bounds layout cost for large trees. Interactive expand/collapse is not
/// bounded.
pub const DEFAULT_MAX_PERSON_NODES: usize = 500;

/// Ahnentafel numbers stop past this many generations (2^62 fits in u64).
pub const MAX_AHNENTAFEL_DEPTH: u32 = 62;

/// Magic bytes for the Kindred binary dataset header.
pub const MAGIC_BYTES: &[u8; 4] = b"KIND";

/// Current binary dataset format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum number of persons accepted in one dataset document.
pub const MAX_DATASET_PERSONS: usize = 1_000_000;

/// Maximum number of relationships accepted in one dataset document.
pub const MAX_DATASET_RELATIONSHIPS: usize = 5_000_000;
