//! # kindred-core
//!
//! The family-tree view engine for Kindred.
//!
//! This crate turns a flat dataset of persons and typed relationships into
//! the graph a layout layer draws:
//! - `family`: nuclear families derived from couple and parent-child links
//! - `traversal`: ancestor/descendant closures, generations, ages, Ahnentafel
//! - `view`: the visible node/link set with show/hide and `etc` placeholders
//! - `mode`: which families a fresh view starts with
//! - `session`: a loaded dataset plus the state derived from it
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies
//! - Deterministic: `BTreeMap`/`BTreeSet` only, no floats
//! - Renderer-agnostic: emits nodes and links, never positions

// =============================================================================
// MODULES
// =============================================================================

pub mod age;
pub mod config;
pub mod export;
pub mod family;
pub mod formats;
pub mod metrics;
pub mod mode;
pub mod primitives;
pub mod session;
pub mod storage;
pub mod store;
pub mod traversal;
pub mod types;
pub mod view;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Fact, FactType, Gender, KindredError, Name, NameType, Person, PersonId, Relationship,
    RelationshipId, RelationshipType, UNKNOWN_NAME,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use age::{GenealogyDate, exact_age, parse_date, years_between};
pub use config::ViewConfig;
pub use export::{NodeJson, SnapshotJson};
pub use family::{FamilyDeriver, FamilyKey, FamilyView};
pub use metrics::DatasetMetrics;
pub use mode::{ModeSelector, ViewMode};
pub use session::{Session, StorageBackend};
pub use storage::RedbStore;
pub use store::{EntityStore, MemoryStore};
pub use traversal::{GenerationConflict, ReferencePoint, TraversalContext, TraversalEngine};
pub use view::{
    FamilySource, FamilyState, Link, NodeType, PersonNode, PopulateReport, ViewEventKind, ViewGraph,
    ViewId, ViewNode, ViewNodeKind, ViewObserver, ViewSnapshot,
};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{Dataset, PersistenceHeader, dataset_from_bytes, dataset_to_bytes};
