//! # Persistent Storage
//!
//! Disk-backed `EntityStore` implementations.

mod redb_store;

pub use redb_store::RedbStore;
