//! # Formats
//!
//! The dataset document and its binary persistence format.

mod dataset;
mod persistence;

pub use dataset::Dataset;
pub use persistence::{
    MAX_PERSISTENCE_PAYLOAD_SIZE, PersistenceHeader, dataset_from_bytes, dataset_to_bytes,
};
