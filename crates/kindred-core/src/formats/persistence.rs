//! # Persistence Format
//!
//! Binary serialization of datasets for the file backend.
//!
//! Format: Header (5 bytes) + postcard-serialized [`Dataset`].
//! - 4 bytes: Magic ("KIND")
//! - 1 byte: Version
//!
//! Sizes and the header are checked before the payload is decoded. File I/O
//! itself happens in the app layer.

use crate::formats::Dataset;
use crate::{primitives, KindredError};

/// Maximum accepted payload size (500 MB).
pub const MAX_PERSISTENCE_PAYLOAD_SIZE: usize = 500 * 1024 * 1024;

/// Header only.
const MIN_FILE_SIZE: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The persistence header precedes all dataset bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), KindredError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(KindredError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(KindredError::DeserializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; 5] {
        let mut bytes = [0u8; 5];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KindredError> {
        let Some(header) = bytes.get(..MIN_FILE_SIZE) else {
            return Err(KindredError::DeserializationError(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[0..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a dataset to bytes (header + payload).
pub fn dataset_to_bytes(dataset: &Dataset) -> Result<Vec<u8>, KindredError> {
    let payload = postcard::to_stdvec(dataset)
        .map_err(|e| KindredError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(MIN_FILE_SIZE + payload.len());
    result.extend_from_slice(&PersistenceHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a dataset from bytes.
///
/// Rejects short input, oversized input and foreign headers before decoding.
pub fn dataset_from_bytes(bytes: &[u8]) -> Result<Dataset, KindredError> {
    if bytes.len() < MIN_FILE_SIZE {
        return Err(KindredError::DeserializationError(
            "Data too short: minimum 5 bytes required".to_string(),
        ));
    }
    if bytes.len() > MAX_PERSISTENCE_PAYLOAD_SIZE {
        return Err(KindredError::DeserializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_PERSISTENCE_PAYLOAD_SIZE
        )));
    }

    PersistenceHeader::from_bytes(bytes)?.validate()?;

    postcard::from_bytes(&bytes[MIN_FILE_SIZE..]).map_err(|e| {
        KindredError::DeserializationError(format!("Failed to decode dataset: {}", e))
    })
}

// =============================================================================
// TESTS
// =============================================================================
