//! # Application Configuration
//!
//! Optional TOML file with a `[view]` table (engine tunables) and a
//! `[server]` table (HTTP settings):
//!
//! ```toml
//! [view]
//! max_person_nodes = 300
//! years_per_generation = 28
//! language = "en"
//!
//! [server]
//! cors_origins = ["http://localhost:5173"]
//! ```
//!
//! The file is read from `--config`, else from `kindred.toml` in the working
//! directory when present. `KINDRED_CORS_ORIGINS` overrides
//! `server.cors_origins`.

use kindred_core::{KindredError, ViewConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file picked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "kindred.toml";

/// Environment override for the allowed CORS origins.
pub const CORS_ORIGINS_ENV: &str = "KINDRED_CORS_ORIGINS";

/// Largest config file accepted (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// CONFIG TYPES
// =============================================================================

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub view: ViewConfig,
    pub server: ServerConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allowed origins; `"*"` allows any. Empty means localhost only.
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, KindredError> {
        toml::from_str(text)
            .map_err(|e| KindredError::DeserializationError(format!("Config: {}", e)))
    }

    /// Load from an explicit path, or from `kindred.toml` if it exists.
    ///
    /// An explicit path that cannot be read is an error; a missing default
    /// file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, KindredError> {
        let path = match path {
            Some(path) => path,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let metadata = std::fs::metadata(path).map_err(|e| {
            KindredError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(KindredError::IoError(format!(
                "Config file {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            KindredError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml(&text)?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}

impl ServerConfig {
    /// Allowed origins after applying the environment override.
    pub fn effective_cors_origins(&self) -> Vec<String> {
        match std::env::var(CORS_ORIGINS_ENV) {
            Ok(value) => parse_origin_list(&value),
            Err(_) => self.cors_origins.clone(),
        }
    }
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origin_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
