//! @ai:module:intent Define error types for the intent parser
//! @ai:module:layer domain
//! @ai:module:public_api Error, Result
//! @ai:module:stateless true

use std::path::PathBuf;
use thiserror::Error;

/// @ai:intent Unified error type for all intent parser operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("Invalid manifest entry #{index}: {message}")]
    ManifestEntry { index: usize, message: String },

    #[error("Invalid intent document: {0}")]
    Document(String),

    #[error("Invalid anchor `{anchor}`: {message}")]
    InvalidAnchor { anchor: String, message: String },

    #[error("Invalid configuration {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
