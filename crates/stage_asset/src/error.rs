//! Error types for the asset layer

use std::path::PathBuf;

use thiserror::Error;

use stage_core::TemplateId;
use stage_scene::SceneError;

/// Asset database and template errors
#[derive(Debug, Error)]
pub enum AssetError {
    /// Template is not in the database
    #[error("Template not found: {0}")]
    TemplateNotFound(TemplateId),

    /// Path escapes the project root or is malformed
    #[error("Invalid template path: {0}")]
    InvalidPath(PathBuf),

    /// Underlying scene model error
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Template document failed to (de)serialize
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Template file could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for asset operations
pub type Result<T> = std::result::Result<T, AssetError>;
