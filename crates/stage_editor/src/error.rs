//! Error types for editor operations

use thiserror::Error;

use stage_assembler::AssembleError;
use stage_asset::AssetError;
use stage_core::TemplateId;
use stage_scene::{NodeId, SceneError};

/// Editor command errors
#[derive(Debug, Error)]
pub enum EditorError {
    /// Command targeted a node that is not in the scene
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Command needs an assembler marker with a target on the node
    #[error("No assembler target on node: {0}")]
    NoMarker(NodeId),

    /// Template exists but holds no nodes yet
    #[error("Template has no contents: {0}")]
    EmptyTemplate(TemplateId),

    /// The current scene has edits but no file to save them to
    #[error("Scene has unsaved changes and no path")]
    UnsavedScene,

    /// Preferences file could not be read or parsed
    #[error("Preferences error: {0}")]
    Config(String),

    /// Scene model failure
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Asset layer failure
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Assembly pipeline failure
    #[error("Assembly error: {0}")]
    Assemble(#[from] AssembleError),
}

/// Result type for editor operations
pub type Result<T> = std::result::Result<T, EditorError>;
