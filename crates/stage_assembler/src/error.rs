//! Error types for the assembly pipeline

use thiserror::Error;

use stage_asset::AssetError;
use stage_core::TemplateId;
use stage_scene::{AssemblyStage, HookError, NodeId, SceneError};

/// Assembly pipeline errors
#[derive(Debug, Error)]
pub enum AssembleError {
    /// Marker node vanished between collection and execution
    #[error("Assembler node not found: {0}")]
    NodeNotFound(NodeId),

    /// Marker references a template the database does not know
    #[error("Template not found: {0}")]
    TemplateNotFound(TemplateId),

    /// A lifecycle hook failed
    #[error("Hook failed during {stage} on '{marker}': {source}")]
    Hook {
        marker: String,
        stage: AssemblyStage,
        source: HookError,
    },

    /// Scene graph operation failed
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Asset layer failure
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
}

/// Result type for assembly operations
pub type Result<T> = std::result::Result<T, AssembleError>;
