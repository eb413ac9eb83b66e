//! # stage_asset - Stagehand Asset Layer
//!
//! Template assets (persisted node trees with labels) and the project
//! asset database that indexes them on disk. Templates are JSON documents
//! with a `.prefab` extension; their ids derive from the project-relative
//! path.

pub mod database;
pub mod error;
pub mod template;

pub use database::*;
pub use error::*;
pub use template::*;
