//! # stage_scene - Stagehand Scene Model
//!
//! The editor-side scene graph: named hierarchical nodes, type-erased
//! behavior components with a serialization registry, the assembly hook
//! capability behaviors opt into, and the JSON scene document format.
//!
//! Higher layers build on this crate: `stage_asset` stores node trees as
//! template assets, `stage_assembler` runs the assembly pipeline over them.

pub mod behavior;
pub mod doc;
pub mod error;
pub mod graph;
pub mod hooks;

pub use behavior::*;
pub use doc::*;
pub use error::*;
pub use graph::*;
pub use hooks::*;
