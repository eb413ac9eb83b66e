//! # stage_assembler - Stagehand Assembly Pipeline
//!
//! Turns marker nodes in a scene into template assets. A marker names a
//! target template; assembling it clones the marker's subtree, runs the
//! behavior lifecycle hooks over the clone, writes the result into the
//! template asset, and discards the clone. Expansion helpers follow
//! template references between markers so dependent templates reassemble
//! together, and the batch driver runs many markers in priority order with
//! per-marker error isolation.

pub mod batch;
pub mod error;
pub mod expand;
pub mod marker;
pub mod pipeline;

pub use batch::*;
pub use error::*;
pub use expand::*;
pub use marker::*;
pub use pipeline::*;
