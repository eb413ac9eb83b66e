//! # stage_core - Stagehand Core
//!
//! Shared primitives for the Stagehand editor toolkit: stable template
//! identifiers and the progress-reporting contract threaded through the
//! assembly pipeline. Kept dependency-light so every other crate can build
//! on it.

pub mod id;
pub mod progress;

pub use id::*;
pub use progress::*;
