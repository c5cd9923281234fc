//! # deformview Algorithms
//!
//! Mesh filters used to build and animate a scene.
//!
//! This crate provides displacement of a mesh along its vector field, arrow
//! glyphs for vector fields, appending several meshes into one labelled mesh,
//! and simple parametric sources.

pub mod warp;
pub mod glyph;
pub mod append;
pub mod sources;

// Re-export commonly used items
pub use warp::*;
pub use glyph::*;
pub use append::*;
pub use sources::*;
