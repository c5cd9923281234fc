//! Core data structures and traits for deformview
//!
//! This crate provides the fundamental types shared by every other deformview
//! crate: points and vectors, named per-point data arrays, the triangle
//! `PolyData` mesh that carries them, transforms, and the common error type.

pub mod point;
pub mod data_array;
pub mod polydata;
pub mod traits;
pub mod transform;
pub mod error;

pub use point::*;
pub use data_array::*;
pub use polydata::*;
pub use traits::*;
pub use transform::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix4, UnitQuaternion};
