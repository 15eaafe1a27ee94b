//! Engine data structures: models, textures, transforms and billboards.
//!
//! - `model` contains the vertex layout, GPU mesh buffers and the `Drawable` trait
//! - `texture` contains sampled textures and the depth attachment
//! - `transform` holds position, rotation and scale of a drawn object
//! - `billboard` is the camera-facing quad entity

pub mod billboard;
pub mod model;
pub mod texture;
pub mod transform;
