//! lux core - renderer-agnostic scene data.
//!
//! This crate provides:
//!
//! - **Textures**: constant, checker and image textures plus an image cache
//! - **Meshes**: indexed triangle geometry
//! - **Colour**: linear RGB / CIE XYZ conversions and 8-bit output helpers
//!
//! # Example
//!
//! ```ignore
//! use lux_core::{ColorSpace, TextureCache};
//!
//! let mut cache = TextureCache::with_base_dir("assets");
//! let albedo = cache.load("brick.png", ColorSpace::Srgb)?;
//! ```

pub mod color;
pub mod mesh;
pub mod texture;

// Re-export commonly used types
pub use color::Color;
pub use mesh::{Mesh, MeshTriangle};
pub use texture::{ColorSpace, ImageTexture, Texture, TextureCache, TextureError, TextureResult};
