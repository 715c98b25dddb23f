//! Textures for primitive albedo, emission and normal maps.
//!
//! Provides procedural textures plus a cache that loads images from disk
//! and stores them as linear float pixels for the renderer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lux_math::{Vec2, Vec3};
use thiserror::Error;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to load texture: {0}")]
    LoadError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Unsupported texture format: {0}")]
    UnsupportedFormat(String),
}

pub type TextureResult<T> = Result<T, TextureError>;

/// How the stored 8-bit values of an image file are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Colour data (albedo, emission); decoded from sRGB to linear.
    Srgb,
    /// Non-colour data such as normal maps; used as-is.
    Linear,
}

/// A texture lookup evaluated at surface UV coordinates.
#[derive(Clone, Debug)]
pub enum Texture {
    /// The same value everywhere.
    Constant(Vec3),

    /// Alternating squares in UV space, `scale` squares per unit.
    Checker { even: Vec3, odd: Vec3, scale: f32 },

    /// A loaded raster image, bilinearly filtered.
    Image(Arc<ImageTexture>),
}

impl Texture {
    /// A constant texture.
    pub fn constant(value: Vec3) -> Self {
        Texture::Constant(value)
    }

    /// Evaluate the texture at UV coordinates.
    pub fn value(&self, uv: Vec2) -> Vec3 {
        match self {
            Texture::Constant(value) => *value,
            Texture::Checker { even, odd, scale } => {
                let iu = (uv.x * scale).floor() as i64;
                let iv = (uv.y * scale).floor() as i64;
                if (iu + iv).rem_euclid(2) == 0 {
                    *even
                } else {
                    *odd
                }
            }
            Texture::Image(image) => image.sample(uv.x, uv.y),
        }
    }

    /// True if the texture is a constant zero, so lookups can be skipped.
    pub fn is_black(&self) -> bool {
        matches!(self, Texture::Constant(v) if *v == Vec3::ZERO)
    }
}

impl Default for Texture {
    fn default() -> Self {
        Texture::Constant(Vec3::ONE)
    }
}

impl From<Vec3> for Texture {
    fn from(value: Vec3) -> Self {
        Texture::Constant(value)
    }
}

/// A loaded image with pixel data.
///
/// Stores pixels in linear RGB(A) float format for rendering.
#[derive(Clone, Debug)]
pub struct ImageTexture {
    /// Texture width in pixels
    pub width: u32,

    /// Texture height in pixels
    pub height: u32,

    /// Pixel data in RGBA format (linear, 0-1 range)
    /// Stored as [R, G, B, A] per pixel, row-major order
    pub pixels: Vec<[f32; 4]>,

    /// Original file path (for debugging)
    pub path: String,
}

impl ImageTexture {
    /// Create a new texture from pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<[f32; 4]>, path: impl Into<String>) -> Self {
        Self {
            width,
            height,
            pixels,
            path: path.into(),
        }
    }

    /// Sample the texture at UV coordinates (bilinear filtering).
    ///
    /// UV coordinates are in [0, 1] range, with (0, 0) at bottom-left.
    pub fn sample(&self, u: f32, v: f32) -> Vec3 {
        if self.width == 0 || self.height == 0 {
            return Vec3::ZERO;
        }

        // Wrap UV coordinates
        let u = u.rem_euclid(1.0);
        let v = v.rem_euclid(1.0);

        // Convert to pixel coordinates
        let x = u * (self.width as f32 - 1.0);
        let y = (1.0 - v) * (self.height as f32 - 1.0); // Flip V for image coordinates

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let fx = x.fract();
        let fy = y.fract();

        let p00 = Vec3::from_slice(&self.get_pixel(x0, y0)[..3]);
        let p10 = Vec3::from_slice(&self.get_pixel(x1, y0)[..3]);
        let p01 = Vec3::from_slice(&self.get_pixel(x0, y1)[..3]);
        let p11 = Vec3::from_slice(&self.get_pixel(x1, y1)[..3]);

        let top = p00.lerp(p10, fx);
        let bottom = p01.lerp(p11, fx);
        top.lerp(bottom, fy)
    }

    /// Get pixel at integer coordinates.
    fn get_pixel(&self, x: u32, y: u32) -> [f32; 4] {
        let idx = (y * self.width + x) as usize;
        self.pixels
            .get(idx)
            .copied()
            .unwrap_or([0.0, 0.0, 0.0, 1.0])
    }

    /// Get total size in bytes (approximate).
    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<[f32; 4]>()
    }
}

/// Cache for loaded image textures.
///
/// Images are loaded on demand and shared between primitives. A path
/// loaded in both colour spaces is cached twice.
pub struct TextureCache {
    /// Cached textures by file path and colour space
    textures: HashMap<(String, ColorSpace), Arc<ImageTexture>>,

    /// Base directory for resolving relative paths
    base_dir: Option<PathBuf>,
}

impl TextureCache {
    /// Create a new empty texture cache.
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
            base_dir: None,
        }
    }

    /// Create a texture cache with a base directory for relative paths.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            textures: HashMap::new(),
            base_dir: Some(base_dir.into()),
        }
    }

    /// Load a texture from file, using cache if available.
    pub fn load(&mut self, path: &str, color_space: ColorSpace) -> TextureResult<Texture> {
        let key = (path.to_string(), color_space);
        if let Some(texture) = self.textures.get(&key) {
            return Ok(Texture::Image(texture.clone()));
        }

        let full_path = self.resolve_path(path);
        let texture = Arc::new(load_texture_file(&full_path, color_space)?);
        self.textures.insert(key, texture.clone());

        log::debug!(
            "Loaded texture: {} ({}x{}, {:.1} KB)",
            path,
            texture.width,
            texture.height,
            texture.size_bytes() as f32 / 1024.0
        );

        Ok(Texture::Image(texture))
    }

    /// Get the number of cached textures.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Resolve a path relative to the base directory.
    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);

        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(base) = &self.base_dir {
            base.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Load a texture from a file path.
fn load_texture_file(path: &Path, color_space: ColorSpace) -> TextureResult<ImageTexture> {
    if !path.exists() {
        return Err(TextureError::LoadError(format!(
            "{} does not exist",
            path.display()
        )));
    }

    let img = image::open(path)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(TextureError::UnsupportedFormat(format!(
            "{} has zero size",
            path.display()
        )));
    }

    let decode = |value: u8| match color_space {
        ColorSpace::Srgb => srgb_to_linear(value),
        ColorSpace::Linear => value as f32 / 255.0,
    };

    let pixels: Vec<[f32; 4]> = rgba
        .pixels()
        .map(|p| {
            [
                decode(p[0]),
                decode(p[1]),
                decode(p[2]),
                p[3] as f32 / 255.0, // Alpha is linear
            ]
        })
        .collect();

    Ok(ImageTexture::new(
        width,
        height,
        pixels,
        path.to_string_lossy().to_string(),
    ))
}

/// Convert sRGB byte value to linear float.
fn srgb_to_linear(value: u8) -> f32 {
    let v = value as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_texture() {
        let tex = Texture::constant(Vec3::new(1.0, 0.5, 0.0));
        let sample = tex.value(Vec2::new(0.3, 0.9));
        assert_eq!(sample, Vec3::new(1.0, 0.5, 0.0));
        assert!(!tex.is_black());
        assert!(Texture::constant(Vec3::ZERO).is_black());
    }

    #[test]
    fn test_checker_texture_alternates() {
        let tex = Texture::Checker {
            even: Vec3::ONE,
            odd: Vec3::ZERO,
            scale: 2.0,
        };
        assert_eq!(tex.value(Vec2::new(0.1, 0.1)), Vec3::ONE);
        assert_eq!(tex.value(Vec2::new(0.6, 0.1)), Vec3::ZERO);
        assert_eq!(tex.value(Vec2::new(0.6, 0.6)), Vec3::ONE);
        // Negative coordinates keep alternating.
        assert_eq!(tex.value(Vec2::new(-0.1, 0.1)), Vec3::ZERO);
    }

    #[test]
    fn test_image_texture_bilinear() {
        // 2x1 image: black on the left, white on the right.
        let image = ImageTexture::new(2, 1, vec![[0.0, 0.0, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]], "mem");
        let left = image.sample(0.0, 0.5);
        let mid = image.sample(0.5, 0.5);
        assert!(left.x < 0.01);
        assert!((mid.x - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_texture_cache_missing_file() {
        let mut cache = TextureCache::new();
        assert!(cache.is_empty());
        let result = cache.load("definitely/not/here.png", ColorSpace::Srgb);
        assert!(matches!(result, Err(TextureError::LoadError(_))));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_texture_cache_reuses_loads_per_color_space() {
        let path = std::env::temp_dir().join(format!("lux_cache_{}.png", std::process::id()));
        image::RgbaImage::from_pixel(2, 2, image::Rgba([128, 128, 128, 255]))
            .save(&path)
            .unwrap();
        let name = path.to_str().unwrap();

        let mut cache = TextureCache::new();
        let first = cache.load(name, ColorSpace::Srgb).unwrap();
        let again = cache.load(name, ColorSpace::Srgb).unwrap();
        let linear = cache.load(name, ColorSpace::Linear).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cache.len(), 2);
        match (&first, &again) {
            (Texture::Image(a), Texture::Image(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("expected image textures"),
        }
        // Same bytes, decoded differently.
        let srgb_value = first.value(Vec2::new(0.5, 0.5)).x;
        let linear_value = linear.value(Vec2::new(0.5, 0.5)).x;
        assert!((linear_value - 128.0 / 255.0).abs() < 1e-4);
        assert!(srgb_value < linear_value);
    }

    #[test]
    fn test_srgb_to_linear() {
        // Black stays black
        assert!((srgb_to_linear(0) - 0.0).abs() < 0.001);

        // White stays white
        assert!((srgb_to_linear(255) - 1.0).abs() < 0.001);

        // Mid-gray is darker in linear
        let mid = srgb_to_linear(128);
        assert!(mid < 0.5);
        assert!(mid > 0.1);
    }
}
