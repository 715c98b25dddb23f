//! Image accumulation.
//!
//! The film stores a running CIE XYZ sum and a sample weight per pixel.
//! Samples are added through `&self` with atomic float adds, so every
//! render thread can write into one shared film. Clearing needs `&mut self`,
//! which the borrow checker keeps apart from in-flight accumulation.

use lux_core::color::{color_to_rgba, rgb_to_xyz, xyz_to_rgb};
use lux_core::Color;
use lux_math::Vec3;
use std::sync::atomic::{AtomicU32, Ordering};

/// An `f32` stored in an `AtomicU32`, with a compare-and-swap add.
#[derive(Debug, Default)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn add(&self, value: f32) {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f32::from_bits(current) + value).to_bits();
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    fn reset(&mut self) {
        *self.0.get_mut() = 0.0f32.to_bits();
    }
}

#[derive(Debug, Default)]
struct FilmPixel {
    xyz: [AtomicF32; 3],
    weight: AtomicF32,
}

/// A width x height accumulator of XYZ samples.
#[derive(Debug)]
pub struct Film {
    width: u32,
    height: u32,
    pixels: Vec<FilmPixel>,
}

impl Film {
    pub fn new(width: u32, height: u32) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count);
        pixels.resize_with(count, FilmPixel::default);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn pixel(&self, x: u32, y: u32) -> Option<&FilmPixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize)
    }

    /// Add one XYZ sample with unit weight to pixel `(x, y)`.
    ///
    /// Samples outside the film are dropped.
    pub fn add_color_xyz(&self, x: u32, y: u32, xyz: Vec3) {
        let Some(pixel) = self.pixel(x, y) else {
            log::warn!("Sample at ({x}, {y}) is outside the {}x{} film", self.width, self.height);
            return;
        };
        pixel.xyz[0].add(xyz.x);
        pixel.xyz[1].add(xyz.y);
        pixel.xyz[2].add(xyz.z);
        pixel.weight.add(1.0);
    }

    /// Add one linear RGB sample to pixel `(x, y)`.
    pub fn add_sample(&self, x: u32, y: u32, rgb: Color) {
        self.add_color_xyz(x, y, rgb_to_xyz(rgb));
    }

    /// Number of samples accumulated at `(x, y)`.
    pub fn sample_weight(&self, x: u32, y: u32) -> f32 {
        self.pixel(x, y).map_or(0.0, |p| p.weight.load())
    }

    /// Average XYZ at `(x, y)`; black for pixels with no samples.
    pub fn pixel_xyz(&self, x: u32, y: u32) -> Vec3 {
        self.pixel(x, y).map_or(Vec3::ZERO, resolve_pixel)
    }

    /// Average linear RGB at `(x, y)`.
    pub fn pixel_rgb(&self, x: u32, y: u32) -> Color {
        xyz_to_rgb(self.pixel_xyz(x, y))
    }

    /// Reset every pixel to zero.
    pub fn clear(&mut self) {
        for pixel in &mut self.pixels {
            for channel in &mut pixel.xyz {
                channel.reset();
            }
            pixel.weight.reset();
        }
    }

    /// Linear RGB for every pixel in row-major order.
    pub fn resolve(&self) -> Vec<Color> {
        self.pixels
            .iter()
            .map(|p| xyz_to_rgb(resolve_pixel(p)))
            .collect()
    }

    /// Gamma-encoded 8-bit RGBA bytes in row-major order.
    pub fn to_rgba8(&self, exposure: f32) -> Vec<u8> {
        let rgba: Vec<[u8; 4]> = self
            .resolve()
            .into_iter()
            .map(|color| color_to_rgba(color, exposure))
            .collect();
        bytemuck::cast_slice(&rgba).to_vec()
    }
}

fn resolve_pixel(pixel: &FilmPixel) -> Vec3 {
    let weight = pixel.weight.load();
    if weight <= 0.0 {
        return Vec3::ZERO;
    }
    Vec3::new(pixel.xyz[0].load(), pixel.xyz[1].load(), pixel.xyz[2].load()) / weight
}
