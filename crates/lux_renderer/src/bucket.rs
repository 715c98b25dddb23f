//! Bucket-based tile rendering.
//!
//! Divides the image into tiles (buckets) that are rendered independently
//! and in parallel with rayon. Each bucket adds one sample per pixel to the
//! shared film per pass.

use crate::camera::Camera;
use crate::film::Film;
use crate::integrator::PathIntegrator;
use crate::scene::Scene;
use lux_math::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A rectangular region of the image to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// X coordinate of bucket's top-left corner
    pub x: u32,
    /// Y coordinate of bucket's top-left corner
    pub y: u32,
    /// Width of the bucket in pixels
    pub width: u32,
    /// Height of the bucket in pixels
    pub height: u32,
    /// Index of this bucket in the render order
    pub index: usize,
}

impl Bucket {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    /// Get the total number of pixels in this bucket.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Pixel coordinates in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y + self.height)
            .flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }
}

/// Generate buckets for an image, sorted in spiral order from center.
///
/// Buckets near the centre of the image come first, so progressive
/// output fills in the middle before the edges.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let bucket_size = bucket_size.max(1);
    let mut buckets = Vec::new();

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let bw = bucket_size.min(width - x);
            let bh = bucket_size.min(height - y);
            buckets.push(Bucket::new(x, y, bw, bh, buckets.len()));
            x += bucket_size;
        }
        y += bucket_size;
    }

    sort_spiral(&mut buckets, width, height);

    for (i, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = i;
    }

    buckets
}

/// Sort buckets by distance from image center.
fn sort_spiral(buckets: &mut [Bucket], width: u32, height: u32) {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;

    let dist2 = |b: &Bucket| {
        let bx = b.x as f32 + b.width as f32 / 2.0;
        let by = b.y as f32 + b.height as f32 / 2.0;
        (bx - center_x).powi(2) + (by - center_y).powi(2)
    };

    buckets.sort_by(|a, b| dist2(a).total_cmp(&dist2(b)));
}

/// Seed for the random stream of one pixel in one pass.
///
/// The inputs are packed directly into the generator's seed, so a render is
/// reproducible no matter how buckets are scheduled across threads.
pub fn pixel_seed(seed: u64, pass: u32, x: u32, y: u32) -> <StdRng as SeedableRng>::Seed {
    let mut bytes = <StdRng as SeedableRng>::Seed::default();
    bytes[0..8].copy_from_slice(&seed.to_le_bytes());
    bytes[8..12].copy_from_slice(&pass.to_le_bytes());
    bytes[12..16].copy_from_slice(&x.to_le_bytes());
    bytes[16..20].copy_from_slice(&y.to_le_bytes());
    bytes
}

/// Everything a bucket needs to trace one pass.
#[derive(Clone, Copy)]
pub struct PassContext<'a> {
    pub scene: &'a Scene,
    pub camera: &'a dyn Camera,
    pub integrator: &'a PathIntegrator,
    pub seed: u64,
    pub pass: u32,
}

/// Trace one sample for every pixel of `bucket` and add it to `film`.
///
/// Returns the number of camera rays traced. Pixels for which the camera
/// produces no ray get no sample.
pub fn render_bucket(bucket: &Bucket, ctx: &PassContext<'_>, film: &Film) -> u64 {
    let mut traced = 0;

    for (x, y) in bucket.pixels() {
        let mut rng = StdRng::from_seed(pixel_seed(ctx.seed, ctx.pass, x, y));
        let sx: f32 = rng.gen();
        let sy: f32 = rng.gen();
        let lens = Vec2::new(rng.gen(), rng.gen());

        let Some(ray) = ctx.camera.create_primary_ray_with_lens(x, y, sx, sy, lens) else {
            continue;
        };
        let radiance = ctx.integrator.radiance(ctx.scene, &ray, &mut rng);
        film.add_sample(x, y, radiance);
        traced += 1;
    }

    traced
}
