//! Cameras for primary ray generation.

use lux_math::{sampling, Ray, Vec2, Vec3};
use std::f32::consts::PI;

/// Generates primary rays for film positions.
///
/// `(px, py)` is the pixel, `(sx, sy)` the sub-pixel position in `[0, 1)`.
/// A camera may decline a sample (e.g. outside a fisheye's image circle).
pub trait Camera: Send + Sync {
    /// Image size in pixels.
    fn resolution(&self) -> (u32, u32);

    fn create_primary_ray(&self, px: u32, py: u32, sx: f32, sy: f32) -> Option<Ray>;

    /// Like [`Camera::create_primary_ray`], with a lens position in `[0, 1)^2`
    /// for cameras that model a finite aperture.
    fn create_primary_ray_with_lens(
        &self,
        px: u32,
        py: u32,
        sx: f32,
        sy: f32,
        _lens: Vec2,
    ) -> Option<Ray> {
        self.create_primary_ray(px, py, sx, sy)
    }
}

/// A thin-lens perspective camera.
///
/// Builder methods recompute the cached viewport, so a camera is always
/// ready to generate rays.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    // Image settings
    image_width: u32,
    image_height: u32,

    // Camera positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,

    // Lens settings
    vfov: f32,          // Vertical field of view in degrees
    defocus_angle: f32, // Variation angle of rays through each pixel
    focus_dist: f32,    // Distance from camera to plane of perfect focus

    // Cached computed values
    center: Vec3,
    pixel00_loc: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
    w: Vec3,
    defocus_disk_u: Vec3,
    defocus_disk_v: Vec3,
}

impl PerspectiveCamera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        let mut camera = Self {
            image_width: 800,
            image_height: 450,
            look_from: Vec3::new(0.0, 0.0, 0.0),
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::new(0.0, 1.0, 0.0),
            vfov: 90.0,
            defocus_angle: 0.0,
            focus_dist: 1.0,
            center: Vec3::ZERO,
            pixel00_loc: Vec3::ZERO,
            pixel_delta_u: Vec3::ZERO,
            pixel_delta_v: Vec3::ZERO,
            w: Vec3::Z,
            defocus_disk_u: Vec3::ZERO,
            defocus_disk_v: Vec3::ZERO,
        };
        camera.update();
        camera
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width.max(1);
        self.image_height = height.max(1);
        self.update();
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self.update();
        self
    }

    /// Set lens settings.
    pub fn with_lens(mut self, vfov: f32, defocus_angle: f32, focus_dist: f32) -> Self {
        self.vfov = vfov;
        self.defocus_angle = defocus_angle;
        self.focus_dist = focus_dist;
        self.update();
        self
    }

    pub fn position(&self) -> Vec3 {
        self.center
    }

    /// Unit direction the camera looks along.
    pub fn forward(&self) -> Vec3 {
        -self.w
    }

    fn update(&mut self) {
        self.center = self.look_from;

        // Calculate viewport dimensions
        let theta = self.vfov.to_radians();
        let h = (theta / 2.0).tan();
        let viewport_height = 2.0 * h * self.focus_dist;
        let viewport_width = viewport_height * (self.image_width as f32 / self.image_height as f32);

        // Calculate camera basis vectors
        self.w = (self.look_from - self.look_at).normalize_or_zero();
        let u = self.vup.cross(self.w).normalize_or_zero();
        let v = self.w.cross(u);

        // Calculate viewport vectors
        let viewport_u = viewport_width * u;
        let viewport_v = -viewport_height * v;

        // Calculate pixel delta vectors
        self.pixel_delta_u = viewport_u / self.image_width as f32;
        self.pixel_delta_v = viewport_v / self.image_height as f32;

        // Calculate upper left pixel corner
        self.pixel00_loc =
            self.center - self.focus_dist * self.w - viewport_u / 2.0 - viewport_v / 2.0;

        // Calculate defocus disk basis vectors
        let defocus_radius = self.focus_dist * (self.defocus_angle / 2.0).to_radians().tan();
        self.defocus_disk_u = u * defocus_radius;
        self.defocus_disk_v = v * defocus_radius;
    }
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for PerspectiveCamera {
    fn resolution(&self) -> (u32, u32) {
        (self.image_width, self.image_height)
    }

    fn create_primary_ray(&self, px: u32, py: u32, sx: f32, sy: f32) -> Option<Ray> {
        self.create_primary_ray_with_lens(px, py, sx, sy, Vec2::splat(0.5))
    }

    fn create_primary_ray_with_lens(
        &self,
        px: u32,
        py: u32,
        sx: f32,
        sy: f32,
        lens: Vec2,
    ) -> Option<Ray> {
        let pixel_sample = self.pixel00_loc
            + (px as f32 + sx) * self.pixel_delta_u
            + (py as f32 + sy) * self.pixel_delta_v;

        let ray_origin = if self.defocus_angle <= 0.0 {
            self.center
        } else {
            let p = sampling::concentric_disk(lens.x, lens.y);
            self.center + p.x * self.defocus_disk_u + p.y * self.defocus_disk_v
        };

        let direction = (pixel_sample - ray_origin).normalize_or_zero();
        (direction != Vec3::ZERO).then(|| Ray::new(ray_origin, direction))
    }
}

/// An equidistant fisheye camera.
///
/// The image circle is inscribed in the shorter image side; samples
/// outside it produce no ray.
#[derive(Debug, Clone)]
pub struct FisheyeCamera {
    image_width: u32,
    image_height: u32,
    center: Vec3,
    u: Vec3,
    v: Vec3,
    w: Vec3,
    /// Half the field of view, in radians
    half_fov: f32,
}

impl FisheyeCamera {
    /// `fov` is the full field of view across the image circle, in degrees.
    pub fn new(look_from: Vec3, look_at: Vec3, vup: Vec3, fov: f32) -> Self {
        let w = (look_from - look_at).normalize_or_zero();
        let u = vup.cross(w).normalize_or_zero();
        let v = w.cross(u);
        Self {
            image_width: 512,
            image_height: 512,
            center: look_from,
            u,
            v,
            w,
            half_fov: 0.5 * fov.clamp(0.0, 360.0).to_radians(),
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width.max(1);
        self.image_height = height.max(1);
        self
    }
}

impl Camera for FisheyeCamera {
    fn resolution(&self) -> (u32, u32) {
        (self.image_width, self.image_height)
    }

    fn create_primary_ray(&self, px: u32, py: u32, sx: f32, sy: f32) -> Option<Ray> {
        let radius = 0.5 * self.image_width.min(self.image_height) as f32;
        let x = (px as f32 + sx - 0.5 * self.image_width as f32) / radius;
        let y = (0.5 * self.image_height as f32 - (py as f32 + sy)) / radius;

        let r = (x * x + y * y).sqrt();
        if r > 1.0 {
            return None;
        }

        let theta = (r * self.half_fov).min(PI);
        let phi = y.atan2(x);
        let (sin_theta, cos_theta) = theta.sin_cos();
        let direction = sin_theta * phi.cos() * self.u + sin_theta * phi.sin() * self.v
            - cos_theta * self.w;

        Some(Ray::new(self.center, direction.normalize()))
    }
}
