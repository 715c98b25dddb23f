//! Axis-aligned rectangle in the object-space XY plane.

use crate::shape::{AreaSample, SurfaceHit};
use lux_math::{Aabb, Interval, Ray, Vec2, Vec3};

/// A rectangle centred at the origin, facing +Z.
///
/// Handy for area lights and ground planes; scale, rotate and move it with
/// the primitive's transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    half_width: f32,
    half_height: f32,
}

impl Quad {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            half_width: 0.5 * width.abs(),
            half_height: 0.5 * height.abs(),
        }
    }

    pub fn width(&self) -> f32 {
        2.0 * self.half_width
    }

    pub fn height(&self) -> f32 {
        2.0 * self.half_height
    }

    /// Object-space edge vectors spanning the rectangle.
    pub fn edges(&self) -> (Vec3, Vec3) {
        (
            Vec3::new(self.width(), 0.0, 0.0),
            Vec3::new(0.0, self.height(), 0.0),
        )
    }

    pub fn bounds(&self) -> Aabb {
        let extent = Vec3::new(self.half_width, self.half_height, 0.0);
        Aabb::from_points(-extent, extent)
    }

    fn surface_at(&self, point: Vec3, t: f32) -> SurfaceHit {
        let (dpdu, dpdv) = self.edges();
        SurfaceHit {
            t,
            point,
            normal: Vec3::Z,
            shading_normal: Vec3::Z,
            dpdu,
            dpdv,
            uv: Vec2::new(
                0.5 + 0.5 * point.x / self.half_width,
                0.5 + 0.5 * point.y / self.half_height,
            ),
        }
    }

    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
        let dz = ray.direction().z;
        if dz.abs() < 1e-8 {
            return None;
        }

        let t = -ray.origin().z / dz;
        if !ray_t.surrounds(t) {
            return None;
        }

        let mut point = ray.at(t);
        if point.x.abs() > self.half_width || point.y.abs() > self.half_height {
            return None;
        }
        point.z = 0.0;

        Some(self.surface_at(point, t))
    }

    pub fn sample_area(&self, u: Vec2) -> AreaSample {
        let point = Vec3::new(
            (2.0 * u.x - 1.0) * self.half_width,
            (2.0 * u.y - 1.0) * self.half_height,
            0.0,
        );
        let hit = self.surface_at(point, 0.0);
        AreaSample {
            point,
            normal: Vec3::Z,
            uv: hit.uv,
        }
    }
}
