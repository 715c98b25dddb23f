//! Sphere shape for ray tracing.

use crate::shape::{AreaSample, SurfaceHit};
use lux_math::{sampling, Aabb, Interval, Ray, Vec2, Vec3};
use std::f32::consts::PI;

/// A sphere centred at the object-space origin.
///
/// Place it in the world with the primitive's transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    radius: f32,
}

impl Sphere {
    /// Create a new sphere.
    pub fn new(radius: f32) -> Self {
        Self {
            radius: radius.max(0.0),
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn bounds(&self) -> Aabb {
        let rvec = Vec3::splat(self.radius);
        Aabb::from_points(-rvec, rvec)
    }

    /// Surface data for a point on the sphere.
    ///
    /// u runs around +Z from +X, v runs from the -Z pole (0) to +Z (1).
    fn surface_at(&self, point: Vec3, t: f32) -> SurfaceHit {
        let normal = point / self.radius;

        let mut phi = point.y.atan2(point.x);
        if phi < 0.0 {
            phi += 2.0 * PI;
        }
        let cos_theta = normal.z.clamp(-1.0, 1.0);
        let theta = cos_theta.acos();
        let sin_theta = theta.sin();

        let dpdu = Vec3::new(-2.0 * PI * point.y, 2.0 * PI * point.x, 0.0);
        let dpdv = PI
            * Vec3::new(
                -point.z * phi.cos(),
                -point.z * phi.sin(),
                self.radius * sin_theta,
            );

        SurfaceHit {
            t,
            point,
            normal,
            shading_normal: normal,
            dpdu,
            dpdv,
            uv: Vec2::new(phi / (2.0 * PI), 1.0 - theta / PI),
        }
    }

    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
        let oc = -ray.origin();
        let a = ray.direction().length_squared();
        let h = ray.direction().dot(oc);
        if a == 0.0 {
            return None;
        }

        // Distance from the centre to the ray's closest approach; stays
        // accurate for small, far spheres where h*h - a*c cancels.
        let perp = oc - ray.direction() * (h / a);
        let discriminant = a * (self.radius * self.radius - perp.length_squared());
        if discriminant < 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();

        // Find the nearest root in the acceptable range
        let mut root = (h - sqrtd) / a;
        if !ray_t.surrounds(root) {
            root = (h + sqrtd) / a;
            if !ray_t.surrounds(root) {
                return None;
            }
        }

        // Reproject onto the surface to limit drift at large t.
        let mut point = ray.at(root);
        point *= self.radius / point.length();
        Some(self.surface_at(point, root))
    }

    pub fn sample_area(&self, u: Vec2) -> AreaSample {
        let n = sampling::uniform_sphere(u.x, u.y);
        let hit = self.surface_at(n * self.radius, 0.0);
        AreaSample {
            point: hit.point,
            normal: n,
            uv: hit.uv,
        }
    }
}
