//! Triangle shape for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use crate::shape::{AreaSample, SurfaceHit};
use lux_core::MeshTriangle;
use lux_math::{sampling, Aabb, Frame, Interval, Ray, Vec2, Vec3};

/// Default parameterisation when a triangle has no UVs.
const DEFAULT_UVS: [Vec2; 3] = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0)];

/// A triangle with optional per-vertex normals and UVs.
///
/// Vertices are counter-clockwise around the geometric normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    /// Pre-computed face normal (unit length)
    normal: Vec3,
    normals: Option<[Vec3; 3]>,
    uvs: [Vec2; 3],
}

impl Triangle {
    /// Create a new triangle from three vertices.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        let normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
        Self {
            v0,
            v1,
            v2,
            normal,
            normals: None,
            uvs: DEFAULT_UVS,
        }
    }

    /// Attach per-vertex shading normals.
    pub fn with_normals(mut self, normals: [Vec3; 3]) -> Self {
        self.normals = Some(normals.map(|n| n.normalize_or_zero()));
        self
    }

    /// Attach per-vertex texture coordinates.
    pub fn with_uvs(mut self, uvs: [Vec2; 3]) -> Self {
        self.uvs = uvs;
        self
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        [self.v0, self.v1, self.v2]
    }

    pub fn area(&self) -> f32 {
        0.5 * (self.v1 - self.v0).cross(self.v2 - self.v0).length()
    }

    pub fn bounds(&self) -> Aabb {
        let min = self.v0.min(self.v1).min(self.v2);
        let max = self.v0.max(self.v1).max(self.v2);

        // Pad thin dimensions to avoid degenerate AABBs
        let delta = 0.0001;
        Aabb::from_points(min - Vec3::splat(delta), max + Vec3::splat(delta))
    }

    /// Surface data at barycentric coordinates (b1, b2).
    fn surface_at(&self, b1: f32, b2: f32, t: f32) -> SurfaceHit {
        let b0 = 1.0 - b1 - b2;
        let point = b0 * self.v0 + b1 * self.v1 + b2 * self.v2;
        let uv = b0 * self.uvs[0] + b1 * self.uvs[1] + b2 * self.uvs[2];

        let (dpdu, dpdv) = self.position_derivatives();

        let mut normal = self.normal;
        let shading_normal = match self.normals {
            Some([n0, n1, n2]) => {
                let ns = (b0 * n0 + b1 * n1 + b2 * n2).normalize_or_zero();
                if ns == Vec3::ZERO {
                    normal
                } else {
                    // Geometric normal follows the authored orientation.
                    if ns.dot(normal) < 0.0 {
                        normal = -normal;
                    }
                    ns
                }
            }
            None => normal,
        };

        SurfaceHit {
            t,
            point,
            normal,
            shading_normal,
            dpdu,
            dpdv,
            uv,
        }
    }

    /// dp/du and dp/dv from the UV layout, falling back to an arbitrary
    /// tangent frame when the UVs are degenerate.
    fn position_derivatives(&self) -> (Vec3, Vec3) {
        let duv02 = self.uvs[0] - self.uvs[2];
        let duv12 = self.uvs[1] - self.uvs[2];
        let dp02 = self.v0 - self.v2;
        let dp12 = self.v1 - self.v2;

        let determinant = duv02.x * duv12.y - duv02.y * duv12.x;
        if determinant.abs() > 1e-8 {
            let inv = 1.0 / determinant;
            let dpdu = (duv12.y * dp02 - duv02.y * dp12) * inv;
            let dpdv = (duv02.x * dp12 - duv12.x * dp02) * inv;
            if dpdu.cross(dpdv).length_squared() > 0.0 {
                return (dpdu, dpdv);
            }
        }

        let frame = Frame::from_normal(self.normal);
        (frame.tangent, frame.bitangent)
    }

    /// Ray-triangle intersection using Möller-Trumbore.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction().cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-8 {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin() - self.v0;
        let u = f * s.dot(h);

        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction().dot(q);

        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        if !ray_t.surrounds(t) {
            return None;
        }

        Some(self.surface_at(u, v, t))
    }

    pub fn sample_area(&self, u: Vec2) -> AreaSample {
        let (b0, b1) = sampling::uniform_triangle(u.x, u.y);
        let hit = self.surface_at(b1, 1.0 - b0 - b1, 0.0);
        AreaSample {
            point: hit.point,
            normal: hit.normal,
            uv: hit.uv,
        }
    }
}

impl From<MeshTriangle> for Triangle {
    fn from(tri: MeshTriangle) -> Self {
        let [v0, v1, v2] = tri.positions;
        let mut triangle = Triangle::new(v0, v1, v2);
        if let Some(normals) = tri.normals {
            triangle = triangle.with_normals(normals);
        }
        if let Some(uvs) = tri.uvs {
            triangle = triangle.with_uvs(uvs);
        }
        triangle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Triangle {
        Triangle::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn test_triangle_hit() {
        let tri = unit_triangle();
        let ray = Ray::new(Vec3::new(0.25, 0.25, 1.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = tri.intersect(&ray, Interval::new(0.001, 100.0)).unwrap();

        assert!((hit.t - 1.0).abs() < 0.001);
        assert!((hit.point - Vec3::new(0.25, 0.25, 0.0)).length() < 1e-5);
        assert!((hit.normal - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_triangle_hit_from_behind_keeps_face_normal() {
        let tri = unit_triangle();
        let ray = Ray::new(Vec3::new(0.25, 0.25, -1.0), Vec3::new(0.0, 0.0, 1.0));
        let hit = tri.intersect(&ray, Interval::new(0.001, 100.0)).unwrap();
        assert!((hit.normal - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_triangle_miss() {
        let tri = unit_triangle();
        // Ray passes outside the triangle
        let ray = Ray::new(Vec3::new(2.0, 2.0, 1.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(tri.intersect(&ray, Interval::new(0.001, 100.0)).is_none());
    }

    #[test]
    fn test_triangle_parallel_ray() {
        let tri = unit_triangle();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(tri.intersect(&ray, Interval::new(0.001, 100.0)).is_none());
    }

    #[test]
    fn test_triangle_interpolates_uvs() {
        let tri = unit_triangle().with_uvs([
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
        ]);
        let ray = Ray::new(Vec3::new(0.5, 0.25, 1.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = tri.intersect(&ray, Interval::new(0.0, 10.0)).unwrap();
        assert!((hit.uv - Vec2::new(0.5, 0.25)).length() < 1e-5);
        assert!((hit.dpdu - Vec3::X).length() < 1e-5);
        assert!((hit.dpdv - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_triangle_shading_normal_flips_geometric() {
        let tri = unit_triangle().with_normals([-Vec3::Z; 3]);
        let ray = Ray::new(Vec3::new(0.2, 0.2, 1.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = tri.intersect(&ray, Interval::new(0.0, 10.0)).unwrap();
        assert!((hit.shading_normal + Vec3::Z).length() < 1e-5);
        assert!(hit.normal.dot(hit.shading_normal) > 0.0);
    }

    #[test]
    fn test_triangle_area_and_sample() {
        let tri = unit_triangle();
        assert!((tri.area() - 0.5).abs() < 1e-6);

        let s = tri.sample_area(Vec2::new(0.7, 0.2));
        assert!(s.point.z.abs() < 1e-6);
        assert!(s.point.x >= 0.0 && s.point.y >= 0.0 && s.point.x + s.point.y <= 1.0 + 1e-6);
    }
}
