//! Object-space shapes.
//!
//! Shapes know nothing about materials or transforms: they answer ray
//! queries and area-sampling requests in their own local space. The
//! owning [`Primitive`](crate::Primitive) carries rays in and results out.

use crate::{Quad, Sphere, Triangle};
use lux_math::{Aabb, Interval, Ray, Vec2, Vec3};

/// Object-space surface data at a ray hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Ray parameter of the hit
    pub t: f32,
    /// Hit point
    pub point: Vec3,
    /// Geometric normal, unit length, pointing out of the surface
    pub normal: Vec3,
    /// Interpolated shading normal, unit length, same side as `normal`
    pub shading_normal: Vec3,
    /// Partial derivative of the position along u
    pub dpdu: Vec3,
    /// Partial derivative of the position along v
    pub dpdv: Vec3,
    /// Surface parameterisation
    pub uv: Vec2,
}

/// A point drawn uniformly over a shape's surface, in object space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaSample {
    pub point: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

/// The closed set of shape kinds a primitive may hold.
#[derive(Debug, Clone)]
pub enum Shape {
    Sphere(Sphere),
    Triangle(Triangle),
    Quad(Quad),
}

impl Shape {
    /// Object-space bounding box.
    pub fn bounds(&self) -> Aabb {
        match self {
            Shape::Sphere(s) => s.bounds(),
            Shape::Triangle(t) => t.bounds(),
            Shape::Quad(q) => q.bounds(),
        }
    }

    /// Closest hit strictly inside `ray_t`, if any.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
        match self {
            Shape::Sphere(s) => s.intersect(ray, ray_t),
            Shape::Triangle(t) => t.intersect(ray, ray_t),
            Shape::Quad(q) => q.intersect(ray, ray_t),
        }
    }

    /// Uniformly sample a point on the surface.
    pub fn sample_area(&self, u: Vec2) -> AreaSample {
        match self {
            Shape::Sphere(s) => s.sample_area(u),
            Shape::Triangle(t) => t.sample_area(u),
            Shape::Quad(q) => q.sample_area(u),
        }
    }

    /// Short name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Sphere(_) => "sphere",
            Shape::Triangle(_) => "triangle",
            Shape::Quad(_) => "quad",
        }
    }
}

impl From<Sphere> for Shape {
    fn from(s: Sphere) -> Self {
        Shape::Sphere(s)
    }
}

impl From<Triangle> for Shape {
    fn from(t: Triangle) -> Self {
        Shape::Triangle(t)
    }
}

impl From<Quad> for Shape {
    fn from(q: Quad) -> Self {
        Shape::Quad(q)
    }
}
