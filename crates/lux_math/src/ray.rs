use crate::{Mat4, Mat4Ext, Vec3};

/// A ray in 3D space with origin and direction.
///
/// The direction is not required to be normalized. Parametric distances
/// `t` are measured in units of the direction's length, which keeps them
/// unchanged when a ray is carried into another space by an affine
/// transform (see [`Ray::transform`]).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Get the origin point of the ray.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Get the direction vector of the ray.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Carry the ray into another space.
    ///
    /// The direction is transformed without renormalization, so a hit at
    /// parameter `t` in the new space is the same point as `t` in this one.
    pub fn transform(&self, m: &Mat4) -> Ray {
        Ray {
            origin: m.transform_point3(self.origin),
            direction: m.transform_vector3_affine(self.direction),
        }
    }
}
