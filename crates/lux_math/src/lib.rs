// Re-export glam for convenience
pub use glam::*;

// lux math types
mod aabb;
mod frame;
mod interval;
mod ray;
pub mod sampling;
mod transform;

pub use aabb::Aabb;
pub use frame::Frame;
pub use interval::Interval;
pub use ray::Ray;
pub use transform::Mat4Ext;

/// Returns the largest of the three components.
#[inline]
pub fn max_component(v: Vec3) -> f32 {
    v.x.max(v.y).max(v.z)
}

/// Returns true if every component is finite (no NaN, no infinity).
#[inline]
pub fn is_finite_vec3(v: Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_creation() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v.x, 1.0);
        assert_eq!(v.y, 2.0);
        assert_eq!(v.z, 3.0);
    }

    #[test]
    fn test_max_component() {
        assert_eq!(max_component(Vec3::new(0.2, 0.9, 0.5)), 0.9);
        assert_eq!(max_component(Vec3::new(-1.0, -2.0, -3.0)), -1.0);
    }

    #[test]
    fn test_is_finite_vec3() {
        assert!(is_finite_vec3(Vec3::ONE));
        assert!(!is_finite_vec3(Vec3::new(f32::NAN, 0.0, 0.0)));
        assert!(!is_finite_vec3(Vec3::new(0.0, f32::INFINITY, 0.0)));
    }
}
