use crate::Vec3;

/// An orthonormal basis around a surface normal.
///
/// Local coordinates put the normal on +Z, so `cos θ` of a local direction
/// is simply its `z` component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
}

impl Frame {
    /// Build a basis from a unit normal.
    ///
    /// Branchless construction from Duff et al., "Building an Orthonormal
    /// Basis, Revisited" (JCGT 2017).
    pub fn from_normal(normal: Vec3) -> Self {
        let sign = 1.0_f32.copysign(normal.z);
        let a = -1.0 / (sign + normal.z);
        let b = normal.x * normal.y * a;
        let tangent = Vec3::new(1.0 + sign * normal.x * normal.x * a, sign * b, -sign * normal.x);
        let bitangent = Vec3::new(b, sign + normal.y * normal.y * a, -normal.y);
        Self {
            tangent,
            bitangent,
            normal,
        }
    }

    /// Build a basis aligned with a surface tangent where one is available.
    ///
    /// Falls back to [`Frame::from_normal`] when the tangent is degenerate
    /// or parallel to the normal.
    pub fn from_normal_tangent(normal: Vec3, tangent: Vec3) -> Self {
        let t = (tangent - normal * normal.dot(tangent)).normalize_or_zero();
        if t == Vec3::ZERO {
            return Self::from_normal(normal);
        }
        Self {
            tangent: t,
            bitangent: normal.cross(t),
            normal,
        }
    }

    /// World-space direction to local coordinates.
    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.tangent), v.dot(self.bitangent), v.dot(self.normal))
    }

    /// Local direction to world space.
    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.tangent * v.x + self.bitangent * v.y + self.normal * v.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_orthonormal(f: &Frame) {
        assert!((f.tangent.length() - 1.0).abs() < 1e-5);
        assert!((f.bitangent.length() - 1.0).abs() < 1e-5);
        assert!(f.tangent.dot(f.bitangent).abs() < 1e-5);
        assert!(f.tangent.dot(f.normal).abs() < 1e-5);
        assert!(f.bitangent.dot(f.normal).abs() < 1e-5);
    }

    #[test]
    fn test_frame_orthonormal() {
        for n in [
            Vec3::Z,
            -Vec3::Z,
            Vec3::X,
            Vec3::new(0.3, -0.8, 0.2).normalize(),
            Vec3::new(-0.001, 0.0, -1.0).normalize(),
        ] {
            assert_orthonormal(&Frame::from_normal(n));
        }
    }

    #[test]
    fn test_frame_round_trip() {
        let frame = Frame::from_normal(Vec3::new(0.2, 0.9, -0.4).normalize());
        let v = Vec3::new(0.5, -0.25, 0.8);
        let back = frame.to_world(frame.to_local(v));
        assert!((back - v).length() < 1e-5);
        assert!((frame.to_local(frame.normal) - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_frame_from_tangent() {
        let frame = Frame::from_normal_tangent(Vec3::Y, Vec3::new(1.0, 0.2, 0.0));
        assert_orthonormal(&frame);
        assert!((frame.tangent - Vec3::X).length() < 1e-5);

        // Parallel tangent falls back to the normal-only construction.
        let fallback = Frame::from_normal_tangent(Vec3::Y, Vec3::Y);
        assert_orthonormal(&fallback);
    }
}
