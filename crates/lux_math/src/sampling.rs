//! Monte Carlo sampling routines.
//!
//! Every routine maps uniform numbers in `[0, 1)` to a distribution and
//! has a matching `*_pdf`. Hemisphere and cone samples are returned in
//! local coordinates (axis on +Z); use a [`Frame`](crate::Frame) to carry
//! them into world space.

use crate::{Vec2, Vec3};
use std::f32::consts::{FRAC_1_PI, FRAC_PI_2, FRAC_PI_4, PI};

/// Uniform point on the unit disk (Shirley-Chiu concentric mapping).
pub fn concentric_disk(u: f32, v: f32) -> Vec2 {
    let ox = 2.0 * u - 1.0;
    let oy = 2.0 * v - 1.0;
    if ox == 0.0 && oy == 0.0 {
        return Vec2::ZERO;
    }
    let (r, theta) = if ox.abs() > oy.abs() {
        (ox, FRAC_PI_4 * (oy / ox))
    } else {
        (oy, FRAC_PI_2 - FRAC_PI_4 * (ox / oy))
    };
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Cosine-weighted direction on the +Z hemisphere.
pub fn cosine_hemisphere(u: f32, v: f32) -> Vec3 {
    let d = concentric_disk(u, v);
    let z = (1.0 - d.x * d.x - d.y * d.y).max(0.0).sqrt();
    Vec3::new(d.x, d.y, z)
}

/// Density of [`cosine_hemisphere`] for a local direction.
pub fn cosine_hemisphere_pdf(cos_theta: f32) -> f32 {
    if cos_theta > 0.0 {
        cos_theta * FRAC_1_PI
    } else {
        0.0
    }
}

/// Uniform direction on the unit sphere.
pub fn uniform_sphere(u: f32, v: f32) -> Vec3 {
    let z = 1.0 - 2.0 * u;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * v;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Density of [`uniform_sphere`] (solid angle measure).
pub fn uniform_sphere_pdf() -> f32 {
    1.0 / (4.0 * PI)
}

/// Uniform direction inside the cone around +Z.
///
/// The cone is given by `1 - cos(half-angle)` rather than the cosine itself,
/// so narrow cones keep their precision.
pub fn uniform_cone(u: f32, v: f32, one_minus_cos_max: f32) -> Vec3 {
    let gap = u * one_minus_cos_max;
    let cos_theta = 1.0 - gap;
    let sin_theta = (gap * (2.0 - gap)).max(0.0).sqrt();
    let phi = 2.0 * PI * v;
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Density of [`uniform_cone`] (solid angle measure).
pub fn uniform_cone_pdf(one_minus_cos_max: f32) -> f32 {
    1.0 / (2.0 * PI * one_minus_cos_max)
}

/// `1 - cos(theta)` for an angle given by `sin^2(theta)`, accurate for
/// small angles where `1 - sqrt(1 - s)` rounds to zero.
pub fn one_minus_cos_from_sin2(sin2: f32) -> f32 {
    if sin2 < 1e-4 {
        // Taylor expansion
        0.5 * sin2 + 0.125 * sin2 * sin2
    } else {
        1.0 - (1.0 - sin2).max(0.0).sqrt()
    }
}

/// Direction distributed as `cos^n` around +Z (Phong lobe).
pub fn power_cosine_hemisphere(u: f32, v: f32, exponent: f32) -> Vec3 {
    let cos_theta = u.powf(1.0 / (exponent + 1.0));
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * v;
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Density of [`power_cosine_hemisphere`].
pub fn power_cosine_hemisphere_pdf(cos_theta: f32, exponent: f32) -> f32 {
    if cos_theta > 0.0 {
        (exponent + 1.0) / (2.0 * PI) * cos_theta.powf(exponent)
    } else {
        0.0
    }
}

/// Uniform barycentric coordinates `(b0, b1)` on a triangle; `b2 = 1 - b0 - b1`.
pub fn uniform_triangle(u: f32, v: f32) -> (f32, f32) {
    let su = u.sqrt();
    (1.0 - su, v * su)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_concentric_disk_inside_unit_disk() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let p = concentric_disk(rng.gen(), rng.gen());
            assert!(p.length() <= 1.0 + 1e-5);
        }
        assert_eq!(concentric_disk(0.5, 0.5), Vec2::ZERO);
    }

    #[test]
    fn test_cosine_hemisphere_estimates_projected_area() {
        // E[1/pdf * cos] over the hemisphere equals pi.
        let mut rng = StdRng::seed_from_u64(7);
        let n = 20_000;
        let mut sum = 0.0;
        for _ in 0..n {
            let d = cosine_hemisphere(rng.gen(), rng.gen());
            assert!(d.z >= 0.0);
            assert!((d.length() - 1.0).abs() < 1e-4);
            sum += d.z / cosine_hemisphere_pdf(d.z).max(1e-8);
        }
        let estimate = sum / n as f32;
        assert!((estimate - PI).abs() < 0.05, "estimate {}", estimate);
    }

    #[test]
    fn test_uniform_cone_within_angle() {
        let mut rng = StdRng::seed_from_u64(3);
        let cos_max = 0.9;
        for _ in 0..1000 {
            let d = uniform_cone(rng.gen(), rng.gen(), 1.0 - cos_max);
            assert!(d.z >= cos_max - 1e-5);
            assert!((d.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_narrow_cone_keeps_finite_pdf() {
        // r/d = 1e-3: 1 - sqrt(1 - 1e-6) is exactly zero in f32.
        let sin2 = 1e-6f32;
        assert_eq!(1.0 - (1.0 - sin2).sqrt(), 0.0);

        let gap = one_minus_cos_from_sin2(sin2);
        assert!((gap - 5e-7).abs() < 1e-10);
        let pdf = uniform_cone_pdf(gap);
        assert!(pdf.is_finite());
        assert!((pdf * 2.0 * PI * 5e-7 - 1.0).abs() < 1e-3);

        let d = uniform_cone(1.0, 0.0, gap);
        assert!((d.x - 1e-3).abs() < 1e-6);

        // Wide angles take the exact branch.
        assert!((one_minus_cos_from_sin2(0.19) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_power_cosine_pdf_normalized() {
        // Integrate pdf over the hemisphere with uniform sampling (pdf 1/2pi).
        let mut rng = StdRng::seed_from_u64(11);
        let n = 50_000;
        let exponent = 8.0;
        let mut sum = 0.0;
        for _ in 0..n {
            let d = uniform_sphere(rng.gen(), rng.gen());
            sum += power_cosine_hemisphere_pdf(d.z, exponent) / uniform_sphere_pdf();
        }
        let integral = sum / n as f32;
        assert!((integral - 1.0).abs() < 0.05, "integral {}", integral);
    }

    #[test]
    fn test_uniform_triangle_barycentrics_valid() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..1000 {
            let (b0, b1) = uniform_triangle(rng.gen(), rng.gen());
            assert!(b0 >= 0.0 && b1 >= 0.0 && b0 + b1 <= 1.0 + 1e-6);
        }
    }
}
