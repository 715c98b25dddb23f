//! Scattering lobes.
//!
//! A [`Bxdf`] is one lobe of a material: it evaluates reflectance and
//! density for a pair of world-space directions and draws new directions.
//! Directions point away from the surface (`wo` toward the viewer, `wi`
//! toward the light). Reflective lobes scatter on whichever side `wo` is.

use lux_core::Color;
use lux_math::{is_finite_vec3, sampling, Frame, Vec3};
use std::f32::consts::{FRAC_1_PI, PI};

/// Reflectance and density of a lobe for a fixed pair of directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BxdfEval {
    pub f: Color,
    pub pdf: f32,
}

impl BxdfEval {
    pub const ZERO: BxdfEval = BxdfEval {
        f: Color::ZERO,
        pdf: 0.0,
    };
}

/// A sampled incoming direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BxdfSample {
    pub wi: Vec3,
    pub f: Color,
    /// Solid-angle density, or 1 for a delta lobe.
    pub pdf: f32,
    /// The lobe is a Dirac delta; density-based weighting does not apply.
    pub is_delta: bool,
}

impl BxdfSample {
    /// True if every quantity is finite and the density is positive.
    pub fn is_valid(&self) -> bool {
        is_finite_vec3(self.wi)
            && is_finite_vec3(self.f)
            && self.pdf.is_finite()
            && self.pdf > 0.0
    }
}

/// The closed set of scattering lobes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bxdf {
    /// Ideal diffuse reflection.
    Lambertian { albedo: Color },
    /// Ideal mirror reflection. Any Fresnel factor is folded into `reflectance`.
    SpecularReflection { reflectance: Color },
    /// Ideal refraction through a dielectric boundary with relative index `ior`
    /// (inside over outside). Any Fresnel factor is folded into `transmittance`.
    SpecularTransmission { transmittance: Color, ior: f32 },
    /// Normalized modified-Phong lobe around the mirror direction.
    Glossy { specular: Color, exponent: f32 },
}

impl Bxdf {
    pub fn is_delta(&self) -> bool {
        matches!(
            self,
            Bxdf::SpecularReflection { .. } | Bxdf::SpecularTransmission { .. }
        )
    }

    /// Reflectance and density for scattering `wo` into `wi` about `normal`.
    ///
    /// Delta lobes always evaluate to zero.
    pub fn evaluate(&self, wo: Vec3, normal: Vec3, wi: Vec3) -> BxdfEval {
        let n = face_forward(normal, wo);
        let cos_i = wi.dot(n);
        if cos_i <= 0.0 {
            return BxdfEval::ZERO;
        }

        match *self {
            Bxdf::Lambertian { albedo } => BxdfEval {
                f: albedo * FRAC_1_PI,
                pdf: sampling::cosine_hemisphere_pdf(cos_i),
            },
            Bxdf::Glossy { specular, exponent } => {
                let cos_alpha = wi.dot(reflect(wo, n));
                if cos_alpha <= 0.0 {
                    return BxdfEval::ZERO;
                }
                BxdfEval {
                    f: specular * glossy_normalization(exponent) * cos_alpha.powf(exponent),
                    pdf: sampling::power_cosine_hemisphere_pdf(cos_alpha, exponent),
                }
            }
            Bxdf::SpecularReflection { .. } | Bxdf::SpecularTransmission { .. } => {
                BxdfEval::ZERO
            }
        }
    }

    /// Draw an incoming direction for `wo`.
    ///
    /// `frame` is the shading frame around `normal`. Returns `None` when the
    /// lobe cannot scatter (total internal reflection, a direction below the
    /// surface, a grazing mirror bounce).
    pub fn sample(&self, wo: Vec3, normal: Vec3, frame: &Frame, u: f32, v: f32) -> Option<BxdfSample> {
        let side = if wo.dot(normal) < 0.0 { -1.0 } else { 1.0 };
        let n = normal * side;

        match *self {
            Bxdf::Lambertian { albedo } => {
                let local = sampling::cosine_hemisphere(u, v);
                let wi = frame.to_world(Vec3::new(local.x, local.y, local.z * side));
                let cos_i = wi.dot(n);
                if cos_i <= 0.0 {
                    return None;
                }
                Some(BxdfSample {
                    wi,
                    f: albedo * FRAC_1_PI,
                    pdf: sampling::cosine_hemisphere_pdf(cos_i),
                    is_delta: false,
                })
            }
            Bxdf::Glossy { specular, exponent } => {
                let lobe = Frame::from_normal(reflect(wo, n));
                let wi = lobe.to_world(sampling::power_cosine_hemisphere(u, v, exponent));
                if wi.dot(n) <= 0.0 {
                    return None;
                }
                let cos_alpha = wi.dot(lobe.normal).max(0.0);
                Some(BxdfSample {
                    wi,
                    f: specular * glossy_normalization(exponent) * cos_alpha.powf(exponent),
                    pdf: sampling::power_cosine_hemisphere_pdf(cos_alpha, exponent),
                    is_delta: false,
                })
            }
            Bxdf::SpecularReflection { reflectance } => {
                let wi = reflect(wo, n);
                let cos_i = wi.dot(n);
                if cos_i <= 1e-6 {
                    return None;
                }
                Some(BxdfSample {
                    wi,
                    f: reflectance / cos_i,
                    pdf: 1.0,
                    is_delta: true,
                })
            }
            Bxdf::SpecularTransmission { transmittance, ior } => {
                let entering = side > 0.0;
                let eta = if entering { 1.0 / ior } else { ior };
                let wi = refract(wo, n, eta)?;
                let cos_i = wi.dot(n).abs();
                if cos_i <= 1e-6 {
                    return None;
                }
                Some(BxdfSample {
                    wi,
                    f: transmittance / cos_i,
                    pdf: 1.0,
                    is_delta: true,
                })
            }
        }
    }
}

/// `normal` flipped, if needed, into the hemisphere of `v`.
#[inline]
pub fn face_forward(normal: Vec3, v: Vec3) -> Vec3 {
    if normal.dot(v) < 0.0 {
        -normal
    } else {
        normal
    }
}

/// Mirror `wo` about `n`. Both point away from the surface.
#[inline]
pub fn reflect(wo: Vec3, n: Vec3) -> Vec3 {
    2.0 * wo.dot(n) * n - wo
}

/// Refract `wo` through a boundary with normal `n` on the side of `wo`.
///
/// `eta` is the ratio of the incident index over the transmitted index.
/// Returns `None` on total internal reflection.
pub fn refract(wo: Vec3, n: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = wo.dot(n);
    let sin2_i = (1.0 - cos_i * cos_i).max(0.0);
    let sin2_t = eta * eta * sin2_i;
    if sin2_t >= 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    Some((-wo * eta + (eta * cos_i - cos_t) * n).normalize())
}

/// Unpolarised Fresnel reflectance at a dielectric boundary.
///
/// `cos_i` is measured on the incident side; `eta_i` and `eta_t` are the
/// indices of the incident and transmitted media.
pub fn fresnel_dielectric(cos_i: f32, eta_i: f32, eta_t: f32) -> f32 {
    let cos_i = cos_i.clamp(0.0, 1.0);
    let sin_i = (1.0 - cos_i * cos_i).max(0.0).sqrt();
    let sin_t = eta_i / eta_t * sin_i;
    if sin_t >= 1.0 {
        return 1.0;
    }
    let cos_t = (1.0 - sin_t * sin_t).max(0.0).sqrt();

    let r_parallel = (eta_t * cos_i - eta_i * cos_t) / (eta_t * cos_i + eta_i * cos_t);
    let r_perp = (eta_i * cos_i - eta_t * cos_t) / (eta_i * cos_i + eta_t * cos_t);
    0.5 * (r_parallel * r_parallel + r_perp * r_perp)
}

#[inline]
fn glossy_normalization(exponent: f32) -> f32 {
    (exponent + 2.0) / (2.0 * PI)
}
