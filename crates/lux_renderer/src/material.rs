//! Surface materials.
//!
//! A material does not scatter light itself: at each hit it picks one of
//! its lobes and reports the probability of that pick. The integrator
//! divides the lobe's contribution by that weight.

use crate::bxdf::{fresnel_dielectric, Bxdf};
use lux_core::color::luminance;
use lux_core::Color;
use lux_math::Vec3;

/// A lobe chosen by [`Material::select`] and the probability it was chosen with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectedBxdf {
    pub bxdf: Bxdf,
    /// Selection probability in (0, 1]
    pub weight: f32,
}

/// The closed set of surface materials.
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    /// Lambertian diffuse reflector
    Diffuse { albedo: Color },
    /// Perfect mirror
    Mirror { reflectance: Color },
    /// Smooth dielectric; reflects or refracts by the Fresnel term
    Glass { tint: Color, ior: f32 },
    /// Modified-Phong glossy reflector
    Glossy { specular: Color, exponent: f32 },
    /// Diffuse base under a glossy coat
    Plastic {
        diffuse: Color,
        specular: Color,
        exponent: f32,
    },
    /// Absorbs everything; typical for light sources
    Absorbing,
}

impl Default for Material {
    fn default() -> Self {
        Material::Diffuse {
            albedo: Color::splat(0.5),
        }
    }
}

impl Material {
    pub fn diffuse(albedo: Color) -> Self {
        Material::Diffuse { albedo }
    }

    pub fn mirror(reflectance: Color) -> Self {
        Material::Mirror { reflectance }
    }

    pub fn glass(ior: f32) -> Self {
        Material::Glass {
            tint: Color::ONE,
            ior,
        }
    }

    pub fn glossy(specular: Color, exponent: f32) -> Self {
        Material::Glossy {
            specular,
            exponent: exponent.max(0.0),
        }
    }

    pub fn plastic(diffuse: Color, specular: Color, exponent: f32) -> Self {
        Material::Plastic {
            diffuse,
            specular,
            exponent: exponent.max(0.0),
        }
    }

    /// Short name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Material::Diffuse { .. } => "diffuse",
            Material::Mirror { .. } => "mirror",
            Material::Glass { .. } => "glass",
            Material::Glossy { .. } => "glossy",
            Material::Plastic { .. } => "plastic",
            Material::Absorbing => "absorbing",
        }
    }

    /// Choose the lobe to use at a hit.
    ///
    /// `tint` is the primitive's albedo texture at the hit and scales the
    /// base colour. `u` is a uniform random number in [0, 1). Returns `None`
    /// when the surface does not scatter.
    pub fn select(&self, wo: Vec3, normal: Vec3, tint: Color, u: f32) -> Option<SelectedBxdf> {
        #[cfg(test)]
        select_calls::record();

        match *self {
            Material::Diffuse { albedo } => Some(SelectedBxdf {
                bxdf: Bxdf::Lambertian {
                    albedo: albedo * tint,
                },
                weight: 1.0,
            }),
            Material::Mirror { reflectance } => Some(SelectedBxdf {
                bxdf: Bxdf::SpecularReflection {
                    reflectance: reflectance * tint,
                },
                weight: 1.0,
            }),
            Material::Glass { tint: glass_tint, ior } => {
                let color = glass_tint * tint;
                let cos_o = wo.dot(normal);
                let (eta_i, eta_t) = if cos_o > 0.0 { (1.0, ior) } else { (ior, 1.0) };
                let fresnel = fresnel_dielectric(cos_o.abs(), eta_i, eta_t);

                if u < fresnel {
                    Some(SelectedBxdf {
                        bxdf: Bxdf::SpecularReflection {
                            reflectance: color * fresnel,
                        },
                        weight: fresnel,
                    })
                } else {
                    Some(SelectedBxdf {
                        bxdf: Bxdf::SpecularTransmission {
                            transmittance: color * (1.0 - fresnel),
                            ior,
                        },
                        weight: 1.0 - fresnel,
                    })
                }
            }
            Material::Glossy { specular, exponent } => Some(SelectedBxdf {
                bxdf: Bxdf::Glossy {
                    specular: specular * tint,
                    exponent,
                },
                weight: 1.0,
            }),
            Material::Plastic {
                diffuse,
                specular,
                exponent,
            } => {
                let diffuse = diffuse * tint;
                let diffuse_lum = luminance(diffuse).max(0.0);
                let specular_lum = luminance(specular).max(0.0);
                let total = diffuse_lum + specular_lum;
                if total <= 0.0 {
                    return None;
                }

                let p_diffuse = diffuse_lum / total;
                if u < p_diffuse {
                    Some(SelectedBxdf {
                        bxdf: Bxdf::Lambertian { albedo: diffuse },
                        weight: p_diffuse,
                    })
                } else {
                    Some(SelectedBxdf {
                        bxdf: Bxdf::Glossy { specular, exponent },
                        weight: 1.0 - p_diffuse,
                    })
                }
            }
            Material::Absorbing => None,
        }
    }
}
