//! Unidirectional path tracing.
//!
//! Each call to [`PathIntegrator::radiance`] walks one random path:
//! intersect, pick a lobe, estimate direct light from every light with
//! multiple importance sampling, then continue along a BSDF sample until
//! the path escapes, is absorbed, hits the bounce limit or loses at
//! Russian roulette.
//!
//! Emission found by the continuation ray is only counted for camera rays
//! and after delta bounces. Everywhere else next-event estimation has
//! already accounted for it.

use crate::bvh::TraceError;
use crate::config::RenderConfig;
use crate::light::Light;
use crate::material::SelectedBxdf;
use crate::primitive::SurfaceInteraction;
use crate::scene::Scene;
use lux_core::Color;
use lux_math::{is_finite_vec3, max_component, Interval, Ray, Vec2};
use rand::{Rng, RngCore};
use thiserror::Error;

/// Shadow rays stop this fraction short of the sampled light point.
const SHADOW_EPSILON: f32 = 1e-3;

/// Why a path stopped before running out of bounces.
#[derive(Debug, Error)]
enum PathError {
    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("non-finite scattering result from a {material} material")]
    NonFinite { material: &'static str },
}

/// Power heuristic weight for a sample drawn with density `pdf_f`, when
/// the other strategy would have drawn it with density `pdf_g`.
///
/// `w(a, b) + w(b, a) == 1` for any positive pair.
pub fn power_heuristic(pdf_f: f32, pdf_g: f32, beta: f32) -> f32 {
    if pdf_f <= 0.0 {
        return 0.0;
    }
    if pdf_g <= 0.0 {
        return 1.0;
    }
    1.0 / (1.0 + (pdf_g / pdf_f).powf(beta))
}

/// Continue a path with probability `max(throughput)`, clamped to 1.
///
/// Returns the reweighted throughput, or `None` if the path is terminated.
/// `u` is uniform in [0, 1).
pub fn russian_roulette(throughput: Color, u: f32) -> Option<Color> {
    let p = max_component(throughput).min(1.0);
    if p <= 0.0 || u >= p {
        None
    } else {
        Some(throughput / p)
    }
}

/// A path tracer with next-event estimation and Russian roulette.
///
/// Holds no scene state; one integrator can serve any number of threads.
#[derive(Debug, Clone, PartialEq)]
pub struct PathIntegrator {
    max_bounces: u32,
    min_bounces: u32,
    samples_per_light: u32,
    mis_exponent: f32,
}

impl Default for PathIntegrator {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

impl PathIntegrator {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            max_bounces: config.max_bounces,
            min_bounces: config.min_bounces,
            samples_per_light: config.samples_per_light.max(1),
            mis_exponent: config.mis_exponent,
        }
    }

    pub fn max_bounces(&self) -> u32 {
        self.max_bounces
    }

    /// Radiance arriving at the origin of `ray` from its direction.
    ///
    /// Never returns a non-finite colour; a corrupt estimate becomes black.
    pub fn radiance(&self, scene: &Scene, ray: &Ray, rng: &mut dyn RngCore) -> Color {
        let mut radiance = Color::ZERO;
        match self.trace_path(scene, *ray, rng, &mut radiance) {
            Ok(()) => {}
            Err(err @ PathError::Trace(_)) => log::error!("Path terminated: {err}"),
            Err(err @ PathError::NonFinite { .. }) => log::warn!("Path terminated: {err}"),
        }

        if is_finite_vec3(radiance) {
            radiance
        } else {
            Color::ZERO
        }
    }

    /// Walk the path, adding into `radiance` as contributions are found.
    ///
    /// On error, `radiance` keeps whatever was gathered before it.
    fn trace_path(
        &self,
        scene: &Scene,
        mut ray: Ray,
        rng: &mut dyn RngCore,
        radiance: &mut Color,
    ) -> Result<(), PathError> {
        let mut throughput = Color::ONE;
        let mut bounces = 0;
        let mut count_emission = true;

        loop {
            let Some(hit) = scene.try_intersection(&ray, Interval::new(0.0, f32::INFINITY))?
            else {
                if count_emission {
                    *radiance += throughput * scene.background().radiance(ray.direction());
                }
                return Ok(());
            };

            let prim = hit.primitive();
            let si = hit.interaction();
            if count_emission {
                *radiance += throughput * prim.emitted(&si);
            }

            bounces += 1;
            if bounces >= self.max_bounces {
                return Ok(());
            }

            let material = prim.material();
            let normal = si.shading_normal();
            let Some(selected) = material.select(si.wo, normal, prim.tint(&si), rng.gen()) else {
                return Ok(());
            };
            let kind = material.kind_name();

            if !selected.bxdf.is_delta() {
                *radiance += throughput * self.sample_lights(scene, &si, &selected, kind, rng)?;
            }

            let Some(sample) = selected.bxdf.sample(si.wo, normal, &si.frame, rng.gen(), rng.gen())
            else {
                return Ok(());
            };
            if !is_finite_vec3(sample.f) || !sample.pdf.is_finite() || !is_finite_vec3(sample.wi) {
                return Err(PathError::NonFinite { material: kind });
            }
            if sample.pdf <= 0.0 {
                return Ok(());
            }

            let cos = sample.wi.dot(normal).abs();
            throughput *= sample.f * cos / (sample.pdf * selected.weight);
            count_emission = sample.is_delta;
            ray = si.spawn_ray(sample.wi);

            if bounces >= self.min_bounces {
                match russian_roulette(throughput, rng.gen()) {
                    Some(t) => throughput = t,
                    None => return Ok(()),
                }
            }
        }
    }

    /// Direct light from every light, `samples_per_light` estimates each.
    fn sample_lights(
        &self,
        scene: &Scene,
        si: &SurfaceInteraction,
        selected: &SelectedBxdf,
        kind: &'static str,
        rng: &mut dyn RngCore,
    ) -> Result<Color, PathError> {
        let mut direct = Color::ZERO;
        for light in scene.lights() {
            let mut sum = Color::ZERO;
            for _ in 0..self.samples_per_light {
                let u_light = Vec2::new(rng.gen(), rng.gen());
                let u_bsdf = Vec2::new(rng.gen(), rng.gen());
                sum += self.estimate_direct(scene, light, si, selected, kind, u_light, u_bsdf)?;
            }
            direct += sum / self.samples_per_light as f32;
        }
        Ok(direct)
    }

    /// One MIS estimate of light from `light`: a light sample plus a BSDF
    /// sample that counts only if it reaches the same light.
    #[allow(clippy::too_many_arguments)]
    fn estimate_direct(
        &self,
        scene: &Scene,
        light: &Light,
        si: &SurfaceInteraction,
        selected: &SelectedBxdf,
        kind: &'static str,
        u_light: Vec2,
        u_bsdf: Vec2,
    ) -> Result<Color, PathError> {
        let bxdf = &selected.bxdf;
        let weight = selected.weight;
        let normal = si.shading_normal();
        let mut direct = Color::ZERO;

        if let Some(ls) = light.sample_li(scene, si.point, u_light) {
            if ls.pdf > 0.0 && ls.radiance != Color::ZERO {
                let eval = bxdf.evaluate(si.wo, normal, ls.wi);
                if !is_finite_vec3(eval.f) || !eval.pdf.is_finite() {
                    return Err(PathError::NonFinite { material: kind });
                }

                let cos = ls.wi.dot(normal).abs();
                if eval.f != Color::ZERO && cos > 0.0 {
                    let max_t = if ls.distance.is_finite() {
                        ls.distance * (1.0 - SHADOW_EPSILON)
                    } else {
                        f32::INFINITY
                    };
                    let shadow = si.spawn_ray(ls.wi);
                    let occluded =
                        scene.try_occluded(&shadow, Interval::new(0.0, max_t), light.primitive())?;
                    if !occluded {
                        let w = power_heuristic(ls.pdf, eval.pdf * weight, self.mis_exponent);
                        direct += eval.f * ls.radiance * cos * w / (ls.pdf * weight);
                    }
                }
            }
        }

        if let Some(bs) = bxdf.sample(si.wo, normal, &si.frame, u_bsdf.x, u_bsdf.y) {
            if !is_finite_vec3(bs.f) || !bs.pdf.is_finite() || !is_finite_vec3(bs.wi) {
                return Err(PathError::NonFinite { material: kind });
            }
            if bs.pdf > 0.0 && !bs.is_delta {
                let light_pdf = light.pdf_li(scene, si.point, bs.wi);
                if light_pdf > 0.0 {
                    let le = self.light_along(scene, light, &si.spawn_ray(bs.wi))?;
                    if le != Color::ZERO {
                        let cos = bs.wi.dot(normal).abs();
                        let w = power_heuristic(bs.pdf * weight, light_pdf, self.mis_exponent);
                        direct += bs.f * le * cos * w / (bs.pdf * weight);
                    }
                }
            }
        }

        Ok(direct)
    }

    /// Radiance from `light` along `ray`, or black if something else is
    /// in the way.
    fn light_along(&self, scene: &Scene, light: &Light, ray: &Ray) -> Result<Color, PathError> {
        let everything = Interval::new(0.0, f32::INFINITY);
        match *light {
            Light::Area { primitive } => match scene.try_intersection(ray, everything)? {
                Some(hit) if hit.id() == primitive => {
                    Ok(hit.primitive().emitted(&hit.interaction()))
                }
                _ => Ok(Color::ZERO),
            },
            Light::Environment => {
                if scene.try_occluded(ray, everything, None)? {
                    Ok(Color::ZERO)
                } else {
                    Ok(light.le(scene, ray.direction()))
                }
            }
        }
    }
}
