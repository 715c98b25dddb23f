//! Light sources for next-event estimation.
//!
//! Area lights wrap an emissive primitive by id; the environment light
//! wraps the scene background. Both report solid-angle densities so the
//! integrator can weight them against BSDF sampling.

use crate::intersector::{Intersection, Intersector};
use crate::primitive::{Primitive, PrimitiveId};
use crate::scene::Scene;
use crate::shape::Shape;
use lux_core::Color;
use lux_math::{sampling, Frame, Interval, Mat4Ext, Ray, Vec2, Vec3};

/// Cosines below this are treated as grazing and carry no light.
const GRAZING_COS: f32 = 1e-6;

/// A light sample as seen from a reference point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    /// Unit direction from the reference point toward the light
    pub wi: Vec3,
    /// Distance to the sampled point; infinite for the environment
    pub distance: f32,
    /// Radiance arriving along `-wi`
    pub radiance: Color,
    /// Solid-angle density of `wi`
    pub pdf: f32,
}

/// The closed set of light kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Light {
    /// An emissive primitive.
    Area { primitive: PrimitiveId },
    /// The scene background, sampled uniformly over the sphere.
    Environment,
}

impl Light {
    /// The emitting primitive, for area lights.
    pub fn primitive(&self) -> Option<PrimitiveId> {
        match *self {
            Light::Area { primitive } => Some(primitive),
            Light::Environment => None,
        }
    }

    pub fn is_environment(&self) -> bool {
        matches!(self, Light::Environment)
    }

    /// Sample a direction toward the light from `reference`.
    ///
    /// Returns `None` if no usable sample was drawn (a grazing or
    /// degenerate configuration, or a dangling primitive id).
    pub fn sample_li(&self, scene: &Scene, reference: Vec3, u: Vec2) -> Option<LightSample> {
        match *self {
            Light::Area { primitive: id } => {
                let prim = scene.primitive(id)?;
                match cone_towards_sphere(prim, reference) {
                    Some(cone) => sample_sphere_cone(id, prim, reference, &cone, u),
                    None => sample_surface(prim, reference, u),
                }
            }
            Light::Environment => {
                let wi = sampling::uniform_sphere(u.x, u.y);
                Some(LightSample {
                    wi,
                    distance: f32::INFINITY,
                    radiance: scene.background().radiance(wi),
                    pdf: sampling::uniform_sphere_pdf(),
                })
            }
        }
    }

    /// Density that [`Light::sample_li`] would produce `wi` with.
    ///
    /// `wi` must be unit length. Zero if the light is not in that direction.
    pub fn pdf_li(&self, scene: &Scene, reference: Vec3, wi: Vec3) -> f32 {
        match *self {
            Light::Area { primitive: id } => {
                let Some(prim) = scene.primitive(id) else {
                    return 0.0;
                };
                let Some(hit) = trace_single(id, prim, Ray::new(reference, wi)) else {
                    return 0.0;
                };

                if let Some(cone) = cone_towards_sphere(prim, reference) {
                    return sampling::uniform_cone_pdf(cone.one_minus_cos_max);
                }

                let si = hit.interaction();
                let dist2 = (si.point - reference).length_squared();
                let cos_light = si.normal.dot(wi).abs();
                if cos_light < GRAZING_COS {
                    return 0.0;
                }
                dist2 / (cos_light * prim.world_area())
            }
            Light::Environment => sampling::uniform_sphere_pdf(),
        }
    }

    /// Radiance reaching a ray that escapes the scene along `direction`.
    ///
    /// Area lights are only reached by hitting their primitive, so they
    /// return zero here.
    pub fn le(&self, scene: &Scene, direction: Vec3) -> Color {
        match self {
            Light::Area { .. } => Color::ZERO,
            Light::Environment => scene.background().radiance(direction),
        }
    }
}

struct SphereCone {
    axis: Vec3,
    one_minus_cos_max: f32,
}

/// The cone a spherical primitive subtends from `reference`, or `None` for
/// other shapes, for points inside the sphere and for spheres too small to
/// resolve as a cone (area sampling takes over).
///
/// Assumes the primitive transform scales uniformly.
fn cone_towards_sphere(prim: &Primitive, reference: Vec3) -> Option<SphereCone> {
    let Shape::Sphere(sphere) = prim.shape() else {
        return None;
    };
    let center = prim.object_to_world().transform_point3(Vec3::ZERO);
    let radius = sphere.radius() * prim.uniform_scale();

    let to_center = center - reference;
    let dist2 = to_center.length_squared();
    let radius2 = radius * radius;
    if dist2 <= radius2 * (1.0 + 1e-4) {
        return None;
    }

    let one_minus_cos_max = sampling::one_minus_cos_from_sin2(radius2 / dist2);
    if one_minus_cos_max <= 0.0 {
        return None;
    }
    Some(SphereCone {
        axis: to_center / dist2.sqrt(),
        one_minus_cos_max,
    })
}

fn sample_sphere_cone(
    id: PrimitiveId,
    prim: &Primitive,
    reference: Vec3,
    cone: &SphereCone,
    u: Vec2,
) -> Option<LightSample> {
    let frame = Frame::from_normal(cone.axis);
    let wi = frame.to_world(sampling::uniform_cone(u.x, u.y, cone.one_minus_cos_max));

    // Find the visible point to get its normal and texture coordinates.
    let hit = trace_single(id, prim, Ray::new(reference, wi))?;
    let si = hit.interaction();

    Some(LightSample {
        wi,
        distance: hit.t(),
        radiance: prim.emitted_toward(si.normal, si.uv, -wi),
        pdf: sampling::uniform_cone_pdf(cone.one_minus_cos_max),
    })
}

/// Uniform area sampling converted to solid angle.
fn sample_surface(prim: &Primitive, reference: Vec3, u: Vec2) -> Option<LightSample> {
    let sample = prim.shape().sample_area(u);
    let point = prim.object_to_world().transform_point3(sample.point);
    let normal = prim.world_to_object().transform_normal3(sample.normal);

    let to_light = point - reference;
    let dist2 = to_light.length_squared();
    if dist2 <= 0.0 {
        return None;
    }
    let distance = dist2.sqrt();
    let wi = to_light / distance;

    let cos_light = normal.dot(-wi);
    let area = prim.world_area();
    if cos_light.abs() < GRAZING_COS || area <= 0.0 {
        return None;
    }

    Some(LightSample {
        wi,
        distance,
        radiance: prim.emitted_toward(normal, sample.uv, -wi),
        pdf: dist2 / (cos_light.abs() * area),
    })
}

/// Closest hit of a world ray against one primitive.
fn trace_single(id: PrimitiveId, prim: &Primitive, ray: Ray) -> Option<Intersection<'_>> {
    let mut query = Intersector::new(ray, Interval::new(0.0, f32::INFINITY));
    query.intersects(id, prim);
    query.compute_intersection()
}
