//! Scene primitives: a shape placed in the world with a material.

use crate::material::Material;
use crate::shape::{Shape, SurfaceHit};
use lux_core::{Color, Texture};
use lux_math::{Aabb, Frame, Mat4, Mat4Ext, Ray, Vec2, Vec3};

/// Stable handle to a primitive within a scene.
///
/// Lights and the BVH refer to primitives by id; identity comparisons
/// (e.g. "did this ray hit the light I sampled?") compare ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveId(u32);

impl PrimitiveId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for PrimitiveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A shape with a material, textures and an object-to-world transform.
///
/// The forward and inverse transforms are stored together and always
/// updated as a pair.
#[derive(Debug, Clone)]
pub struct Primitive {
    shape: Shape,
    material: Material,
    object_to_world: Mat4,
    world_to_object: Mat4,
    albedo: Texture,
    emission: Texture,
    emission_strength: f32,
    normal_map: Option<Texture>,
}

/// World-space surface data at a hit, derived from an object-space hit.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceInteraction {
    pub point: Vec3,
    /// Geometric normal, outward facing
    pub normal: Vec3,
    /// Shading frame; its normal lies on the same side as `normal`
    pub frame: Frame,
    pub uv: Vec2,
    /// Direction back toward the ray origin, unit length
    pub wo: Vec3,
}

/// Scale of the origin offset used when spawning rays off a surface.
const RAY_OFFSET: f32 = 1e-4;

impl SurfaceInteraction {
    pub fn shading_normal(&self) -> Vec3 {
        self.frame.normal
    }

    /// A point lifted off the surface toward the side `w` points to.
    pub fn offset_origin(&self, w: Vec3) -> Vec3 {
        let scale = RAY_OFFSET * (1.0 + self.point.abs().max_element());
        let offset = self.normal * scale;
        if w.dot(self.normal) >= 0.0 {
            self.point + offset
        } else {
            self.point - offset
        }
    }

    /// A ray leaving the surface in direction `w`.
    pub fn spawn_ray(&self, w: Vec3) -> Ray {
        Ray::new(self.offset_origin(w), w)
    }
}

impl Primitive {
    /// Create a primitive at the origin with default textures.
    pub fn new(shape: impl Into<Shape>, material: Material) -> Self {
        Self {
            shape: shape.into(),
            material,
            object_to_world: Mat4::IDENTITY,
            world_to_object: Mat4::IDENTITY,
            albedo: Texture::default(),
            emission: Texture::constant(Color::ZERO),
            emission_strength: 1.0,
            normal_map: None,
        }
    }

    pub fn with_transform(mut self, object_to_world: Mat4) -> Self {
        self.set_object_to_world(object_to_world);
        self
    }

    pub fn with_albedo(mut self, albedo: Texture) -> Self {
        self.albedo = albedo;
        self
    }

    /// Emitted radiance; any non-black emission makes the primitive a light.
    pub fn with_emission(mut self, emission: impl Into<Texture>) -> Self {
        self.emission = emission.into();
        self
    }

    /// Multiplier applied to the emission texture.
    pub fn with_emission_strength(mut self, strength: f32) -> Self {
        self.emission_strength = strength.max(0.0);
        self
    }

    /// Tangent-space normal map, encoded as `0.5 * n + 0.5`.
    pub fn with_normal_map(mut self, normal_map: Texture) -> Self {
        self.normal_map = Some(normal_map);
        self
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    pub fn albedo(&self) -> &Texture {
        &self.albedo
    }

    pub fn emission(&self) -> &Texture {
        &self.emission
    }

    pub fn object_to_world(&self) -> &Mat4 {
        &self.object_to_world
    }

    pub fn world_to_object(&self) -> &Mat4 {
        &self.world_to_object
    }

    /// Replace the object-to-world transform; the inverse follows.
    pub fn set_object_to_world(&mut self, m: Mat4) {
        self.object_to_world = m;
        self.world_to_object = m.inverse();
    }

    /// Replace the world-to-object transform; the inverse follows.
    pub fn set_world_to_object(&mut self, m: Mat4) {
        self.world_to_object = m;
        self.object_to_world = m.inverse();
    }

    /// True if the stored transforms are finite and invert each other.
    pub fn has_valid_transform(&self) -> bool {
        if !self.object_to_world.is_invertible() {
            return false;
        }
        let product = self.object_to_world * self.world_to_object;
        product.abs_diff_eq(Mat4::IDENTITY, 1e-3)
    }

    pub fn is_emissive(&self) -> bool {
        self.emission_strength > 0.0 && !self.emission.is_black()
    }

    /// World-space bounding box.
    pub fn world_bounds(&self) -> Aabb {
        self.object_to_world.transform_aabb(&self.shape.bounds())
    }

    /// Carry an object-space hit into world space.
    pub fn interaction(&self, hit: &SurfaceHit, ray: &Ray) -> SurfaceInteraction {
        let point = self.object_to_world.transform_point3(hit.point);
        let normal = self.world_to_object.transform_normal3(hit.normal);

        let mut shading_normal = match &self.normal_map {
            Some(map) => {
                let tangent_frame = Frame::from_normal_tangent(hit.shading_normal, hit.dpdu);
                let encoded = map.value(hit.uv);
                let local = (encoded * 2.0 - Vec3::ONE).normalize_or_zero();
                if local == Vec3::ZERO {
                    hit.shading_normal
                } else {
                    tangent_frame.to_world(local)
                }
            }
            None => hit.shading_normal,
        };
        shading_normal = self.world_to_object.transform_normal3(shading_normal);
        if shading_normal.dot(normal) < 0.0 {
            shading_normal = -shading_normal;
        }

        let dpdu = self.object_to_world.transform_vector3(hit.dpdu);
        let frame = Frame::from_normal_tangent(shading_normal, dpdu);

        SurfaceInteraction {
            point,
            normal,
            frame,
            uv: hit.uv,
            wo: -ray.direction().normalize(),
        }
    }

    /// Albedo texture value at a hit.
    pub fn tint(&self, si: &SurfaceInteraction) -> Color {
        self.albedo.value(si.uv)
    }

    /// Radiance emitted from the front face toward `si.wo`.
    pub fn emitted(&self, si: &SurfaceInteraction) -> Color {
        self.emitted_toward(si.normal, si.uv, si.wo)
    }

    /// Radiance leaving a surface point with normal `normal` in direction `w`.
    ///
    /// Emission is one-sided: nothing leaves the back face.
    pub fn emitted_toward(&self, normal: Vec3, uv: Vec2, w: Vec3) -> Color {
        if normal.dot(w) > 0.0 {
            self.emission.value(uv) * self.emission_strength
        } else {
            Color::ZERO
        }
    }

    /// World-space surface area.
    ///
    /// Exact for triangles and quads under any affine transform; spheres
    /// assume uniform scale.
    pub fn world_area(&self) -> f32 {
        let m = &self.object_to_world;
        match &self.shape {
            Shape::Sphere(s) => {
                let r = s.radius() * self.uniform_scale();
                4.0 * std::f32::consts::PI * r * r
            }
            Shape::Triangle(t) => {
                let [v0, v1, v2] = t.vertices().map(|v| m.transform_point3(v));
                0.5 * (v1 - v0).cross(v2 - v0).length()
            }
            Shape::Quad(q) => {
                let (e0, e1) = q.edges();
                m.transform_vector3(e0)
                    .cross(m.transform_vector3(e1))
                    .length()
            }
        }
    }

    /// Scale factor of the transform along its first axis.
    pub(crate) fn uniform_scale(&self) -> f32 {
        self.object_to_world.transform_vector3(Vec3::X).length()
    }
}
