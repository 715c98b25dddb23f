//! Scene assembly and ray queries.
//!
//! A [`SceneBuilder`] collects primitives and a background; [`SceneBuilder::build`]
//! checks them, builds the BVH and derives the light list. The resulting
//! [`Scene`] is immutable and shared read-only by all render threads. To
//! edit a built scene, turn it back into a builder and rebuild.

use crate::background::Background;
use crate::bvh::{BuildError, Bvh, SplitMethod, TraceError};
use crate::intersector::Intersection;
use crate::light::Light;
use crate::material::Material;
use crate::primitive::{Primitive, PrimitiveId};
use crate::triangle::Triangle;
use lux_core::Mesh;
use lux_math::{Aabb, Interval, Mat4, Ray};
use thiserror::Error;

/// Errors raised while assembling a scene.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("primitive {primitive} has a non-invertible or inconsistent transform")]
    InvalidTransform { primitive: PrimitiveId },
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Collects primitives before a scene is built.
#[derive(Debug, Clone, Default)]
pub struct SceneBuilder {
    primitives: Vec<Primitive>,
    background: Background,
    split_method: SplitMethod,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a primitive; the returned id stays valid in the built scene.
    pub fn add(&mut self, primitive: Primitive) -> PrimitiveId {
        let id = PrimitiveId::new(self.primitives.len());
        self.primitives.push(primitive);
        id
    }

    /// Add every triangle of a mesh as its own primitive.
    pub fn add_mesh(
        &mut self,
        mesh: &Mesh,
        material: Material,
        object_to_world: Mat4,
    ) -> Vec<PrimitiveId> {
        let triangles = mesh.triangles();
        log::debug!("Adding mesh with {} triangles", triangles.len());

        triangles
            .into_iter()
            .map(|tri| {
                self.add(
                    Primitive::new(Triangle::from(tri), material.clone())
                        .with_transform(object_to_world),
                )
            })
            .collect()
    }

    pub fn primitive_mut(&mut self, id: PrimitiveId) -> Option<&mut Primitive> {
        self.primitives.get_mut(id.index())
    }

    pub fn set_background(&mut self, background: Background) {
        self.background = background;
    }

    pub fn with_background(mut self, background: Background) -> Self {
        self.background = background;
        self
    }

    pub fn with_split_method(mut self, method: SplitMethod) -> Self {
        self.split_method = method;
        self
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Check every primitive, build the BVH and collect the lights.
    pub fn build(self) -> SceneResult<Scene> {
        let mut bounds = Vec::with_capacity(self.primitives.len());
        for (index, prim) in self.primitives.iter().enumerate() {
            if !prim.has_valid_transform() {
                return Err(SceneError::InvalidTransform {
                    primitive: PrimitiveId::new(index),
                });
            }
            let world_bounds = prim.world_bounds();
            if !world_bounds.is_finite() {
                log::warn!(
                    "Primitive #{} ({}) has non-finite bounds",
                    index,
                    prim.shape().kind_name()
                );
            }
            bounds.push(world_bounds);
        }

        let bvh = Bvh::build(&bounds, self.split_method)?;
        if cfg!(debug_assertions) {
            bvh.validate(&bounds)?;
        }

        let mut lights: Vec<Light> = self
            .primitives
            .iter()
            .enumerate()
            .filter(|(_, prim)| prim.is_emissive())
            .map(|(index, _)| Light::Area {
                primitive: PrimitiveId::new(index),
            })
            .collect();
        if !self.background.is_black() {
            lights.push(Light::Environment);
        }

        log::info!(
            "Scene built: {} primitives, {} lights",
            self.primitives.len(),
            lights.len()
        );

        Ok(Scene {
            primitives: self.primitives,
            lights,
            background: self.background,
            bvh,
            split_method: self.split_method,
        })
    }
}

/// An immutable, renderable scene.
#[derive(Debug, Clone)]
pub struct Scene {
    primitives: Vec<Primitive>,
    lights: Vec<Light>,
    background: Background,
    bvh: Bvh,
    split_method: SplitMethod,
}

impl Scene {
    pub fn builder() -> SceneBuilder {
        SceneBuilder::new()
    }

    /// Give the primitives back for editing; rebuild to render again.
    pub fn into_builder(self) -> SceneBuilder {
        SceneBuilder {
            primitives: self.primitives,
            background: self.background,
            split_method: self.split_method,
        }
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn primitive(&self, id: PrimitiveId) -> Option<&Primitive> {
        self.primitives.get(id.index())
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    pub fn bounds(&self) -> Aabb {
        self.bvh.bounds()
    }

    /// Closest hit within `ray_t`, or an error if the BVH is malformed.
    pub fn try_intersection(
        &self,
        ray: &Ray,
        ray_t: Interval,
    ) -> Result<Option<Intersection<'_>>, TraceError> {
        self.bvh.closest_hit(&self.primitives, *ray, ray_t)
    }

    /// Closest hit within `ray_t`.
    ///
    /// A malformed BVH is logged and reported as a miss.
    pub fn intersection(&self, ray: &Ray, ray_t: Interval) -> Option<Intersection<'_>> {
        self.try_intersection(ray, ray_t).unwrap_or_else(|err| {
            log::error!("Intersection query failed: {err}");
            None
        })
    }

    /// True if anything other than `ignore` lies within `ray_t`.
    pub fn try_occluded(
        &self,
        ray: &Ray,
        ray_t: Interval,
        ignore: Option<PrimitiveId>,
    ) -> Result<bool, TraceError> {
        self.bvh.any_hit(&self.primitives, *ray, ray_t, ignore)
    }

    /// True if anything lies within `ray_t`.
    pub fn intersects(&self, ray: &Ray, ray_t: Interval) -> bool {
        self.try_occluded(ray, ray_t, None).unwrap_or_else(|err| {
            log::error!("Occlusion query failed: {err}");
            false
        })
    }
}
