//! Per-ray intersection queries.
//!
//! An [`Intersector`] owns one world-space ray and a shrinking `[t_min, t_max]`
//! range. The BVH feeds it candidate primitives through the [`Visitor`]
//! trait; each accepted hit lowers `t_max`, so later candidates only count
//! if they are nearer. The world ray itself is never modified: each test
//! works on a transformed copy.

use crate::primitive::{Primitive, PrimitiveId, SurfaceInteraction};
use crate::shape::SurfaceHit;
use lux_math::{Interval, Ray};

/// Receives candidate primitives during BVH traversal.
pub trait Visitor<'s> {
    /// The world-space ray being traced.
    fn ray(&self) -> &Ray;

    /// Current parametric range; traversal culls nodes outside it.
    fn interval(&self) -> Interval;

    /// Test one candidate. Returns true if it was accepted as a hit.
    fn visit(&mut self, id: PrimitiveId, primitive: &'s Primitive) -> bool;

    /// True once no further candidates can change the outcome.
    fn is_done(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryMode {
    Closest,
    Any,
}

/// The closest (or first accepted) hit found for a ray.
#[derive(Debug, Clone, Copy)]
pub struct Intersection<'s> {
    id: PrimitiveId,
    primitive: &'s Primitive,
    ray: Ray,
    hit: SurfaceHit,
}

impl<'s> Intersection<'s> {
    pub fn id(&self) -> PrimitiveId {
        self.id
    }

    pub fn primitive(&self) -> &'s Primitive {
        self.primitive
    }

    /// Ray parameter of the hit.
    pub fn t(&self) -> f32 {
        self.hit.t
    }

    /// The world-space ray that produced this hit.
    pub fn ray(&self) -> &Ray {
        &self.ray
    }

    /// Object-space surface data.
    pub fn local_hit(&self) -> &SurfaceHit {
        &self.hit
    }

    /// World-space surface data, computed from the primitive's transform.
    pub fn interaction(&self) -> SurfaceInteraction {
        self.primitive.interaction(&self.hit, &self.ray)
    }
}

/// A single ray query against a set of primitives.
#[derive(Debug)]
pub struct Intersector<'s> {
    ray: Ray,
    t_min: f32,
    t_max: f32,
    mode: QueryMode,
    ignore: Option<PrimitiveId>,
    best: Option<(PrimitiveId, &'s Primitive, SurfaceHit)>,
}

impl<'s> Intersector<'s> {
    /// Query for the closest hit within `ray_t`.
    pub fn new(ray: Ray, ray_t: Interval) -> Self {
        Self {
            ray,
            t_min: ray_t.min,
            t_max: ray_t.max,
            mode: QueryMode::Closest,
            ignore: None,
            best: None,
        }
    }

    /// Query that stops at the first hit within `ray_t`.
    pub fn any_hit(ray: Ray, ray_t: Interval) -> Self {
        Self {
            mode: QueryMode::Any,
            ..Self::new(ray, ray_t)
        }
    }

    /// Skip one primitive, e.g. the light a shadow ray is aimed at.
    pub fn ignoring(mut self, id: PrimitiveId) -> Self {
        self.ignore = Some(id);
        self
    }

    pub fn t_max(&self) -> f32 {
        self.t_max
    }

    /// True once any hit has been recorded.
    pub fn found(&self) -> bool {
        self.best.is_some()
    }

    /// Test one primitive, recording it if it is nearer than the current best.
    pub fn intersects(&mut self, id: PrimitiveId, primitive: &'s Primitive) -> bool {
        if self.ignore == Some(id) {
            return false;
        }

        let local_ray = self.ray.transform(primitive.world_to_object());
        let ray_t = Interval::new(self.t_min, self.t_max);
        match primitive.shape().intersect(&local_ray, ray_t) {
            Some(hit) if hit.t < self.t_max => {
                self.t_max = hit.t;
                self.best = Some((id, primitive, hit));
                true
            }
            _ => false,
        }
    }

    /// Resolve the query.
    pub fn compute_intersection(self) -> Option<Intersection<'s>> {
        let ray = self.ray;
        self.best.map(|(id, primitive, hit)| Intersection {
            id,
            primitive,
            ray,
            hit,
        })
    }
}

impl<'s> Visitor<'s> for Intersector<'s> {
    fn ray(&self) -> &Ray {
        &self.ray
    }

    fn interval(&self) -> Interval {
        Interval::new(self.t_min, self.t_max)
    }

    fn visit(&mut self, id: PrimitiveId, primitive: &'s Primitive) -> bool {
        self.intersects(id, primitive)
    }

    fn is_done(&self) -> bool {
        self.mode == QueryMode::Any && self.best.is_some()
    }
}
