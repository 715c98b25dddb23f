//! lux renderer - CPU path tracing.
//!
//! A Monte Carlo path tracer built around two pieces:
//!
//! - **BVH**: a flat binary tree over primitive bounds answering closest-hit,
//!   any-hit and visitor queries
//! - **Path integrator**: next-event estimation with multiple importance
//!   sampling and Russian roulette
//!
//! Scenes are assembled with a [`SceneBuilder`], rendered pass by pass into
//! a [`Film`] by a [`Renderer`].

mod background;
mod bucket;
mod bvh;
mod bxdf;
mod camera;
mod config;
mod film;
mod integrator;
mod intersector;
mod light;
mod material;
mod primitive;
mod quad;
mod renderer;
mod scene;
mod shape;
mod sphere;
mod triangle;

pub use background::Background;
pub use bucket::{generate_buckets, pixel_seed, render_bucket, Bucket, PassContext};
pub use bvh::{BuildError, Bvh, BvhNode, BvhStats, NodeKind, SplitMethod, TraceError};
pub use bxdf::{fresnel_dielectric, reflect, refract, Bxdf, BxdfEval, BxdfSample};
pub use camera::{Camera, FisheyeCamera, PerspectiveCamera};
pub use config::{ConfigError, RenderConfig};
pub use film::Film;
pub use integrator::{power_heuristic, russian_roulette, PathIntegrator};
pub use intersector::{Intersection, Intersector, Visitor};
pub use light::{Light, LightSample};
pub use material::{Material, SelectedBxdf};
pub use primitive::{Primitive, PrimitiveId, SurfaceInteraction};
pub use quad::Quad;
pub use renderer::{RenderError, RenderStats, Renderer};
pub use scene::{Scene, SceneBuilder, SceneError, SceneResult};
pub use shape::{AreaSample, Shape, SurfaceHit};
pub use sphere::Sphere;
pub use triangle::Triangle;

/// Re-export common math and colour types
pub use lux_core::Color;
pub use lux_math::{Aabb, Interval, Mat4, Ray, Vec2, Vec3};
