//! Multi-pass render driver.
//!
//! Each pass traces one sample per pixel, bucket by bucket in parallel,
//! into a shared [`Film`]. Between passes the caller gets to look at the
//! film and may ask the render to stop.

use crate::bucket::{generate_buckets, render_bucket, Bucket, PassContext};
use crate::camera::Camera;
use crate::config::{ConfigError, RenderConfig};
use crate::film::Film;
use crate::integrator::PathIntegrator;
use crate::scene::Scene;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("film is {actual:?} pixels but the render needs {expected:?}")]
    FilmSizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("camera resolution {actual:?} does not match the configured {expected:?}")]
    CameraSizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Summary of a finished (or cancelled) render.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderStats {
    pub passes_completed: u32,
    /// Camera rays traced across all passes
    pub samples: u64,
    pub elapsed: Duration,
}

/// Renders a scene through a camera.
///
/// The scene and camera are borrowed read-only for the whole render.
pub struct Renderer<'a> {
    scene: &'a Scene,
    camera: &'a dyn Camera,
    config: RenderConfig,
    integrator: PathIntegrator,
    buckets: Vec<Bucket>,
}

impl<'a> Renderer<'a> {
    /// Check the configuration against the camera and prepare buckets.
    pub fn new(
        scene: &'a Scene,
        camera: &'a dyn Camera,
        config: RenderConfig,
    ) -> Result<Self, RenderError> {
        config.validate()?;

        let expected = (config.width, config.height);
        let actual = camera.resolution();
        if actual != expected {
            return Err(RenderError::CameraSizeMismatch { expected, actual });
        }

        let integrator = PathIntegrator::from_config(&config);
        let buckets = generate_buckets(config.width, config.height, config.bucket_size);
        log::debug!(
            "Renderer ready: {}x{}, {} buckets, {} passes",
            config.width,
            config.height,
            buckets.len(),
            config.passes
        );

        Ok(Self {
            scene,
            camera,
            config,
            integrator,
            buckets,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn integrator(&self) -> &PathIntegrator {
        &self.integrator
    }

    /// A film of the right size for this render.
    pub fn create_film(&self) -> Film {
        Film::new(self.config.width, self.config.height)
    }

    /// Clear `film` and run every pass into it.
    ///
    /// `cancel` is checked before each pass; a pass in flight always
    /// finishes. `on_pass` runs after each pass with the pass index and the
    /// film as it stands.
    pub fn render<F>(
        &self,
        film: &mut Film,
        cancel: &AtomicBool,
        mut on_pass: F,
    ) -> Result<RenderStats, RenderError>
    where
        F: FnMut(u32, &Film),
    {
        let expected = (self.config.width, self.config.height);
        let actual = (film.width(), film.height());
        if actual != expected {
            return Err(RenderError::FilmSizeMismatch { expected, actual });
        }

        film.clear();
        let start = Instant::now();
        let mut stats = RenderStats::default();

        for pass in 0..self.config.passes {
            if cancel.load(Ordering::Relaxed) {
                log::info!(
                    "Render cancelled after {} of {} passes",
                    stats.passes_completed,
                    self.config.passes
                );
                break;
            }

            let pass_start = Instant::now();
            let samples = self.render_pass(pass, film);
            stats.passes_completed += 1;
            stats.samples += samples;

            log::info!(
                "Pass {}/{} finished in {:.2?}",
                pass + 1,
                self.config.passes,
                pass_start.elapsed()
            );
            on_pass(pass, film);
        }

        stats.elapsed = start.elapsed();
        Ok(stats)
    }

    /// One sample per pixel, buckets in parallel. Returns rays traced.
    fn render_pass(&self, pass: u32, film: &Film) -> u64 {
        let ctx = PassContext {
            scene: self.scene,
            camera: self.camera,
            integrator: &self.integrator,
            seed: self.config.seed,
            pass,
        };
        self.buckets
            .par_iter()
            .map(|bucket| render_bucket(bucket, &ctx, film))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Background, Material, PerspectiveCamera, Primitive, Sphere};
    use lux_core::Color;
    use lux_math::{Mat4, Vec3};

    fn small_config() -> RenderConfig {
        RenderConfig {
            width: 16,
            height: 8,
            passes: 3,
            bucket_size: 4,
            ..Default::default()
        }
    }

    fn scene() -> Scene {
        let mut builder = Scene::builder().with_background(Background::sky());
        builder.add(
            Primitive::new(Sphere::new(1.0), Material::default())
                .with_transform(Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0))),
        );
        builder.build().unwrap()
    }

    #[test]
    fn test_render_counts_samples() {
        let scene = scene();
        let camera = PerspectiveCamera::new().with_resolution(16, 8);
        let renderer = Renderer::new(&scene, &camera, small_config()).unwrap();
        let mut film = renderer.create_film();

        let mut seen = Vec::new();
        let stats = renderer
            .render(&mut film, &AtomicBool::new(false), |pass, _| seen.push(pass))
            .unwrap();

        assert_eq!(stats.passes_completed, 3);
        assert_eq!(stats.samples, 3 * 16 * 8);
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(film.sample_weight(15, 7), 3.0);
        assert!(film.resolve().iter().all(|c| c.min_element() > -1e-4));
    }

    #[test]
    fn test_render_is_reproducible() {
        let scene = scene();
        let camera = PerspectiveCamera::new().with_resolution(16, 8);
        let renderer = Renderer::new(&scene, &camera, small_config()).unwrap();

        let mut a = renderer.create_film();
        let mut b = renderer.create_film();
        let cancel = AtomicBool::new(false);
        renderer.render(&mut a, &cancel, |_, _| {}).unwrap();
        renderer.render(&mut b, &cancel, |_, _| {}).unwrap();

        let (a, b) = (a.resolve(), b.resolve());
        for (ca, cb) in a.iter().zip(&b) {
            assert!((*ca - *cb).abs().max_element() < 1e-5);
        }
    }

    #[test]
    fn test_cancel_stops_at_pass_boundary() {
        let scene = scene();
        let camera = PerspectiveCamera::new().with_resolution(16, 8);
        let renderer = Renderer::new(&scene, &camera, small_config()).unwrap();
        let mut film = renderer.create_film();
        let cancel = AtomicBool::new(false);

        let stats = renderer
            .render(&mut film, &cancel, |pass, _| {
                if pass == 0 {
                    cancel.store(true, Ordering::Relaxed);
                }
            })
            .unwrap();
        assert_eq!(stats.passes_completed, 1);
        assert_eq!(film.sample_weight(0, 0), 1.0);
    }

    #[test]
    fn test_rejects_invalid_setup() {
        let scene = scene();
        let camera = PerspectiveCamera::new().with_resolution(16, 8);

        let config = RenderConfig {
            passes: 0,
            ..small_config()
        };
        assert!(matches!(
            Renderer::new(&scene, &camera, config),
            Err(RenderError::Config(ConfigError::InvalidArgument(_)))
        ));

        let wrong_camera = PerspectiveCamera::new().with_resolution(8, 8);
        assert!(matches!(
            Renderer::new(&scene, &wrong_camera, small_config()),
            Err(RenderError::CameraSizeMismatch { .. })
        ));

        let renderer = Renderer::new(&scene, &camera, small_config()).unwrap();
        let mut film = Film::new(4, 4);
        let err = renderer
            .render(&mut film, &AtomicBool::new(false), |_, _| {})
            .unwrap_err();
        assert!(matches!(err, RenderError::FilmSizeMismatch { .. }));
    }

    #[test]
    fn test_scene_errors_surface_before_a_renderer_exists() {
        let mut builder = Scene::builder();
        builder.add(Primitive::new(Sphere::new(1.0), Material::default()).with_transform(Mat4::ZERO));
        let err = builder.build().unwrap_err();
        assert!(matches!(err, crate::SceneError::InvalidTransform { .. }));
    }

    #[test]
    fn test_background_only_render() {
        let scene = Scene::builder()
            .with_background(Background::constant(Color::splat(0.25)))
            .build()
            .unwrap();
        let camera = PerspectiveCamera::new().with_resolution(16, 8);
        let renderer = Renderer::new(&scene, &camera, small_config()).unwrap();
        let mut film = renderer.create_film();
        renderer
            .render(&mut film, &AtomicBool::new(false), |_, _| {})
            .unwrap();
        for color in film.resolve() {
            assert!((color - Color::splat(0.25)).abs().max_element() < 1e-4);
        }
    }
}
