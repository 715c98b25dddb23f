//! End-to-end checks of the BVH, the integrator and the render driver.

use lux_core::{Color, Mesh, Texture};
use lux_math::{sampling, Frame, Interval, Mat4, Quat, Ray, Vec3};
use lux_renderer::{
    power_heuristic, Background, Intersector, Material, PathIntegrator, PerspectiveCamera,
    Primitive, PrimitiveId, Quad, RenderConfig, Renderer, Scene, SceneBuilder, Sphere,
    SplitMethod, Triangle, Visitor,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;
use std::sync::atomic::AtomicBool;

fn random_unit(rng: &mut StdRng) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let len2 = v.length_squared();
        if len2 > 1e-4 && len2 <= 1.0 {
            return v / len2.sqrt();
        }
    }
}

fn random_transform(rng: &mut StdRng) -> Mat4 {
    let translation = Vec3::new(
        rng.gen_range(-10.0..10.0),
        rng.gen_range(-10.0..10.0),
        rng.gen_range(-10.0..10.0),
    );
    let rotation = Quat::from_axis_angle(random_unit(rng), rng.gen_range(0.0..PI));
    let scale = rng.gen_range(0.3..2.0);
    Mat4::from_scale_rotation_translation(Vec3::splat(scale), rotation, translation)
}

/// A mix of transformed spheres, triangles and quads.
fn random_scene(seed: u64, count: usize, split: SplitMethod) -> (Scene, Vec<PrimitiveId>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = SceneBuilder::new().with_split_method(split);
    let mut ids = Vec::with_capacity(count);

    for i in 0..count {
        let transform = random_transform(&mut rng);
        let prim = match i % 3 {
            0 => Primitive::new(Sphere::new(rng.gen_range(0.2..1.5)), Material::default()),
            1 => Primitive::new(
                Triangle::new(
                    random_unit(&mut rng) * 2.0,
                    random_unit(&mut rng) * 2.0,
                    random_unit(&mut rng) * 2.0,
                ),
                Material::default(),
            ),
            _ => Primitive::new(
                Quad::new(rng.gen_range(0.5..3.0), rng.gen_range(0.5..3.0)),
                Material::default(),
            ),
        };
        ids.push(builder.add(prim.with_transform(transform)));
    }

    (builder.build().unwrap(), ids)
}

fn random_ray(rng: &mut StdRng) -> Ray {
    let origin = Vec3::new(
        rng.gen_range(-15.0..15.0),
        rng.gen_range(-15.0..15.0),
        rng.gen_range(-15.0..15.0),
    );
    // Aim near the middle of the scene so most rays hit something.
    let target = Vec3::new(
        rng.gen_range(-8.0..8.0),
        rng.gen_range(-8.0..8.0),
        rng.gen_range(-8.0..8.0),
    );
    Ray::new(origin, (target - origin).normalize())
}

/// Linear scan over every primitive.
fn brute_force(scene: &Scene, ids: &[PrimitiveId], ray: Ray, ray_t: Interval) -> Option<(PrimitiveId, f32)> {
    let mut query = Intersector::new(ray, ray_t);
    for &id in ids {
        query.intersects(id, scene.primitive(id).unwrap());
    }
    query.compute_intersection().map(|hit| (hit.id(), hit.t()))
}

#[test]
fn closest_hit_matches_brute_force() {
    for split in [SplitMethod::Median, SplitMethod::Sah] {
        let (scene, ids) = random_scene(17, 300, split);
        let mut rng = StdRng::seed_from_u64(99);
        let mut hits = 0;

        for _ in 0..500 {
            let ray = random_ray(&mut rng);
            let full = Interval::new(0.0, f32::INFINITY);
            let expected = brute_force(&scene, &ids, ray, full);
            let actual = scene.try_intersection(&ray, full).unwrap().map(|h| (h.id(), h.t()));
            assert_eq!(actual, expected, "{split:?} ray {ray:?}");

            // Sub-intervals that still contain the closest hit.
            if let Some((_, t)) = expected {
                hits += 1;
                for (lo, hi) in [(0.5 * t, f32::INFINITY), (0.0, t * 1.01), (0.9 * t, 1.1 * t)] {
                    let ray_t = Interval::new(lo, hi);
                    let expected = brute_force(&scene, &ids, ray, ray_t);
                    let actual =
                        scene.try_intersection(&ray, ray_t).unwrap().map(|h| (h.id(), h.t()));
                    assert_eq!(actual, expected, "{split:?} ray {ray:?} in [{lo}, {hi}]");
                }
            }
        }
        assert!(hits > 100, "only {hits} rays hit anything");
    }
}

#[test]
fn any_hit_agrees_with_closest_hit() {
    let (scene, _) = random_scene(5, 200, SplitMethod::Sah);
    let mut rng = StdRng::seed_from_u64(6);

    for _ in 0..1000 {
        let ray = random_ray(&mut rng);
        let lo: f32 = rng.gen_range(0.0..10.0);
        let ray_t = Interval::new(lo, lo + rng.gen_range(0.1..30.0));

        let any = scene.try_occluded(&ray, ray_t, None).unwrap();
        let closest = scene.try_intersection(&ray, ray_t).unwrap();
        assert_eq!(any, closest.is_some(), "ray {ray:?} in {ray_t:?}");
    }
}

/// Wraps an intersector and checks that its `t_max` never grows.
struct MonotonicCheck<'s> {
    inner: Intersector<'s>,
    last_t_max: f32,
    visits: usize,
}

impl<'s> Visitor<'s> for MonotonicCheck<'s> {
    fn ray(&self) -> &Ray {
        self.inner.ray()
    }

    fn interval(&self) -> Interval {
        self.inner.interval()
    }

    fn visit(&mut self, id: PrimitiveId, primitive: &'s Primitive) -> bool {
        let accepted = self.inner.visit(id, primitive);
        let t_max = self.inner.t_max();
        assert!(t_max <= self.last_t_max, "t_max grew from {} to {t_max}", self.last_t_max);
        if accepted {
            assert!(t_max < self.last_t_max);
        }
        self.last_t_max = t_max;
        self.visits += 1;
        accepted
    }
}

#[test]
fn t_max_shrinks_monotonically() {
    let (scene, _) = random_scene(23, 300, SplitMethod::Sah);
    let mut rng = StdRng::seed_from_u64(24);
    let mut visits = 0;

    for _ in 0..300 {
        let ray = random_ray(&mut rng);
        let mut check = MonotonicCheck {
            inner: Intersector::new(ray, Interval::new(0.0, f32::INFINITY)),
            last_t_max: f32::INFINITY,
            visits: 0,
        };
        scene.bvh().all_candidates(scene.primitives(), &mut check).unwrap();
        visits += check.visits;
    }
    // The BVH culls most of the scene.
    assert!(visits < 300 * 300 / 4, "{visits} visits");
}

#[test]
fn primitive_transforms_round_trip() {
    let mut rng = StdRng::seed_from_u64(31);
    for _ in 0..50 {
        let mut prim = Primitive::new(Sphere::new(1.0), Material::default())
            .with_transform(random_transform(&mut rng));
        for _ in 0..20 {
            let p = Vec3::new(
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
            );
            let back = prim
                .world_to_object()
                .transform_point3(prim.object_to_world().transform_point3(p));
            assert!((back - p).length() < 1e-3 * (1.0 + p.length()), "{p} -> {back}");
        }

        // Replacing one matrix keeps the pair consistent.
        let world_to_object = random_transform(&mut rng);
        prim.set_world_to_object(world_to_object);
        let p = Vec3::new(1.0, -2.0, 0.5);
        let back = prim
            .object_to_world()
            .transform_point3(prim.world_to_object().transform_point3(p));
        assert!((back - p).length() < 1e-3);
    }
}

#[test]
fn scattering_is_non_negative() {
    let materials = [
        Material::default(),
        Material::mirror(Color::splat(0.9)),
        Material::glass(1.5),
        Material::glossy(Color::new(0.9, 0.6, 0.3), 40.0),
        Material::plastic(Color::new(0.2, 0.4, 0.8), Color::splat(0.04), 200.0),
    ];
    let mut rng = StdRng::seed_from_u64(77);

    for material in &materials {
        for _ in 0..2000 {
            let normal = random_unit(&mut rng);
            let frame = Frame::from_normal(normal);
            let wo = random_unit(&mut rng);
            let wi = random_unit(&mut rng);

            let Some(selected) = material.select(wo, normal, Color::ONE, rng.gen()) else {
                continue;
            };
            assert!(selected.weight > 0.0 && selected.weight <= 1.0);

            let eval = selected.bxdf.evaluate(wo, normal, wi);
            assert!(eval.f.min_element() >= 0.0 && eval.pdf >= 0.0, "{material:?}: {eval:?}");

            if let Some(sample) = selected.bxdf.sample(wo, normal, &frame, rng.gen(), rng.gen()) {
                assert!(sample.is_valid(), "{material:?}: {sample:?}");
                assert!(sample.f.min_element() >= 0.0, "{material:?}: {sample:?}");
            }
        }
    }
}

#[test]
fn mis_weights_are_normalised() {
    let mut rng = StdRng::seed_from_u64(8);
    for _ in 0..1000 {
        let a: f32 = rng.gen_range(1e-4..1e4);
        let b: f32 = rng.gen_range(1e-4..1e4);
        let sum = power_heuristic(a, b, 2.0) + power_heuristic(b, a, 2.0);
        assert!((sum - 1.0).abs() < 1e-5, "a={a} b={b}");
    }
}

/// A small bright sphere light straight above a diffuse sphere. The
/// radiance leaving the top of the diffuse sphere is
/// `albedo / pi * Le * pi * sin^2(theta_max) = albedo * Le * r^2 / d^2`.
#[test]
fn diffuse_sphere_under_point_like_light() {
    let albedo = 0.5;
    let light_radius: f32 = 0.1;
    let distance: f32 = 4.0;
    let le = 1600.0;

    let mut builder = Scene::builder();
    builder.add(Primitive::new(Sphere::new(1.0), Material::diffuse(Color::splat(albedo))));
    builder.add(
        Primitive::new(Sphere::new(light_radius), Material::Absorbing)
            .with_transform(Mat4::from_translation(Vec3::new(0.0, 1.0 + distance, 0.0)))
            .with_emission(Color::splat(le)),
    );
    let scene = builder.build().unwrap();

    let integrator = PathIntegrator::default();
    let ray = Ray::new(Vec3::new(0.0, 3.0, 0.0), -Vec3::Y);
    let mut rng = StdRng::seed_from_u64(2024);

    let n = 4096;
    let mut sum = Color::ZERO;
    for _ in 0..n {
        sum += integrator.radiance(&scene, &ray, &mut rng);
    }
    let mean = sum / n as f32;

    let expected = albedo * le * light_radius * light_radius / (distance * distance);
    assert!((expected - 0.5).abs() < 1e-6);
    for c in mean.to_array() {
        assert!((c - expected).abs() < 0.02 * expected, "mean {mean}, expected {expected}");
    }
}

#[test]
fn diffuse_sphere_in_white_furnace_reflects_its_albedo() {
    let albedo = 0.5;
    let mut builder = Scene::builder().with_background(Background::constant(Color::ONE));
    builder.add(Primitive::new(Sphere::new(1.0), Material::diffuse(Color::splat(albedo))));
    let scene = builder.build().unwrap();
    assert_eq!(scene.lights().len(), 1);
    assert!(scene.lights()[0].is_environment());

    let ray = Ray::new(Vec3::new(0.3, 0.2, 3.0), -Vec3::Z);
    for mis_exponent in [1.0, 2.0] {
        let integrator = PathIntegrator::from_config(&RenderConfig {
            mis_exponent,
            ..Default::default()
        });
        let mut rng = StdRng::seed_from_u64(77);

        let n = 4096;
        let mut sum = Color::ZERO;
        for _ in 0..n {
            sum += integrator.radiance(&scene, &ray, &mut rng);
        }
        let mean = sum / n as f32;
        for c in mean.to_array() {
            assert!((c - albedo).abs() < 0.02 * albedo, "beta {mis_exponent}: mean {mean}");
        }
    }
}

/// Direct light at the origin of an upward-facing plate from a square light
/// `2 * half` wide, facing down at `height`, by uniform hemisphere sampling.
fn hemisphere_reference(
    material: &Material,
    wo: Vec3,
    half: f32,
    height: f32,
    le: f32,
    n: usize,
    rng: &mut StdRng,
) -> Color {
    // Every lobe of the material; their reflectances add up.
    let lobes: Vec<_> = [0.0, 0.9999]
        .iter()
        .filter_map(|&u| material.select(wo, Vec3::Y, Color::ONE, u))
        .collect();

    let mut sum = Color::ZERO;
    for _ in 0..n {
        let mut wi = sampling::uniform_sphere(rng.gen(), rng.gen());
        wi.y = wi.y.abs();
        if wi.y <= 0.0 {
            continue;
        }
        let p = wi * (height / wi.y);
        if p.x.abs() > half || p.z.abs() > half {
            continue;
        }
        let f: Color = lobes
            .iter()
            .map(|lobe| lobe.bxdf.evaluate(wo, Vec3::Y, wi).f)
            .sum();
        sum += f * le * wi.y * (2.0 * PI);
    }
    sum / n as f32
}

#[test]
fn plastic_plate_under_quad_light_matches_hemisphere_reference() {
    let material = Material::plastic(Color::splat(0.5), Color::splat(0.3), 20.0);
    let (half, height, le) = (0.5, 2.0, 5.0);

    let mut builder = Scene::builder();
    builder.add(
        Primitive::new(Quad::new(4.0, 4.0), material.clone())
            .with_transform(Mat4::from_rotation_x(-PI / 2.0)),
    );
    builder.add(
        Primitive::new(Quad::new(2.0 * half, 2.0 * half), Material::Absorbing)
            .with_transform(
                Mat4::from_translation(Vec3::new(0.0, height, 0.0)) * Mat4::from_rotation_x(PI / 2.0),
            )
            .with_emission(Color::splat(le)),
    );
    let scene = builder.build().unwrap();

    // The mirror direction of `wo` lands on the light, so the glossy lobe matters.
    let wo = Vec3::new(-0.2, 1.0, 0.0).normalize();
    let ray = Ray::new(wo * 1.5, -wo);

    let mut rng = StdRng::seed_from_u64(5);
    let reference = hemisphere_reference(&material, wo, half, height, le, 2_000_000, &mut rng);

    let integrator = PathIntegrator::default();
    let n = 16_384;
    let mut sum = Color::ZERO;
    for _ in 0..n {
        sum += integrator.radiance(&scene, &ray, &mut rng);
    }
    let mean = sum / n as f32;

    assert!(reference.x > 0.1, "reference {reference}");
    for (c, r) in mean.to_array().into_iter().zip(reference.to_array()) {
        assert!((c - r).abs() < 0.03 * r, "mean {mean}, reference {reference}");
    }
}

#[test]
fn single_bounce_returns_emission_only() {
    let emission = Color::new(0.7, 1.3, 2.9);

    let mut builder = Scene::builder().with_background(Background::constant(Color::splat(5.0)));
    builder.add(
        Primitive::new(Sphere::new(1.0), Material::default())
            .with_transform(Mat4::from_translation(Vec3::new(0.0, 0.0, -4.0)))
            .with_emission(emission),
    );
    builder.add(
        Primitive::new(Quad::new(4.0, 4.0), Material::Absorbing)
            .with_transform(
                Mat4::from_translation(Vec3::new(0.0, 4.0, -4.0)) * Mat4::from_rotation_x(PI / 2.0),
            )
            .with_emission(Color::splat(50.0)),
    );
    let scene = builder.build().unwrap();
    assert_eq!(scene.lights().len(), 3);

    let integrator = PathIntegrator::from_config(&RenderConfig {
        max_bounces: 1,
        min_bounces: 0,
        ..Default::default()
    });
    let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..16 {
        assert_eq!(integrator.radiance(&scene, &ray, &mut rng), emission);
    }
}

#[test]
fn textured_emission_and_albedo() {
    let checker = Texture::Checker {
        even: Vec3::ONE,
        odd: Vec3::ZERO,
        scale: 2.0,
    };
    let mut builder = Scene::builder();
    builder.add(
        Primitive::new(Quad::new(2.0, 2.0), Material::default())
            .with_transform(Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0)))
            .with_emission(checker)
            .with_emission_strength(3.0),
    );
    let scene = builder.build().unwrap();
    let integrator = PathIntegrator::from_config(&RenderConfig {
        max_bounces: 1,
        ..Default::default()
    });
    let mut rng = StdRng::seed_from_u64(4);

    let lit = Ray::new(Vec3::new(-0.75, -0.75, 0.0), -Vec3::Z);
    let dark = Ray::new(Vec3::new(0.25, -0.75, 0.0), -Vec3::Z);
    assert_eq!(integrator.radiance(&scene, &lit, &mut rng), Color::splat(3.0));
    assert_eq!(integrator.radiance(&scene, &dark, &mut rng), Color::ZERO);
}

fn demo_scene() -> Scene {
    let mut builder = Scene::builder().with_background(Background::sky());

    builder.add(
        Primitive::new(Quad::new(20.0, 20.0), Material::diffuse(Color::splat(0.7)))
            .with_transform(Mat4::from_rotation_x(-PI / 2.0)),
    );
    builder.add(
        Primitive::new(Sphere::new(1.0), Material::glass(1.5))
            .with_transform(Mat4::from_translation(Vec3::new(-2.2, 1.0, 0.0))),
    );
    builder.add(
        Primitive::new(
            Sphere::new(1.0),
            Material::plastic(Color::new(0.8, 0.2, 0.1), Color::splat(0.04), 100.0),
        )
        .with_transform(Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0))),
    );
    builder.add(
        Primitive::new(Sphere::new(1.0), Material::mirror(Color::splat(0.9)))
            .with_transform(Mat4::from_translation(Vec3::new(2.2, 1.0, 0.0))),
    );
    builder.add(
        Primitive::new(Quad::new(2.0, 2.0), Material::Absorbing)
            .with_transform(
                Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0)) * Mat4::from_rotation_x(PI / 2.0),
            )
            .with_emission(Color::splat(8.0)),
    );

    let tetra = Mesh::new(
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.5, 0.0, 0.9),
            Vec3::new(0.5, 0.8, 0.3),
        ],
        vec![0, 2, 1, 0, 1, 3, 1, 2, 3, 2, 0, 3],
        None,
    );
    builder.add_mesh(
        &tetra,
        Material::glossy(Color::new(0.9, 0.8, 0.5), 50.0),
        Mat4::from_translation(Vec3::new(-0.5, 0.0, 2.0)),
    );

    builder.build().unwrap()
}

#[test]
fn full_render_is_finite_and_lit() {
    let scene = demo_scene();
    let config = RenderConfig {
        width: 32,
        height: 24,
        passes: 2,
        bucket_size: 8,
        seed: 42,
        ..Default::default()
    };
    let camera = PerspectiveCamera::new()
        .with_resolution(config.width, config.height)
        .with_position(Vec3::new(0.0, 2.0, 8.0), Vec3::new(0.0, 1.0, 0.0), Vec3::Y)
        .with_lens(40.0, 0.0, 8.0);

    let renderer = Renderer::new(&scene, &camera, config).unwrap();
    let mut film = renderer.create_film();
    let stats = renderer
        .render(&mut film, &AtomicBool::new(false), |_, _| {})
        .unwrap();

    assert_eq!(stats.passes_completed, 2);
    assert_eq!(stats.samples, 2 * 32 * 24);

    let pixels = film.resolve();
    assert!(pixels
        .iter()
        .all(|c| c.is_finite() && c.min_element() > -1e-3));
    let mean = pixels.iter().copied().sum::<Color>() / pixels.len() as f32;
    assert!(mean.max_element() > 0.05, "image too dark: {mean}");

    let bytes = film.to_rgba8(1.0);
    assert_eq!(bytes.len(), 32 * 24 * 4);
}
