//! `lux` - render the demo scene to a PNG.
//!
//! Usage: lux [--config render.json] [--output out.png] [--passes N]
//!            [--size WxH] [--seed N] [--fisheye] [--floor-texture img.png]

use anyhow::{bail, Context, Result};
use lux_core::{Color, ColorSpace, Mesh, Texture, TextureCache};
use lux_math::{Mat4, Vec3};
use lux_renderer::{
    Background, Camera, FisheyeCamera, Film, Material, PerspectiveCamera, Primitive, Quad,
    RenderConfig, Renderer, Scene, Sphere,
};
use std::env;
use std::f32::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

struct Args {
    config: Option<PathBuf>,
    output: PathBuf,
    passes: Option<u32>,
    size: Option<(u32, u32)>,
    seed: Option<u64>,
    fisheye: bool,
    floor_texture: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        output: PathBuf::from("lux.png"),
        passes: None,
        size: None,
        seed: None,
        fisheye: false,
        floor_texture: None,
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .with_context(|| format!("{name} needs a value"))
        };
        match arg.as_str() {
            "--config" => args.config = Some(PathBuf::from(value("--config")?)),
            "--output" | "-o" => args.output = PathBuf::from(value("--output")?),
            "--passes" => {
                args.passes = Some(value("--passes")?.parse().context("invalid --passes")?)
            }
            "--seed" => args.seed = Some(value("--seed")?.parse().context("invalid --seed")?),
            "--size" => args.size = Some(parse_size(&value("--size")?)?),
            "--fisheye" => args.fisheye = true,
            "--floor-texture" => args.floor_texture = Some(value("--floor-texture")?),
            "--help" | "-h" => {
                println!(
                    "Usage: lux [--config render.json] [--output out.png] [--passes N] \
                     [--size WxH] [--seed N] [--fisheye] [--floor-texture img.png]"
                );
                std::process::exit(0);
            }
            other => bail!("unknown argument: {other}"),
        }
    }

    Ok(args)
}

fn parse_size(s: &str) -> Result<(u32, u32)> {
    let (w, h) = s
        .split_once('x')
        .with_context(|| format!("size must look like 640x360, got {s}"))?;
    Ok((
        w.parse().context("invalid width")?,
        h.parse().context("invalid height")?,
    ))
}

fn load_config(args: &Args) -> Result<RenderConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => RenderConfig::default(),
    };

    if let Some(passes) = args.passes {
        config.passes = passes;
    }
    if let Some((width, height)) = args.size {
        config.width = width;
        config.height = height;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

/// Three spheres, a small mesh and a quad light over a checkered floor.
///
/// `floor_texture` replaces the checker pattern with an sRGB image.
fn build_scene(floor_texture: Option<&str>) -> Result<Scene> {
    let mut builder = Scene::builder().with_background(Background::sky());

    let floor_albedo = match floor_texture {
        Some(path) => TextureCache::new()
            .load(path, ColorSpace::Srgb)
            .with_context(|| format!("loading floor texture {path}"))?,
        None => Texture::Checker {
            even: Vec3::ONE,
            odd: Vec3::splat(0.3),
            scale: 20.0,
        },
    };

    builder.add(
        Primitive::new(Quad::new(40.0, 40.0), Material::diffuse(Color::splat(0.8)))
            .with_transform(Mat4::from_rotation_x(-PI / 2.0))
            .with_albedo(floor_albedo),
    );
    builder.add(
        Primitive::new(Sphere::new(1.0), Material::glass(1.5))
            .with_transform(Mat4::from_translation(Vec3::new(-2.2, 1.0, 0.0))),
    );
    builder.add(
        Primitive::new(
            Sphere::new(1.0),
            Material::plastic(Color::new(0.8, 0.15, 0.1), Color::splat(0.05), 200.0),
        )
        .with_transform(Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0))),
    );
    builder.add(
        Primitive::new(Sphere::new(1.0), Material::glossy(Color::new(0.95, 0.8, 0.5), 80.0))
            .with_transform(Mat4::from_translation(Vec3::new(2.2, 1.0, 0.0))),
    );
    builder.add(
        Primitive::new(Quad::new(3.0, 3.0), Material::Absorbing)
            .with_transform(
                Mat4::from_translation(Vec3::new(0.0, 6.0, 1.0)) * Mat4::from_rotation_x(PI / 2.0),
            )
            .with_emission(Color::new(1.0, 0.9, 0.8))
            .with_emission_strength(6.0),
    );

    let pyramid = Mesh::new(
        vec![
            Vec3::new(-0.5, 0.0, -0.5),
            Vec3::new(0.5, 0.0, -0.5),
            Vec3::new(0.5, 0.0, 0.5),
            Vec3::new(-0.5, 0.0, 0.5),
            Vec3::new(0.0, 0.9, 0.0),
        ],
        vec![0, 4, 1, 1, 4, 2, 2, 4, 3, 3, 4, 0],
        None,
    );
    builder.add_mesh(
        &pyramid,
        Material::mirror(Color::splat(0.9)),
        Mat4::from_translation(Vec3::new(0.8, 0.0, 2.2)) * Mat4::from_rotation_y(PI / 5.0),
    );

    Ok(builder.build()?)
}

fn build_camera(config: &RenderConfig, fisheye: bool) -> Box<dyn Camera> {
    let look_from = Vec3::new(0.0, 2.5, 8.0);
    let look_at = Vec3::new(0.0, 0.8, 0.0);
    if fisheye {
        Box::new(
            FisheyeCamera::new(look_from, look_at, Vec3::Y, 150.0)
                .with_resolution(config.width, config.height),
        )
    } else {
        Box::new(
            PerspectiveCamera::new()
                .with_resolution(config.width, config.height)
                .with_position(look_from, look_at, Vec3::Y)
                .with_lens(35.0, 0.4, (look_at - look_from).length()),
        )
    }
}

fn save_png(film: &Film, exposure: f32, path: &Path) -> Result<()> {
    let bytes = film.to_rgba8(exposure);
    let image = image::RgbaImage::from_raw(film.width(), film.height(), bytes)
        .context("film size does not match its pixel buffer")?;
    image
        .save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = parse_args()?;
    let config = load_config(&args)?;
    log::info!(
        "Rendering {}x{}, {} passes, up to {} bounces",
        config.width,
        config.height,
        config.passes,
        config.max_bounces
    );

    let scene = build_scene(args.floor_texture.as_deref())?;
    let camera = build_camera(&config, args.fisheye);
    let exposure = config.exposure;

    let renderer = Renderer::new(&scene, camera.as_ref(), config)?;
    let mut film = renderer.create_film();
    let cancel = AtomicBool::new(false);

    let stats = renderer.render(&mut film, &cancel, |pass, _| {
        log::debug!("Pass {} accumulated", pass + 1);
    })?;

    save_png(&film, exposure, &args.output)?;
    log::info!(
        "Wrote {} ({} passes, {} samples in {:.2?})",
        args.output.display(),
        stats.passes_completed,
        stats.samples,
        stats.elapsed
    );

    Ok(())
}
