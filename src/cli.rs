use std::{
    fs::OpenOptions,
    io::Write as _,
    num::NonZeroU32,
    path::{Path, PathBuf},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use anyhow::Context as _;
use bdpath::{
    Integrator, RenderSettings, RenderedImage, WorkerCount, render,
    scene::demo::{self, Demo},
};
use clap::{Parser, ValueEnum};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SceneArg {
    Spheres,
    Torus,
    Box,
}

impl From<SceneArg> for Demo {
    fn from(scene: SceneArg) -> Demo {
        match scene {
            SceneArg::Spheres => Demo::Spheres,
            SceneArg::Torus => Demo::Torus,
            SceneArg::Box => Demo::Box,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum IntegratorArg {
    Bidirectional,
    Whitted,
}

/// Renders one of the built-in scenes to a PNG file.
#[derive(Debug, Parser)]
struct Args {
    #[arg(long, value_enum, default_value = "spheres")]
    scene: SceneArg,
    #[arg(long, default_value_t = 640)]
    width: u32,
    #[arg(long, default_value_t = 480)]
    height: u32,
    #[arg(long, default_value = "64")]
    samples: NonZeroU32,
    /// Mean number of extra bounces of eye and light subpaths.
    #[arg(long, default_value_t = 2.0)]
    mean_path_length: f32,
    #[arg(long, value_enum, default_value = "bidirectional")]
    integrator: IntegratorArg,
    /// Recursion depth of the Whitted integrator.
    #[arg(long, default_value_t = 5)]
    bounces: u32,
    /// Do not weight connections by the cosine at the emitter.
    #[arg(long)]
    no_cosine_term: bool,
    /// Render on the calling thread only.
    #[arg(long)]
    serial: bool,
    /// Number of worker threads, defaults to the number of CPUs.
    #[arg(long)]
    threads: Option<std::num::NonZeroUsize>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(short, long, default_value = "render.png")]
    output: PathBuf,
    /// Also save surface normals seen through the pixel centers.
    #[arg(long, value_name = "FILE")]
    normals: Option<PathBuf>,
    /// Also save distances to the surfaces, black at MIN and white at MAX.
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    depth: Option<Vec<f32>>,
    #[arg(long, value_name = "FILE", default_value = "depth.png")]
    depth_output: PathBuf,
    /// Append the settings and duration of this run to a log file.
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,
}

fn save(image: &image::RgbImage, path: &Path) -> anyhow::Result<()> {
    image
        .save(path)
        .with_context(|| format!("Saving {}", path.display()))?;
    log::info!("Saved {}", path.display());
    Ok(())
}

fn save_images(args: &Args, image: &RenderedImage) -> anyhow::Result<()> {
    save(&image.to_rgb8(), &args.output)?;
    if let Some(path) = &args.normals
        && let Some(normals) = image.normals_to_rgb8()
    {
        save(&normals, path)?;
    }
    if let Some([min, max]) = args.depth.as_deref()
        && let Some(depth) = image.depth_to_rgb8(*min, *max)
    {
        save(&depth, &args.depth_output)?;
    }
    Ok(())
}

fn append_run_log(
    path: &Path,
    args: &Args,
    started: SystemTime,
    duration: Duration,
) -> anyhow::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Opening log {}", path.display()))?;
    let timestamp = |time: SystemTime| time.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
    writeln!(file, "[start {}]", timestamp(started))?;
    writeln!(file, "{args:#?}")?;
    writeln!(file, "[end {}]", timestamp(started + duration))?;
    writeln!(file, "Total duration: {duration:?}\n")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let scene = demo::build(args.scene.into())?;
    let settings = RenderSettings {
        sample_count: args.samples,
        mean_path_length: args.mean_path_length,
        integrator: match args.integrator {
            IntegratorArg::Bidirectional => Integrator::Bidirectional,
            IntegratorArg::Whitted => Integrator::Whitted {
                bounces: args.bounces,
            },
        },
        cosine_term: !args.no_cosine_term,
        parallel: !args.serial,
        worker_count: args.threads.map_or(WorkerCount::Auto, WorkerCount::Manual),
        seed: args.seed,
        feature_buffers: args.normals.is_some() || args.depth.is_some(),
    };

    let started = SystemTime::now();
    let start = Instant::now();
    let image = render(&scene, args.width, args.height, &settings)?;
    save_images(&args, &image)?;
    let duration = start.elapsed();
    log::info!("Total time {duration:?}");

    if let Some(path) = &args.log {
        append_run_log(path, &args, started, duration)?;
    }
    Ok(())
}
