mod bidirectional;
mod subpath;
mod whitted;
mod worker;

use std::{convert::Infallible, num::NonZeroU32, time::Instant};

use image::RgbImage;
use thiserror::Error;

use crate::{
    geometry::{FloatType, ScreenPoint, ScreenSize, WorldVector},
    parallel_for::{ParallelForError, WorkerCount, parallel_for_slice},
    scene::Scene,
    util::{Color, Rgb, Stats, color_to_rgb, rgb_to_image},
};

pub use bidirectional::MisAccumulator;
use worker::{FirstHit, PixelEstimate, Worker};

const DEFAULT_SAMPLE_COUNT: NonZeroU32 = NonZeroU32::new(16).unwrap();

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Integrator {
    /// Eye and light subpaths connected in every combination, combined by multiple
    /// importance sampling.
    #[default]
    Bidirectional,
    /// Recursive mirror and refraction rays with shadow tested direct light.
    Whitted { bounces: u32 },
}

#[derive(Copy, Clone, Debug)]
pub struct RenderSettings {
    pub sample_count: NonZeroU32,
    /// Mean number of extra bounces of a subpath.
    pub mean_path_length: FloatType,
    pub integrator: Integrator,
    /// Weight connections by the cosine at the emitter.
    pub cosine_term: bool,
    pub parallel: bool,
    pub worker_count: WorkerCount,
    /// Fixed seed for reproducible renders, random when None.
    pub seed: Option<u64>,
    /// Also record normal and depth of the surface seen through each pixel center.
    pub feature_buffers: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            sample_count: DEFAULT_SAMPLE_COUNT,
            mean_path_length: 2.0,
            integrator: Integrator::default(),
            cosine_term: true,
            parallel: true,
            worker_count: WorkerCount::Auto,
            seed: None,
            feature_buffers: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Image must not be empty, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },
    #[error("Mean path length must be finite and non-negative, got {0}")]
    InvalidMeanPathLength(FloatType),
    #[error("Failed to start a render thread")]
    Spawn(#[source] std::io::Error),
}

impl From<ParallelForError<Infallible>> for RenderError {
    fn from(error: ParallelForError<Infallible>) -> Self {
        match error {
            ParallelForError::Spawn(source) => RenderError::Spawn(source),
            ParallelForError::Worker(never) => match never {},
        }
    }
}

impl From<ParallelForError<RenderError>> for RenderError {
    fn from(error: ParallelForError<RenderError>) -> Self {
        match error {
            ParallelForError::Spawn(source) => RenderError::Spawn(source),
            ParallelForError::Worker(error) => error,
        }
    }
}

/// Floating point image, rows from top to bottom.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedImage {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
    first_hits: Option<Vec<FirstHit>>,
}

impl RenderedImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Clamped 8 bit version of the image.
    pub fn to_rgb8(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| rgb_to_image(self.pixel(x, y)))
    }

    /// Normal seen through the pixel center, zero for background.
    /// None unless the render recorded feature buffers.
    pub fn normal(&self, x: u32, y: u32) -> Option<WorldVector> {
        self.first_hit(x, y).map(|hit| hit.normal)
    }

    /// Distance along the ray through the pixel center, infinite for background.
    /// None unless the render recorded feature buffers.
    pub fn depth(&self, x: u32, y: u32) -> Option<FloatType> {
        self.first_hit(x, y).map(|hit| hit.depth)
    }

    /// Normals mapped from [-1, 1] to [0, 1] per channel.
    pub fn normals_to_rgb8(&self) -> Option<RgbImage> {
        self.first_hits.as_ref()?;
        Some(self.feature_image(|hit| (hit.normal + Color::repeat(1.0)) / 2.0))
    }

    /// Gray ramp, black at `min` and white at `max` and beyond.
    /// An empty depth range gives a black image.
    pub fn depth_to_rgb8(&self, min: FloatType, max: FloatType) -> Option<RgbImage> {
        self.first_hits.as_ref()?;
        let range = max - min;
        Some(self.feature_image(|hit| {
            if range > 0.0 {
                Color::repeat((hit.depth - min) / range)
            } else {
                Color::zeros()
            }
        }))
    }

    fn first_hit(&self, x: u32, y: u32) -> Option<FirstHit> {
        let hits = self.first_hits.as_ref()?;
        Some(hits[y as usize * self.width as usize + x as usize])
    }

    fn feature_image(&self, f: impl Fn(&FirstHit) -> Color) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let color = self.first_hit(x, y).map_or_else(Color::zeros, |hit| f(&hit));
            rgb_to_image(color_to_rgb(&color))
        })
    }
}

/// Renders the scene from its camera.
/// Rows are split between worker threads and every row is split again by columns.
pub fn render(
    scene: &Scene,
    width: u32,
    height: u32,
    settings: &RenderSettings,
) -> Result<RenderedImage, RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::EmptyImage { width, height });
    }
    let seed = settings.seed.unwrap_or_else(rand::random);
    let worker = Worker::new(scene, settings, ScreenSize::new(width, height), seed)?;

    log::info!(
        "Rendering {width}x{height}, {} samples per pixel, {:?}, seed {seed}",
        settings.sample_count,
        settings.integrator
    );
    let start = Instant::now();

    let mut estimates = vec![PixelEstimate::default(); width as usize * height as usize];
    let mut rows = estimates.chunks_mut(width as usize).collect::<Vec<_>>();
    parallel_for_slice(
        &mut rows,
        settings.worker_count,
        settings.parallel,
        |first_row, rows| -> Result<(), RenderError> {
            for (i, row) in rows.iter_mut().enumerate() {
                let y = (first_row + i) as u32;
                parallel_for_slice(
                    row,
                    settings.worker_count,
                    settings.parallel,
                    |first_column, pixels| -> Result<(), Infallible> {
                        for (j, pixel) in pixels.iter_mut().enumerate() {
                            let x = (first_column + j) as u32;
                            *pixel = worker.render_pixel(&ScreenPoint::new(x, y));
                        }
                        Ok(())
                    },
                )?;
            }
            Ok(())
        },
    )?;

    let (eye_lengths, light_lengths) = estimates.iter().fold(
        (Stats::default(), Stats::default()),
        |(eye, light), estimate| {
            (
                eye.merge(&estimate.eye_lengths),
                light.merge(&estimate.light_lengths),
            )
        },
    );
    log::info!("Rendering finished in {:?}", start.elapsed());
    log::debug!("Eye subpath lengths: {eye_lengths}");
    log::debug!("Light subpath lengths: {light_lengths}");

    let first_hits = settings
        .feature_buffers
        .then(|| estimates.iter().filter_map(|estimate| estimate.first_hit).collect());
    Ok(RenderedImage {
        width,
        height,
        pixels: estimates.into_iter().map(|estimate| estimate.color).collect(),
        first_hits,
    })
}
