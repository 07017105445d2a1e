mod camera;
pub mod geometry;
mod material;
pub mod parallel_for;
mod renderer;
mod sampler;
pub mod scene;
mod util;

pub use crate::renderer::{
    Integrator, MisAccumulator, RenderError, RenderSettings, RenderedImage, render,
};
pub use camera::Camera;
pub use material::Material;
pub use parallel_for::WorkerCount;
pub use sampler::Sampler;
pub use scene::{Background, Lamp, Scene, SceneBuilder, SceneError};
pub use util::{Color, Rgb, Stats};
