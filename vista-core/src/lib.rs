#[cfg(feature = "accelerate")]
extern crate accelerate_src;

#[cfg(feature = "mkl")]
extern crate intel_mkl_src;

pub mod config;
pub mod device_map;
pub mod error;
pub mod generator;
pub mod loader;
pub mod persist;
pub mod provider;
mod util;

mod stable_diffusion;

pub use config::*;
pub use device_map::*;
pub use error::GenerationError;
pub use generator::ImageGenerator;
use image::DynamicImage;
pub use loader::*;
pub use persist::save_image;
pub use provider::PipelineProvider;
pub use stable_diffusion::{StableDiffusionLoader, StableDiffusionModel, StableDiffusionVariant};
pub(crate) use util::*;

/// Classifier-free guidance scale used for every generation.
pub const GUIDANCE_SCALE: f64 = 7.5;

/// Input to a single pipeline invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub guidance_scale: f64,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            guidance_scale: GUIDANCE_SCALE,
        }
    }
}

/// A loaded text-to-image model.
///
/// `run` blocks for the whole inference and returns every image produced for
/// the prompt.
pub trait Pipeline: Send + Sync {
    fn run(&self, request: &GenerationRequest) -> anyhow::Result<Vec<DynamicImage>>;
}
