use std::path::PathBuf;

use crate::DeviceMap;

pub const DEFAULT_MODEL: &str = "CompVis/stable-diffusion-v1-4";
pub const DEFAULT_OUTPUT_DIR: &str = "static/outputs";
pub const DEFAULT_STEPS: usize = 50;

/// Everything needed to construct a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Hugging Face model identifier, e.g. `CompVis/stable-diffusion-v1-4`.
    pub model_id: String,
    pub device: DeviceMap,
    /// Number of denoising steps per generation.
    pub n_steps: usize,
    pub use_flash_attn: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL.to_string(),
            device: DeviceMap::default(),
            n_steps: DEFAULT_STEPS,
            use_flash_attn: false,
        }
    }
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub pipeline: PipelineConfig,
    /// Directory generated images are written to.
    pub output_dir: PathBuf,
}

impl Config {
    pub fn new(pipeline: PipelineConfig) -> Self {
        Self {
            pipeline,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
