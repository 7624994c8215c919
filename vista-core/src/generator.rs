use std::{path::PathBuf, sync::Arc};

use tracing::info;

use crate::{persist, GenerationError, GenerationRequest, PipelineProvider};

/// Turns prompts into image files on disk.
pub struct ImageGenerator {
    provider: Arc<PipelineProvider>,
    output_dir: PathBuf,
}

impl ImageGenerator {
    pub fn new(provider: Arc<PipelineProvider>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            output_dir: output_dir.into(),
        }
    }

    /// Runs the pipeline for `prompt` and writes the first image it produces.
    ///
    /// Every call regenerates and writes a new file; nothing is cached.
    pub async fn generate_image(&self, prompt: &str) -> Result<PathBuf, GenerationError> {
        if prompt.is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }

        if !self.provider.is_loaded() {
            info!("Pipeline not loaded yet, loading before first generation");
        }
        let pipeline = self
            .provider
            .get_pipeline()
            .await
            .map_err(GenerationError::Load)?;

        let request = GenerationRequest::new(prompt);
        let output_dir = self.output_dir.clone();

        // Inference is blocking and long running; keep it off the async workers.
        let path = tokio::task::spawn_blocking(move || {
            let images = pipeline
                .run(&request)
                .map_err(GenerationError::Inference)?;
            let image = images.into_iter().next().ok_or(GenerationError::NoImage)?;
            let path = persist::save_image(&image, &request.prompt, &output_dir)?;
            Ok::<_, GenerationError>(path)
        })
        .await??;

        info!(path = %path.display(), "Saved generated image");
        Ok(path)
    }
}
