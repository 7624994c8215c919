use thiserror::Error;

/// Failure modes of a single generation call.
///
/// Server-side variants display the underlying error text unchanged.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Prompt is required")]
    EmptyPrompt,

    #[error("{0:#}")]
    Load(anyhow::Error),

    #[error("{0:#}")]
    Inference(anyhow::Error),

    #[error("pipeline returned no images")]
    NoImage,

    #[error(transparent)]
    Save(#[from] image::ImageError),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

impl GenerationError {
    /// True when the caller supplied bad input rather than the server failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, GenerationError::EmptyPrompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_empty_prompt_is_a_client_error() {
        assert!(GenerationError::EmptyPrompt.is_client_error());
        assert!(!GenerationError::NoImage.is_client_error());
        assert!(!GenerationError::Inference(anyhow::anyhow!("boom")).is_client_error());
    }

    #[test]
    fn load_errors_keep_their_context_chain() {
        let err = anyhow::anyhow!("repo not found").context("failed to get unet weights");
        let message = GenerationError::Load(err).to_string();
        assert_eq!(message, "failed to get unet weights: repo not found");
    }

    #[test]
    fn server_errors_pass_their_text_through() {
        let err = GenerationError::Inference(anyhow::anyhow!("CUDA out of memory"));
        assert_eq!(err.to_string(), "CUDA out of memory");

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only file system");
        let image_err = image::ImageError::IoError(io);
        let expected = image_err.to_string();
        assert_eq!(GenerationError::Save(image_err).to_string(), expected);
    }
}
