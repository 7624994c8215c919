use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::{self, net::TcpListener};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;
use vista_core::{
    Config, DeviceMap, ImageGenerator, PipelineConfig, PipelineProvider, StableDiffusionLoader,
    DEFAULT_MODEL, DEFAULT_STEPS,
};

mod routes;

// Define command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Vista text-to-image server")]
struct Args {
    /// Hugging Face model identifier
    #[arg(long, env = "MODEL_NAME", default_value = DEFAULT_MODEL)]
    model: String,

    /// Compute device: cpu, cuda[:N] or metal[:N]
    #[arg(long, env = "DEVICE", default_value = "cuda")]
    device: DeviceMap,

    /// Number of denoising steps per image
    #[arg(long, env = "NUM_INFERENCE_STEPS", default_value_t = DEFAULT_STEPS)]
    steps: usize,

    /// Use flash attention in the unet (requires the `flash-attn` feature)
    #[arg(long)]
    use_flash_attn: bool,

    /// Load the model before accepting requests instead of on the first request
    #[arg(long)]
    preload: bool,

    /// Host address to bind the server to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind the server to
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,
}

impl Args {
    fn config(&self) -> Config {
        Config::new(PipelineConfig {
            model_id: self.model.clone(),
            device: self.device,
            n_steps: self.steps,
            use_flash_attn: self.use_flash_attn,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Variables from `.env` fill in whatever the process environment leaves unset.
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = args.config();
    info!(?config, "Starting");

    let provider = Arc::new(PipelineProvider::new(
        StableDiffusionLoader,
        config.pipeline.clone(),
    ));
    if args.preload {
        provider
            .get_pipeline()
            .await
            .context("failed to preload pipeline")?;
    }
    let generator = Arc::new(ImageGenerator::new(provider, config.output_dir));

    // --- Build axum router with shared state ---
    let app = routes::router(generator);

    // --- Start the server ---
    let bind_address = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    info!("Started server on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // Serializes tests that read or write process environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_follow_the_reference_deployment() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let args = Args::try_parse_from(["vista-server"]).unwrap();
        let config = args.config();

        assert_eq!(config.pipeline.model_id, "CompVis/stable-diffusion-v1-4");
        assert_eq!(config.pipeline.device, DeviceMap::Cuda(0));
        assert_eq!(config.output_dir, std::path::PathBuf::from("static/outputs"));
        assert!(!args.preload);
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "vista-server",
            "--model",
            "stabilityai/stable-diffusion-2-1",
            "--device",
            "cpu",
            "--steps",
            "20",
            "--preload",
        ])
        .unwrap();
        let config = args.config();

        assert_eq!(config.pipeline.model_id, "stabilityai/stable-diffusion-2-1");
        assert_eq!(config.pipeline.device, DeviceMap::ForceCpu);
        assert_eq!(config.pipeline.n_steps, 20);
        assert!(args.preload);
    }

    #[test]
    fn unknown_device_is_rejected() {
        assert!(Args::try_parse_from(["vista-server", "--device", "tpu"]).is_err());
    }

    #[test]
    fn dotenv_file_reaches_the_pipeline_config() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::remove_var("MODEL_NAME");
        std::env::remove_var("DEVICE");
        let tmp = tempfile::tempdir().unwrap();
        let env_file = tmp.path().join(".env");
        std::fs::write(
            &env_file,
            "MODEL_NAME=stabilityai/stable-diffusion-2-1\nDEVICE=cpu\n",
        )
        .unwrap();

        dotenvy::from_path(&env_file).unwrap();
        let parsed = Args::try_parse_from(["vista-server"]);
        std::env::remove_var("MODEL_NAME");
        std::env::remove_var("DEVICE");

        let config = parsed.unwrap().config();
        assert_eq!(config.pipeline.model_id, "stabilityai/stable-diffusion-2-1");
        assert_eq!(config.pipeline.device, DeviceMap::ForceCpu);
    }
}
