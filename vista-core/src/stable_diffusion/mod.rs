use anyhow::{anyhow, Context, Error, Result};
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::Module;
use candle_transformers::models::stable_diffusion::{
    self, clip::ClipTextTransformer, unet_2d::UNet2DConditionModel, vae::AutoEncoderKL,
    StableDiffusionConfig,
};
use hf_hub::api::sync::Api;
use image::DynamicImage;
use tokenizers::Tokenizer;
use tracing::{debug, info};

mod variant;

pub use variant::StableDiffusionVariant;

use crate::{
    dtype_for, select_best_device, tensor_to_image, GenerationRequest, Loader, Pipeline,
    PipelineConfig,
};

const VAE_SCALE: f64 = 0.18215;

pub struct StableDiffusionModel {
    device: Device,
    dtype: DType,
    sd_config: StableDiffusionConfig,
    n_steps: usize,
    tokenizer: Tokenizer,
    pad_id: u32,
    clip_model: ClipTextTransformer,
    unet: UNet2DConditionModel,
    vae: AutoEncoderKL,
}

impl StableDiffusionModel {
    fn encode_prompt(&self, prompt: &str) -> Result<Tensor> {
        let max_len = self.sd_config.clip.max_position_embeddings;
        let mut tokens = self
            .tokenizer
            .encode(prompt, true)
            .map_err(Error::msg)?
            .get_ids()
            .to_vec();
        if tokens.len() > max_len {
            anyhow::bail!(
                "the prompt is too long, {} > max-tokens ({max_len})",
                tokens.len()
            );
        }
        tokens.resize(max_len, self.pad_id);
        let tokens = Tensor::new(tokens.as_slice(), &self.device)?.unsqueeze(0)?;
        Ok(self.clip_model.forward(&tokens)?)
    }
}

impl Pipeline for StableDiffusionModel {
    fn run(&self, request: &GenerationRequest) -> Result<Vec<DynamicImage>> {
        let guidance_scale = request.guidance_scale;
        let use_guide_scale = guidance_scale > 1.0;

        // --- Text embeddings, unconditional first when guiding ---
        let text_embeddings = self.encode_prompt(&request.prompt)?;
        let text_embeddings = if use_guide_scale {
            let uncond_embeddings = self.encode_prompt("")?;
            Tensor::cat(&[uncond_embeddings, text_embeddings], 0)?
        } else {
            text_embeddings
        };
        let text_embeddings = text_embeddings.to_dtype(self.dtype)?;

        // --- Denoising loop ---
        let mut scheduler = self.sd_config.build_scheduler(self.n_steps)?;
        let timesteps = scheduler.timesteps().to_vec();
        let latents = Tensor::randn(
            0f32,
            1f32,
            (1, 4, self.sd_config.height / 8, self.sd_config.width / 8),
            &self.device,
        )?;
        let latents = (latents * scheduler.init_noise_sigma())?;
        let mut latents = latents.to_dtype(self.dtype)?;

        for (timestep_index, &timestep) in timesteps.iter().enumerate() {
            debug!(step = timestep_index + 1, of = timesteps.len(), "Denoising");
            let latent_model_input = if use_guide_scale {
                Tensor::cat(&[&latents, &latents], 0)?
            } else {
                latents.clone()
            };
            let latent_model_input = scheduler.scale_model_input(latent_model_input, timestep)?;
            let noise_pred =
                self.unet
                    .forward(&latent_model_input, timestep as f64, &text_embeddings)?;
            let noise_pred = if use_guide_scale {
                let noise_pred = noise_pred.chunk(2, 0)?;
                let (noise_pred_uncond, noise_pred_text) = (&noise_pred[0], &noise_pred[1]);
                (noise_pred_uncond + ((noise_pred_text - noise_pred_uncond)? * guidance_scale)?)?
            } else {
                noise_pred
            };
            latents = scheduler.step(&noise_pred, timestep, &latents)?;
        }

        // --- Decode latents and scale into [0, 255] ---
        let decoded = self.vae.decode(&(&latents / VAE_SCALE)?)?;
        let decoded = ((decoded / 2.)? + 0.5)?
            .to_device(&Device::Cpu)?
            .to_dtype(DType::F32)?;
        let decoded = (decoded.clamp(0f32, 1f32)? * 255.)?.to_dtype(DType::U8)?;

        let batch = decoded.dim(0)?;
        (0..batch)
            .map(|idx| tensor_to_image(&decoded.i(idx)?))
            .collect()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StableDiffusionLoader;

impl Loader for StableDiffusionLoader {
    type Model = StableDiffusionModel;

    async fn load(&self, config: &PipelineConfig) -> Result<Self::Model> {
        let variant = StableDiffusionVariant::from_name(&config.model_id)
            .ok_or_else(|| anyhow!("Unsupported model: {}", config.model_id))?;
        info!(model = %config.model_id, ?variant, "Detected Stable Diffusion variant");

        let config = config.clone();
        // Downloads and weight loading are blocking.
        tokio::task::spawn_blocking(move || load_blocking(variant, &config)).await?
    }
}

fn load_blocking(
    variant: StableDiffusionVariant,
    config: &PipelineConfig,
) -> Result<StableDiffusionModel> {
    // Configure device.
    let device = select_best_device(config.device).context("failed to set up device")?;
    let dtype = dtype_for(&device);
    info!(?device, ?dtype, "Selected compute device");

    let api = Api::new().context("failed to create hf hub API")?;
    let sd_config = variant.config();

    // --- Tokenizer ---
    let tokenizer_file = api
        .model(variant.tokenizer_repo().to_string())
        .get("tokenizer.json")
        .context("failed to get CLIP tokenizer")?;
    let tokenizer = Tokenizer::from_file(tokenizer_file)
        .map_err(Error::msg)
        .context("failed to load CLIP tokenizer")?;
    let pad_token = sd_config.clip.pad_with.as_deref().unwrap_or("<|endoftext|>");
    let pad_id = *tokenizer
        .get_vocab(true)
        .get(pad_token)
        .ok_or_else(|| anyhow!("tokenizer has no `{pad_token}` token"))?;

    // --- Weights ---
    let repo = api.model(config.model_id.clone());
    let clip_weights = repo
        .get("text_encoder/model.safetensors")
        .context("failed to get text encoder weights")?;
    let unet_weights = repo
        .get("unet/diffusion_pytorch_model.safetensors")
        .context("failed to get unet weights")?;
    let vae_weights = repo
        .get("vae/diffusion_pytorch_model.safetensors")
        .context("failed to get vae weights")?;

    // The text encoder stays in F32; its output is cast to `dtype` per run.
    let clip_model = stable_diffusion::build_clip_transformer(
        &sd_config.clip,
        clip_weights,
        &device,
        DType::F32,
    )
    .context("failed to build CLIP text encoder")?;
    let unet = sd_config
        .build_unet(unet_weights, &device, 4, config.use_flash_attn, dtype)
        .context("failed to build unet")?;
    let vae = sd_config
        .build_vae(vae_weights, &device, dtype)
        .context("failed to build vae")?;

    Ok(StableDiffusionModel {
        device,
        dtype,
        sd_config,
        n_steps: config.n_steps,
        tokenizer,
        pad_id,
        clip_model,
        unet,
        vae,
    })
}
