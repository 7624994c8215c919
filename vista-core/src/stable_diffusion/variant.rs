use candle_transformers::models::stable_diffusion::StableDiffusionConfig;

/// Stable Diffusion checkpoint families the loader knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StableDiffusionVariant {
    /// 1.x checkpoints (CompVis v1-4, runwayml v1-5), 512x512.
    V1_5,
    /// `stabilityai/stable-diffusion-2-1`, 768x768 with v-prediction.
    V2_1,
}

impl StableDiffusionVariant {
    /// Detect the variant from a Hugging Face model identifier.
    pub fn from_name(model_name: &str) -> Option<Self> {
        let name_upper = model_name.to_uppercase();

        let contains_any = |needles: &[&str]| needles.iter().any(|v| name_upper.contains(v));

        // SDXL needs a second text encoder, 2.x base checkpoints use epsilon prediction,
        // and SD3/Cascade are different architectures altogether.
        if contains_any(&[
            "XL",
            "BASE",
            "SD3",
            "CASCADE",
            "STABLE-DIFFUSION-3",
            "STABLE-DIFFUSION-V3",
        ]) {
            return None;
        }

        if contains_any(&["2-1", "2.1", "2_1"]) {
            Some(Self::V2_1)
        } else if contains_any(&["V1-4", "V1-5", "V1.4", "V1.5"]) {
            Some(Self::V1_5)
        } else if contains_any(&["STABLE-DIFFUSION-2", "STABLE-DIFFUSION-V2"]) {
            // Only 2.1 is supported from the 2.x family.
            None
        } else if name_upper.contains("STABLE-DIFFUSION") {
            Some(Self::V1_5)
        } else {
            None
        }
    }

    pub fn config(&self) -> StableDiffusionConfig {
        match self {
            Self::V1_5 => StableDiffusionConfig::v1_5(None, None, None),
            Self::V2_1 => StableDiffusionConfig::v2_1(None, None, None),
        }
    }

    pub fn tokenizer_repo(&self) -> &'static str {
        "openai/clip-vit-base-patch32"
    }
}
