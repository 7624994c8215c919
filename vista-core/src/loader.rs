use std::future::Future;

use anyhow::Result;

use crate::{Pipeline, PipelineConfig};

/// Builds a [`Pipeline`] from configuration.
pub trait Loader {
    type Model: Pipeline;

    fn load(&self, config: &PipelineConfig) -> impl Future<Output = Result<Self::Model>> + Send;
}
