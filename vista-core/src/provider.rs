use std::{future::Future, pin::Pin, sync::Arc};

use anyhow::Result;
use tokio::sync::OnceCell;
use tracing::info;

use crate::{Loader, Pipeline, PipelineConfig};

type LoadFuture = Pin<Box<dyn Future<Output = Result<Arc<dyn Pipeline>>> + Send>>;
type LoadFn = Box<dyn Fn(PipelineConfig) -> LoadFuture + Send + Sync>;

/// Owns the process-wide pipeline handle.
///
/// The pipeline is constructed on the first call to [`get_pipeline`](Self::get_pipeline)
/// and shared by every later caller. Concurrent first callers wait on the same
/// construction instead of racing. A failed construction is not cached, so the
/// next call tries again.
pub struct PipelineProvider {
    config: PipelineConfig,
    load: LoadFn,
    pipeline: OnceCell<Arc<dyn Pipeline>>,
}

impl PipelineProvider {
    pub fn new<L>(loader: L, config: PipelineConfig) -> Self
    where
        L: Loader + Send + Sync + 'static,
        L::Model: 'static,
    {
        let loader = Arc::new(loader);
        let load: LoadFn = Box::new(move |config| {
            let loader = Arc::clone(&loader);
            Box::pin(async move {
                let model = loader.load(&config).await?;
                Ok(Arc::new(model) as Arc<dyn Pipeline>)
            })
        });

        Self {
            config,
            load,
            pipeline: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.pipeline.initialized()
    }

    pub async fn get_pipeline(&self) -> Result<Arc<dyn Pipeline>> {
        let pipeline = self
            .pipeline
            .get_or_try_init(|| async {
                info!(
                    model = %self.config.model_id,
                    device = %self.config.device,
                    "Loading pipeline"
                );
                let pipeline = (self.load)(self.config.clone()).await?;
                info!(model = %self.config.model_id, "Pipeline ready");
                Ok::<_, anyhow::Error>(pipeline)
            })
            .await?;
        Ok(Arc::clone(pipeline))
    }
}
