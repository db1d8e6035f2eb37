//! Extraction proxy: the HTTP surface that holds provider credentials.
//!
//! Clients never talk to the model provider directly. They POST a base64
//! page image to `/api/extract-questions` and get parsed questions back;
//! `/api/models` serves the vision-model catalog and `/api/health` answers
//! liveness probes.
//!
//! The router is composable: [`router`] returns an axum `Router` that tests
//! mount on an ephemeral port and [`server::serve`] mounts on the configured
//! address.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::router;
pub use server::serve;

use crate::catalog::CatalogClient;
use crate::config::ServerConfig;
use crate::upstream::{LlmVisionModel, VisionModel};
use std::sync::Arc;

/// Shared state for every route.
#[derive(Clone)]
pub struct ApiContext {
    pub vision: Arc<dyn VisionModel>,
    pub catalog: CatalogClient,
    pub prompt: Arc<str>,
}

impl ApiContext {
    pub fn new(vision: Arc<dyn VisionModel>, catalog: CatalogClient, prompt: impl Into<Arc<str>>) -> Self {
        Self {
            vision,
            catalog,
            prompt: prompt.into(),
        }
    }

    /// Production context: `edgequake-llm` provider plus the live catalog.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            Arc::new(LlmVisionModel::new(config)),
            CatalogClient::new(config.catalog_url.clone()),
            config.effective_prompt(),
        )
    }
}
