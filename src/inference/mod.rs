//! Text-to-image inference collaborator.
//!
//! The request handler only depends on [`ImageGenerator`]; the production
//! implementation talks to the Cloudflare Workers AI REST API.

mod workers_ai;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

pub use workers_ai::WorkersAiGenerator;

/// Generates an image from a prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync + 'static {
    /// Runs the model once with `prompt` as its only input.
    ///
    /// Returns `Ok(None)` when the endpoint answered but produced no image.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is unreachable or rejects the call.
    async fn generate(&self, prompt: &str) -> Result<Option<Bytes>>;
}
