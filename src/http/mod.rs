//! HTTP surface of the request handler.
//!
//! One generate endpoint is mounted at `/` and at every other path except
//! `/health`; the path itself carries no meaning. GET reads the prompt from
//! the query string, POST from a JSON body. Every other method gets 405.

mod handlers;

use std::any::Any;
use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Serialize;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::asset::{AssetKey, created_at_metadata};
use crate::clock::Clock;
use crate::constants::ASSET_CONTENT_TYPE;
use crate::error::{Error, Result};
use crate::inference::ImageGenerator;
use crate::storage::{ObjectStore, PutOptions};

/// Settings the request handler needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Origin the store is publicly readable at; asset URLs are
    /// `{public_base_url}/{key}`.
    pub public_base_url: String,
}

/// Shared state of the request handler.
///
/// Collaborators are injected here so tests can substitute doubles.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<HandlerConfig>,
    pub generator: Arc<dyn ImageGenerator>,
    pub store: Arc<dyn ObjectStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        config: HandlerConfig,
        generator: Arc<dyn ImageGenerator>,
        store: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            generator,
            store,
            clock,
        }
    }
}

/// Success body: `{"imageUrl": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub image_url: String,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let generate = get(handlers::generate_get)
        .post(handlers::generate_post)
        // Without an explicit HEAD route axum would run the GET handler.
        .head(handlers::method_not_allowed)
        .fallback(handlers::method_not_allowed);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", generate.clone())
        .route("/{*path}", generate)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs one prompt through inference and storage.
///
/// The clock is read once: the same instant names the key and becomes the
/// `createdAt` metadata.
///
/// # Errors
///
/// - [`Error::Inference`] if the inference call fails
/// - [`Error::GenerationEmpty`] if it returns no bytes (nothing is stored)
/// - [`Error::Storage`] if the write fails
pub async fn generate_image(state: &AppState, prompt: &str) -> Result<GenerateResponse> {
    debug!(prompt_len = prompt.len(), "Generating image");

    let image = state
        .generator
        .generate(prompt)
        .await
        .map_err(Error::Inference)?
        .filter(|bytes| !bytes.is_empty())
        .ok_or(Error::GenerationEmpty)?;

    let now = state.clock.now_millis();
    let key = AssetKey::new_random(now);
    let size = image.len();

    state
        .store
        .put(
            key.as_str(),
            image,
            PutOptions::new(ASSET_CONTENT_TYPE).with_metadata(created_at_metadata(now)),
        )
        .await
        .map_err(Error::Storage)?;

    info!(%key, bytes = size, "Stored generated image");

    Ok(GenerateResponse {
        image_url: key.public_url(&state.config.public_base_url),
    })
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(error = %self, "Error handling request");
        } else {
            debug!(error = %self, status = status.as_u16(), "Rejected request");
        }

        (status, self.public_message()).into_response()
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %detail, "Request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}
