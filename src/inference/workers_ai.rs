//! Cloudflare Workers AI client.
//!
//! `POST {api_base}/accounts/{account_id}/ai/run/{model}` with a bearer token
//! and `{"prompt": ...}`. Image models answer with raw PNG bytes; failures
//! come back as a JSON envelope.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;

use super::ImageGenerator;
use crate::config::InferenceConfig;
use crate::error::Error;

/// Longest upstream error body copied into an error message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

/// [`ImageGenerator`] backed by the Workers AI REST API.
#[derive(Clone)]
pub struct WorkersAiGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_token: String,
}

impl WorkersAiGenerator {
    /// Creates a client for one model.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_base: &str,
        account_id: &str,
        model: &str,
        api_token: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build inference HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/accounts/{account_id}/ai/run/{model}",
                api_base.trim_end_matches('/')
            ),
            api_token: api_token.into(),
        })
    }

    /// Builds the client from `[inference]`, resolving the token from the
    /// environment when the file leaves it out.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the account id or token is missing.
    pub fn from_config(config: &InferenceConfig) -> crate::error::Result<Self> {
        let account_id = config
            .account_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Config("inference.account_id is required".to_string()))?;
        let api_token = config.resolve_api_token().ok_or_else(|| {
            Error::Config(format!(
                "inference.api_token is required (or set {})",
                crate::constants::API_TOKEN_ENV
            ))
        })?;

        Self::new(
            &config.api_base,
            account_id,
            &config.model,
            api_token,
            config.timeout(),
        )
        .map_err(|e| Error::Config(format!("{e:#}")))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ImageGenerator for WorkersAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<Option<Bytes>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await
            .context("Inference request failed")?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));
        let body = response
            .bytes()
            .await
            .context("Failed to read inference response body")?;

        if is_json {
            bail!("inference endpoint returned {status}: {}", describe_json_error(&body));
        }
        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            let text: String = text.chars().take(MAX_ERROR_BODY).collect();
            bail!("inference endpoint returned {status}: {text}");
        }

        tracing::debug!(bytes = body.len(), "Inference returned image");
        Ok((!body.is_empty()).then_some(body))
    }
}

fn describe_json_error(body: &[u8]) -> String {
    match serde_json::from_slice::<ApiEnvelope>(body) {
        Ok(envelope) if !envelope.errors.is_empty() => envelope
            .errors
            .iter()
            .map(|e| match e.code {
                Some(code) => format!("[{code}] {}", e.message),
                None => e.message.clone(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => String::from_utf8_lossy(body)
            .chars()
            .take(MAX_ERROR_BODY)
            .collect(),
    }
}
