//! Request handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde_json::Value;

use super::{AppState, GenerateResponse, generate_image};
use crate::error::{Error, Result};

/// GET /health
pub(crate) async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /?prompt=... - Generate from the first `prompt` query parameter.
pub(crate) async fn generate_get(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<GenerateResponse>> {
    let prompt = prompt_from_query(query.as_deref().unwrap_or_default())?;
    Ok(Json(generate_image(&state, &prompt).await?))
}

/// POST / - Generate from `{"prompt": "..."}`.
///
/// The body is parsed as JSON whatever the `Content-Type` says.
pub(crate) async fn generate_post(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerateResponse>> {
    let prompt = prompt_from_json(&body)?;
    Ok(Json(generate_image(&state, &prompt).await?))
}

/// Any method other than GET and POST.
pub(crate) async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET, POST")],
        "Method not allowed",
    )
}

/// First `prompt` parameter of a query string; empty counts as missing.
fn prompt_from_query(query: &str) -> Result<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name == "prompt")
        .map(|(_, value)| value.into_owned())
        .filter(|prompt| !prompt.is_empty())
        .ok_or(Error::MissingPrompt)
}

/// Extracts the prompt from a JSON body.
///
/// - invalid JSON → [`Error::MalformedBody`]
/// - `null` body → [`Error::InvalidBody`]
/// - non-object body, or `prompt` absent / `null` / `""` / `false` / `0`
///   → [`Error::MissingPrompt`]
/// - any other non-string `prompt` → [`Error::InvalidBody`]
fn prompt_from_json(body: &[u8]) -> Result<String> {
    let value: Value = serde_json::from_slice(body).map_err(Error::MalformedBody)?;

    let mut object = match value {
        Value::Object(object) => object,
        Value::Null => return Err(Error::InvalidBody("body is null".to_string())),
        _ => return Err(Error::MissingPrompt),
    };

    match object.remove("prompt") {
        Some(Value::String(prompt)) if !prompt.is_empty() => Ok(prompt),
        None | Some(Value::Null | Value::Bool(false)) => Err(Error::MissingPrompt),
        Some(Value::String(_)) => Err(Error::MissingPrompt),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Err(Error::MissingPrompt),
        Some(other) => Err(Error::InvalidBody(format!(
            "prompt must be a string, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
