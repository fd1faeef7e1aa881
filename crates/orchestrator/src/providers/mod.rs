//! HTTP adapters for the upstream chat completion APIs.

mod anthropic;
mod google;
mod openai;

use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::Value;

pub use anthropic::AnthropicProvider;
pub use google::GoogleProvider;
pub use openai::OpenAiProvider;

use crate::OrchestratorError;

pub(crate) fn http_client(timeout: Duration) -> Result<Client, OrchestratorError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Turn a non-2xx response into `OrchestratorError::ProviderStatus`, pulling
/// the message and code out of the usual `{"error": {...}}` body shapes.
pub(crate) async fn ensure_success(
    provider: &str,
    response: Response,
) -> Result<Response, OrchestratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let parsed: Option<Value> = serde_json::from_str(&body).ok();
    let error = parsed.as_ref().and_then(|value| value.get("error"));

    let message = error
        .and_then(|e| e.get("message").and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.to_string()
            } else {
                body.chars().take(200).collect()
            }
        });

    let code = error.and_then(|e| {
        e.get("code")
            .and_then(Value::as_str)
            .or_else(|| e.get("type").and_then(Value::as_str))
            .or_else(|| e.get("status").and_then(Value::as_str))
            .map(str::to_string)
    });

    Err(OrchestratorError::ProviderStatus {
        provider: provider.to_string(),
        status: status.as_u16(),
        code,
        message,
    })
}
