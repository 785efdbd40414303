//! OpenAI-compatible chat-completions backend (OpenRouter by default).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use coordination::debate::{ModelBackend, ModelError, ModelRequest};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::config::ProviderConfig;

/// Longest slice of an error body kept in error messages.
const ERROR_BODY_LIMIT: usize = 300;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// [`ModelBackend`] over `POST {base_url}/chat/completions`.
pub struct OpenRouterBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    referer: String,
    title: String,
}

impl OpenRouterBackend {
    pub fn new(config: &ProviderConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            referer: config.referer.clone(),
            title: config.title.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ModelBackend for OpenRouterBackend {
    async fn invoke(&self, request: &ModelRequest) -> Result<String, ModelError> {
        let start = Instant::now();
        let body = serde_json::json!({
            "model": request.model,
            "messages": [
                {"role": "user", "content": request.prompt}
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ModelError::RateLimited {
                retry_after: retry_after(response.headers()),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let msg = format!("HTTP {}: {}", status, clip(&body));
            return Err(if status.is_server_error() {
                ModelError::Transient(msg)
            } else {
                ModelError::Rejected(msg)
            });
        }

        let resp_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ModelError::Rejected(format!("malformed response body: {}", e)))?;

        // Upstream provider failures can arrive as a 200 with an error object
        if let Some(err) = resp_json.get("error") {
            return Err(ModelError::Transient(format!(
                "provider error: {}",
                err["message"].as_str().unwrap_or("unknown")
            )));
        }

        let content = resp_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                ModelError::Rejected("response has no choices[0].message.content".to_string())
            })?;
        if content.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }

        debug!(
            role = %request.role,
            model = %request.model,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            chars = content.len(),
            "completion received"
        );
        Ok(content.to_string())
    }
}

fn send_error(e: reqwest::Error) -> ModelError {
    if e.is_timeout() {
        ModelError::Timeout(e.to_string())
    } else {
        ModelError::Transient(e.to_string())
    }
}

/// `Retry-After` in whole seconds. HTTP-date values are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn clip(body: &str) -> &str {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_endpoint_joins_base_url() {
        let config = ProviderConfig {
            base_url: "http://localhost:9000/v1/".into(),
            ..Default::default()
        };
        let backend = OpenRouterBackend::new(&config).unwrap();
        assert_eq!(backend.endpoint(), "http://localhost:9000/v1/chat/completions");
    }

    #[test]
    fn test_retry_after_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(12)));
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_clip_is_char_safe() {
        let long = "é".repeat(ERROR_BODY_LIMIT + 10);
        assert_eq!(clip(&long).chars().count(), ERROR_BODY_LIMIT);
        assert_eq!(clip("short"), "short");
    }
}
