use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use super::models::{ApiErrorBody, ContentBlock, MessagesRequest, MessagesResponse};
use super::CompletionApi;
use crate::config::{Config, ANTHROPIC_VERSION};
use crate::error::{RelayError, Result};

/// Messages API client. One instance is shared by every query of a session.
pub struct AnthropicClient {
    http: reqwest::Client,
    endpoint: String,
}

impl AnthropicClient {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_endpoint(&config.api_key, &config.api_endpoint)
    }

    pub fn with_endpoint(api_key: &str, endpoint: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key).map_err(|e| {
            RelayError::Configuration(format!("Invalid API key header: {}", e))
        })?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl CompletionApi for AnthropicClient {
    async fn create(&self, request: &MessagesRequest) -> Result<Vec<ContentBlock>> {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            "sending completion request"
        );

        let response = self.http.post(&self.endpoint).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| {
                    if body.is_empty() {
                        "Unknown error".to_string()
                    } else {
                        body
                    }
                });
            return Err(RelayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        if let Some(usage) = parsed.usage {
            tracing::debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = parsed.stop_reason.as_deref().unwrap_or("none"),
                "completion received"
            );
        }

        Ok(parsed.content)
    }
}
