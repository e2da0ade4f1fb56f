//! Google Gemini annotator
//!
//! Calls `models/{model}:generateContent` once per message and reads the tag
//! object out of the first candidate's text.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AnnotatorConfig;
use crate::error::{Error, Result};

use super::{AnnotationRequest, Annotator, Tags};

/// Annotator backed by the Gemini `generateContent` API
pub struct GeminiAnnotator {
    http_client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiAnnotator {
    /// Create an annotator from configuration
    ///
    /// Fails when no API key is configured or in the environment.
    pub fn new(config: &AnnotatorConfig) -> Result<Self> {
        config.validate()?;

        let api_key = config.resolve_api_key().ok_or_else(|| {
            Error::Config(format!(
                "no API key: set annotator.api_key or {}",
                AnnotatorConfig::API_KEY_ENV
            ))
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        )
    }
}

#[async_trait]
impl Annotator for GeminiAnnotator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn annotate(&self, request: &AnnotationRequest<'_>) -> Result<Tags> {
        let body = GenerateContentRequest::new(request.prompt()?);

        // reqwest errors embed the URL, which carries the key
        let response = self
            .http_client
            .post(self.url())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Annotator(format!("HTTP request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(Error::Annotator(format!("API error ({}): {}", status, error_text)));
        }

        let reply: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Annotator(format!("failed to parse response: {}", e.without_url())))?;
        Tags::parse(&reply.text()?)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    fn new(prompt: String) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.0,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Result<String> {
        let content = self
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .ok_or_else(|| Error::Annotator("response has no candidates".to_string()))?;

        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            return Err(Error::Annotator("response has no text".to_string()));
        }
        Ok(text)
    }
}
