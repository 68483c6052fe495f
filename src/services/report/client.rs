use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ReportConfig;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no API key configured for the report service")]
    Unconfigured,
    #[error("report request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("report service answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("the model returned no text")]
    EmptyResponse,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// One-shot text generation against a `generateContent` endpoint.
#[derive(Clone)]
pub struct ReportClient {
    client: Client,
    config: ReportConfig,
}

impl ReportClient {
    pub fn new(config: ReportConfig) -> Result<Self, ReportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    pub fn structured(&self) -> bool {
        self.config.structured
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, ReportError> {
        let key = self.config.api_key.as_deref().ok_or(ReportError::Unconfigured)?;

        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        debug!("Requesting report ({} prompt chars)", prompt.len());
        let response = self
            .client
            .post(&self.config.api_url)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Report service error {}", status);
            return Err(ReportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        parsed.into_text().ok_or(ReportError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_camel_case() {
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: "hola" }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.5,
                max_output_tokens: 300,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hola");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 300);
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn response_text_is_joined_and_trimmed() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":" Muy "},{"text":"bien. "}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.into_text().as_deref(), Some("Muy bien."));
    }

    #[test]
    fn no_candidates_is_empty() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.into_text().is_none());
    }

    #[tokio::test]
    async fn missing_key_is_reported_before_any_request() {
        let client = ReportClient::new(ReportConfig::default()).unwrap();
        assert!(!client.is_configured());
        let err = client.generate("x").await.unwrap_err();
        assert!(matches!(err, ReportError::Unconfigured));
    }
}
