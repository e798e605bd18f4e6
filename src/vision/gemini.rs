use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::model::EncodedImage;
use crate::domain::ports::VisionBackend;
use crate::utils::error::{ProbeError, Result};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

/// Gemini `generateContent` REST 介面
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    api_key: String,
    endpoint: String,
    model: String,
    max_output_tokens: u32,
    client: Client,
}

impl GeminiBackend {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        max_output_tokens: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProbeError::MissingConfigError {
                field: "vision.api_key".to_string(),
            });
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            max_output_tokens,
            client,
        })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }

    fn build_request(
        &self,
        system_message: &str,
        prompt: &str,
        images: &[EncodedImage],
    ) -> GeminiRequest {
        let mut parts = vec![GeminiPart {
            text: Some(prompt.to_string()),
            inline_data: None,
        }];
        parts.extend(images.iter().map(|image| GeminiPart {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: image.data_base64.clone(),
            }),
        }));

        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts,
            }],
            system_instruction: (!system_message.is_empty()).then(|| GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: Some(system_message.to_string()),
                    inline_data: None,
                }],
            }),
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl VisionBackend for GeminiBackend {
    async fn generate(
        &self,
        system_message: &str,
        prompt: &str,
        images: &[EncodedImage],
    ) -> Result<String> {
        let request = self.build_request(system_message, prompt, images);

        info!(
            "🚀 Sending {} image(s) to Gemini (model: {})",
            images.len(),
            self.model
        );

        let response = self
            .client
            .post(self.api_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(ProbeError::VisionError {
                message: format!("Gemini API returned {}: {}", status.as_u16(), body),
            });
        }

        let parsed: GeminiResponse = response.json().await?;
        let content = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| ProbeError::VisionError {
                message: "Empty response from Gemini".to_string(),
            })?;

        let text: String = content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(ProbeError::VisionError {
                message: "No text in Gemini response".to_string(),
            });
        }

        debug!("Gemini returned {} chars", text.len());
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
