use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::PlannerConfig;
use crate::errors::{ProviderError, ProviderResult};
use crate::provider::ExtractionProvider;
use crate::types::*;

const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Client for interacting with the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model_name: String,
    temperature: Option<f32>,
}

impl GeminiClient {
    /// Create a new Gemini API client
    pub fn new(config: &PlannerConfig) -> ProviderResult<Self> {
        let api_key = config.api_key.clone().filter(|k| !k.is_empty()).ok_or_else(|| {
            ProviderError::ConfigError(
                "API key is required to initialize the Gemini client".to_string(),
            )
        })?;

        let model_name = config
            .model_name
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            client: Client::new(),
            api_key,
            model_name,
            temperature: config.temperature,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Get the base API URL
    fn get_base_url(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model_name, self.api_key
        )
    }

    /// Generate content using the Gemini API
    pub async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> ProviderResult<GenerateContentResponse> {
        let url = self.get_base_url();

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestError(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.map_err(|e| {
                ProviderError::ResponseError(format!("Failed to read error response: {}", e))
            })?;

            return Err(ProviderError::HttpError {
                status_code: status.as_u16(),
                message: format!("API request failed: {}", error_body),
            });
        }

        let response_body = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| ProviderError::ParsingError(format!("Failed to parse response: {}", e)))?;

        Ok(response_body)
    }

    /// Creates a single-turn request carrying the whole prompt as user content.
    pub(crate) fn create_prompt_request(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompt)],
                role: Some("user".to_string()),
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                temperature: self.temperature,
                ..Default::default()
            }),
        }
    }

    /// Helper method to extract text from a response
    pub fn extract_text_from_response(
        &self,
        response: &GenerateContentResponse,
    ) -> ProviderResult<String> {
        let candidate = response.candidates.first().ok_or_else(|| {
            ProviderError::ResponseError("No candidates in response".to_string())
        })?;

        let content = candidate
            .content
            .as_ref()
            .ok_or_else(|| ProviderError::ResponseError("No content in candidate".to_string()))?;

        let part = content
            .parts
            .first()
            .ok_or_else(|| ProviderError::ResponseError("No parts in content".to_string()))?;

        let text = part
            .text
            .as_ref()
            .ok_or_else(|| ProviderError::ResponseError("No text in part".to_string()))?;

        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl ExtractionProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> ProviderResult<String> {
        debug!(model = %self.model_name, prompt_len = prompt.len(), "Calling Gemini");
        let request = self.create_prompt_request(prompt);
        let response = self.generate_content(request).await?;
        self.extract_text_from_response(&response)
    }
}
