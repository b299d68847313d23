use crate::error::{ExtractError, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Bound on a single text-classification call. The vision path carries the
/// same bound since it is one request as well.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(90);

/// Text-in, JSON-text-out capability. Implementations must return the raw
/// model output string; callers own parsing and coercion.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String>;
}

/// Multimodal capability: raw document bytes plus instructions.
#[async_trait]
pub trait VisionCompletion: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn complete_with_document(
        &self,
        system_prompt: &str,
        file_bytes: &[u8],
        filename: &str,
        user_text: &str,
    ) -> Result<String>;
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Clone)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize, Clone)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Reads `GEMINI_API_KEY`; an absent or empty key yields an unconfigured
    /// client rather than an error, so the routing ladder can skip it.
    pub fn from_env() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        Self::new(api_key)
    }

    async fn generate(&self, system_prompt: &str, contents: Vec<Content>) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let payload = GenerateContentRequest {
            contents,
            system_instruction: Content {
                role: "user".to_string(),
                parts: vec![Part::Text {
                    text: system_prompt.to_string(),
                }],
            },
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let res = self
            .client
            .post(&url)
            .timeout(COMPLETION_TIMEOUT)
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            return Err(ExtractError::ClassificationFailed(format!(
                "Gemini API error (status {}): {}",
                status, err_text
            )));
        }

        let body: GenerateContentResponse = res.json().await?;

        body.candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| {
                ExtractError::ClassificationFailed("Model returned no text content".to_string())
            })
    }
}

#[async_trait]
impl TextCompletion for GeminiClient {
    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String> {
        let contents = vec![Content {
            role: "user".to_string(),
            parts: vec![Part::Text {
                text: user_text.to_string(),
            }],
        }];
        self.generate(system_prompt, contents).await
    }
}

#[async_trait]
impl VisionCompletion for GeminiClient {
    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn complete_with_document(
        &self,
        system_prompt: &str,
        file_bytes: &[u8],
        filename: &str,
        user_text: &str,
    ) -> Result<String> {
        let mime_type = mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string();
        let data = base64::engine::general_purpose::STANDARD.encode(file_bytes);

        let contents = vec![Content {
            role: "user".to_string(),
            parts: vec![
                Part::InlineData {
                    inline_data: InlineData { mime_type, data },
                },
                Part::Text {
                    text: user_text.to_string(),
                },
            ],
        }];
        self.generate(system_prompt, contents).await
    }
}
