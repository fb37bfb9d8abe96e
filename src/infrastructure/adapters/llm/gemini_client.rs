//! Gemini Client - 调用 Gemini generateContent 接口
//!
//! 实现 GenerationPort，通过 HTTP 调用外部 LLM 服务
//!
//! POST {base_url}/v1beta/models/{model}:generateContent
//! Request: {"contents": [{"parts": [{"text": "..."}]}], "generationConfig": {...}}
//! Response: {"candidates": [{"content": {"parts": [{"text": "..."}]}}]}

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::prompts;
use crate::application::ports::{
    ChapterRequest, GeneratedChapter, GenerationError, GenerationPort, OutlineRequest,
};

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
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
    /// 拼接第一个候选的所有文本片段
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        Some(text)
    }
}

// ============================================================================
// Client
// ============================================================================

/// Gemini 客户端配置
#[derive(Debug, Clone)]
pub struct GeminiClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_outline_tokens: u32,
    pub max_chapter_tokens: u32,
    pub max_summary_tokens: u32,
}

impl Default for GeminiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: String::new(),
            model: "gemini-2.0-flash".to_string(),
            timeout_secs: 180,
            temperature: 0.7,
            max_outline_tokens: 4096,
            max_chapter_tokens: 8192,
            max_summary_tokens: 500,
        }
    }
}

impl GeminiClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Gemini 客户端
pub struct GeminiClient {
    client: Client,
    config: GeminiClientConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiClientConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn model_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn generate_url(&self) -> String {
        format!("{}:generateContent", self.model_url())
    }

    /// 单次文本生成
    async fn generate(&self, prompt: String, max_tokens: u32) -> Result<String, GenerationError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens,
                temperature: self.config.temperature,
            },
        };

        tracing::debug!(
            model = %self.config.model,
            max_tokens = max_tokens,
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else if e.is_connect() {
                    GenerationError::NetworkError(format!("Cannot connect to LLM service: {}", e))
                } else {
                    GenerationError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let text = parsed
            .text()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GenerationError::InvalidResponse("empty completion".to_string()))?;

        tracing::debug!(chars = text.len(), "generateContent completed");
        Ok(text)
    }
}

#[async_trait]
impl GenerationPort for GeminiClient {
    async fn generate_outline(&self, request: OutlineRequest) -> Result<String, GenerationError> {
        let prompt = prompts::outline_prompt(&request);
        let outline = self.generate(prompt, self.config.max_outline_tokens).await?;

        tracing::info!(
            title = %request.title,
            revision = request.is_revision(),
            chars = outline.len(),
            "Outline generated"
        );
        Ok(outline)
    }

    async fn generate_chapter(
        &self,
        request: ChapterRequest,
    ) -> Result<GeneratedChapter, GenerationError> {
        let content = self
            .generate(prompts::chapter_prompt(&request), self.config.max_chapter_tokens)
            .await?;
        let summary = self
            .generate(
                prompts::summary_prompt(&request, &content),
                self.config.max_summary_tokens,
            )
            .await?;

        tracing::info!(
            sequence = request.sequence,
            chapter_title = %request.chapter_title,
            chars = content.len(),
            "Chapter generated"
        );
        Ok(GeneratedChapter { content, summary })
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.model_url())
            .header("x-goog-api-key", &self.config.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = GeminiClientConfig::new("key")
            .with_base_url("http://localhost:9000/")
            .with_model("gemini-test");
        let client = GeminiClient::new(config).unwrap();
        assert_eq!(
            client.generate_url(),
            "http://localhost:9000/v1beta/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn test_request_wire_format() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some("hello".into()),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: 10,
                temperature: 0.5,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 10);
    }

    #[test]
    fn test_response_text_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"Hello, "},{"text":"world"}]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Hello, world"));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(empty.text().is_none());
    }
}
