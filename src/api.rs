use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;

// generateContent 请求结构
#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
pub struct RequestContent {
    pub role: String,
    pub parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
pub struct RequestPart {
    pub text: String,
}

impl GenerateRequest {
    pub fn user_text(text: &str) -> Self {
        GenerateRequest {
            contents: vec![RequestContent {
                role: "user".to_string(),
                parts: vec![RequestPart {
                    text: text.to_string(),
                }],
            }],
        }
    }
}

// generateContent 响应结构，只保留需要的字段
#[derive(Debug, Deserialize, Default)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateResponse {
    /// candidates[0].content.parts[0].text
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

/// 单个模型一次尝试的失败原因
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error("网络请求失败: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API请求失败 (状态码: {status}): {body}")]
    HttpStatus { status: StatusCode, body: String },
    #[error("响应解析失败: {0}")]
    Decode(String),
    #[error("模型返回了空内容")]
    EmptyReply,
    #[error("无法从回复中提取结果: {0}")]
    Parse(#[from] serde_json::Error),
}

/// 文本生成服务的抽象，便于替换和测试
#[async_trait]
pub trait GenerateContent: Send + Sync {
    /// 用指定模型发送一次请求，返回模型的原始文本回复
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AttemptError>;
}

pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.api_key().ok_or_else(|| {
            anyhow::anyhow!(
                "未配置 API 密钥，请设置 {} 环境变量或在配置文件中填写 api.gemini_key",
                crate::config::API_KEY_ENV
            )
        })?;

        Self::with_endpoint(
            &config.api.base_url,
            api_key,
            config.processing.request_timeout(),
        )
    }

    pub fn with_endpoint(base_url: &str, api_key: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = ClientBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(GeminiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl GenerateContent for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AttemptError> {
        let request = GenerateRequest::user_text(prompt);

        let response = self
            .client
            .post(self.endpoint(model))
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::HttpStatus { status, body });
        }

        let bytes = response.bytes().await?;
        let api_response: GenerateResponse = serde_json::from_slice(&bytes)
            .map_err(|e| AttemptError::Decode(e.to_string()))?;

        match api_response.first_text() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            _ => Err(AttemptError::EmptyReply),
        }
    }
}
