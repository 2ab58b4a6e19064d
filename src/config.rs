use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const DEFAULT_MODELS: [&str; 6] = [
    "gemma-3n-e2b-it",
    "gemma-3n-e4b-it",
    "gemma-3-1b-it",
    "gemma-3-4b-it",
    "gemma-3-12b-it",
    "gemma-3-27b-it",
];

// 配置文件结构，所有字段都有默认值
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub processing: ProcessingConfig,
    pub database: DatabaseConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub gemini_key: Option<String>,
    pub base_url: String,
    // 按优先级排列，第一个最优先
    pub models: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            gemini_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProcessingConfig {
    pub request_delay_ms: u64,
    // 不设置时使用 HTTP 客户端的默认行为
    pub request_timeout_seconds: Option<u64>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        ProcessingConfig {
            request_delay_ms: 500,
            request_timeout_seconds: None,
        }
    }
}

impl ProcessingConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub db_file: String,
    pub storage_key: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            db_file: "eng_vocab.db".to_string(),
            storage_key: "eng_vocab_words_v1".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub words_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            words_file: "saved_words.csv".to_string(),
        }
    }
}

impl Config {
    /// 读取配置文件并应用环境变量。文件不存在时使用默认配置。
    pub fn load(path: &Path) -> Result<Config> {
        let mut config = if path.exists() {
            let config_content = std::fs::read_to_string(path)
                .with_context(|| format!("配置文件 {} 无法读取", path.display()))?;
            Config::from_toml_str(&config_content)?
        } else {
            tracing::info!(path = %path.display(), "配置文件不存在，使用默认配置");
            Config::default()
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            config.apply_api_key(key);
        }

        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Config> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("配置文件解析失败: {}", e))
    }

    // 环境变量优先于配置文件，空值忽略
    pub fn apply_api_key(&mut self, key: String) {
        if !key.trim().is_empty() {
            self.api.gemini_key = Some(key.trim().to_string());
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api
            .gemini_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}
