use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::time::sleep;

use crate::api::{AttemptError, GenerateContent};
use crate::config::Config;
use crate::models::WordLookupResult;

const FORMAT_INSTRUCTION: &str = "Return ONLY a strict JSON object with keys: vietnamese_meaning, pronunciation, example_sentence. No commentary, no markdown fences.";

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```json\s*(.*?)```").expect("fenced json pattern is valid")
});

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("没有配置可用的模型")]
    NoModels,
    #[error("全部 {attempts} 个模型都失败了，最后一次错误: {last}")]
    Exhausted {
        attempts: usize,
        #[source]
        last: AttemptError,
    },
}

/// 按模型优先级依次查询单词，第一个成功的结果直接返回
pub struct LookupService<C> {
    client: C,
    models: Vec<String>,
    retry_delay: Duration,
}

impl<C: GenerateContent> LookupService<C> {
    pub fn new(client: C, models: Vec<String>, retry_delay: Duration) -> Self {
        LookupService {
            client,
            models,
            retry_delay,
        }
    }

    pub fn from_config(client: C, config: &Config) -> Self {
        Self::new(
            client,
            config.api.models.clone(),
            config.processing.request_delay(),
        )
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn lookup(&self, word: &str) -> Result<WordLookupResult, LookupError> {
        let prompt = build_prompt(word);
        let mut last_error = None;

        for (attempt, model) in self.models.iter().enumerate() {
            let outcome = match self.client.generate(model, &prompt).await {
                Ok(text) => parse_reply(&text),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(result) => {
                    tracing::info!(word, model = %model, attempt = attempt + 1, "查询成功");
                    return Ok(result);
                }
                Err(e) => {
                    tracing::warn!(word, model = %model, attempt = attempt + 1, error = %e, "模型查询失败，切换下一个模型");
                    last_error = Some(e);
                    sleep(self.retry_delay).await;
                }
            }
        }

        match last_error {
            Some(last) => Err(LookupError::Exhausted {
                attempts: self.models.len(),
                last,
            }),
            None => Err(LookupError::NoModels),
        }
    }
}

pub fn build_prompt(word: &str) -> String {
    let prompt = format!(
        "Provide the Vietnamese meaning, pronunciation (IPA format), and a simple English example sentence for the English word \"{}\", specifically within the context of the IT and software testing industry. The pronunciation should be in IPA format enclosed in slashes, e.g., /əˈɡraɪt/. Ensure the example sentence is relevant to software development or testing.",
        word
    );
    format!("{}\n\n{}", prompt, FORMAT_INSTRUCTION)
}

/// 从模型回复中提取 JSON：优先取 ```json 代码块，再取第一个 `{` 到最后一个 `}` 之间的内容
pub fn parse_reply(text: &str) -> Result<WordLookupResult, AttemptError> {
    if text.trim().is_empty() {
        return Err(AttemptError::EmptyReply);
    }

    let candidate = FENCED_JSON
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text);

    let json_content = match (candidate.find('{'), candidate.rfind('}')) {
        (Some(start), Some(end)) if end > start => &candidate[start..=end],
        _ => candidate,
    };

    Ok(serde_json::from_str(json_content)?)
}
