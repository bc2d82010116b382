//! LLM field extraction for award-result documents.
//!
//! One synchronous chat-completions call per document, with a fixed
//! instruction pinning the exact nullable-field JSON response shape. Models
//! love wrapping JSON in code fences, so parsing tolerates them.

use async_trait::async_trait;
use nyusatsu_storage::EnrichmentUpdate;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use thiserror::Error;

/// Characters of document text submitted per call; result PDFs are mostly
/// one page but archive bundles can balloon.
const MAX_DOCUMENT_CHARS: usize = 12_000;

const INSTRUCTION: &str = "\
以下は公共工事の入札結果・契約結果に関する文書です。\
文書から次の項目を抽出し、JSONのみで回答してください。\
不明な項目は null としてください。\n\
{\n\
  \"estimated_price\": \"予定価格または落札金額 (例: 12,300,000円)\",\n\
  \"winning_contractor\": \"落札者・受注者名\",\n\
  \"design_firm\": \"設計者・設計事務所名\",\n\
  \"construction_period\": \"工期 (例: 令和7年4月〜令和8年3月)\",\n\
  \"description\": \"工事概要 (1〜2文)\"\n\
}";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("llm returned status {0}")]
    Status(u16),
    #[error("malformed llm response: {0}")]
    Malformed(String),
}

/// Structured response shape the instruction pins down.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExtractedFields {
    pub estimated_price: Option<String>,
    pub winning_contractor: Option<String>,
    pub design_firm: Option<String>,
    pub construction_period: Option<String>,
    pub description: Option<String>,
}

impl ExtractedFields {
    pub fn into_update(self) -> EnrichmentUpdate {
        EnrichmentUpdate {
            winning_contractor: clean(self.winning_contractor),
            design_firm: clean(self.design_firm),
            estimated_price: clean(self.estimated_price),
            construction_period: clean(self.construction_period),
            description: clean(self.description),
        }
    }
}

/// Models occasionally answer "" or "不明" instead of null.
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "不明" && v != "null")
}

/// Extraction seam so the pipeline is testable without a live endpoint.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract(&self, title: &str, document_text: &str)
        -> Result<ExtractedFields, LlmError>;
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("NYUSATSU_LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: std::env::var("NYUSATSU_LLM_API_KEY").unwrap_or_default(),
            model: std::env::var("NYUSATSU_LLM_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        }
    }
}

/// Chat-completions client implementing [`FieldExtractor`].
pub struct ExtractionClient {
    config: LlmConfig,
    client: reqwest::Client,
}

impl ExtractionClient {
    pub fn new(config: LlmConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl FieldExtractor for ExtractionClient {
    async fn extract(
        &self,
        title: &str,
        document_text: &str,
    ) -> Result<ExtractedFields, LlmError> {
        let prompt = build_prompt(title, document_text);
        let body = json!({
            "model": self.config.model,
            "temperature": 0,
            "messages": [{"role": "user", "content": prompt}],
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LlmError::Status(status.as_u16()));
        }

        let value: JsonValue = resp.json().await?;
        let content = value["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::Malformed("no message content".to_string()))?;
        parse_fields(content)
    }
}

pub fn build_prompt(title: &str, document_text: &str) -> String {
    let mut text = document_text.to_string();
    if text.chars().count() > MAX_DOCUMENT_CHARS {
        text = text.chars().take(MAX_DOCUMENT_CHARS).collect();
        text.push_str("\n(以下省略)");
    }
    format!("{INSTRUCTION}\n\n案件名: {title}\n\n--- 文書 ---\n{text}")
}

/// Parse the model's answer, tolerating an enclosing code fence.
pub fn parse_fields(content: &str) -> Result<ExtractedFields, LlmError> {
    let stripped = strip_code_fence(content.trim());
    serde_json::from_str(stripped).map_err(|e| {
        let head: String = stripped.chars().take(80).collect();
        LlmError::Malformed(format!("{e} (got: {head})"))
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (```json) up to the first newline.
    let rest = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
