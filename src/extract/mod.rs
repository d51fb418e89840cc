//! Content extraction capability
//!
//! Extraction (summaries, Q&A pairs, schema-shaped data) is performed by an
//! external language-model service. The crawler depends only on the
//! [`Extractor`] trait defined here; extraction failures degrade a single
//! URL's result and never fail a batch.

use crate::output::UrlResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Kind of extraction to perform on crawled text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionType {
    Summary,
    Qa,
    Schema,
}

/// Language model settings forwarded to the extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 500,
        }
    }
}

/// What to extract and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionPolicy {
    pub extraction_type: ExtractionType,
    #[serde(default)]
    pub custom_schema: Option<Value>,
    #[serde(default)]
    pub llm_config: Option<LlmConfig>,
}

/// A generated question/answer pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

/// Extraction output attached to a crawl result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub summary: Option<String>,
    pub qa_pairs: Option<Vec<QaPair>>,
    pub structured_data: Option<Value>,
    pub raw_text: Option<String>,
}

/// Errors from the extraction service
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExtractionError {
    #[error("no extraction service is configured")]
    Unavailable,

    #[error("schema extraction requires a custom_schema")]
    MissingSchema,

    #[error("extraction failed: {0}")]
    Failed(String),
}

/// Language-model backed extraction service
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn summarize(&self, text: &str, llm: &LlmConfig) -> Result<String, ExtractionError>;

    async fn generate_qa(&self, text: &str, llm: &LlmConfig)
        -> Result<Vec<QaPair>, ExtractionError>;

    async fn extract_schema(
        &self,
        text: &str,
        schema: &Value,
        llm: &LlmConfig,
    ) -> Result<Value, ExtractionError>;
}

/// Extractor used when no extraction service is wired in
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredExtractor;

#[async_trait]
impl Extractor for UnconfiguredExtractor {
    async fn summarize(&self, _text: &str, _llm: &LlmConfig) -> Result<String, ExtractionError> {
        Err(ExtractionError::Unavailable)
    }

    async fn generate_qa(
        &self,
        _text: &str,
        _llm: &LlmConfig,
    ) -> Result<Vec<QaPair>, ExtractionError> {
        Err(ExtractionError::Unavailable)
    }

    async fn extract_schema(
        &self,
        _text: &str,
        _schema: &Value,
        _llm: &LlmConfig,
    ) -> Result<Value, ExtractionError> {
        Err(ExtractionError::Unavailable)
    }
}

/// Runs the extraction named by `policy` over `text`
pub async fn extract(
    extractor: &dyn Extractor,
    text: &str,
    policy: &ExtractionPolicy,
) -> Result<ExtractedContent, ExtractionError> {
    let llm = policy.llm_config.clone().unwrap_or_default();
    let mut content = ExtractedContent {
        raw_text: Some(text.to_string()),
        ..ExtractedContent::default()
    };

    match policy.extraction_type {
        ExtractionType::Summary => {
            content.summary = Some(extractor.summarize(text, &llm).await?);
        }
        ExtractionType::Qa => {
            content.qa_pairs = Some(extractor.generate_qa(text, &llm).await?);
        }
        ExtractionType::Schema => {
            let schema = policy
                .custom_schema
                .as_ref()
                .ok_or(ExtractionError::MissingSchema)?;
            content.structured_data = Some(extractor.extract_schema(text, schema, &llm).await?);
        }
    }

    Ok(content)
}

/// Attaches extraction output to a crawl result
///
/// On failure the result keeps the raw text and records the error message
/// in `extraction_error`.
pub async fn enrich(extractor: &dyn Extractor, result: &mut UrlResult, policy: &ExtractionPolicy) {
    match extract(extractor, &result.markdown, policy).await {
        Ok(content) => {
            result.extracted_content = Some(content);
            result.extraction_error = None;
        }
        Err(e) => {
            tracing::warn!(url = %result.url, error = %e, "Extraction failed; keeping raw text");
            result.extracted_content = Some(ExtractedContent {
                raw_text: Some(result.markdown.clone()),
                ..ExtractedContent::default()
            });
            result.extraction_error = Some(e.to_string());
        }
    }
}
