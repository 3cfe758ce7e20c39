//! Field extraction: one page image → one [`PartialRecord`] via a vision LLM.
//!
//! [`FieldExtractor`] is the seam the orchestrator depends on.
//! [`VisionExtractor`] sends the page as a base64 JPEG together with the
//! extraction prompt and validates the reply against the schema.
//!
//! The model is not under our control, so its reply is treated as untrusted
//! input: the payload is cut out of any fence or surrounding prose and must
//! be a JSON object, the `schemaVersion` tag (if present) must match, and the
//! remaining fields must deserialize into [`PartialRecord`]. Anything else is
//! [`ExtractError::MalformedResponse`]. There is no retry.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::pipeline::encode::{to_image_data, PageImage};
use crate::prompts::{EXTRACTION_PROMPT, PAGE_INSTRUCTION, SCHEMA_VERSION};
use crate::record::PartialRecord;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default model when only an API key is available.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1";

/// Converts one page image into the fields visible on that page.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract(&self, page: &PageImage) -> Result<PartialRecord, ExtractError>;
}

/// Extracts fields with a vision-capable LLM provider.
pub struct VisionExtractor {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    options: CompletionOptions,
    timeout_secs: u64,
}

impl VisionExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| EXTRACTION_PROMPT.to_string()),
            options: build_options(config),
            timeout_secs: config.api_timeout_secs,
        }
    }

    /// Resolve the provider from `config` (or the environment) and wrap it.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }
}

#[async_trait]
impl FieldExtractor for VisionExtractor {
    async fn extract(&self, page: &PageImage) -> Result<PartialRecord, ExtractError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user_with_images(PAGE_INSTRUCTION, vec![to_image_data(page)]),
        ];

        let call = self.provider.chat(&messages, Some(&self.options));
        let response = tokio::time::timeout(Duration::from_secs(self.timeout_secs), call)
            .await
            .map_err(|_| ExtractError::Timeout {
                secs: self.timeout_secs,
            })?
            .map_err(|e| ExtractError::Api {
                message: e.to_string(),
            })?;

        debug!(
            "Page {}: {} input tokens, {} output tokens, {:?}",
            page.page_num,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        parse_response(&response.content).inspect_err(|e| {
            warn!("Page {}: {}", page.page_num, e);
        })
    }
}

fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

static RE_FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\n(.*?)\n?```").unwrap());

/// Locate the JSON payload in a reply: the first fenced block if any,
/// otherwise the outermost `{…}` span when the reply has text around it.
fn json_payload(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(inner) = RE_FENCED_BLOCK.captures(trimmed).and_then(|c| c.get(1)) {
        return inner.as_str().trim();
    }
    if !trimmed.starts_with('{') {
        if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
            if start < end {
                return &trimmed[start..=end];
            }
        }
    }
    trimmed
}

/// Validate a raw model reply and convert it to a [`PartialRecord`].
pub fn parse_response(raw: &str) -> Result<PartialRecord, ExtractError> {
    let malformed = |reason: String| ExtractError::MalformedResponse {
        reason,
        raw: raw.to_string(),
    };

    let body = json_payload(raw);
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| malformed(format!("not JSON: {e}")))?;

    let serde_json::Value::Object(mut fields) = value else {
        return Err(malformed("expected a JSON object".to_string()));
    };

    match fields.remove("schemaVersion") {
        None | Some(serde_json::Value::Null) => {}
        Some(serde_json::Value::String(v)) if v == SCHEMA_VERSION => {}
        Some(other) => {
            return Err(malformed(format!(
                "unsupported schemaVersion {other}, expected \"{SCHEMA_VERSION}\""
            )))
        }
    }

    serde_json::from_value(serde_json::Value::Object(fields))
        .map_err(|e| malformed(format!("schema mismatch: {e}")))
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `config.provider` — a pre-built provider, used as-is.
/// 2. `config.provider_name` (+ `config.model`).
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set.
/// 4. `GEMINI_API_KEY`, then `OPENAI_API_KEY`, with their default models.
/// 5. `ProviderFactory::from_env()` auto-detection.
pub fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config
            .model
            .as_deref()
            .unwrap_or_else(|| default_model_for(name));
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    for (provider, key) in [("gemini", "GEMINI_API_KEY"), ("openai", "OPENAI_API_KEY")] {
        if std::env::var(key).is_ok_and(|k| !k.is_empty()) {
            let model = config
                .model
                .as_deref()
                .unwrap_or_else(|| default_model_for(provider));
            return create_vision_provider(provider, model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn default_model_for(provider: &str) -> &'static str {
    match provider {
        "openai" | "azure" => DEFAULT_OPENAI_MODEL,
        _ => DEFAULT_GEMINI_MODEL,
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
