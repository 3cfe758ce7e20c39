//! Configuration types for shipping-bill extraction and export.
//!
//! Extraction behaviour lives in [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]; spreadsheet layout lives in [`ExportConfig`].
//! Every knob has a documented default so callers set only what they need.

use crate::error::ConfigError;
use crate::progress::BatchProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default workbook file name offered by the export action.
pub const DEFAULT_EXPORT_FILE: &str = "extracted_shipping_data.xlsx";

/// Configuration for rendering pages and extracting fields.
///
/// # Example
/// ```rust
/// use csb_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .render_scale(2.0)
///     .jpeg_quality(0.8)
///     .model("gemini-2.5-pro")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Render resolution multiplier applied to each page's natural size. Default: 1.5.
    ///
    /// 1.5× keeps small print on the bill legible without producing images
    /// large enough to hit provider upload limits.
    pub render_scale: f32,

    /// JPEG compression quality in `0.0..=1.0`. Default: 0.9.
    pub jpeg_quality: f32,

    /// Documents processed at once. Default: 1 (strictly sequential).
    ///
    /// Values above 1 keep output order equal to input order, but more than
    /// one document's extraction calls may be in flight.
    pub concurrency: usize,

    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 8192.
    ///
    /// A page with a long item table can produce several thousand tokens of
    /// JSON; truncation would make the response unparseable.
    pub max_tokens: usize,

    /// Per-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Custom extraction prompt. If None, uses [`crate::prompts::EXTRACTION_PROMPT`].
    pub system_prompt: Option<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Receives batch and per-document progress events.
    pub progress_callback: Option<Arc<dyn BatchProgressCallback>>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            render_scale: 1.5,
            jpeg_quality: 0.9,
            concurrency: 1,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 8192,
            api_timeout_secs: 120,
            system_prompt: None,
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("render_scale", &self.render_scale)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("concurrency", &self.concurrency)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale;
        self
    }

    pub fn jpeg_quality(mut self, quality: f32) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn BatchProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ConfigError> {
        let c = &self.config;
        if !(0.5..=4.0).contains(&c.render_scale) {
            return Err(ConfigError(format!(
                "Render scale must be 0.5–4.0, got {}",
                c.render_scale
            )));
        }
        if !(0.0..=1.0).contains(&c.jpeg_quality) {
            return Err(ConfigError(format!(
                "JPEG quality must be 0.0–1.0, got {}",
                c.jpeg_quality
            )));
        }
        if c.concurrency == 0 {
            return Err(ConfigError("Concurrency must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(ConfigError("API timeout must be ≥ 1 second".into()));
        }
        Ok(self.config)
    }
}

/// Layout of the exported workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Name of the single worksheet. Default: "Extracted Data".
    pub sheet_name: String,

    /// Text written for unknown values. Default: "N/A".
    pub unknown_marker: String,

    /// Characters added to the widest cell of each column. Default: 2.
    pub column_padding: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            sheet_name: "Extracted Data".to_string(),
            unknown_marker: "N/A".to_string(),
            column_padding: 2,
        }
    }
}

impl ExportConfig {
    /// Check the sheet name against the spreadsheet format's rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = &self.sheet_name;
        if name.is_empty() || name.chars().count() > 31 {
            return Err(ConfigError(format!(
                "Sheet name must be 1–31 characters, got {:?}",
                name
            )));
        }
        if name.contains(['[', ']', ':', '*', '?', '/', '\\']) {
            return Err(ConfigError(format!(
                "Sheet name {:?} contains a character not allowed in worksheet names",
                name
            )));
        }
        Ok(())
    }
}
