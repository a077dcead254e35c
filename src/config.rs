//! Configuration types for deck analysis and the HTTP endpoint.
//!
//! All analysis behaviour is controlled through [`AnalyzerConfig`], built via
//! its [`AnalyzerConfigBuilder`]. The HTTP surface has its own
//! [`ServerConfig`] since it is only needed when serving.

use crate::error::DeckError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default model identifier sent to the provider.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Configuration for one analyzer instance.
///
/// # Example
/// ```rust
/// use pitchdeck_analyzer::AnalyzerConfig;
///
/// let config = AnalyzerConfig::builder()
///     .model("gpt-4o-mini")
///     .temperature(0.2)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_text_chars, 8000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// LLM model identifier. Default: `gpt-4o`.
    pub model: String,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Sampling temperature. Default: 0.3.
    ///
    /// Kept low so two runs over the same deck give comparable analyses.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: provider default.
    pub max_tokens: Option<usize>,

    /// Extracted text is truncated to this many characters. Default: 8000.
    pub max_text_chars: usize,

    /// Extracted text shorter than this is rejected. Default: 50.
    pub min_text_chars: usize,

    /// Page-wise fallback reads at most this many pages. Default: 20.
    pub max_fallback_pages: usize,

    /// Page text fetches outstanding at once in the fallback. Default: 20.
    pub page_concurrency: usize,

    /// Directory (or full path) of the pdfium shared library.
    /// If None, the system library is used.
    pub pdfium_library_path: Option<PathBuf>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            temperature: 0.3,
            max_tokens: None,
            max_text_chars: 8000,
            min_text_chars: 50,
            max_fallback_pages: 20,
            page_concurrency: 20,
            pdfium_library_path: None,
        }
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn max_text_chars(mut self, n: usize) -> Self {
        self.config.max_text_chars = n;
        self
    }

    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.config.min_text_chars = n;
        self
    }

    pub fn max_fallback_pages(mut self, n: usize) -> Self {
        self.config.max_fallback_pages = n.max(1);
        self
    }

    pub fn page_concurrency(mut self, n: usize) -> Self {
        self.config.page_concurrency = n.max(1);
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, DeckError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(DeckError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_text_chars == 0 {
            return Err(DeckError::InvalidConfig(
                "max_text_chars must be ≥ 1".into(),
            ));
        }
        if c.min_text_chars > c.max_text_chars {
            return Err(DeckError::InvalidConfig(format!(
                "min_text_chars ({}) exceeds max_text_chars ({})",
                c.min_text_chars, c.max_text_chars
            )));
        }
        Ok(self.config)
    }
}

/// Settings for the HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on. Default: `0.0.0.0:3000`.
    pub bind: SocketAddr,
    /// Path of the analysis endpoint. Default: `/api/DeckAnalyzer`.
    pub route: String,
    /// Largest accepted request body in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            route: "/api/DeckAnalyzer".to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}
