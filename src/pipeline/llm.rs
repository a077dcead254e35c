//! Language-model boundary.
//!
//! The orchestrator only sees [`ModelClient`]: prompt text in, reply text
//! out. [`ProviderClient`] adapts any `edgequake_llm` provider to it, and
//! [`resolve_provider`] picks that provider from configuration and the
//! environment. Exactly one attempt is made per call; there is no retry.

use crate::config::AnalyzerConfig;
use crate::error::{DeckError, ModelError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Sampling settings sent with every completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvocationSettings {
    pub temperature: f32,
    pub max_tokens: Option<usize>,
}

impl InvocationSettings {
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Opaque text-completion service.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    async fn complete(
        &self,
        prompt: &str,
        settings: &InvocationSettings,
    ) -> Result<String, ModelError>;
}

/// [`ModelClient`] over an `edgequake_llm` provider.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    model: String,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Resolve a provider from `config` and wrap it.
    ///
    /// The reported model name is the one the provider actually serves.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, DeckError> {
        let provider = resolve_provider(config)?;
        let model = provider.model().to_string();
        Ok(Self::new(provider, model))
    }
}

#[async_trait]
impl ModelClient for ProviderClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        prompt: &str,
        settings: &InvocationSettings,
    ) -> Result<String, ModelError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user(prompt)];
        let options = build_options(settings);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| {
                warn!("Model call failed: {}", e);
                ModelError::Provider(e.to_string())
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            self.model,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        if response.content.trim().is_empty() {
            return Err(ModelError::EmptyReply);
        }
        Ok(response.content)
    }
}

/// Build `CompletionOptions` from invocation settings.
fn build_options(settings: &InvocationSettings) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(settings.temperature),
        max_tokens: settings.max_tokens,
        ..Default::default()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, DeckError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        DeckError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Named provider** (`config.provider_name`): created with `config.model`
///    via [`ProviderFactory::create_llm_provider`], which reads the matching
///    API key from the environment.
/// 2. **OpenAI key present** (`OPENAI_API_KEY`): OpenAI with `config.model`,
///    even when other providers' keys are also set.
/// 3. **Auto-detection** ([`ProviderFactory::from_env`]): the first provider
///    whose key is found, rebuilt with `config.model`.
pub fn resolve_provider(config: &AnalyzerConfig) -> Result<Arc<dyn LLMProvider>, DeckError> {
    if let Some(ref name) = config.provider_name {
        return create_provider(name, &config.model);
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", &config.model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| DeckError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    if llm_provider.model() == config.model {
        return Ok(llm_provider);
    }
    debug!(
        "Auto-detected provider '{}', switching model {} -> {}",
        llm_provider.name(),
        llm_provider.model(),
        config.model
    );
    create_provider(llm_provider.name(), &config.model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let settings = InvocationSettings::from_config(&AnalyzerConfig::default());
        let opts = build_options(&settings);
        assert_eq!(opts.temperature, Some(0.3));
        assert_eq!(opts.max_tokens, None);
    }

    #[test]
    fn build_options_passes_token_cap() {
        let config = AnalyzerConfig::builder()
            .temperature(0.0)
            .max_tokens(1500)
            .build()
            .unwrap();
        let opts = build_options(&InvocationSettings::from_config(&config));
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(1500));
    }

    #[test]
    fn unknown_provider_is_not_configured() {
        let config = AnalyzerConfig::builder()
            .provider_name("no-such-provider")
            .build()
            .unwrap();
        let err = resolve_provider(&config).err().expect("unknown provider");
        assert!(
            matches!(err, DeckError::ProviderNotConfigured { ref provider, .. } if provider == "no-such-provider"),
            "got: {err}"
        );
    }

    #[test]
    fn auto_detected_provider_keeps_configured_model() {
        // Variables from_env checks before the Anthropic key.
        for var in [
            "OPENAI_API_KEY",
            "EDGEQUAKE_LLM_PROVIDER",
            "OLLAMA_HOST",
            "OLLAMA_MODEL",
            "LMSTUDIO_HOST",
            "LMSTUDIO_MODEL",
        ] {
            std::env::remove_var(var);
        }
        std::env::set_var("ANTHROPIC_API_KEY", "sk-ant-test");

        let config = AnalyzerConfig::builder()
            .model("claude-3-5-haiku-latest")
            .build()
            .unwrap();
        let provider = resolve_provider(&config).unwrap();
        assert_eq!(provider.model(), "claude-3-5-haiku-latest");

        let client = ProviderClient::from_config(&config).unwrap();
        assert_eq!(client.model_name(), "claude-3-5-haiku-latest");
    }
}
