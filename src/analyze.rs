//! One analysis request, end to end.
//!
//! [`AnalysisOrchestrator::run`] walks a fixed sequence of [`Stage`]s and
//! stops at the first failure, turning it into an [`AnalysisOutcome`]. It
//! never returns an error and never panics on bad input: every failure is a
//! value the caller can serialize.
//!
//! ```text
//! Idle ─▶ Validating ─▶ Extracting ─▶ Prompting ─▶ Invoking ─▶ Sanitizing ─▶ Succeeded
//!            │              │                          │            │
//!            └──────────────┴──────────── Failed ◀─────┴────────────┘
//! ```
//!
//! The orchestrator holds no per-request state, so one instance is shared
//! behind an `Arc` by every request the server handles.

use crate::config::AnalyzerConfig;
use crate::error::{ErrorKind, ParseError};
use crate::output::{AnalysisFailure, AnalysisMetadata, AnalysisOutcome, DebugInfo};
use crate::pipeline::extract::{ExtractedText, TextExtractor};
use crate::pipeline::input::{ContentType, RawDocument};
use crate::pipeline::llm::{InvocationSettings, ModelClient};
use crate::pipeline::sanitize;
use crate::prompts::build_analysis_prompt;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const NO_FILE_MESSAGE: &str = "No file uploaded";
pub const UNSUPPORTED_TYPE_MESSAGE: &str =
    "Unsupported file type. Please upload a PDF or DOCX file.";
pub const PARSE_FAILED_MESSAGE: &str = "Failed to parse AI response as JSON";
pub const MODEL_FAILED_MESSAGE: &str = "AI analysis failed";

/// Position in the request state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Validating,
    Extracting,
    Prompting,
    Invoking,
    Sanitizing,
    Succeeded,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Validating => "validating",
            Stage::Extracting => "extracting",
            Stage::Prompting => "prompting",
            Stage::Invoking => "invoking",
            Stage::Sanitizing => "sanitizing",
            Stage::Succeeded => "succeeded",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Composes extraction, prompting, the model call and sanitizing.
pub struct AnalysisOrchestrator {
    extractor: TextExtractor,
    model: Arc<dyn ModelClient>,
    settings: InvocationSettings,
}

impl AnalysisOrchestrator {
    /// Default extractor chain for `config`, calling `model`.
    pub fn new(config: &AnalyzerConfig, model: Arc<dyn ModelClient>) -> Self {
        Self::with_extractor(TextExtractor::from_config(config), config, model)
    }

    /// Custom extractor, e.g. with fake strategies in tests.
    pub fn with_extractor(
        extractor: TextExtractor,
        config: &AnalyzerConfig,
        model: Arc<dyn ModelClient>,
    ) -> Self {
        Self {
            extractor,
            model,
            settings: InvocationSettings::from_config(config),
        }
    }

    /// Run one request cycle.
    pub async fn run(&self, document: Option<RawDocument>) -> AnalysisOutcome {
        let start = Instant::now();
        let mut run = Run::default();

        let outcome = match self.drive(&mut run, document).await {
            Ok(outcome) => {
                run.advance(Stage::Succeeded);
                outcome
            }
            Err(failure) => {
                warn!(
                    "Analysis failed while {}: {:?}: {}",
                    run.stage, failure.kind, failure.message
                );
                run.advance(Stage::Failed);
                AnalysisOutcome::Failure(failure)
            }
        };

        info!("Analysis finished in {}ms", start.elapsed().as_millis());
        outcome
    }

    async fn drive(
        &self,
        run: &mut Run,
        document: Option<RawDocument>,
    ) -> Result<AnalysisOutcome, AnalysisFailure> {
        run.advance(Stage::Validating);
        let (document, content_type) = validate(document)?;
        info!(
            "Received {} ({} bytes, {:?})",
            document.file_name().unwrap_or("<unnamed>"),
            document.len(),
            content_type
        );

        run.advance(Stage::Extracting);
        let text = self
            .extractor
            .extract(document.into_bytes(), content_type)
            .await
            .map_err(|e| AnalysisFailure::new(ErrorKind::from(&e), e.to_string()))?;

        run.advance(Stage::Prompting);
        let prompt = build_analysis_prompt(&text);
        debug!("Prompt is {} chars", prompt.chars().count());

        run.advance(Stage::Invoking);
        info!("Calling model {}", self.model.model_name());
        let reply = self
            .model
            .complete(&prompt, &self.settings)
            .await
            .map_err(|e| {
                warn!("Model {} failed: {}", self.model.model_name(), e);
                AnalysisFailure::new(ErrorKind::ModelInvocationFailed, MODEL_FAILED_MESSAGE)
            })?;

        run.advance(Stage::Sanitizing);
        let record = sanitize::parse_record(&reply).map_err(parse_failure)?;

        Ok(AnalysisOutcome::Success {
            record,
            metadata: metadata_for(&text),
        })
    }
}

#[derive(Debug)]
struct Run {
    stage: Stage,
}

impl Default for Run {
    fn default() -> Self {
        Self { stage: Stage::Idle }
    }
}

impl Run {
    fn advance(&mut self, next: Stage) {
        debug!("Stage {} -> {}", self.stage, next);
        self.stage = next;
    }
}

fn validate(
    document: Option<RawDocument>,
) -> Result<(RawDocument, ContentType), AnalysisFailure> {
    let document =
        document.ok_or_else(|| AnalysisFailure::new(ErrorKind::NoFile, NO_FILE_MESSAGE))?;
    let content_type = document.content_type().ok_or_else(|| {
        warn!("Rejected declared type '{}'", document.declared_type());
        AnalysisFailure::new(ErrorKind::UnsupportedType, UNSUPPORTED_TYPE_MESSAGE)
    })?;
    Ok((document, content_type))
}

fn parse_failure(e: ParseError) -> AnalysisFailure {
    AnalysisFailure {
        kind: ErrorKind::ResponseParseFailed,
        message: PARSE_FAILED_MESSAGE.to_string(),
        debug: Some(DebugInfo {
            raw_response: e.raw,
            cleaned_response: e.cleaned,
        }),
    }
}

fn metadata_for(text: &ExtractedText) -> AnalysisMetadata {
    AnalysisMetadata {
        text_extracted: text.char_count(),
        timestamp: Utc::now(),
    }
}
