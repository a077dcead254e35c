//! # pitchdeck-analyzer
//!
//! Turn an uploaded pitch deck into a structured investor analysis.
//!
//! ## Why this crate?
//!
//! Two things go wrong when a deck is handed to a language model. PDFs come
//! out of every slide tool imaginable, and a single reader chokes on a good
//! share of them. And the model, asked for JSON, answers with code fences,
//! a friendly preamble, or keys it decided to skip. This crate wraps both
//! ends: a fallback chain of PDF readers on the way in, and a sanitizer that
//! turns the reply into a complete [`AnalysisRecord`] on the way out.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Validate  declared MIME type: PDF or DOCX
//!  ├─ 2. Extract   pdfium, then lopdf page by page (≤ 20 pages, concurrent)
//!  ├─ 3. Normalize collapse whitespace, cut to 8000 chars, reject < 50
//!  ├─ 4. Prompt    fixed analyst template with the five JSON keys
//!  ├─ 5. Model     one completion, temperature 0.3
//!  └─ 6. Sanitize  strip fences, slice the outer braces, parse, backfill
//! ```
//!
//! Every failure along the way ends up as an [`AnalysisOutcome::Failure`]
//! tagged with an [`ErrorKind`], which fixes its HTTP status.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pitchdeck_analyzer::{AnalysisOrchestrator, AnalyzerConfig, ProviderClient, RawDocument};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = AnalyzerConfig::default();
//!     let model = Arc::new(ProviderClient::from_config(&config)?);
//!     let analyzer = AnalysisOrchestrator::new(&config, model);
//!
//!     let bytes = std::fs::read("deck.pdf")?;
//!     let outcome = analyzer
//!         .run(Some(RawDocument::new(bytes, "application/pdf")))
//!         .await;
//!     println!("{}", serde_json::to_string_pretty(&outcome)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `deck-analyzer` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pitchdeck-analyzer = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{AnalysisOrchestrator, Stage};
pub use config::{AnalyzerConfig, AnalyzerConfigBuilder, ServerConfig};
pub use error::{DeckError, ErrorKind, ExtractionError, ModelError, ParseError, ParseFailure};
pub use output::{AnalysisFailure, AnalysisMetadata, AnalysisOutcome, AnalysisRecord, DebugInfo};
pub use pipeline::extract::{ExtractedText, ExtractionStrategy, TextExtractor};
pub use pipeline::input::{ContentType, RawDocument};
pub use pipeline::llm::{InvocationSettings, ModelClient, ProviderClient};
pub use server::{router, serve, AppState};
