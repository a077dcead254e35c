//! Whole-document text extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto the blocking pool, and a
//! panic inside pdfium surfaces as a `JoinError` instead of unwinding into
//! the request.
//!
//! ## Binding
//!
//! The shared library is bound per extraction: from
//! [`AnalyzerConfig::pdfium_library_path`](crate::AnalyzerConfig) when set,
//! otherwise from the system library search path. A missing library is an
//! ordinary strategy failure; the page-wise fallback still runs.

use crate::error::StrategyError;
use crate::pipeline::extract::ExtractionStrategy;
use async_trait::async_trait;
use bytes::Bytes;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Primary strategy: load the full buffer with pdfium and read every page.
#[derive(Debug, Clone, Default)]
pub struct PdfiumTextStrategy {
    library_path: Option<PathBuf>,
}

impl PdfiumTextStrategy {
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }
}

#[async_trait]
impl ExtractionStrategy for PdfiumTextStrategy {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    async fn extract(&self, bytes: Bytes) -> Result<String, StrategyError> {
        let library_path = self.library_path.clone();

        tokio::task::spawn_blocking(move || {
            extract_text_blocking(library_path.as_deref(), &bytes)
        })
        .await
        .map_err(|e| StrategyError::TaskAborted(format!("pdfium task panicked: {}", e)))?
    }
}

fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, StrategyError> {
    let bindings = match library_path {
        Some(path) if path.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
        }
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| StrategyError::EngineUnavailable(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of whole-document extraction.
fn extract_text_blocking(library_path: Option<&Path>, bytes: &[u8]) -> Result<String, StrategyError> {
    let pdfium = bind_pdfium(library_path)?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| StrategyError::Load(format!("{:?}", e)))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let mut parts = Vec::with_capacity(total_pages);
    for (idx, page) in pages.iter().enumerate() {
        match page.text() {
            Ok(text) => parts.push(text.all()),
            Err(e) => {
                warn!("pdfium: no text layer on page {}: {:?}", idx + 1, e);
                return Err(StrategyError::Page {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                });
            }
        }
    }

    let text = parts.join("\n");
    debug!("pdfium extracted {} bytes from {} pages", text.len(), total_pages);
    Ok(text)
}
