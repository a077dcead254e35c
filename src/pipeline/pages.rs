//! Page-wise fallback extraction.
//!
//! Opens the document with a [`PageDocumentLoader`], then fetches the text of
//! the first `max_pages` pages with at most `concurrency` fetches in flight.
//! Fetches complete in any order; each result is written into the slot of
//! its page index, so the joined text always follows document order.

use crate::error::StrategyError;
use crate::pipeline::extract::ExtractionStrategy;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use lopdf::Document;
use std::sync::Arc;
use tracing::{debug, info};

/// An opened document exposing per-page text.
#[async_trait]
pub trait PageDocument: Send + Sync {
    fn page_count(&self) -> usize;

    /// Text of the page at `index` (0-based).
    async fn page_text(&self, index: usize) -> Result<String, StrategyError>;
}

/// Opens documents for page-wise reading.
#[async_trait]
pub trait PageDocumentLoader: Send + Sync {
    async fn load(&self, bytes: Bytes) -> Result<Arc<dyn PageDocument>, StrategyError>;
}

/// Fallback strategy: read a bounded number of pages concurrently.
pub struct PageWiseStrategy {
    loader: Arc<dyn PageDocumentLoader>,
    max_pages: usize,
    concurrency: usize,
}

impl PageWiseStrategy {
    pub fn new(loader: Arc<dyn PageDocumentLoader>, max_pages: usize, concurrency: usize) -> Self {
        Self {
            loader,
            max_pages,
            concurrency: concurrency.max(1),
        }
    }
}

#[async_trait]
impl ExtractionStrategy for PageWiseStrategy {
    fn name(&self) -> &'static str {
        "page-wise"
    }

    async fn extract(&self, bytes: Bytes) -> Result<String, StrategyError> {
        let document = self.loader.load(bytes).await?;
        let total = document.page_count();
        let count = total.min(self.max_pages);
        if count < total {
            info!("Reading first {} of {} pages", count, total);
        }

        let texts = fetch_pages_in_order(&document, count, self.concurrency).await?;
        Ok(texts.join(" "))
    }
}

/// Fetch pages `0..count` with bounded concurrency, returned in page order.
///
/// The first failing page fails the whole fetch.
pub async fn fetch_pages_in_order(
    document: &Arc<dyn PageDocument>,
    count: usize,
    concurrency: usize,
) -> Result<Vec<String>, StrategyError> {
    let mut slots: Vec<Option<String>> = vec![None; count];

    let mut fetches = stream::iter(0..count)
        .map(|idx| {
            let document = Arc::clone(document);
            async move { (idx, document.page_text(idx).await) }
        })
        .buffer_unordered(concurrency.max(1));

    while let Some((idx, result)) = fetches.next().await {
        let text = result?;
        debug!("Page {}: {} bytes of text", idx + 1, text.len());
        slots[idx] = Some(text);
    }

    Ok(slots.into_iter().flatten().collect())
}

// ── lopdf backend ────────────────────────────────────────────────────────────

/// Loads documents with `lopdf` (pure Rust, no native library).
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfLoader;

#[async_trait]
impl PageDocumentLoader for LopdfLoader {
    async fn load(&self, bytes: Bytes) -> Result<Arc<dyn PageDocument>, StrategyError> {
        let document = tokio::task::spawn_blocking(move || Document::load_mem(&bytes))
            .await
            .map_err(|e| StrategyError::TaskAborted(format!("lopdf load panicked: {}", e)))?
            .map_err(|e| StrategyError::Load(e.to_string()))?;

        // get_pages() is keyed by 1-based page number in document order.
        let page_numbers: Vec<u32> = document.get_pages().into_keys().collect();
        info!("lopdf loaded {} pages", page_numbers.len());

        Ok(Arc::new(LopdfDocument {
            document: Arc::new(document),
            page_numbers,
        }))
    }
}

struct LopdfDocument {
    document: Arc<Document>,
    page_numbers: Vec<u32>,
}

#[async_trait]
impl PageDocument for LopdfDocument {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    async fn page_text(&self, index: usize) -> Result<String, StrategyError> {
        let page = index + 1;
        let number = *self.page_numbers.get(index).ok_or_else(|| StrategyError::Page {
            page,
            detail: format!("document has {} pages", self.page_numbers.len()),
        })?;
        let document = Arc::clone(&self.document);

        tokio::task::spawn_blocking(move || document.extract_text(&[number]))
            .await
            .map_err(|e| StrategyError::TaskAborted(format!("lopdf page {} panicked: {}", page, e)))?
            .map_err(|e| StrategyError::Page {
                page,
                detail: e.to_string(),
            })
    }
}
