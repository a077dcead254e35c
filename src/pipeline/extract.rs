//! Text extraction: document bytes → normalized, length-bounded text.
//!
//! PDFs in the wild are produced by every slide tool imaginable, and no
//! single reader copes with all of them. [`TextExtractor`] therefore holds an
//! ordered list of [`ExtractionStrategy`] values and tries them in turn:
//!
//! ```text
//! bytes ──▶ pdfium (whole document) ──fail──▶ lopdf (page-wise, ≤ 20 pages)
//!                  │                                  │
//!                  └──────────── first usable text ◀──┘
//!                                      │
//!                      normalize (collapse whitespace, trim, truncate)
//!                                      │
//!                         min-length check ──▶ ExtractedText
//! ```
//!
//! Each strategy is its own failure domain: an error (or a panic inside a
//! blocking worker) is logged and the next strategy still runs.

use crate::config::AnalyzerConfig;
use crate::error::{ExtractionError, StrategyError};
use crate::pipeline::input::ContentType;
use crate::pipeline::pages::{LopdfLoader, PageWiseStrategy};
use crate::pipeline::pdfium::PdfiumTextStrategy;
use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One way of turning document bytes into raw text.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Extract the raw (un-normalized) text of the document.
    async fn extract(&self, bytes: Bytes) -> Result<String, StrategyError>;
}

/// Normalized document text.
///
/// Invariant: whitespace runs are collapsed to single spaces, there is no
/// leading or trailing whitespace, and `char_count` never exceeds the
/// configured maximum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    text: String,
    char_count: usize,
    truncated: bool,
}

impl ExtractedText {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters (Unicode scalar values), not bytes.
    pub fn char_count(&self) -> usize {
        self.char_count
    }

    /// Whether text past the character limit was cut off.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse whitespace runs, trim, and cut to the first `max_chars`
/// characters. The cut is a hard character boundary, not sentence-aware.
pub fn normalize(raw: &str, max_chars: usize) -> ExtractedText {
    let collapsed = RE_WHITESPACE.replace_all(raw, " ");
    let trimmed = collapsed.trim();

    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => ExtractedText {
            text: trimmed[..cut].to_string(),
            char_count: max_chars,
            truncated: true,
        },
        None => ExtractedText {
            text: trimmed.to_string(),
            char_count: trimmed.chars().count(),
            truncated: false,
        },
    }
}

/// Runs the strategy chain and enforces the length bounds.
pub struct TextExtractor {
    strategies: Vec<Arc<dyn ExtractionStrategy>>,
    max_chars: usize,
    min_chars: usize,
}

impl TextExtractor {
    /// The default chain: pdfium over the whole document, then lopdf
    /// page by page.
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        let strategies: Vec<Arc<dyn ExtractionStrategy>> = vec![
            Arc::new(PdfiumTextStrategy::new(config.pdfium_library_path.clone())),
            Arc::new(PageWiseStrategy::new(
                Arc::new(LopdfLoader),
                config.max_fallback_pages,
                config.page_concurrency,
            )),
        ];
        Self::with_strategies(strategies, config)
    }

    /// A custom chain, tried in the given order.
    pub fn with_strategies(
        strategies: Vec<Arc<dyn ExtractionStrategy>>,
        config: &AnalyzerConfig,
    ) -> Self {
        Self {
            strategies,
            max_chars: config.max_text_chars,
            min_chars: config.min_text_chars,
        }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Extract normalized text from a document of the given type.
    pub async fn extract(
        &self,
        bytes: Bytes,
        content_type: ContentType,
    ) -> Result<ExtractedText, ExtractionError> {
        if content_type != ContentType::Pdf {
            warn!("No text extractor for {:?} documents", content_type);
            return Err(ExtractionError::Unparseable);
        }

        let raw = self.run_chain(bytes).await?;
        let text = normalize(&raw, self.max_chars);
        if text.truncated() {
            debug!("Extracted text truncated to {} chars", self.max_chars);
        }

        if text.char_count() < self.min_chars {
            warn!(
                "Extracted only {} chars (minimum {})",
                text.char_count(),
                self.min_chars
            );
            return Err(ExtractionError::TooShort {
                chars: text.char_count(),
                min: self.min_chars,
            });
        }

        info!("Extracted {} chars of text", text.char_count());
        Ok(text)
    }

    /// Try each strategy in order; the first non-blank result wins.
    ///
    /// Blank output from a strategy that did parse the document is kept as a
    /// last resort so an image-only deck is reported as too short rather than
    /// unparseable.
    async fn run_chain(&self, bytes: Bytes) -> Result<String, ExtractionError> {
        let mut blank: Option<String> = None;

        for strategy in &self.strategies {
            let attempt = AssertUnwindSafe(strategy.extract(bytes.clone()))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(StrategyError::TaskAborted(format!(
                        "strategy '{}' panicked",
                        strategy.name()
                    )))
                });

            match attempt {
                Ok(text) if !text.trim().is_empty() => {
                    debug!("Strategy '{}' produced {} bytes", strategy.name(), text.len());
                    return Ok(text);
                }
                Ok(text) => {
                    warn!("Strategy '{}' found no text", strategy.name());
                    blank.get_or_insert(text);
                }
                Err(e) => {
                    warn!("Strategy '{}' failed: {}", strategy.name(), e);
                }
            }
        }

        blank.ok_or(ExtractionError::Unparseable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        name: &'static str,
        result: Result<String, StrategyError>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn ok(name: &'static str, text: &str) -> Arc<Self> {
            Arc::new(Self {
                name,
                result: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn err(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                result: Err(StrategyError::Load("bad xref".into())),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ExtractionStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn extract(&self, _bytes: Bytes) -> Result<String, StrategyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    struct Panicking;

    #[async_trait]
    impl ExtractionStrategy for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn extract(&self, _bytes: Bytes) -> Result<String, StrategyError> {
            let worker = tokio::task::spawn_blocking(|| -> String { panic!("corrupt stream") });
            worker
                .await
                .map_err(|e| StrategyError::TaskAborted(e.to_string()))
        }
    }

    struct PanicsInline;

    #[async_trait]
    impl ExtractionStrategy for PanicsInline {
        fn name(&self) -> &'static str {
            "panics-inline"
        }

        async fn extract(&self, bytes: Bytes) -> Result<String, StrategyError> {
            if bytes.is_empty() {
                panic!("unexpected end of stream");
            }
            Ok(String::new())
        }
    }

    const DECK: &str = "Acme builds autonomous forklifts for mid-size warehouses across Europe.";

    fn extractor(strategies: Vec<Arc<dyn ExtractionStrategy>>) -> TextExtractor {
        TextExtractor::with_strategies(strategies, &AnalyzerConfig::default())
    }

    #[test]
    fn normalize_collapses_and_trims() {
        let t = normalize("  Alpha\n\n\tBeta   Gamma \r\n", 8000);
        assert_eq!(t.as_str(), "Alpha Beta Gamma");
        assert_eq!(t.char_count(), 16);
        assert!(!t.truncated());
    }

    #[test]
    fn normalize_truncates_on_char_boundary() {
        let raw = "é".repeat(9000);
        let t = normalize(&raw, 8000);
        assert_eq!(t.char_count(), 8000);
        assert_eq!(t.as_str().chars().count(), 8000);
        assert!(t.truncated());
    }

    #[test]
    fn normalize_never_exceeds_limit() {
        for len in [0, 1, 49, 50, 7999, 8000, 8001, 20_000] {
            let raw = "word ".repeat(len / 5 + 1);
            let t = normalize(&raw[..len.min(raw.len())], 8000);
            assert!(t.char_count() <= 8000);
            assert_eq!(t.char_count(), t.as_str().chars().count());
        }
    }

    #[test]
    fn normalize_exact_limit_is_not_truncated() {
        let t = normalize(&"a".repeat(8000), 8000);
        assert_eq!(t.char_count(), 8000);
        assert!(!t.truncated());
    }

    #[tokio::test]
    async fn primary_success_skips_fallback() {
        let primary = Fixed::ok("primary", DECK);
        let fallback = Fixed::ok("fallback", "unused fallback text that is long enough to pass");
        let ex = extractor(vec![primary.clone(), fallback.clone()]);

        let text = ex.extract(Bytes::from_static(b"%PDF"), ContentType::Pdf).await.unwrap();
        assert_eq!(text.as_str(), DECK);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn primary_failure_falls_back() {
        let fallback = Fixed::ok("fallback", DECK);
        let ex = extractor(vec![Fixed::err("primary"), fallback.clone()]);

        let text = ex.extract(Bytes::new(), ContentType::Pdf).await.unwrap();
        assert_eq!(text.as_str(), DECK);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panic_in_primary_does_not_stop_fallback() {
        let ex = extractor(vec![Arc::new(Panicking), Fixed::ok("fallback", DECK)]);
        let text = ex.extract(Bytes::new(), ContentType::Pdf).await.unwrap();
        assert_eq!(text.as_str(), DECK);
    }

    #[tokio::test]
    async fn inline_panic_is_contained() {
        let ex = extractor(vec![Arc::new(PanicsInline), Fixed::ok("fallback", DECK)]);
        let text = ex.extract(Bytes::new(), ContentType::Pdf).await.unwrap();
        assert_eq!(text.as_str(), DECK);
    }

    #[tokio::test]
    async fn blank_primary_falls_back() {
        let ex = extractor(vec![Fixed::ok("primary", "  \n "), Fixed::ok("fallback", DECK)]);
        let text = ex.extract(Bytes::new(), ContentType::Pdf).await.unwrap();
        assert_eq!(text.as_str(), DECK);
    }

    #[tokio::test]
    async fn all_strategies_failing_is_unparseable() {
        let ex = extractor(vec![Fixed::err("primary"), Fixed::err("fallback")]);
        let err = ex.extract(Bytes::new(), ContentType::Pdf).await.unwrap_err();
        assert_eq!(err, ExtractionError::Unparseable);
    }

    #[tokio::test]
    async fn blank_document_is_too_short() {
        let ex = extractor(vec![Fixed::ok("primary", ""), Fixed::err("fallback")]);
        let err = ex.extract(Bytes::new(), ContentType::Pdf).await.unwrap_err();
        assert_eq!(err, ExtractionError::TooShort { chars: 0, min: 50 });
    }

    #[tokio::test]
    async fn short_text_is_too_short() {
        let ex = extractor(vec![Fixed::ok("primary", "Pitch deck")]);
        let err = ex.extract(Bytes::new(), ContentType::Pdf).await.unwrap_err();
        assert_eq!(err, ExtractionError::TooShort { chars: 10, min: 50 });
    }

    #[tokio::test]
    async fn docx_has_no_extractor() {
        let primary = Fixed::ok("primary", DECK);
        let ex = extractor(vec![primary.clone()]);
        let err = ex.extract(Bytes::new(), ContentType::Docx).await.unwrap_err();
        assert_eq!(err, ExtractionError::Unparseable);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn default_chain_order() {
        let ex = TextExtractor::from_config(&AnalyzerConfig::default());
        assert_eq!(ex.strategy_names(), ["pdfium", "page-wise"]);
    }
}
