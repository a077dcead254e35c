//! Error types for the pitchdeck-analyzer library.
//!
//! Errors are split by how far they travel:
//!
//! * [`DeckError`]: fatal setup errors. The analyzer cannot be built or
//!   the input cannot be read at all (bad configuration, provider not
//!   configured, missing file). Returned as `Err(DeckError)` from
//!   constructors and input resolution.
//!
//! * [`StrategyError`]: one extraction strategy failed. Logged and
//!   swallowed by the extractor, which moves on to the next strategy.
//!
//! * [`ExtractionError`], [`ModelError`], [`ParseError`]: stage failures.
//!   The orchestrator folds them into an
//!   [`AnalysisFailure`](crate::output::AnalysisFailure) tagged with an
//!   [`ErrorKind`]; none of them escapes a request.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors returned while configuring the analyzer or reading input.
#[derive(Debug, Error)]
pub enum DeckError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Server errors ─────────────────────────────────────────────────────
    /// The listening socket could not be opened.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a single extraction strategy.
///
/// Never surfaces to callers on its own: the extractor logs it and tries the
/// next strategy in the chain.
#[derive(Debug, Clone, Error)]
pub enum StrategyError {
    /// The PDF engine could not be loaded (missing shared library, etc.).
    #[error("PDF engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The document could not be opened or parsed.
    #[error("failed to load document: {0}")]
    Load(String),

    /// Text of one page could not be read (1-indexed).
    #[error("failed to read text of page {page}: {detail}")]
    Page { page: usize, detail: String },

    /// The blocking worker panicked or was cancelled.
    #[error("extraction task aborted: {0}")]
    TaskAborted(String),
}

/// Why no usable text came out of a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// Every strategy failed.
    #[error("Unable to parse PDF. Please ensure the file is a valid text-based PDF.")]
    Unparseable,

    /// Text was extracted but is below the minimum useful length.
    #[error(
        "No meaningful text could be extracted. The PDF may be image-based or corrupted."
    )]
    TooShort { chars: usize, min: usize },
}

/// Failure of the language-model collaborator.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The provider returned an error (network, auth, rate limit, …).
    #[error("LLM API error: {0}")]
    Provider(String),

    /// The provider answered, but with no content.
    #[error("LLM returned an empty response")]
    EmptyReply,
}

/// Why a sanitized model reply could not become an
/// [`AnalysisRecord`](crate::output::AnalysisRecord).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    /// Not valid JSON at all.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    /// Valid JSON, but the top level is not an object.
    #[error("top-level JSON value is not an object")]
    NotAnObject,
    /// A mandatory key is present with the wrong JSON type.
    #[error("key '{key}' must be {expected}")]
    WrongType {
        key: &'static str,
        expected: &'static str,
    },
}

/// A model reply that could not be parsed into a record.
///
/// Carries both the raw reply and its sanitized form so the caller can
/// surface them as debug information.
#[derive(Debug, Clone, Error)]
#[error("Failed to parse AI response as JSON: {reason}")]
pub struct ParseError {
    pub raw: String,
    pub cleaned: String,
    pub reason: ParseFailure,
}

/// Category of a failed analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NoFile,
    UnsupportedType,
    ExtractionFailed,
    ContentTooShort,
    ModelInvocationFailed,
    ResponseParseFailed,
    InternalError,
    /// Request body exceeded the upload limit.
    FileTooLarge,
}

impl ErrorKind {
    /// HTTP status code reported for this kind of failure.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::NoFile
            | ErrorKind::UnsupportedType
            | ErrorKind::ExtractionFailed
            | ErrorKind::ContentTooShort => 400,
            ErrorKind::FileTooLarge => 413,
            ErrorKind::ResponseParseFailed => 422,
            ErrorKind::ModelInvocationFailed | ErrorKind::InternalError => 500,
        }
    }
}

impl From<&ExtractionError> for ErrorKind {
    fn from(e: &ExtractionError) -> Self {
        match e {
            ExtractionError::Unparseable => ErrorKind::ExtractionFailed,
            ExtractionError::TooShort { .. } => ErrorKind::ContentTooShort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_class() {
        assert_eq!(ErrorKind::NoFile.http_status(), 400);
        assert_eq!(ErrorKind::UnsupportedType.http_status(), 400);
        assert_eq!(ErrorKind::ExtractionFailed.http_status(), 400);
        assert_eq!(ErrorKind::ContentTooShort.http_status(), 400);
        assert_eq!(ErrorKind::FileTooLarge.http_status(), 413);
        assert_eq!(ErrorKind::ResponseParseFailed.http_status(), 422);
        assert_eq!(ErrorKind::ModelInvocationFailed.http_status(), 500);
        assert_eq!(ErrorKind::InternalError.http_status(), 500);
    }

    #[test]
    fn extraction_errors_map_one_to_one() {
        assert_eq!(
            ErrorKind::from(&ExtractionError::Unparseable),
            ErrorKind::ExtractionFailed
        );
        assert_eq!(
            ErrorKind::from(&ExtractionError::TooShort { chars: 3, min: 50 }),
            ErrorKind::ContentTooShort
        );
    }

    #[test]
    fn too_short_display_mentions_image_based() {
        let e = ExtractionError::TooShort { chars: 10, min: 50 };
        assert!(e.to_string().contains("image-based"), "got: {e}");
    }

    #[test]
    fn parse_error_display_includes_reason() {
        let e = ParseError {
            raw: "x".into(),
            cleaned: "x".into(),
            reason: ParseFailure::WrongType {
                key: "redFlags",
                expected: "an array of strings",
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("redFlags"), "got: {msg}");
        assert!(msg.starts_with("Failed to parse AI response as JSON"));
    }

    #[test]
    fn parse_failure_messages() {
        assert_eq!(
            ParseFailure::InvalidJson("EOF while parsing".into()).to_string(),
            "invalid JSON: EOF while parsing"
        );
        assert_eq!(
            ParseFailure::NotAnObject.to_string(),
            "top-level JSON value is not an object"
        );
        let wrong = ParseFailure::WrongType {
            key: "marketSize",
            expected: "a string",
        };
        assert_eq!(wrong.to_string(), "key 'marketSize' must be a string");
        let _: &dyn std::error::Error = &wrong;
    }

    #[test]
    fn download_timeout_display() {
        let e = DeckError::DownloadTimeout {
            url: "https://example.com/deck.pdf".into(),
            secs: 30,
        };
        assert!(e.to_string().contains("30s"));
    }
}
