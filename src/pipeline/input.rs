//! Input documents: declared content types and input resolution.
//!
//! The HTTP endpoint builds a [`RawDocument`] straight from the multipart
//! part. The CLI goes through [`resolve_input`], which reads a local file or
//! downloads a URL into memory. In both cases the content type is the
//! *declared* one (part header, file extension, response `Content-Type`);
//! bytes are never sniffed.

use crate::error::DeckError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Declared type used when nothing better is known.
const UNKNOWN_MIME: &str = "application/octet-stream";

/// The two accepted document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Pdf,
    Docx,
}

impl ContentType {
    /// Parse a MIME type, ignoring parameters (`; charset=…`) and case.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            PDF_MIME => Some(ContentType::Pdf),
            DOCX_MIME => Some(ContentType::Docx),
            _ => None,
        }
    }

    /// Guess from a file extension (`.pdf`, `.docx`).
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(ContentType::Pdf),
            "docx" => Some(ContentType::Docx),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ContentType::Pdf => PDF_MIME,
            ContentType::Docx => DOCX_MIME,
        }
    }
}

/// An uploaded document: bytes plus the MIME type its sender declared.
#[derive(Debug, Clone)]
pub struct RawDocument {
    bytes: Bytes,
    declared_type: String,
    file_name: Option<String>,
}

impl RawDocument {
    pub fn new(bytes: impl Into<Bytes>, declared_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            declared_type: declared_type.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// The accepted content type, or `None` if the declared type is not one.
    pub fn content_type(&self) -> Option<ContentType> {
        ContentType::from_mime(&self.declared_type)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a local path or HTTP(S) URL to an in-memory document.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<RawDocument, DeckError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(Path::new(input)).await
    }
}

/// Read a local file; the declared type comes from its extension.
async fn resolve_local(path: &Path) -> Result<RawDocument, DeckError> {
    let path_buf = path.to_path_buf();
    if !path.exists() {
        return Err(DeckError::FileNotFound { path: path_buf });
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => DeckError::PermissionDenied {
            path: path_buf.clone(),
        },
        std::io::ErrorKind::NotFound => DeckError::FileNotFound {
            path: path_buf.clone(),
        },
        _ => DeckError::Io {
            path: path_buf.clone(),
            source: e,
        },
    })?;

    let declared = ContentType::from_extension(path).map_or(UNKNOWN_MIME, ContentType::mime);
    debug!("Resolved local document: {} ({})", path.display(), declared);

    let mut document = RawDocument::new(bytes, declared);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        document = document.with_file_name(name);
    }
    Ok(document)
}

/// Download a URL into memory.
///
/// The declared type is the response `Content-Type`, unless the server only
/// says `application/octet-stream` (or nothing), in which case the URL's
/// extension decides.
async fn download_url(url: &str, timeout_secs: u64) -> Result<RawDocument, DeckError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DeckError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            DeckError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            DeckError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(DeckError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let header_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let file_name = extract_filename(url);

    let bytes = response.bytes().await.map_err(|e| DeckError::DownloadFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let declared = declared_type_for_download(header_type.as_deref(), file_name.as_deref());
    info!("Downloaded {} bytes ({})", bytes.len(), declared);

    let mut document = RawDocument::new(bytes, declared);
    if let Some(name) = file_name {
        document = document.with_file_name(name);
    }
    Ok(document)
}

fn declared_type_for_download(header: Option<&str>, file_name: Option<&str>) -> String {
    match header {
        Some(h) if !h.trim().is_empty() && !h.starts_with(UNKNOWN_MIME) => h.to_string(),
        _ => file_name
            .and_then(|n| ContentType::from_extension(&PathBuf::from(n)))
            .map_or(UNKNOWN_MIME, ContentType::mime)
            .to_string(),
    }
}

/// Last path segment of the URL, if it looks like a file name.
fn extract_filename(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if !last.is_empty() && last.contains('.') {
        Some(last.to_string())
    } else {
        None
    }
}
