//! HTTP surface tests: the axum router driven in-process with `oneshot`.
//!
//! Multipart bodies are assembled by hand so each test controls field
//! names, file names and declared content types exactly.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use bytes::Bytes;
use pitchdeck_analyzer::error::StrategyError;
use pitchdeck_analyzer::{
    router, AnalysisOrchestrator, AnalyzerConfig, AppState, ExtractionStrategy,
    InvocationSettings, ModelClient, ModelError, ServerConfig, TextExtractor,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "----deck-analyzer-test-boundary";
const ROUTE: &str = "/api/DeckAnalyzer";
const FULL_REPLY: &str = r#"{"marketSize":"X","productSummary":"Y","teamOverview":"Z","tractionSummary":"W","redFlags":["Single customer"]}"#;

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Treats the uploaded bytes as the deck text, so tests choose the text.
struct EchoBytes;

#[async_trait]
impl ExtractionStrategy for EchoBytes {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn extract(&self, bytes: Bytes) -> Result<String, StrategyError> {
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

enum Behaviour {
    Reply(&'static str),
    Panic,
}

struct FakeModel(Behaviour);

#[async_trait]
impl ModelClient for FakeModel {
    fn model_name(&self) -> &str {
        "fake"
    }

    async fn complete(
        &self,
        _prompt: &str,
        _settings: &InvocationSettings,
    ) -> Result<String, ModelError> {
        match self.0 {
            Behaviour::Reply(r) => Ok(r.to_string()),
            Behaviour::Panic => panic!("provider client bug"),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn app_with(behaviour: Behaviour, server: ServerConfig) -> axum::Router {
    let config = AnalyzerConfig::default();
    let extractor = TextExtractor::with_strategies(vec![Arc::new(EchoBytes)], &config);
    let orchestrator =
        AnalysisOrchestrator::with_extractor(extractor, &config, Arc::new(FakeModel(behaviour)));
    router(AppState::new(Arc::new(orchestrator)), &server)
}

fn app(behaviour: Behaviour) -> axum::Router {
    app_with(behaviour, ServerConfig::default())
}

struct Part<'a> {
    name: &'a str,
    file_name: Option<&'a str>,
    content_type: Option<&'a str>,
    data: &'a [u8],
}

fn file<'a>(name: &'a str, file_name: &'a str, content_type: &'a str, data: &'a [u8]) -> Part<'a> {
    Part {
        name,
        file_name: Some(file_name),
        content_type: Some(content_type),
        data,
    }
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(f) = part.file_name {
            disposition.push_str(&format!("; filename=\"{f}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(ct) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(ROUTE)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

const DECK: &[u8] = b"Harbor Robotics automates container lashing at mid-size ports. \
    Pilots with two terminal operators, seed round of 3M USD.";

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn analyzes_pitch_deck_field() {
    let req = upload(&[file("pitchDeck", "harbor.pdf", "application/pdf", DECK)]);
    let (status, body) = send(app(Behaviour::Reply(FULL_REPLY)), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["analysis"]["marketSize"], "X");
    assert_eq!(body["analysis"]["redFlags"][0], "Single customer");
    let expected = String::from_utf8_lossy(DECK)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .count();
    assert_eq!(body["metadata"]["textExtracted"], expected);
    assert!(body["metadata"]["timestamp"].is_string());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn form_without_file_is_400() {
    let req = upload(&[Part {
        name: "company",
        file_name: None,
        content_type: None,
        data: b"Harbor Robotics",
    }]);
    let (status, body) = send(app(Behaviour::Reply(FULL_REPLY)), req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No file uploaded");
}

#[tokio::test]
async fn non_multipart_body_is_treated_as_no_file() {
    let req = Request::builder()
        .method("POST")
        .uri(ROUTE)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"pitchDeck":"deck.pdf"}"#))
        .unwrap();
    let (status, body) = send(app(Behaviour::Reply(FULL_REPLY)), req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded");
}

#[tokio::test]
async fn unsupported_type_is_400() {
    let req = upload(&[file("pitchDeck", "slide.png", "image/png", DECK)]);
    let (status, body) = send(app(Behaviour::Reply(FULL_REPLY)), req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Unsupported file type"));
}

#[tokio::test]
async fn other_file_field_is_accepted() {
    let req = upload(&[file("deck", "harbor.pdf", "application/pdf", DECK)]);
    let (status, body) = send(app(Behaviour::Reply(FULL_REPLY)), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn pitch_deck_field_wins_over_earlier_file() {
    let req = upload(&[
        file("logo", "logo.png", "image/png", b"\x89PNG not a deck"),
        file("pitchDeck", "harbor.pdf", "application/pdf", DECK),
    ]);
    let (status, body) = send(app(Behaviour::Reply(FULL_REPLY)), req).await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
}

#[tokio::test]
async fn short_deck_is_400() {
    let req = upload(&[file("pitchDeck", "tiny.pdf", "application/pdf", b"Pitch deck")]);
    let (status, body) = send(app(Behaviour::Reply(FULL_REPLY)), req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("image-based"));
}

#[tokio::test]
async fn malformed_reply_is_422_with_debug() {
    let reply = "```json\n{\"marketSize\": \"X\", \"productSummary\": \"trunc";
    let req = upload(&[file("pitchDeck", "harbor.pdf", "application/pdf", DECK)]);
    let (status, body) = send(app(Behaviour::Reply(reply)), req).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Failed to parse AI response as JSON");
    assert_eq!(body["debug"]["rawResponse"], reply);
    assert_eq!(
        body["debug"]["cleanedResponse"],
        "{\"marketSize\": \"X\", \"productSummary\": \"trunc"
    );
}

#[tokio::test]
async fn panicking_analysis_is_500() {
    let req = upload(&[file("pitchDeck", "harbor.pdf", "application/pdf", DECK)]);
    let (status, body) = send(app(Behaviour::Panic), req).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body.get("debug").is_none());
}

#[tokio::test]
async fn oversized_upload_is_413() {
    let server = ServerConfig {
        max_upload_bytes: 1024,
        ..ServerConfig::default()
    };
    let big = vec![b'a'; 8 * 1024];
    let req = upload(&[file("pitchDeck", "big.pdf", "application/pdf", &big)]);
    let (status, body) = send(app_with(Behaviour::Reply(FULL_REPLY), server), req).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn custom_route_is_honoured() {
    let server = ServerConfig {
        route: "/analyze".to_string(),
        ..ServerConfig::default()
    };
    let mut req = upload(&[file("pitchDeck", "harbor.pdf", "application/pdf", DECK)]);
    *req.uri_mut() = "/analyze".parse().unwrap();
    let (status, _) = send(app_with(Behaviour::Reply(FULL_REPLY), server), req).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_endpoint() {
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(Behaviour::Reply(FULL_REPLY)), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
