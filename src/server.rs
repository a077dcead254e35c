//! HTTP endpoint.
//!
//! `POST {route}` takes a `multipart/form-data` upload and answers with the
//! serialized [`AnalysisOutcome`]; `GET /health` is a liveness probe.
//!
//! The uploaded part's declared `Content-Type` is passed through untouched.
//! Analysis runs in its own task so that a panic anywhere below the handler
//! becomes a 500 response instead of a dropped connection.

use crate::analyze::AnalysisOrchestrator;
use crate::config::ServerConfig;
use crate::error::{DeckError, ErrorKind};
use crate::output::AnalysisOutcome;
use crate::pipeline::input::RawDocument;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument, warn};

/// Multipart field the upload form uses for the deck.
pub const FILE_FIELD: &str = "pitchDeck";

/// Shared by every request.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<AnalysisOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

/// Build the application router.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route(&config.route, post(analyze_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.bind` and serve until Ctrl-C.
#[instrument(skip(state, config), fields(addr = %config.bind))]
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<(), DeckError> {
    let app = router(state, config);
    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|source| DeckError::Bind {
            addr: config.bind,
            source,
        })?;

    info!("Listening on http://{}{}", config.bind, config.route);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(DeckError::Serve)?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

impl IntoResponse for AnalysisOutcome {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

async fn analyze_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AnalysisOutcome {
    let document = match multipart {
        Ok(form) => match read_upload(form).await {
            Ok(doc) => doc,
            Err(outcome) => return outcome,
        },
        Err(rejection) => {
            warn!("Request is not a multipart form: {}", rejection);
            None
        }
    };

    let orchestrator = Arc::clone(&state.orchestrator);
    match tokio::spawn(async move { orchestrator.run(document).await }).await {
        Ok(outcome) => outcome,
        Err(join_error) => {
            error!("Analysis task aborted: {}", join_error);
            AnalysisOutcome::failure(ErrorKind::InternalError, "Internal server error")
        }
    }
}

/// Pick the uploaded file out of the form.
///
/// The `pitchDeck` field wins; otherwise the first field that carries a file
/// name. A form that cannot be read is treated as having no file, except when
/// it exceeds the upload limit.
async fn read_upload(mut form: Multipart) -> Result<Option<RawDocument>, AnalysisOutcome> {
    let mut fallback: Option<RawDocument> = None;

    loop {
        let field = match form.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return unreadable_form(e).map(|()| fallback),
        };

        let name = field.name().unwrap_or_default().to_string();
        let is_named = name == FILE_FIELD;
        let file_name = field.file_name().map(str::to_string);
        if !is_named && (file_name.is_none() || fallback.is_some()) {
            debug!("Skipping form field '{}'", name);
            continue;
        }

        let declared = field.content_type().unwrap_or_default().to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return unreadable_form(e).map(|()| fallback),
        };

        let mut document = RawDocument::new(bytes, declared);
        if let Some(file_name) = file_name {
            document = document.with_file_name(file_name);
        }

        if is_named {
            return Ok(Some(document));
        }
        fallback = Some(document);
    }

    Ok(fallback)
}

fn unreadable_form(e: MultipartError) -> Result<(), AnalysisOutcome> {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Upload rejected: {}", e);
        return Err(AnalysisOutcome::failure(
            ErrorKind::FileTooLarge,
            "Uploaded file is too large",
        ));
    }
    warn!("Unreadable multipart body: {}", e);
    Ok(())
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
