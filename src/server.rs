//! HTTP front end.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/generate` | Form fields `language` and `code`; returns the PDF |
//! | `GET`  | `/stats` | Aggregate generation statistics |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! `POST /generate` answers failures with a `text/plain` body holding the
//! pipeline error message, using the status of [`PipelineError::status`].
//! The JSON endpoints use:
//!
//! ```json
//! { "error": { "code": "persistence_unavailable", "message": "..." } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::FormRejection, ConnectInfo, Form, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::PipelineError;
use crate::pipeline::{GenerateRequest, Pipeline};
use crate::stats::StatsResponse;
use crate::store::{Recorder, SqliteOutcomeStore};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pipeline: Arc<Pipeline>,
}

/// Starts the HTTP server on `[server].bind`.
///
/// Opens the outcome database when `[db]` is configured; otherwise outcomes
/// are only logged. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let recorder = match &config.db {
        Some(db_config) => Recorder::new(Arc::new(SqliteOutcomeStore::open(db_config).await?)),
        None => {
            tracing::warn!("no [db] section configured, generation outcomes will not be stored");
            Recorder::disabled()
        }
    };
    let pipeline = Arc::new(Pipeline::new(config, recorder));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    println!("inkpress listening on http://{}", config.server.bind);
    serve(listener, pipeline, Arc::new(config.clone())).await
}

/// Serves the router on an already bound listener.
pub async fn serve(
    listener: tokio::net::TcpListener,
    pipeline: Arc<Pipeline>,
    config: Arc<Config>,
) -> anyhow::Result<()> {
    let app = router(AppState { config, pipeline });
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/generate", post(handle_generate))
        .route("/stats", get(handle_stats))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// JSON error for the non-pipeline endpoints.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

// ============ POST /generate ============

/// Dialect assumed when the form omits `language`.
const DEFAULT_LANGUAGE: &str = "python";

#[derive(Debug, Deserialize)]
struct GenerateForm {
    #[serde(default, alias = "dialect")]
    language: Option<String>,
    #[serde(default, alias = "text")]
    code: Option<String>,
}

/// First `X-Forwarded-For` entry, else the peer address.
fn caller_address(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}

async fn handle_generate(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    form: Result<Form<GenerateForm>, FormRejection>,
) -> Result<Response, PipelineError> {
    let caller = caller_address(&headers, peer);
    let run = match form {
        Ok(Form(form)) => {
            let language = form
                .language
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
            let request =
                GenerateRequest::new(language, form.code.unwrap_or_default()).with_caller(caller);
            state.pipeline.run(request).await
        }
        // Unreadable body: recorded as a validation failure.
        Err(rejection) => state.pipeline.reject(
            GenerateRequest::new(DEFAULT_LANGUAGE, "").with_caller(caller),
            PipelineError::Validation(rejection.body_text()),
        ),
    };

    let pdf = run.result?;
    let disposition = format!("attachment; filename=\"{}\"", pdf.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf.bytes,
    )
        .into_response())
}

// ============ GET /stats ============

async fn handle_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let Some(store) = state.pipeline.recorder().store() else {
        return Err(AppError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: "persistence_unavailable".to_string(),
            message: "Database not available".to_string(),
        });
    };

    let summary = store
        .summary(state.config.stats.recent_limit)
        .await
        .map_err(|e| {
            tracing::error!(error = %format!("{:#}", e), "failed to load stats");
            AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal".to_string(),
                message: e.to_string(),
            }
        })?;

    Ok(Json(StatsResponse::from(&summary)))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
