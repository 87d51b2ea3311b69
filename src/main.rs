//! Review SWOT analyzer - HTTP server turning customer review spreadsheets
//! into SWOT analyses via an LLM.

mod classify;
mod columns;
mod config;
mod error;
mod gemini;
mod normalize;
mod pipeline;
mod prompt;
mod response;
mod sampling;
mod strategy;
mod swot;
mod table;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use config::AnalysisConfig;
use error::PipelineError;
use gemini::GeminiClient;
use pipeline::Analyzer;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    analyses: Arc<RwLock<HashMap<String, serde_json::Value>>>,
    analyzer: Arc<Analyzer>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_swot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AnalysisConfig::from_env();
    info!(
        "Model fallback order: {:?}, sample threshold: {}",
        config.models, config.sample_threshold
    );

    let gemini = GeminiClient::from_env(&config)?;
    info!("Gemini client initialized");

    let state = AppState {
        analyses: Arc::new(RwLock::new(HashMap::new())),
        analyzer: Arc::new(Analyzer::new(Arc::new(gemini), config)),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/analyses/:id", get(get_analysis))
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024)) // 50MB
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("Server listening on http://0.0.0.0:3000");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

#[derive(serde::Deserialize)]
struct AnalyzeQuery {
    /// "combined" (default) or "split".
    mode: Option<String>,
}

/// Upload review files and run a SWOT analysis.
async fn analyze(
    State(state): State<AppState>,
    Query(query): Query<AnalyzeQuery>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ErrorResponse> {
    let split = match query.mode.as_deref() {
        None | Some("combined") => false,
        Some("split") => true,
        Some(other) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("Unknown mode: {}. Expected 'combined' or 'split'", other),
                &[],
            ))
        }
    };

    // Collect all uploaded files
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, format!("Multipart error: {}", e), &[])
    })? {
        let Some(filename) = field.file_name().map(String::from) else {
            continue;
        };
        let data = field.bytes().await.map_err(|e| {
            error_response(
                StatusCode::BAD_REQUEST,
                format!("Failed to read file: {}", e),
                &[],
            )
        })?;
        files.push((filename, data.to_vec()));
    }

    if files.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "No files uploaded".to_string(),
            &[],
        ));
    }

    info!(
        "Received {} file(s), mode: {}",
        files.len(),
        if split { "split" } else { "combined" }
    );

    let (set, issues) = state.analyzer.ingest(files);

    let (id, mut body) = if split {
        let result = state
            .analyzer
            .analyze_split(set)
            .await
            .map_err(|e| map_pipeline_error(e, &issues))?;
        (result.id.clone(), serde_json::to_value(&result).unwrap())
    } else {
        let result = state
            .analyzer
            .analyze_combined(set)
            .await
            .map_err(|e| map_pipeline_error(e, &issues))?;
        (result.id.clone(), serde_json::to_value(&result).unwrap())
    };

    if !issues.is_empty() {
        body["file_issues"] = serde_json::to_value(&issues).unwrap();
    }

    state
        .analyses
        .write()
        .unwrap()
        .insert(id.clone(), body.clone());
    info!("Analysis complete: {}", id);

    Ok(Json(body))
}

/// Retrieve a stored analysis by ID.
async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let analyses = state.analyses.read().unwrap();
    analyses.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

type ErrorResponse = (StatusCode, Json<serde_json::Value>);

/// JSON error body. Per-file ingestion issues travel with the error so a
/// caller whose every file was rejected still learns why.
fn error_response(
    status: StatusCode,
    message: String,
    issues: &[normalize::FileIssue],
) -> ErrorResponse {
    let mut body = serde_json::json!({ "error": message });
    if !issues.is_empty() {
        body["file_issues"] = serde_json::to_value(issues).unwrap_or_default();
    }
    (status, Json(body))
}

fn map_pipeline_error(e: PipelineError, issues: &[normalize::FileIssue]) -> ErrorResponse {
    error!("Analysis failed: {}", e);
    let status = match &e {
        PipelineError::EmptyInput | PipelineError::ColumnNotFound { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PipelineError::Llm(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Parse(_) => StatusCode::BAD_GATEWAY,
    };
    error_response(status, e.to_string(), issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use normalize::FileIssue;

    #[test]
    fn test_pipeline_error_body_carries_file_issues() {
        let issues = vec![FileIssue {
            file: "broken.pdf".into(),
            error: "Unsupported file type: .pdf".into(),
        }];
        let (status, Json(body)) = map_pipeline_error(PipelineError::EmptyInput, &issues);
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["file_issues"][0]["file"], "broken.pdf");
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("no usable reviews"));
    }

    #[test]
    fn test_error_body_without_issues_omits_key() {
        let (_, Json(body)) =
            error_response(StatusCode::BAD_REQUEST, "No files uploaded".into(), &[]);
        assert!(body.get("file_issues").is_none());
        assert_eq!(body["error"], "No files uploaded");
    }
}
