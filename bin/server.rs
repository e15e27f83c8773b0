// Carbon Credit Dashboard - Web Server
// JSON API + embedded single-page dashboard with Axum

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use carbon_dashboard::{calculate, emitter_unit_for, DashboardSession, UnifiedConfig, WorkbookCache};

const DEFAULT_WORKBOOK_PATH: &str = "data/carbon_credits.xlsx";

/// Shared application state
#[derive(Clone)]
struct AppState {
    session: Arc<DashboardSession>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

/// Config response: sink options and defaults for populating the form
#[derive(Serialize)]
struct ConfigResponse {
    sink_options: Vec<String>,
    default_sink: String,
    default_size: f64,
    emitter_units: HashMap<String, String>,
    unified: Option<UnifiedConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    load_error: Option<String>,
}

/// Raw query string so a malformed size degrades to the default instead of
/// a 400 from the deserializer
#[derive(Deserialize)]
struct CalculateParams {
    size: Option<String>,
}

fn parse_size(raw: &str) -> Option<f64> {
    raw.trim().parse().ok()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/config - Sink options and form defaults
async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    let session = &state.session;

    let emitter_units: HashMap<String, String> = session
        .sink_options()
        .iter()
        .map(|name| (name.clone(), emitter_unit_for(name).as_str().to_string()))
        .collect();

    let config = ConfigResponse {
        sink_options: session.sink_options().to_vec(),
        default_sink: session.sink().to_string(),
        default_size: session.size(),
        emitter_units,
        unified: session.snapshot().map(|snapshot| snapshot.unified.clone()),
        load_error: session.load_error().map(String::from),
    };

    (StatusCode::OK, Json(ApiResponse::ok(config))).into_response()
}

/// GET /api/calculate/:sink?size=N - Derived metrics for one selection
async fn calculate_metrics(
    State(state): State<AppState>,
    Path(sink): Path<String>,
    Query(params): Query<CalculateParams>,
) -> impl IntoResponse {
    // Sink names contain spaces; decode URL-encoded path segment
    let decoded_sink = urlencoding::decode(&sink)
        .unwrap_or_else(|_| sink.clone().into())
        .into_owned();

    // Missing or unparseable size falls back to the session default
    let size = params
        .size
        .as_deref()
        .and_then(parse_size)
        .unwrap_or(state.session.size())
        .max(0.0);

    // Calculation never fails; unknown sinks produce zeroed metrics
    let metrics = calculate(&decoded_sink, size, state.session.snapshot());

    (StatusCode::OK, Json(ApiResponse::ok(metrics))).into_response()
}

/// GET / - Serve the dashboard page
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

fn build_router(state: AppState) -> Router {
    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/config", get(get_config))
        .route("/calculate/:sink", get(calculate_metrics))
        .with_state(state);

    // Build main router
    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 Carbon Credit Dashboard - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let args: Vec<String> = std::env::args().collect();
    let workbook_path = args
        .get(1)
        .map(String::as_str)
        .unwrap_or(DEFAULT_WORKBOOK_PATH);

    // Load the workbook once; the session is read-only after this
    let mut cache = WorkbookCache::new();
    let session = DashboardSession::open(&mut cache, std::path::Path::new(workbook_path));

    match session.load_error() {
        Some(message) => {
            eprintln!("⚠️  {}", message);
            eprintln!("   Serving built-in fallback defaults.");
        }
        None => println!("✓ Workbook loaded: {}", workbook_path),
    }

    let state = AppState {
        session: Arc::new(session),
    };

    let app = build_router(state);

    // Start server
    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:3000");
    println!("   API: http://localhost:3000/api/config");
    println!("   UI:  http://localhost:3000");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

// ============================================================================
// TESTS
// ============================================================================
