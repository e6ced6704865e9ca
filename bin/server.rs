// Fraud Triage - API Server
// JSON presentation layer over the triage coordinator

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use fraud_triage::{
    load_data, Decision, EvaluatorHandle, LedgerEntry, SqliteStore, Transaction,
    TransactionFilter, TransactionStatus, TriageCoordinator,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    coordinator: Arc<Mutex<TriageCoordinator<SqliteStore>>>,
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

    fn err(data: T, message: String) -> Self {
        Self {
            success: false,
            data,
            error: Some(message),
        }
    }
}

#[derive(Deserialize)]
struct LedgerQuery {
    page: Option<usize>,
    page_size: Option<usize>,
}

#[derive(Deserialize)]
struct DisposeRequest {
    decision: Decision,
}

#[derive(Serialize)]
struct CountsResponse {
    total_transactions: usize,
    flagged: usize,
    resolved: usize,
    escalated: usize,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/flagged - Current flagged snapshot
async fn get_flagged(State(state): State<AppState>) -> impl IntoResponse {
    let coordinator = state.coordinator.lock().await;

    Json(ApiResponse::ok(coordinator.flagged().to_vec()))
}

/// POST /api/evaluate - Run a triage pass (optionally over a filtered subset)
async fn post_evaluate(
    State(state): State<AppState>,
    filter: Option<Json<TransactionFilter>>,
) -> impl IntoResponse {
    let mut coordinator = state.coordinator.lock().await;

    let filter = filter.map(|Json(f)| f);
    match coordinator.evaluate(filter.as_ref()).await {
        Ok(flagged) => {
            (StatusCode::OK, Json(ApiResponse::ok(flagged.to_vec()))).into_response()
        }
        Err(e) => {
            eprintln!("Evaluation failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::err(
                    Vec::<Transaction>::new(),
                    format!("evaluation failed, flagged data may be stale: {}", e),
                )),
            )
                .into_response()
        }
    }
}

/// POST /api/transactions/:id/dispose - Record a reviewer decision
async fn post_dispose(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<DisposeRequest>,
) -> impl IntoResponse {
    let mut coordinator = state.coordinator.lock().await;

    match coordinator.dispose_transaction(id, body.decision) {
        Ok(entry) => (StatusCode::OK, Json(ApiResponse::ok(Some(entry)))).into_response(),
        Err(e) => {
            eprintln!("Disposition failed for {}: {}", id, e);
            (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::err(None::<LedgerEntry>, e.to_string())),
            )
                .into_response()
        }
    }
}

/// GET /api/ledger?page=&page_size= - One ledger page
async fn get_ledger(
    State(state): State<AppState>,
    Query(query): Query<LedgerQuery>,
) -> impl IntoResponse {
    let coordinator = state.coordinator.lock().await;

    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(10);

    Json(ApiResponse::ok(
        coordinator.ledger_page(page, page_size).to_vec(),
    ))
}

/// GET /api/counts - Display counters
async fn get_counts(State(state): State<AppState>) -> impl IntoResponse {
    let coordinator = state.coordinator.lock().await;

    Json(ApiResponse::ok(CountsResponse {
        total_transactions: coordinator.total_transactions(),
        flagged: coordinator.flagged().len(),
        resolved: coordinator.count_by_status(TransactionStatus::Resolved),
        escalated: coordinator.count_by_status(TransactionStatus::Escalated),
    }))
}

/// GET /api/export.csv - Flagged snapshot as CSV
async fn get_export(State(state): State<AppState>) -> impl IntoResponse {
    let coordinator = state.coordinator.lock().await;

    match coordinator.export_flagged_csv() {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"flagged_transactions.csv\"",
                ),
            ],
            csv,
        )
            .into_response(),
        Err(e) => {
            eprintln!("CSV export failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    env_logger::init();

    println!("🌐 Fraud Triage - API Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let db_path = std::env::var("TRIAGE_DB").unwrap_or_else(|_| "triage.db".to_string());
    let data_path = std::env::var("TRIAGE_DATA").unwrap_or_else(|_| "data.json".to_string());

    let store = SqliteStore::open(&db_path).expect("Failed to open database");
    println!("✓ Database opened: {}", db_path);

    let (evaluator, _worker) = EvaluatorHandle::spawn(16);

    let mut coordinator = TriageCoordinator::new(store, evaluator);
    coordinator.init().expect("Failed to load persisted triage state");

    let data = load_data(&data_path);
    println!("✓ Loaded {} transactions from {}", data.transactions.len(), data_path);
    coordinator.load_data(data);

    // Create shared state
    let state = AppState {
        coordinator: Arc::new(Mutex::new(coordinator)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/flagged", get(get_flagged))
        .route("/evaluate", post(post_evaluate))
        .route("/transactions/:id/dispose", post(post_dispose))
        .route("/ledger", get(get_ledger))
        .route("/counts", get(get_counts))
        .route("/export.csv", get(get_export))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:3000");
    println!("   API: http://localhost:3000/api/flagged");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
