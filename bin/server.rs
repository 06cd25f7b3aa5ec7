// Filing Registry - Web Server
// Read-only REST API over the pipeline outputs, with Axum

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use filing_registry::config::PipelineConfig;
use filing_registry::{
    load_companies, load_run_history, load_validation_history, Company, RunStats,
    ValidationStats,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    config: Arc<PipelineConfig>,
}

impl AppState {
    /// Enriched companies when available, otherwise the structured output.
    /// Files are re-read per request so a pipeline run shows up without a restart.
    fn companies(&self) -> anyhow::Result<Vec<Company>> {
        let enriched = self.config.paths.enriched_json();
        if enriched.exists() {
            return load_companies(&enriched);
        }
        load_companies(&self.config.paths.companies_json())
    }
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

    fn err(data: T, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            error: Some(error.into()),
        }
    }
}

/// Company row without its filings
#[derive(Serialize)]
struct CompanySummary {
    id: String,
    entity_name: String,
    normalized_name: String,
    entity_type: String,
    filing_count: usize,
    latest_filing_date: String,
    enriched: bool,
}

impl From<&Company> for CompanySummary {
    fn from(company: &Company) -> Self {
        Self {
            id: company.id.clone(),
            entity_name: company.entity_name.clone(),
            normalized_name: company.normalized_name.clone(),
            entity_type: company.entity_type.as_str().to_string(),
            filing_count: company.filing_count,
            latest_filing_date: company.latest_filing_date().to_string(),
            enriched: !company.enrichment.is_empty(),
        }
    }
}

/// Flat filing row, linked back by company id
#[derive(Serialize)]
struct FilingResponse {
    company_id: String,
    entity_name: String,
    filing_id: String,
    date_received: String,
    docket_number: String,
    submission_type: String,
    status: String,
    primary_doc_url: String,
    detail_url: String,
}

#[derive(Debug, Deserialize)]
struct FilingQuery {
    docket: Option<String>,
    limit: Option<usize>,
}

fn load_failed<T: Serialize>(what: &str, e: anyhow::Error, empty: T) -> axum::response::Response {
    tracing::error!(error = %format!("{:#}", e), "failed to load {}", what);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiResponse::err(empty, format!("{} not available, run the pipeline first", what))),
    )
        .into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/companies - All companies, most recent filing first
async fn get_companies(State(state): State<AppState>) -> impl IntoResponse {
    match state.companies() {
        Ok(companies) => {
            let response: Vec<CompanySummary> = companies.iter().map(CompanySummary::from).collect();
            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => load_failed("companies", e, Vec::<CompanySummary>::new()),
    }
}

/// GET /api/companies/:id - One company with its filings and enrichment
async fn get_company(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.companies() {
        Ok(companies) => match companies.into_iter().find(|c| c.id == id) {
            Some(company) => (StatusCode::OK, Json(ApiResponse::ok(Some(company)))).into_response(),
            None => (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::err(None::<Company>, format!("Company {} not found", id))),
            )
                .into_response(),
        },
        Err(e) => load_failed("companies", e, None::<Company>),
    }
}

/// GET /api/filings?docket=&limit= - Filings across companies, newest first
async fn get_filings(
    State(state): State<AppState>,
    Query(query): Query<FilingQuery>,
) -> impl IntoResponse {
    let companies = match state.companies() {
        Ok(companies) => companies,
        Err(e) => return load_failed("filings", e, Vec::<FilingResponse>::new()),
    };

    let docket = query.docket.map(|d| d.to_lowercase());
    let mut filings: Vec<FilingResponse> = companies
        .iter()
        .flat_map(|c| {
            c.filings.iter().map(move |f| FilingResponse {
                company_id: c.id.clone(),
                entity_name: c.entity_name.clone(),
                filing_id: f.filing_id.clone(),
                date_received: f.date_received.clone(),
                docket_number: f.docket_number.clone(),
                submission_type: f.submission_type.clone(),
                status: f.filing_status.clone(),
                primary_doc_url: f.primary_document_url().to_string(),
                detail_url: f.detail_url.clone(),
            })
        })
        .filter(|f| match &docket {
            Some(d) => f.docket_number.to_lowercase().contains(d.as_str()),
            None => true,
        })
        .collect();

    filings.sort_by(|a, b| b.date_received.cmp(&a.date_received));
    if let Some(limit) = query.limit {
        filings.truncate(limit);
    }

    (StatusCode::OK, Json(ApiResponse::ok(filings))).into_response()
}

/// GET /api/validation - Validation history, oldest first
async fn get_validation(State(state): State<AppState>) -> impl IntoResponse {
    let history: Vec<ValidationStats> =
        load_validation_history(&state.config.paths.validation_stats());
    Json(ApiResponse::ok(history))
}

/// GET /api/runs - Pipeline run history, oldest first
async fn get_runs(State(state): State<AppState>) -> impl IntoResponse {
    let history: Vec<RunStats> = load_run_history(&state.config.paths.run_stats());
    Json(ApiResponse::ok(history))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    filing_registry::config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("🌐 Filing Registry - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let config = PipelineConfig::load(config_path.as_deref())?;

    if !config.paths.companies_json().exists() {
        println!("⚠️  No structured companies at {:?}", config.paths.companies_json());
        println!("   Run: filing-registry structure");
    }

    let documents_dir = config.paths.documents_dir.clone();
    let state = AppState {
        config: Arc::new(config),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/companies", get(get_companies))
        .route("/companies/:id", get(get_company))
        .route("/filings", get(get_filings))
        .route("/validation", get(get_validation))
        .route("/runs", get(get_runs))
        .with_state(state);

    // Build main router
    let app = Router::new()
        .nest("/api", api_routes)
        .nest_service("/documents", ServeDir::new(documents_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        );

    // Start server
    let addr = std::env::var("REGISTRY_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API:       http://{}/api/companies", addr);
    println!("   Documents: http://{}/documents", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await?;
    Ok(())
}
