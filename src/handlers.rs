use crate::ai_gateway::GeminiClient;
use crate::config::Config;
use crate::dashboard_state::DashboardSnapshot;
use crate::errors::AppError;
use crate::models::LeadWithEnrichment;
use crate::prospector::Prospector;
use crate::settings::Settings;
use crate::store_client::StoreClient;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Store connection settings in effect (after self-healing).
    pub settings: Settings,
    /// Owns the dashboard state and runs probe cycles.
    pub prospector: Arc<Prospector<StoreClient, GeminiClient>>,
}

#[derive(Debug, Deserialize)]
pub struct ProbeRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    /// False when the query was blank or a cycle was already running.
    pub accepted: bool,
    pub query: String,
}

/// Routes under `/api/v1`. Callers add the state and any layers.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/dashboard", get(dashboard))
        .route("/api/v1/leads", get(list_leads))
        .route("/api/v1/leads/:id", get(inspect_lead))
        .route("/api/v1/probe", post(start_probe))
        .route("/api/v1/refresh", post(refresh))
        .route("/api/v1/settings", get(settings))
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "nexus-leads",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /api/v1/dashboard
///
/// Current leads, aggregate stats, the rolling activity log, the busy flag,
/// and the latest market insight.
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardSnapshot> {
    Json(state.prospector.snapshot())
}

/// GET /api/v1/leads
pub async fn list_leads(State(state): State<Arc<AppState>>) -> Json<Vec<LeadWithEnrichment>> {
    Json(state.prospector.leads())
}

/// GET /api/v1/leads/:id
pub async fn inspect_lead(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<LeadWithEnrichment>, AppError> {
    state.prospector.inspect(lead_id).map(Json)
}

/// POST /api/v1/probe
///
/// Starts a probe cycle in the background. A request arriving while a cycle
/// runs is dropped (`accepted: false`), never queued.
pub async fn start_probe(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProbeRequest>,
) -> (StatusCode, Json<ProbeResponse>) {
    let Some(ticket) = state.prospector.begin(&request.query) else {
        return (
            StatusCode::OK,
            Json(ProbeResponse {
                accepted: false,
                query: request.query,
            }),
        );
    };

    let query = ticket.query().to_string();
    tracing::info!("Probe accepted for \"{}\"", query);

    let prospector = Arc::clone(&state.prospector);
    tokio::spawn(async move {
        let outcome = prospector.run(ticket).await;
        tracing::info!("Probe finished: {:?}", outcome);
    });

    (
        StatusCode::ACCEPTED,
        Json(ProbeResponse {
            accepted: true,
            query,
        }),
    )
}

/// POST /api/v1/refresh
///
/// Re-runs the read path (lead list + market insight) and returns the
/// updated dashboard.
pub async fn refresh(State(state): State<Arc<AppState>>) -> Json<DashboardSnapshot> {
    state.prospector.refresh().await;
    Json(state.prospector.snapshot())
}

/// GET /api/v1/settings
///
/// Store connection in effect, with the key masked.
pub async fn settings(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "store_url": state.settings.store_url,
        "store_key": mask_key(&state.settings.store_key),
        "model": state.config.gemini_model,
    }))
}

/// Keeps at most 12 leading characters, and never more than half the key.
fn mask_key(key: &str) -> String {
    let shown = (key.chars().count() / 2).min(12);
    format!("{}…", key.chars().take(shown).collect::<String>())
}
