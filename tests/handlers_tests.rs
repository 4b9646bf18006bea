/// HTTP API tests driving the router against mocked store and model backends
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use nexus_leads::ai_gateway::GeminiClient;
use nexus_leads::config::Config;
use nexus_leads::handlers::{self, AppState};
use nexus_leads::prospector::Prospector;
use nexus_leads::settings::Settings;
use nexus_leads::store_client::StoreClient;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STORE_KEY: &str = "sb_publishable_0123456789abcdef";
const GENERATE_PATH: &str = "/v1beta/models/gemini-test:generateContent";

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    store: MockServer,
    gemini: MockServer,
}

async fn test_app() -> TestApp {
    let store = MockServer::start().await;
    let gemini = MockServer::start().await;

    let config = Config {
        port: 0,
        store_url: store.uri(),
        store_api_key: STORE_KEY.to_string(),
        gemini_api_key: "test-key".to_string(),
        gemini_base_url: gemini.uri(),
        gemini_model: "gemini-test".to_string(),
        settings_path: PathBuf::from("unused-settings.json"),
        http_timeout_secs: 5,
    };
    let timeout = Duration::from_secs(config.http_timeout_secs);

    let store_client =
        StoreClient::new(config.store_url.clone(), STORE_KEY.to_string(), timeout).unwrap();
    let gemini_client = GeminiClient::new(
        config.gemini_base_url.clone(),
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        timeout,
    )
    .unwrap();

    let state = Arc::new(AppState {
        settings: Settings::new(config.store_url.clone(), STORE_KEY),
        config,
        prospector: Arc::new(Prospector::new(store_client, gemini_client)),
    });

    let router = Router::new()
        .route("/health", get(handlers::health))
        .merge(handlers::api_routes())
        .with_state(Arc::clone(&state));

    TestApp {
        router,
        state,
        store,
        gemini,
    }
}

fn model_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
    }))
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = test_app().await;

    let (status, body) = call(&app.router, get_request("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_probe_is_accepted_and_runs_in_background() {
    let app = test_app().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(model_reply("[]"))
        .mount(&app.gemini)
        .await;

    let (status, body) = call(
        &app.router,
        post_json(
            "/api/v1/probe",
            json!({"query": "  Solar panel distributors in Dubai "}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["accepted"], true);
    assert_eq!(body["query"], "Solar panel distributors in Dubai");

    let mut waited = 0;
    while app.state.prospector.is_busy() && waited < 100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += 1;
    }

    let (_, dashboard) = call(&app.router, get_request("/api/v1/dashboard")).await;
    assert_eq!(dashboard["busy"], false);
    assert_eq!(dashboard["phase"], "idle");
    assert_eq!(
        dashboard["logs"][0],
        "AI: No leads found for this query. Refine keywords."
    );
}

#[tokio::test]
async fn test_probe_while_busy_is_not_accepted() {
    let app = test_app().await;
    let _running = app
        .state
        .prospector
        .begin("Solar panel distributors in Dubai")
        .unwrap();

    let (status, body) = call(
        &app.router,
        post_json("/api/v1/probe", json!({"query": "Coffee roasters in Lisbon"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], false);

    let (_, dashboard) = call(&app.router, get_request("/api/v1/dashboard")).await;
    assert_eq!(dashboard["query"], "Solar panel distributors in Dubai");
    assert_eq!(dashboard["busy"], true);
}

#[tokio::test]
async fn test_blank_probe_is_not_accepted() {
    let app = test_app().await;

    let (status, body) = call(&app.router, post_json("/api/v1/probe", json!({"query": "   "}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], false);
    assert!(!app.state.prospector.is_busy());
}

#[tokio::test]
async fn test_unknown_lead_is_not_found() {
    let app = test_app().await;

    let (status, body) = call(
        &app.router,
        get_request(&format!("/api/v1/leads/{}", Uuid::new_v4())),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/v1/leads/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_then_inspect() {
    let app = test_app().await;
    let lead_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/leads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": lead_id,
            "source": "Google Maps",
            "company_name": "Gulf Solar",
            "created_at": "2026-10-18T09:00:00Z",
            "enrichment": [{"lead_id": lead_id, "ai_score": 93, "validated": true}]
        }])))
        .mount(&app.store)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(model_reply("Gulf Solar leads a sales-ready segment."))
        .mount(&app.gemini)
        .await;

    let (status, dashboard) = call(&app.router, post_json("/api/v1/refresh", json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["loading"], false);
    assert_eq!(dashboard["insight"], "Gulf Solar leads a sales-ready segment.");
    assert_eq!(dashboard["stats"]["total_ingested"], 1);
    assert_eq!(dashboard["stats"]["high_ready"], 1);

    let (status, lead) = call(
        &app.router,
        get_request(&format!("/api/v1/leads/{}", lead_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lead["company_name"], "Gulf Solar");

    let (_, dashboard) = call(&app.router, get_request("/api/v1/dashboard")).await;
    assert_eq!(dashboard["logs"][0], "Inspection: Gulf Solar details view.");
}

#[tokio::test]
async fn test_settings_masks_store_key() {
    let app = test_app().await;

    let (status, body) = call(&app.router, get_request("/api/v1/settings")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store_url"], app.store.uri());
    assert_eq!(body["store_key"], "sb_publishab…");
    assert_eq!(body["model"], "gemini-test");
    assert!(!body.to_string().contains(STORE_KEY));
}
