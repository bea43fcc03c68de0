//! Integration tests for the price server API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use estimator_lib::{
    health::HealthRegistry, ArtifactStore, ArtifactStoreConfig, LifecycleConfig, LifecyclePhase,
    ModelLifecycle, PriceEstimator, StructuredLogger,
};
use price_server::api::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const ENCODER_JSON: &str = r#"{
    "scheme": "one_hot",
    "handle_unknown": "ignore",
    "columns": [
        {"name": "property_usage_en", "categories": ["Residential", "Commercial"]},
        {"name": "property_type_en", "categories": ["Unit", "Villa"]},
        {"name": "reg_type_en", "categories": ["Existing Properties", "Off-Plan Properties"]},
        {"name": "area_name_en", "categories": ["Business Bay", "Dubai Marina"]},
        {"name": "nearest_metro_en", "categories": ["Business Bay Metro Station", "DMCC Metro Station"]},
        {"name": "trans_group_en", "categories": ["Sales", "Mortgages"]}
    ]
}"#;

/// y_log = 12.4 + 0.005 * area + 0.4 * [Business Bay] + 0.1 * parking
const LINEAR_JSON: &str = r#"{
    "feature_names": ["procedure_area", "area_name_en_Business Bay", "has_parking", "room_value"],
    "coefficients": [0.005, 0.4, 0.1, 0.0],
    "intercept": 12.4
}"#;

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    _dir: TempDir,
}

async fn setup_test_app(encoder: Option<&str>) -> TestApp {
    let dir = TempDir::new().unwrap();
    let encoder_path = dir.path().join("trans_encoder_new.json");
    let regressor_path = dir.path().join("trans_predictor_new.json");
    if let Some(contents) = encoder {
        std::fs::write(&encoder_path, contents).unwrap();
    }
    std::fs::write(&regressor_path, LINEAR_JSON).unwrap();

    let store = ArtifactStore::new(ArtifactStoreConfig::new(encoder_path, regressor_path));
    let logger = StructuredLogger::new("api-test");
    let lifecycle = ModelLifecycle::build(Arc::new(store), LifecycleConfig::default(), logger.clone());
    let estimator = PriceEstimator::new(lifecycle, logger);

    let state = Arc::new(AppState::new(estimator, HealthRegistry::new()).await);
    TestApp {
        router: create_router(state.clone()),
        state,
        _dir: dir,
    }
}

async fn ready_app() -> TestApp {
    let app = setup_test_app(Some(ENCODER_JSON)).await;
    let lifecycle = app.state.estimator.lifecycle();
    lifecycle.trigger_load();
    assert_eq!(lifecycle.wait_until_settled().await, LifecyclePhase::Ready);
    app
}

fn full_request() -> Value {
    json!({
        "property_usage_en": "Residential",
        "property_type_en": "Unit",
        "reg_type_en": "Existing Properties",
        "area_name_en": "Business Bay",
        "nearest_metro_en": "Business Bay Metro Station",
        "room_value": "1 B/R",
        "has_parking": "Yes",
        "procedure_area": 120.0,
        "trans_group": "Sales"
    })
}

async fn get(app: &TestApp, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn post_predict(app: &TestApp, body: String) -> (StatusCode, Value) {
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn is_formatted_price(value: &str) -> bool {
    match value.strip_prefix("AED ") {
        Some(digits) => {
            !digits.is_empty()
                && digits.chars().all(|c| c.is_ascii_digit() || c == ',')
                && digits.starts_with(|c: char| c.is_ascii_digit())
        }
        None => false,
    }
}

#[tokio::test]
async fn test_predict_returns_formatted_price_when_ready() {
    let app = ready_app().await;

    let (status, body) = post_predict(&app, full_request().to_string()).await;

    assert_eq!(status, StatusCode::OK);
    let price = body["predicted_price"].as_str().unwrap();
    assert!(is_formatted_price(price), "unexpected price {}", price);
    assert_eq!(price, "AED 729,416");
}

#[tokio::test]
async fn test_predict_returns_503_before_load() {
    let app = setup_test_app(Some(ENCODER_JSON)).await;

    let (status, body) = post_predict(&app, full_request().to_string()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body["error"],
        "Model is still loading, please try again later."
    );
    // The rejected request kicked off the load
    assert_eq!(
        app.state.estimator.lifecycle().wait_until_settled().await,
        LifecyclePhase::Ready
    );
}

#[tokio::test]
async fn test_predict_missing_field_returns_500_naming_it() {
    let app = ready_app().await;
    let mut request = full_request();
    request.as_object_mut().unwrap().remove("procedure_area");

    let (status, body) = post_predict(&app, request.to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("procedure_area"));
}

#[tokio::test]
async fn test_predict_malformed_json_returns_500_once_ready() {
    let app = ready_app().await;

    let (status, body) = post_predict(&app, "{not json".to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("malformed request"));
}

#[tokio::test]
async fn test_predict_malformed_json_before_load_is_503() {
    let app = setup_test_app(Some(ENCODER_JSON)).await;

    let (status, _) = post_predict(&app, "{not json".to_string()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_status_triggers_load_and_reports_ready() {
    let app = setup_test_app(Some(ENCODER_JSON)).await;

    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "loading");

    app.state.estimator.lifecycle().wait_until_settled().await;

    let (_, body) = get(&app, "/").await;
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_failed_load_reported_everywhere() {
    let app = setup_test_app(None).await;

    get(&app, "/").await;
    assert_eq!(
        app.state.estimator.lifecycle().wait_until_settled().await,
        LifecyclePhase::Failed
    );

    let (_, body) = get(&app, "/").await;
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "failed");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("trans_encoder_new.json"));

    // Requests still get the not-ready answer; no retry without a cooldown
    let (status, _) = post_predict(&app, full_request().to_string()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_healthz_degraded_while_unloaded() {
    let app = setup_test_app(Some(ENCODER_JSON)).await;

    let (status, body) = get(&app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "degraded");
    assert!(health["components"]["artifacts"].is_object());
    assert!(health["components"]["predictor"].is_object());
}

#[tokio::test]
async fn test_readyz_follows_model_state() {
    let app = setup_test_app(Some(ENCODER_JSON)).await;

    let (status, body) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let readiness: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["ready"], false);

    let lifecycle = app.state.estimator.lifecycle();
    lifecycle.trigger_load();
    lifecycle.wait_until_settled().await;

    let (status, body) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    let readiness: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let app = ready_app().await;
    post_predict(&app, full_request().to_string()).await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("price_estimator_predictions_total"));
    assert!(metrics_text.contains("price_estimator_prediction_latency_seconds_bucket"));
    assert!(metrics_text.contains("price_estimator_model_load_duration_seconds_count"));
    assert!(metrics_text.contains("price_estimator_model_info"));
}

#[tokio::test]
async fn test_encoding_failure_degrades_predictor_until_next_success() {
    let strict = ENCODER_JSON.replace(r#""handle_unknown": "ignore""#, r#""handle_unknown": "error""#);
    let app = setup_test_app(Some(&strict)).await;
    let lifecycle = app.state.estimator.lifecycle();
    lifecycle.trigger_load();
    assert_eq!(lifecycle.wait_until_settled().await, LifecyclePhase::Ready);

    let mut request = full_request();
    request["area_name_en"] = json!("Atlantis");
    let (status, body) = post_predict(&app, request.to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Atlantis"));

    let (status, body) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"]["predictor"]["status"], "degraded");

    let (status, _) = post_predict(&app, full_request().to_string()).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(&app, "/healthz").await;
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let app = setup_test_app(Some(ENCODER_JSON)).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/predict")
                .header("origin", "http://example.com")
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert!(response
        .headers()
        .contains_key("access-control-allow-methods"));
}

#[tokio::test]
async fn test_cross_origin_predict_carries_cors_header() {
    let app = ready_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header("origin", "http://example.com")
                .header("content-type", "application/json")
                .body(Body::from(full_request().to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}
