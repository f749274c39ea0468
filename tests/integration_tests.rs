//! End-to-end tests for the gateway's HTTP surface.
//!
//! Most tests drive the router in-process with the in-memory backends. The
//! `upstream` tests point the real Google adapters at a wiremock server, and
//! the `shutdown` tests run the serve loop on a real socket.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use translate_gateway::backend::{
    GoogleTranslateV2, GoogleTranslateV3, LegacyBackend, MockLegacyBackend, MockModernBackend,
    ModernBackend,
};
use translate_gateway::compat::CompatibilityWrapper;
use translate_gateway::error::GatewayError;
use translate_gateway::lifecycle::{Lifecycle, LifecycleState};
use translate_gateway::server::{self, AppState, ShutdownTiming};

// ==================== Test Helpers ====================

struct Harness {
    app: Router,
    legacy: Arc<MockLegacyBackend>,
    modern: Arc<MockModernBackend>,
    lifecycle: Arc<Lifecycle>,
}

fn harness_with(legacy: MockLegacyBackend, modern: MockModernBackend) -> Harness {
    let legacy = Arc::new(legacy);
    let modern = Arc::new(modern);
    let lifecycle = Arc::new(Lifecycle::new());

    let legacy_dyn: Arc<dyn LegacyBackend> = legacy.clone();
    let modern_dyn: Arc<dyn ModernBackend> = modern.clone();
    let state = AppState::new(
        CompatibilityWrapper::new(legacy_dyn, modern_dyn),
        lifecycle.clone(),
    );

    Harness {
        app: server::router(state),
        legacy,
        modern,
        lifecycle,
    }
}

fn harness() -> Harness {
    harness_with(MockLegacyBackend::new(), MockModernBackend::new())
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = body.map(|b| b.to_string()).unwrap_or_default();
    call_raw(app, method, uri, "application/json", body).await
}

async fn call_raw(
    app: &Router,
    method: &str,
    uri: &str,
    content_type: &str,
    body: String,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .expect("Failed to build request");

    let response = app.clone().oneshot(request).await.expect("Router failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Body is not JSON")
    };
    (status, json)
}

fn error_id(body: &Value) -> &str {
    body["error_code"]["id"].as_str().expect("error_code.id")
}

// ==================== Translate / Detect ====================

#[tokio::test]
async fn test_legacy_translate_success() {
    let h = harness();

    let (status, body) = call(
        &h.app,
        "POST",
        "/google-translate/v2/translate",
        Some(json!({ "text": "hello", "target_locale": "fr" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!({
            "original": { "text": "hello", "detected_locale": "en" },
            "translated": { "text": "hello_fr", "locale": "fr" }
        })
    );
}

#[tokio::test]
async fn test_empty_text_is_422_on_every_route() {
    let h = harness();

    for uri in [
        "/google-translate/v2/translate",
        "/google-translate/v3/translate",
        "/google-translate/translate",
        "/google-translate/v2/detect",
        "/google-translate/v3/detect",
        "/google-translate/detect",
    ] {
        let (status, body) = call(
            &h.app,
            "POST",
            uri,
            Some(json!({ "text": "", "target_locale": "fr" })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
        let id = error_id(&body);
        assert!(!id.is_empty());
        assert!(id.ends_with(".5"), "{} gave {}", uri, id);
        assert_eq!(
            body["error_code"]["description"],
            "\"text\" field in body is empty"
        );
    }

    assert_eq!(h.legacy.translate_calls(), 0);
    assert_eq!(h.modern.translate_calls(), 0);
}

#[tokio::test]
async fn test_missing_and_invalid_target_locale() {
    let h = harness();

    let (status, body) = call(
        &h.app,
        "POST",
        "/google-translate/v2/translate",
        Some(json!({ "text": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["error_code"]["description"],
        "\"target_locale\" field in body is empty"
    );

    let (status, body) = call(
        &h.app,
        "POST",
        "/google-translate/translate",
        Some(json!({ "text": "hello", "target_locale": "not a locale" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(error_id(&body).ends_with(".6"));
}

#[tokio::test]
async fn test_underscore_target_locale_is_accepted() {
    let h = harness();

    let (status, body) = call(
        &h.app,
        "POST",
        "/google-translate/v2/translate",
        Some(json!({ "text": "hello", "target_locale": "en_US" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["translated"]["locale"], "en-US");
    assert_eq!(body["translated"]["text"], "hello_en-US");
}

#[tokio::test]
async fn test_modern_route_passes_target_through() {
    let h = harness();

    let (status, body) = call(
        &h.app,
        "POST",
        "/google-translate/v3/translate",
        Some(json!({ "text": "hello", "target_locale": "zh-TW", "source_locale": "en" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["translated"]["locale"], "zh-TW");
    assert_eq!(body["original"]["detected_locale"], "");
    assert!(body.get("glossary_translated").is_none());
}

#[tokio::test]
async fn test_modern_translate_with_glossary() {
    let h = harness_with(
        MockLegacyBackend::new(),
        MockModernBackend::new().with_glossaries(&[("tech", "gs://bucket/tech.csv")]),
    );

    let (status, body) = call(
        &h.app,
        "POST",
        "/google-translate/v3/translate",
        Some(json!({ "text": "hello", "target_locale": "fr", "glossary": { "id": "tech" } })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body["glossary_translated"],
        json!({ "text": "hello_fr_tech", "locale": "fr" })
    );
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let h = harness();

    let (status, body) = call_raw(
        &h.app,
        "POST",
        "/google-translate/v2/translate",
        "application/json",
        "{\"text\": ".to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_id(&body).ends_with(".7"));
    assert!(body["error_code"]["cause"].is_string());

    // Content type does not matter
    let (status, _) = call_raw(
        &h.app,
        "POST",
        "/google-translate/detect",
        "text/plain",
        "not json".to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_result_and_call_failure_are_distinct_502s() {
    let empty = harness_with(
        MockLegacyBackend::new().failing_with(GatewayError::empty_result("Google Translate v2 translate")),
        MockModernBackend::new(),
    );
    let failed = harness_with(
        MockLegacyBackend::new().failing_with(GatewayError::backend_call(
            "Google Translate v2 translate",
            "503 Service Unavailable",
        )),
        MockModernBackend::new(),
    );
    let request = json!({ "text": "hello", "target_locale": "fr" });

    let (empty_status, empty_body) = call(
        &empty.app,
        "POST",
        "/google-translate/v2/translate",
        Some(request.clone()),
    )
    .await;
    let (failed_status, failed_body) = call(
        &failed.app,
        "POST",
        "/google-translate/v2/translate",
        Some(request),
    )
    .await;

    assert_eq!(empty_status, StatusCode::BAD_GATEWAY);
    assert_eq!(failed_status, StatusCode::BAD_GATEWAY);
    assert_ne!(error_id(&empty_body), error_id(&failed_body));
    assert_eq!(failed_body["error_code"]["cause"], "503 Service Unavailable");
}

#[tokio::test]
async fn test_unified_routes_select_backend() {
    let h = harness();

    let (status, _) = call(
        &h.app,
        "POST",
        "/google-translate/translate",
        Some(json!({ "text": "hello", "target_locale": "fr" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(h.legacy.translate_calls(), 1);
    assert_eq!(h.modern.translate_calls(), 0);

    let (status, body) = call(
        &h.app,
        "POST",
        "/google-translate/translate",
        Some(json!({ "text": "hello", "target_locale": "fr", "v3": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["translated"]["locale"], "fr");
    assert_eq!(h.legacy.translate_calls(), 1);
    assert_eq!(h.modern.translate_calls(), 1);
}

#[tokio::test]
async fn test_unified_detect_rejects_whole_batch_on_bad_tag() {
    let h = harness_with(
        MockLegacyBackend::new(),
        MockModernBackend::new().with_detections(&[("fr", 0.9), ("???", 0.5)]),
    );

    let (status, body) = call(
        &h.app,
        "POST",
        "/google-translate/detect",
        Some(json!({ "text": "bonjour", "v3": true })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(error_id(&body).ends_with(".4"));
    assert!(body.get("results").is_none());
}

#[tokio::test]
async fn test_detect_results_shape() {
    let h = harness_with(
        MockLegacyBackend::new().with_detections(&[("fr", 0.9), ("fr-CA", 0.25)]),
        MockModernBackend::new().with_detections(&[("de", 0.5)]),
    );

    let (status, body) = call(
        &h.app,
        "POST",
        "/google-translate/v2/detect",
        Some(json!({ "text": "bonjour" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!({ "results": [
            { "locale": "fr", "confidence": 0.9 },
            { "locale": "fr-CA", "confidence": 0.25 }
        ] })
    );

    let (status, body) = call(
        &h.app,
        "POST",
        "/google-translate/v3/detect",
        Some(json!({ "text": "hallo" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["results"][0]["locale"], "de");
}

// ==================== Glossaries ====================

#[tokio::test]
async fn test_glossary_lifecycle() {
    let h = harness();
    let uri = "/google-translate/v3/glossaries";

    let (status, body) = call(
        &h.app,
        "POST",
        uri,
        Some(json!({
            "id": "tech",
            "gcs_source": "gs://bucket/tech.csv",
            "source_locale": "en",
            "target_locale": "fr"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({}));

    let (status, body) = call(&h.app, "GET", uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "glossaries": [ { "id": "tech", "gcs_source": "gs://bucket/tech.csv" } ] })
    );

    let (status, body) = call(&h.app, "DELETE", uri, Some(json!({ "id": "tech" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, body) = call(&h.app, "GET", uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "glossaries": [] }));
}

#[tokio::test]
async fn test_glossary_create_requires_every_field() {
    let h = harness();

    let (status, body) = call(
        &h.app,
        "POST",
        "/google-translate/v3/glossaries",
        Some(json!({ "id": "tech", "source_locale": "en", "target_locale": "fr" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["error_code"]["description"],
        "\"gcs_source\" field in body is empty"
    );
    assert_eq!(h.modern.glossary_calls(), 0);
}

#[tokio::test]
async fn test_glossary_delete_requires_id() {
    let h = harness();

    let (status, _) = call(
        &h.app,
        "DELETE",
        "/google-translate/v3/glossaries",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_glossary_listing_failure_returns_no_partial_list() {
    let h = harness_with(
        MockLegacyBackend::new(),
        MockModernBackend::new()
            .with_glossaries(&[("a", "gs://b/a.csv"), ("b", "gs://b/b.csv")])
            .failing_list_after(1),
    );

    let (status, body) = call(&h.app, "GET", "/google-translate/v3/glossaries", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.get("glossaries").is_none());
}

// ==================== Probes / Routing ====================

#[tokio::test]
async fn test_readiness_flips_on_shutdown() {
    let h = harness();

    let (status, body) = call(&h.app, "GET", "/readiness", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ready": true }));

    h.lifecycle.begin_shutdown();

    let (status, body) = call(&h.app, "GET", "/readiness", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "ready": false }));

    // Liveness is independent of readiness
    assert!(h.lifecycle.is_alive());
    let (status, body) = call(&server::liveness_router(), "GET", "/anything", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_unknown_path_is_404_empty_object() {
    let h = harness();
    let (status, body) = call(&h.app, "GET", "/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_cors_preflight() {
    let h = harness();

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/google-translate/v2/translate")
        .header(header::ORIGIN, "https://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_responses_are_gzipped_on_request() {
    let h = harness();

    let request = Request::builder()
        .method("POST")
        .uri("/google-translate/v2/translate")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT_ENCODING, "gzip")
        .body(Body::from(
            json!({ "text": "a sentence long enough to be worth compressing", "target_locale": "fr" })
                .to_string(),
        ))
        .unwrap();

    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
}

// ==================== Upstream (wiremock) ====================

fn google_harness(server: &MockServer) -> Router {
    let client = reqwest::Client::new();
    let legacy: Arc<dyn LegacyBackend> = Arc::new(GoogleTranslateV2::new(
        client.clone(),
        "test-key",
        format!("{}/language/translate/v2", server.uri()),
    ));
    let modern: Arc<dyn ModernBackend> = Arc::new(GoogleTranslateV3::new(
        client,
        "projects/demo/locations/global",
        format!("{}/v3", server.uri()),
    ));

    server::router(AppState::new(
        CompatibilityWrapper::new(legacy, modern),
        Arc::new(Lifecycle::new()),
    ))
}

#[tokio::test]
async fn test_upstream_legacy_translate_end_to_end() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/language/translate/v2"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "translations": [
                { "translatedText": "bonjour", "detectedSourceLanguage": "en" }
            ] }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = google_harness(&mock_server);
    let (status, body) = call(
        &app,
        "POST",
        "/google-translate/v2/translate",
        Some(json!({ "text": "hello", "target_locale": "fr" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["translated"]["text"], "bonjour");
    assert_eq!(body["original"]["detected_locale"], "en");
}

#[tokio::test]
async fn test_upstream_failure_surfaces_cause() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/projects/demo/locations/global:translateText"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Quota exceeded"))
        .mount(&mock_server)
        .await;

    let app = google_harness(&mock_server);
    let (status, body) = call(
        &app,
        "POST",
        "/google-translate/translate",
        Some(json!({ "text": "hello", "target_locale": "fr", "v3": true })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(error_id(&body).ends_with(".2"));
    assert!(body["error_code"]["cause"]
        .as_str()
        .unwrap_or_default()
        .contains("Quota exceeded"));
}

#[tokio::test]
async fn test_upstream_glossary_pages_are_merged() {
    let mock_server = MockServer::start().await;
    let glossaries_path = "/v3/projects/demo/locations/global/glossaries";

    Mock::given(method("GET"))
        .and(path(glossaries_path))
        .and(query_param("pageToken", "next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "glossaries": [ {
                "name": "projects/demo/locations/global/glossaries/legal",
                "inputConfig": { "gcsSource": { "inputUri": "gs://b/legal.csv" } }
            } ]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(glossaries_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "glossaries": [ {
                "name": "projects/demo/locations/global/glossaries/tech",
                "inputConfig": { "gcsSource": { "inputUri": "gs://b/tech.csv" } }
            } ],
            "nextPageToken": "next"
        })))
        .mount(&mock_server)
        .await;

    let app = google_harness(&mock_server);
    let (status, body) = call(&app, "GET", "/google-translate/v3/glossaries", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "glossaries": [
            { "id": "tech", "gcs_source": "gs://b/tech.csv" },
            { "id": "legal", "gcs_source": "gs://b/legal.csv" }
        ] })
    );
}

// ==================== Shutdown ====================

async fn bind_local() -> (tokio::net::TcpListener, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let url = format!("http://{}", listener.local_addr().unwrap());
    (listener, url)
}

#[tokio::test]
async fn test_serve_stops_after_shutdown_signal() {
    let h = harness();
    let (listener, url) = bind_local().await;

    let serve = tokio::spawn(server::serve(
        listener,
        h.app.clone(),
        h.lifecycle.clone(),
        ShutdownTiming {
            drain: Duration::ZERO,
            grace: Duration::from_secs(5),
        },
    ));

    let response = reqwest::get(format!("{}/readiness", url)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    h.lifecycle.begin_shutdown();

    tokio::time::timeout(Duration::from_secs(5), serve)
        .await
        .expect("serve should return")
        .expect("serve task should not panic")
        .expect("serve should succeed");
    assert_eq!(h.lifecycle.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn test_readiness_is_503_over_socket_while_draining() {
    let h = harness();
    let (listener, url) = bind_local().await;

    let serve = tokio::spawn(server::serve(
        listener,
        h.app.clone(),
        h.lifecycle.clone(),
        ShutdownTiming {
            drain: Duration::from_millis(500),
            grace: Duration::from_secs(5),
        },
    ));

    h.lifecycle.begin_shutdown();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let response = reqwest::get(format!("{}/readiness", url))
        .await
        .expect("listener should still accept while draining");
    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "ready": false }));

    tokio::time::timeout(Duration::from_secs(5), serve)
        .await
        .expect("serve should return after the drain")
        .expect("serve task should not panic")
        .expect("serve should succeed");
    assert_eq!(h.lifecycle.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn test_serve_abandons_requests_after_grace_period() {
    let lifecycle = Arc::new(Lifecycle::new());
    let (listener, url) = bind_local().await;
    let handler_finished = Arc::new(AtomicBool::new(false));

    let app = {
        let handler_finished = handler_finished.clone();
        Router::new().route(
            "/slow",
            get(move || async move {
                tokio::time::sleep(Duration::from_millis(800)).await;
                handler_finished.store(true, Ordering::SeqCst);
                "done"
            }),
        )
    };

    let serve = tokio::spawn(server::serve(
        listener,
        app,
        lifecycle.clone(),
        ShutdownTiming {
            drain: Duration::ZERO,
            grace: Duration::from_millis(200),
        },
    ));

    let in_flight = tokio::spawn(reqwest::get(format!("{}/slow", url)));
    tokio::time::sleep(Duration::from_millis(100)).await;

    lifecycle.begin_shutdown();

    tokio::time::timeout(Duration::from_secs(5), serve)
        .await
        .expect("serve should return once the grace period elapses")
        .expect("serve task should not panic")
        .expect("serve should succeed");
    assert_eq!(lifecycle.state(), LifecycleState::Stopped);

    let response = tokio::time::timeout(Duration::from_secs(5), in_flight)
        .await
        .expect("abandoned request should be answered promptly")
        .expect("client task should not panic")
        .expect("client should get a response");
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error_code"]["description"],
        "request abandoned at shutdown"
    );

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(!handler_finished.load(Ordering::SeqCst));
}
