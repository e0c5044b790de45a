use std::path::Path;
use std::time::Duration;

use axum::body::Body;
use axum::Router;
use bytes::Bytes;
use http::{header, HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{any, header as header_eq, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use model_gateway::refresh::RefreshOutput;
use model_gateway::routes;
use model_gateway::test_util::{
    create_state_with_config, create_test_state, test_config, write_model_file, write_status,
};

const PAGE: &str = "<html><head></head><body>Hi</body></html>";

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }

    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn content_type(&self) -> &str {
        self.headers[header::CONTENT_TYPE].to_str().unwrap()
    }
}

fn app(root: &Path) -> Router {
    routes::router(create_test_state(root, None))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("Content-Type", "application/json");
    }
    let request = builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();

    TestResponse {
        status,
        headers,
        body,
    }
}

async fn get(app: &Router, uri: &str) -> TestResponse {
    send(app, Method::GET, uri, None).await
}

/// Register `demo` as running on the mock server's port.
fn register_demo(root: &Path, server: &MockServer) {
    write_status(
        root,
        json!({"demo": {"status": "success", "port": server.address().port()}}),
    )
    .unwrap();
}

async fn mount_missing_manifest(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/openapi.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_unknown_backend_is_not_found() {
    let root = TempDir::new().unwrap();
    let response = get(&app(root.path()), "/api/ghost/").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(
        response.json(),
        json!({"error": {"type": "not_found", "message": "Model ghost not found"}})
    );
}

#[tokio::test]
async fn test_failed_backend_is_unavailable_without_contacting_it() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    write_status(
        root.path(),
        json!({"broken": {"status": "failed", "port": server.address().port()}}),
    )
    .unwrap();
    let app = app(root.path());

    for method in [Method::GET, Method::POST, Method::DELETE] {
        let response = send(&app, method, "/api/broken/infer/", Some("{}")).await;
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.json()["error"]["message"], "Model broken is not running");
    }
}

#[tokio::test]
async fn test_html_page_is_decorated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html"))
        .mount(&server)
        .await;
    mount_missing_manifest(&server).await;

    let root = TempDir::new().unwrap();
    register_demo(root.path(), &server);
    let app = app(root.path());

    for uri in ["/api/demo/", "/api/demo"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type(), "text/html; charset=utf-8");

        let html = response.text();
        assert!(html.contains("</style>\n</head>"));
        assert!(html.contains("</script>\n</body>"));
        assert!(html.contains("Back to Gateway"));
        assert!(html.find("<style>").unwrap() < html.find("</head>").unwrap());
    }
}

#[tokio::test]
async fn test_html_links_follow_the_mount_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><head><link href="/style-css"></head><body><form action="/infer/"></form><a href="/api/demo/docs">docs</a></body></html>"#,
            "text/html; charset=utf-8",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/openapi.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paths": {"/infer/": {"post": {"summary": "Infer"}}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    register_demo(root.path(), &server);
    let app = app(root.path());

    let html = get(&app, "/api/demo/").await.text();
    assert!(html.contains(r#"href="/api/demo/style-css""#));
    assert!(html.contains(r#"action="/api/demo/infer/""#));
    assert!(html.contains(r#"href="/api/demo/docs""#));
    assert!(!html.contains("/api/demo/api/demo"));

    // manifest is fetched once per backend
    get(&app, "/api/demo/").await;
}

#[tokio::test]
async fn test_error_html_is_not_decorated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_raw(PAGE, "text/html"))
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    register_demo(root.path(), &server);

    let response = get(&app(root.path()), "/api/demo/missing").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.text(), PAGE);
    assert_eq!(response.content_type(), "text/html");
}

#[tokio::test]
async fn test_script_is_rewritten_from_manifest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/main-js"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"fetch("/infer/", {method: "POST"});"#, "text/plain"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/openapi.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paths": {"/infer/": {"post": {"summary": "Infer"}}}
        })))
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    register_demo(root.path(), &server);

    let response = get(&app(root.path()), "/api/demo/main-js").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type(), "application/javascript");
    assert_eq!(response.text(), r#"fetch("/api/demo/infer/", {method: "POST"});"#);
}

#[tokio::test]
async fn test_script_without_manifest_rewrites_bare_fetch_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/static/app.js"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"fetch("/config"); fetch("/infer/", {method: "POST"});"#,
            "application/javascript",
        ))
        .mount(&server)
        .await;
    mount_missing_manifest(&server).await;

    let root = TempDir::new().unwrap();
    register_demo(root.path(), &server);

    let response = get(&app(root.path()), "/api/demo/static/app.js").await;
    assert_eq!(response.content_type(), "application/javascript");
    assert_eq!(
        response.text(),
        r#"fetch("/api/demo/config"); fetch("/infer/", {method: "POST"});"#
    );
}

#[tokio::test]
async fn test_stylesheet_alias_gets_css_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/style-css"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("body { color: red; }", "text/plain"))
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    register_demo(root.path(), &server);

    let response = get(&app(root.path()), "/api/demo/style-css").await;
    assert_eq!(response.content_type(), "text/css");
    assert_eq!(response.text(), "body { color: red; }");
}

#[tokio::test]
async fn test_request_is_forwarded_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/infer/"))
        .and(query_param("mode", "fast"))
        .and(header_eq("x-trace", "t1"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"prediction": "setosa"}))
                .append_header("set-cookie", "a=1")
                .append_header("set-cookie", "b=2")
                .append_header("x-backend", "demo"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    register_demo(root.path(), &server);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/demo/infer/?mode=fast")
        .header("Content-Type", "application/json")
        .header("x-trace", "t1")
        .body(Body::from(r#"{"features": []}"#))
        .unwrap();
    let response = app(root.path()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(response.headers().get_all("set-cookie").iter().count(), 2);
    assert_eq!(response.headers()["x-backend"], "demo");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"prediction": "setosa"}));

    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].body, br#"{"features": []}"#);
}

#[tokio::test]
async fn test_redirects_are_relayed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(307).insert_header("location", "/docs/"))
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    register_demo(root.path(), &server);

    let response = get(&app(root.path()), "/api/demo/docs").await;
    assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers[header::LOCATION], "/docs/");
}

#[tokio::test]
async fn test_static_asset_is_served_from_disk() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    register_demo(root.path(), &server);
    write_model_file(root.path(), "demo", "logo.png", b"\x89PNG\r\n").unwrap();

    let response = get(&app(root.path()), "/api/demo/logo.png").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type(), "image/png");
    assert_eq!(response.body.as_ref(), b"\x89PNG\r\n");
}

#[tokio::test]
async fn test_missing_static_asset_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/figure.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"png".to_vec(), "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    register_demo(root.path(), &server);

    let response = get(&app(root.path()), "/api/demo/figure.png").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body.as_ref(), b"png");
}

#[tokio::test]
async fn test_unreachable_backend_is_unavailable() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let root = TempDir::new().unwrap();
    write_status(root.path(), json!({"demo": {"status": "success", "port": port}})).unwrap();

    let response = get(&app(root.path()), "/api/demo/").await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        response.json()["error"]["message"],
        format!("Cannot connect to model demo on port {}", port)
    );
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    register_demo(root.path(), &server);
    let app = app(root.path());

    let response = get(&app, "/health/demo").await;
    assert_eq!(response.status, StatusCode::OK);
    let report = response.json();
    assert_eq!(report["status"], "healthy");
    assert_eq!(report["model"], "demo");
    assert_eq!(report["port"], server.address().port());
    assert_eq!(report["http_status"], 200);
    assert!(report["response_time"].as_str().unwrap().ends_with("ms"));
    assert!(report.get("reason").is_none());

    assert_eq!(get(&app, "/health/ghost").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_endpoints_listing() {
    let server = MockServer::start().await;
    mount_missing_manifest(&server).await;

    let root = TempDir::new().unwrap();
    let port = server.address().port();
    write_status(
        root.path(),
        json!({
            "demo": {"status": "success", "port": port},
            "down": {"status": "failed", "port": null}
        }),
    )
    .unwrap();
    let app = app(root.path());

    let response = get(&app, "/endpoints/demo").await.json();
    assert_eq!(response["status"], "default endpoints");
    assert_eq!(response["endpoints"].as_array().unwrap().len(), 7);
    assert_eq!(response["endpoints"][4]["path"], "/infer/");
    assert_eq!(response["endpoints"][4]["method"], "POST");

    let response = get(&app, "/endpoints/down").await.json();
    assert_eq!(response, json!({"endpoints": [], "status": "model not running"}));

    assert_eq!(get(&app, "/endpoints/ghost").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_endpoints_listing_uses_manifest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/openapi.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paths": {"/predict": {"post": {"summary": "Predict", "description": "Run it"}}}
        })))
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    register_demo(root.path(), &server);

    let response = get(&app(root.path()), "/endpoints/demo").await.json();
    assert_eq!(
        response,
        json!({
            "endpoints": [{
                "path": "/predict",
                "method": "POST",
                "summary": "Predict",
                "description": "Run it"
            }],
            "status": "available"
        })
    );
}

#[tokio::test]
async fn test_refresh() {
    let root = TempDir::new().unwrap();
    let state = create_test_state(
        root.path(),
        Some(RefreshOutput {
            output: "3 models started\n".to_string(),
            errors: String::new(),
        }),
    );

    let response = send(&routes::router(state), Method::POST, "/refresh", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({"message": "Models refreshed", "output": "3 models started\n", "errors": ""})
    );
}

#[tokio::test]
async fn test_refresh_launch_failure_is_internal_error() {
    let root = TempDir::new().unwrap();
    let response = send(&app(root.path()), Method::POST, "/refresh", None).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"]["type"], "internal_error");
}

#[tokio::test]
async fn test_home_page_lists_backends() {
    let root = TempDir::new().unwrap();
    write_status(
        root.path(),
        json!({
            "iris_model": {"status": "success", "port": 9001},
            "ocr": {"status": "failed"}
        }),
    )
    .unwrap();
    write_model_file(
        root.path(),
        "Iris-Model",
        "utils/config.toml",
        "name = \"Iris Classifier\"\nversion = \"v1.2.0\"\n",
    )
    .unwrap();

    let response = get(&app(root.path()), "/").await;
    assert_eq!(response.status, StatusCode::OK);

    let html = response.text();
    assert!(html.contains("Iris Classifier"));
    assert!(html.contains("v1.2.0"));
    assert!(html.contains(r#"href="/api/iris_model/""#));
    assert!(html.contains("<h3>Ocr</h3>"));
    assert!(html.contains("Registered: <b>2</b>"));
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    register_demo(root.path(), &server);
    let mut config = test_config(root.path());
    config.backends.proxy_timeout_secs = 1;
    let app = routes::router(create_state_with_config(config, None));

    let response = get(&app, "/api/demo/slow").await;
    assert_eq!(response.status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(
        response.json(),
        json!({"error": {"type": "timeout", "message": "Timeout connecting to model demo"}})
    );
}

#[tokio::test]
async fn test_malformed_sibling_entry_keeps_backend_reachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("ok", "text/plain"))
        .mount(&server)
        .await;

    let port = server.address().port();
    for sibling in [
        json!({"status": null, "port": null}),
        json!({"status": "failed", "port": "9002"}),
    ] {
        let root = TempDir::new().unwrap();
        write_status(
            root.path(),
            json!({"demo": {"status": "success", "port": port}, "other": sibling}),
        )
        .unwrap();
        let app = app(root.path());

        let response = get(&app, "/api/demo/x").await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text(), "ok");

        let response = get(&app, "/api/other/x").await;
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    }
}

#[tokio::test]
async fn test_forgetting_endpoints_refetches_manifest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/openapi.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paths": {"/predict": {"post": {"summary": "Predict"}}}
        })))
        .expect(2)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    register_demo(root.path(), &server);
    let app = app(root.path());

    assert_eq!(get(&app, "/endpoints/demo").await.json()["status"], "available");
    get(&app, "/endpoints/demo").await;

    let response = send(&app, Method::DELETE, "/endpoints/demo", None).await;
    assert_eq!(response.json(), json!({"model": "demo", "cleared": true}));
    let response = send(&app, Method::DELETE, "/endpoints/demo", None).await;
    assert_eq!(response.json(), json!({"model": "demo", "cleared": false}));

    get(&app, "/endpoints/demo").await;
}

#[tokio::test]
async fn test_cache_clear_picks_up_new_descriptor() {
    let root = TempDir::new().unwrap();
    write_status(root.path(), json!({"late_model": {"status": "failed"}})).unwrap();
    let app = app(root.path());

    assert!(get(&app, "/").await.text().contains("<h3>Late Model</h3>"));

    write_model_file(
        root.path(),
        "late-model",
        "utils/config.toml",
        "name = \"Late Arrival\"\n",
    )
    .unwrap();
    assert!(!get(&app, "/").await.text().contains("Late Arrival"));

    let response = send(&app, Method::POST, "/cache/clear", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"message": "Caches cleared"}));
    assert!(get(&app, "/").await.text().contains("<h3>Late Arrival</h3>"));
}
