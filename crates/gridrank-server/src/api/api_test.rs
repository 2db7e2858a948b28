use super::*;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use gridrank_core::Credentials;
use gridrank_engine::{GridRankChecker, PollConfig};
use gridrank_provider::ClientSettings;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn state(service: Option<RankingService>) -> AppState {
    AppState {
        service,
        shutdown: CancellationToken::new(),
        default_max_wait: Duration::from_secs(5),
        default_poll_interval: Duration::from_millis(100),
    }
}

fn service_for(server: &MockServer) -> RankingService {
    let checker = GridRankChecker::new(
        Some(Credentials::new("grid-user", "grid-password")),
        ClientSettings::for_base_url(&server.uri()),
        PollConfig {
            max_wait: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
            max_concurrent: 2,
        },
    )
    .expect("checker");
    RankingService::new(checker)
}

fn open_app(service: Option<RankingService>) -> Router {
    let auth = AuthState::from_raw("", true).expect("auth");
    build_app(state(service), auth, default_rate_limit_state())
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn mount_one_point_grid(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v3/serp/google/maps/task_post"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status_code": 20_000,
            "tasks": [{
                "id": "t1",
                "status_code": 20_100,
                "status_message": "Task Created.",
                "data": { "tag": "grid_point_1_1" }
            }]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/serp/google/maps/task_get/advanced/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status_code": 20_000,
            "tasks": [{
                "status_code": 20_000,
                "result_count": 1,
                "result": [{ "items": [
                    { "domain": "other.com" },
                    { "url": "https://www.example.com/menu" }
                ] }]
            }]
        })))
        .mount(server)
        .await;
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("provider_unconfigured", StatusCode::SERVICE_UNAVAILABLE),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, expected) in cases {
        let response = ApiError::new("req-1", code, "msg").into_response();
        assert_eq!(response.status(), expected, "code {code}");
    }
}

#[tokio::test]
async fn health_reports_unconfigured_provider() {
    let request = Request::builder()
        .uri("/api/v1/health")
        .header("x-request-id", "req-health")
        .body(Body::empty())
        .expect("request");
    let (status, json) = send(open_app(None), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["provider"], "unconfigured");
    assert_eq!(json["meta"]["request_id"], "req-health");
}

#[tokio::test]
async fn ranking_routes_return_503_without_provider() {
    let body = json!({ "business_name": "Corner Cafe", "lat": 37.0, "lng": -122.0 });
    let (status, json) = send(
        open_app(None),
        post_json("/api/v1/ranking/create-tasks", &body),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"]["code"], "provider_unconfigured");
}

#[tokio::test]
async fn invalid_grid_request_is_rejected_before_provider_lookup() {
    let body = json!({ "business_name": "Corner Cafe", "lat": 91.0, "lng": 0.0 });
    let (status, json) = send(
        open_app(None),
        post_json("/api/v1/ranking/grid-check", &body),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn unknown_device_is_a_validation_error() {
    let body = json!({
        "business_name": "Corner Cafe", "lat": 37.0, "lng": -122.0, "device": "watch"
    });
    let (status, json) = send(
        open_app(None),
        post_json("/api/v1/ranking/create-tasks", &body),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]["message"]
        .as_str()
        .is_some_and(|m| m.contains("watch")));
}

#[tokio::test]
async fn out_of_range_polling_parameters_are_rejected() {
    let body = json!({ "task_ids": ["t1"], "max_wait_time": 30, "poll_interval": 30 });
    let (status, json) = send(open_app(None), post_json("/api/v1/ranking/results", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn empty_task_ids_are_rejected_for_results() {
    let body = json!({ "task_ids": [] });
    let (status, _) = send(open_app(None), post_json("/api/v1/ranking/results", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn grid_endpoint_needs_no_provider() {
    let body = json!({ "lat": 37.0, "lng": -122.0, "grid_size": 3, "radius_km": 2.0 });
    let (status, json) = send(open_app(None), post_json("/api/v1/ranking/grid", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["coordinates"].as_array().map(Vec::len), Some(9));
    assert_eq!(json["data"]["grid_size"], 3);
}

#[tokio::test]
async fn grid_endpoint_rejects_oversized_grid() {
    let body = json!({ "lat": 37.0, "lng": -122.0, "grid_size": 11 });
    let (status, _) = send(open_app(None), post_json("/api/v1/ranking/grid", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn info_without_provider_is_unconfigured() {
    let request = Request::builder()
        .uri("/api/v1/ranking/info")
        .body(Body::empty())
        .expect("request");
    let (status, json) = send(open_app(None), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["credentials_configured"], false);
    assert_eq!(json["data"]["api_connection"], "unchecked");
}

#[tokio::test]
async fn bearer_auth_guards_ranking_routes_but_not_health() {
    let auth = AuthState::from_raw("secret-token", false).expect("auth");
    let app = build_app(state(None), auth, default_rate_limit_state());

    let unauthenticated = Request::builder()
        .uri("/api/v1/ranking/info")
        .body(Body::empty())
        .expect("request");
    let (status, json) = send(app.clone(), unauthenticated).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");

    let authenticated = Request::builder()
        .uri("/api/v1/ranking/info")
        .header("authorization", "Bearer secret-token")
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(app.clone(), authenticated).await;
    assert_eq!(status, StatusCode::OK);

    let health = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(app, health).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn rate_limit_rejects_requests_over_the_window() {
    let auth = AuthState::from_raw("", true).expect("auth");
    let app = build_app(
        state(None),
        auth,
        RateLimitState::new(1, Duration::from_secs(60)),
    );
    let request = || {
        Request::builder()
            .uri("/api/v1/ranking/info")
            .body(Body::empty())
            .expect("request")
    };

    let (first, _) = send(app.clone(), request()).await;
    let (second, json) = send(app, request()).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"]["code"], "rate_limited");
}

#[tokio::test]
async fn create_tasks_returns_201_with_paired_tasks() {
    let server = MockServer::start().await;
    mount_one_point_grid(&server).await;

    let body = json!({
        "business_name": "Corner Cafe", "lat": 37.0, "lng": -122.0, "grid_size": 1
    });
    let (status, json) = send(
        open_app(Some(service_for(&server))),
        post_json("/api/v1/ranking/create-tasks", &body),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["task_ids"], json!(["t1"]));
    assert_eq!(json["data"]["rejected_count"], 0);
    assert_eq!(json["data"]["tasks"][0]["submission"]["state"], "created");
}

#[tokio::test]
async fn grid_check_attaches_rank_map_for_target_domain() {
    let server = MockServer::start().await;
    mount_one_point_grid(&server).await;

    let body = json!({
        "business_name": "Corner Cafe",
        "lat": 37.0,
        "lng": -122.0,
        "grid_size": 1,
        "target_domain": "Example.com"
    });
    let (status, json) = send(
        open_app(Some(service_for(&server))),
        post_json("/api/v1/ranking/grid-check", &body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["metadata"]["success"], true);
    assert_eq!(data["rank_map"][0]["status"], "completed");
    assert_eq!(data["rank_map"][0]["rank"], 2);
}

#[tokio::test]
async fn grid_check_rejects_grid_that_cannot_be_formatted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let body = json!({
        "business_name": "Corner Cafe", "lat": 89.999, "lng": 0.0, "grid_size": 3
    });
    let (status, json) = send(
        open_app(Some(service_for(&server))),
        post_json("/api/v1/ranking/grid-check", &body),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn results_builds_rank_map_from_coordinates() {
    let server = MockServer::start().await;
    mount_one_point_grid(&server).await;

    let body = json!({
        "task_ids": ["t1"],
        "coordinates": ["37.000000,-122.000000,15"],
        "target_domain": "example.com"
    });
    let (status, json) = send(
        open_app(Some(service_for(&server))),
        post_json("/api/v1/ranking/results", &body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["data"]["completed"]["t1"].is_object());
    assert_eq!(json["data"]["rank_map"][0]["rank"], 2);
    assert_eq!(json["data"]["rank_map"][0]["zoom"], 15);
}

#[tokio::test]
async fn status_without_ids_reports_no_tasks() {
    let server = MockServer::start().await;
    let (status, json) = send(
        open_app(Some(service_for(&server))),
        post_json("/api/v1/ranking/status", &json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "no_tasks");
    assert_eq!(json["data"]["task_count"], 0);
}
