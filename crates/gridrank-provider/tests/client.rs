//! Integration tests for `ProviderClient` using wiremock HTTP mocks.

use gridrank_core::Credentials;
use gridrank_provider::{ClientSettings, ProviderClient, ProviderError, TaskPostItem};
use wiremock::matchers::{basic_auth, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> ProviderClient {
    ProviderClient::new(
        Credentials::new("grid-user", "grid-password"),
        ClientSettings::for_base_url(base_url),
    )
    .expect("client construction should not fail")
}

fn retrying_client(base_url: &str, max_retries: u32) -> ProviderClient {
    let settings = ClientSettings {
        max_retries,
        backoff_base_ms: 1,
        ..ClientSettings::for_base_url(base_url)
    };
    ProviderClient::new(Credentials::new("grid-user", "grid-password"), settings)
        .expect("client construction should not fail")
}

fn item(i: usize, total: usize) -> TaskPostItem {
    TaskPostItem {
        keyword: "Corner Cafe".to_owned(),
        location_coordinate: format!("37.00000{i},-122.000000,15"),
        language_code: "en".to_owned(),
        device: "desktop".to_owned(),
        tag: format!("grid_point_{i}_{total}"),
    }
}

#[tokio::test]
async fn post_tasks_sends_batch_with_basic_auth() {
    let server = MockServer::start().await;
    let items = vec![item(1, 2), item(2, 2)];

    let body = serde_json::json!({
        "status_code": 20_000,
        "status_message": "Ok.",
        "tasks": [
            {
                "id": "task-1",
                "status_code": 20_100,
                "status_message": "Task Created.",
                "data": { "tag": "grid_point_1_2" }
            },
            {
                "id": "task-2",
                "status_code": 40_501,
                "status_message": "Invalid Field.",
                "data": { "tag": "grid_point_2_2" }
            }
        ]
    });

    Mock::given(method("POST"))
        .and(path("/v3/serp/google/maps/task_post"))
        .and(basic_auth("grid-user", "grid-password"))
        .and(body_json(&items))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let envelope = client.post_tasks(&items).await.expect("batch should post");

    assert_eq!(envelope.tasks.len(), 2);
    assert_eq!(envelope.tasks[0].created_id(), Some("task-1"));
    assert_eq!(envelope.tasks[1].created_id(), None);
    assert_eq!(envelope.tasks[1].tag(), Some("grid_point_2_2"));
}

#[tokio::test]
async fn post_tasks_non_2xx_is_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/serp/google/maps/task_post"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.post_tasks(&[item(1, 1)]).await.unwrap_err();
    assert!(
        matches!(err, ProviderError::UnexpectedStatus { status: 401, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn post_tasks_is_not_retried_on_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/serp/google/maps/task_post"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = retrying_client(&server.uri(), 3);
    let err = client.post_tasks(&[item(1, 1)]).await.unwrap_err();
    assert!(matches!(err, ProviderError::UnexpectedStatus { status: 503, .. }));
}

#[tokio::test]
async fn post_tasks_envelope_error_is_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/serp/google/maps/task_post"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status_code": 40_200,
            "status_message": "Payment Required.",
            "tasks": []
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.post_tasks(&[item(1, 1)]).await.unwrap_err();
    assert!(matches!(err, ProviderError::Api { code: 40_200, .. }), "got {err:?}");
}

#[tokio::test]
async fn post_tasks_malformed_body_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/serp/google/maps/task_post"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.post_tasks(&[item(1, 1)]).await.unwrap_err();
    assert!(matches!(err, ProviderError::Deserialize { .. }), "got {err:?}");
}

#[tokio::test]
async fn get_task_returns_raw_payload() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "status_code": 20_000,
        "tasks": [{
            "id": "task-1",
            "status_code": 20_000,
            "status_message": "Ok.",
            "result_count": 1,
            "result": [{ "items": [{ "domain": "example.com" }] }]
        }]
    });

    Mock::given(method("GET"))
        .and(path("/v3/serp/google/maps/task_get/advanced/task-1"))
        .and(basic_auth("grid-user", "grid-password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let payload = client.get_task("task-1").await.expect("should fetch");
    assert_eq!(payload, body);
}

#[tokio::test]
async fn get_task_retries_transient_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/serp/google/maps/task_get/advanced/task-1"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/serp/google/maps/task_get/advanced/task-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "tasks": [] })),
        )
        .mount(&server)
        .await;

    let client = retrying_client(&server.uri(), 2);
    let payload = client.get_task("task-1").await.expect("retry should succeed");
    assert_eq!(payload, serde_json::json!({ "tasks": [] }));
}

#[tokio::test]
async fn get_task_gives_up_after_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/serp/google/maps/task_get/advanced/task-1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = retrying_client(&server.uri(), 2);
    let err = client.get_task("task-1").await.unwrap_err();
    assert!(matches!(err, ProviderError::UnexpectedStatus { status: 500, .. }));
}

#[tokio::test]
async fn check_connection_reports_auth_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/appendix/user_data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status_code": 40_100,
            "status_message": "You are not authorized to access this resource."
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.check_connection().await.unwrap_err();
    assert!(matches!(err, ProviderError::Api { code: 40_100, .. }));
}

#[tokio::test]
async fn check_connection_succeeds_on_ok_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/appendix/user_data"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "status_code": 20_000, "tasks": [] })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client.check_connection().await.expect("connection check should pass");
}
