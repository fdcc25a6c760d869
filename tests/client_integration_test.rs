use checkly_provider::{ApiError, ChecklyApi, ChecklyClient, EnvironmentVariable};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, api_key: Option<&str>) -> ChecklyClient {
    let mut client = ChecklyClient::new(&server.uri(), api_key.map(str::to_string)).unwrap();
    client.set_account_id("acc-123");
    client
}

fn variable(key: &str, value: &str, locked: bool) -> EnvironmentVariable {
    EnvironmentVariable {
        key: key.to_string(),
        value: value.to_string(),
        locked,
    }
}

#[tokio::test]
async fn test_create_sends_headers_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/variables"))
        .and(header("X-Checkly-Account", "acc-123"))
        .and(header("x-checkly-source", "TF"))
        .and(header("authorization", "Bearer cu_key"))
        .and(body_json(json!({"key": "one", "value": "secret", "locked": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"key": "one", "value": "secret", "locked": true})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let created = client(&mock_server, Some("cu_key"))
        .create_environment_variable(&variable("one", "secret", true))
        .await
        .unwrap();

    assert_eq!(created, variable("one", "secret", true));
}

#[tokio::test]
async fn test_get_decodes_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/variables/one"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"key": "one", "value": "secret"})),
        )
        .mount(&mock_server)
        .await;

    let fetched = client(&mock_server, Some("cu_key"))
        .get_environment_variable("one")
        .await
        .unwrap();

    // A missing `locked` field decodes as false
    assert_eq!(fetched, variable("one", "secret", false));
}

#[tokio::test]
async fn test_get_missing_maps_to_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/variables/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server, Some("cu_key"))
        .get_environment_variable("missing")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_update_puts_to_prior_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/v1/variables/one"))
        .and(body_json(json!({"key": "two", "value": "three", "locked": false})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"key": "two", "value": "three", "locked": false})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let updated = client(&mock_server, Some("cu_key"))
        .update_environment_variable("one", &variable("two", "three", false))
        .await
        .unwrap();

    assert_eq!(updated.key, "two");
}

#[tokio::test]
async fn test_delete() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/variables/one"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    client(&mock_server, Some("cu_key"))
        .delete_environment_variable("one")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_error_status_keeps_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/variables"))
        .respond_with(
            ResponseTemplate::new(409).set_body_string(r#"{"message":"Key already exists"}"#),
        )
        .mount(&mock_server)
        .await;

    let err = client(&mock_server, Some("cu_key"))
        .create_environment_variable(&variable("one", "secret", false))
        .await
        .unwrap_err();

    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 409);
            assert!(body.contains("Key already exists"));
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_without_api_key_sends_no_authorization() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/variables/one"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let mut client = client(&mock_server, None);
    client.set_source("CI");
    client.delete_environment_variable("one").await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(requests[0].headers.get("x-checkly-source").unwrap(), "CI");
    assert_eq!(requests[0].headers.get("x-checkly-account").unwrap(), "acc-123");
}

#[tokio::test]
async fn test_keys_are_path_encoded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/variables/a%2Fb"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"key": "a/b", "value": "v"})),
        )
        .mount(&mock_server)
        .await;

    let fetched = client(&mock_server, Some("cu_key"))
        .get_environment_variable("a/b")
        .await
        .unwrap();
    assert_eq!(fetched.key, "a/b");
}
