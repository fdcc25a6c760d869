//! Configuration resolution against the real process environment.
//!
//! Every case runs inside `temp_env`, which serializes access to the
//! environment across tests in this binary.

use checkly_provider::testing::{ProviderTester, TestError};
use checkly_provider::ChecklyProvider;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENV_VARS: [&str; 4] = [
    "CHECKLY_API_KEY",
    "CHECKLY_API_URL",
    "CHECKLY_ACCOUNT_ID",
    "CHECKLY_API_SOURCE",
];

#[test]
fn test_missing_account_id_fails_configure() {
    temp_env::with_vars_unset(ENV_VARS, || {
        tokio_test::block_on(async {
            let tester = ProviderTester::new(ChecklyProvider::new("test"));
            let err = tester
                .configure(json!({"api_key": "cu_key"}))
                .await
                .unwrap_err();

            match err {
                TestError::Provider(e) => {
                    let diagnostic = e.to_diagnostic();
                    assert_eq!(diagnostic.summary, "Missing Checkly account ID");
                    assert_eq!(
                        diagnostic.detail.as_deref(),
                        Some("Set the `account_id` provider attribute or the CHECKLY_ACCOUNT_ID environment variable.")
                    );
                    assert_eq!(diagnostic.attribute.as_deref(), Some("account_id"));
                },
                other => panic!("unexpected error: {other}"),
            }
            assert!(!tester.provider().is_configured());
        });
    });
}

#[test]
fn test_missing_api_key_warns() {
    temp_env::with_vars_unset(ENV_VARS, || {
        tokio_test::block_on(async {
            let provider = ChecklyProvider::new("test");
            let diagnostics = checkly_provider::ProviderService::configure(
                &provider,
                json!({"account_id": "acc-123"}),
            )
            .await
            .unwrap();

            assert_eq!(diagnostics.len(), 1);
            assert!(!diagnostics[0].is_error());
            assert_eq!(diagnostics[0].attribute.as_deref(), Some("api_key"));
            assert!(provider.is_configured());
        });
    });
}

#[test]
fn test_settings_fall_back_to_environment() {
    let mock_server = tokio_test::block_on(MockServer::start());
    tokio_test::block_on(
        Mock::given(method("GET"))
            .and(path("/v1/variables/one"))
            .and(header("X-Checkly-Account", "acc-env"))
            .and(header("authorization", "Bearer cu_env"))
            .and(header("x-checkly-source", "CI"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"key": "one", "value": "v", "locked": true})),
            )
            .expect(1)
            .mount(&mock_server),
    );

    temp_env::with_vars(
        [
            ("CHECKLY_API_KEY", Some("cu_env")),
            ("CHECKLY_API_URL", Some(mock_server.uri().as_str())),
            ("CHECKLY_ACCOUNT_ID", Some("acc-env")),
            ("CHECKLY_API_SOURCE", Some("CI")),
        ],
        || {
            tokio_test::block_on(async {
                let tester = ProviderTester::new(ChecklyProvider::new("test"));
                tester.configure(json!({})).await.unwrap();

                let state = tester
                    .lifecycle_import("checkly_environment_variable", "one")
                    .await
                    .unwrap();
                assert_eq!(
                    state,
                    json!({"key": "one", "value": "v", "locked": true, "id": "one"})
                );
            });
        },
    );
}

#[test]
fn test_explicit_config_beats_environment() {
    let mock_server = tokio_test::block_on(MockServer::start());
    tokio_test::block_on(
        Mock::given(method("DELETE"))
            .and(path("/v1/variables/one"))
            .and(header("X-Checkly-Account", "acc-config"))
            .and(header("authorization", "Bearer cu_config"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server),
    );

    temp_env::with_vars(
        [
            ("CHECKLY_API_KEY", Some("cu_env")),
            ("CHECKLY_API_URL", Some("http://127.0.0.1:9")),
            ("CHECKLY_ACCOUNT_ID", Some("acc-env")),
        ],
        || {
            tokio_test::block_on(async {
                let tester = ProviderTester::new(ChecklyProvider::new("test"));
                tester
                    .configure(json!({
                        "account_id": "acc-config",
                        "api_url": mock_server.uri(),
                        "api_key": "cu_config"
                    }))
                    .await
                    .unwrap();

                tester
                    .delete(
                        "checkly_environment_variable",
                        json!({"key": "one", "value": "v", "locked": false, "id": "one"}),
                    )
                    .await
                    .unwrap();
            });
        },
    );
}
