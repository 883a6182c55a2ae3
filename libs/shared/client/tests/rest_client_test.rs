use std::time::Duration;

use assert_matches::assert_matches;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_client::{RestClient, RestError};

fn client_for(server: &MockServer) -> RestClient {
    RestClient::new(server.uri(), Duration::from_secs(2)).expect("client should build")
}

#[tokio::test]
async fn request_decodes_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resources/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "MRI Machine"})))
        .mount(&server)
        .await;

    let value: Value = client_for(&server)
        .request(Method::GET, "/resources/abc", None)
        .await
        .expect("request should succeed");

    assert_eq!(value["name"], "MRI Machine");
}

#[tokio::test]
async fn execute_sends_body_and_accepts_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/external-task/1/complete"))
        .and(body_json(json!({"workerId": "w"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let status = client_for(&server)
        .execute(
            Method::POST,
            "/external-task/1/complete",
            Some(json!({"workerId": "w"})),
        )
        .await
        .expect("execute should succeed");

    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn non_success_status_is_reported_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doctors/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such doctor"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .execute(Method::GET, "/doctors/missing", None)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_matches!(err, RestError::Status { status: 404, ref body } if body == "no such doctor");
}

#[tokio::test]
async fn trailing_slash_in_base_url_is_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = RestClient::new(format!("{}/", server.uri()), Duration::from_secs(2)).unwrap();
    assert_eq!(client.base_url(), server.uri());
    let result: Result<Value, _> = client.request(Method::GET, "/ping", None).await;
    assert!(result.is_ok());
}
