use axum::{routing::post, Json, Router};
use http::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_utils::extractor::{ApiJson, ApiPath};
use shared_utils::test_utils::{json_request, read_json};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Action {
    Accept,
    Reject,
}

#[derive(Debug, Deserialize)]
struct DecisionBody {
    action: Action,
}

async fn echo(
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<DecisionBody>,
) -> Result<Json<Value>, AppError> {
    let accepted = matches!(body.action, Action::Accept);
    Ok(Json(json!({"id": id, "accepted": accepted})))
}

fn app() -> Router {
    Router::new().route("/items/{id}", post(echo))
}

#[tokio::test]
async fn well_formed_request_passes_through() {
    let id = Uuid::new_v4();
    let response = app()
        .oneshot(json_request(
            Method::POST,
            &format!("/items/{}", id),
            Some(json!({"action": "accept"})),
        ))
        .await
        .unwrap();

    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], true);
}

#[tokio::test]
async fn unknown_enum_value_is_undecodable() {
    let response = app()
        .oneshot(json_request(
            Method::POST,
            &format!("/items/{}", Uuid::new_v4()),
            Some(json!({"action": "maybe"})),
        ))
        .await
        .unwrap();

    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "undecodable.request");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn malformed_path_is_undecodable() {
    let response = app()
        .oneshot(json_request(
            Method::POST,
            "/items/not-a-uuid",
            Some(json!({"action": "reject"})),
        ))
        .await
        .unwrap();

    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "undecodable.request");
}
