//! Tests for server error mapping.

use super::*;
use axum::http::StatusCode;
use warden_core::{Error, Permission};

async fn response_parts(err: ServerError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, body)
}

#[tokio::test]
async fn test_forbidden_maps_to_403() {
    let err = ServerError::Gateway(Error::Forbidden {
        permission: Permission::CanDelete,
    });
    let (status, body) = response_parts(err).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("can_delete"));
    assert_eq!(body["code"], 403);
}

#[tokio::test]
async fn test_not_found_maps_to_404() {
    let err = ServerError::Gateway(Error::NotFound {
        identifier: "ghost@example.com".to_string(),
    });
    let (status, _) = response_parts(err).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ambiguous_input_maps_to_400() {
    let err = ServerError::Gateway(Error::AmbiguousInput("no roles".to_string()));
    let (status, _) = response_parts(err).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_step_up_expiry_maps_to_410() {
    let (status, _) = response_parts(ServerError::Gateway(Error::StepUpExpired)).await;
    assert_eq!(status, StatusCode::GONE);

    let (status, _) = response_parts(ServerError::Gateway(Error::StepUpTimeout)).await;
    assert_eq!(status, StatusCode::GONE);
}

#[tokio::test]
async fn test_external_api_maps_to_502() {
    let err = ServerError::Gateway(Error::ExternalApi {
        status: 500,
        message: "upstream".to_string(),
    });
    let (status, _) = response_parts(err).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_unauthorized_maps_to_401() {
    let err = ServerError::Unauthorized("missing bearer token".to_string());
    let (status, body) = response_parts(err).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("bearer"));
}

#[tokio::test]
async fn test_internal_errors_hide_details() {
    let err = ServerError::Gateway(Error::Store("tuple shard 3 rejected write".to_string()));
    let (status, body) = response_parts(err).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body["error"].as_str().unwrap().contains("shard"));
}
