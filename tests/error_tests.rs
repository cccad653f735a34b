// Error handling tests
// Author: kelexine (https://github.com/kelexine)

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use nbrp::error::{ProxyError, PROXY_FAILURE_MESSAGE};
use redis::{ErrorKind, RedisError};

#[test]
fn test_error_display_messages() {
    let errors = vec![
        ProxyError::Config("bad prefix".to_string()),
        ProxyError::InvalidDuration("five minutes".to_string()),
        ProxyError::Redis(RedisError::from((ErrorKind::IoError, "connection refused"))),
        ProxyError::Upstream("connection reset".to_string()),
        ProxyError::Internal("oops".to_string()),
    ];

    for error in errors {
        let display = format!("{}", error);
        assert!(!display.is_empty(), "Error should have display message");
    }
}

#[test]
fn test_upstream_error_message() {
    let error = ProxyError::Upstream("Connection refused".to_string());
    assert!(format!("{}", error).contains("Connection refused"));
}

#[tokio::test]
async fn test_upstream_error_renders_fixed_plain_text() {
    let response = ProxyError::Upstream("dns failure".to_string()).into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], PROXY_FAILURE_MESSAGE.as_bytes());
}

#[tokio::test]
async fn test_store_error_renders_json() {
    let response = ProxyError::Redis(RedisError::from((ErrorKind::IoError, "timeout"))).into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["type"], "error");
    assert_eq!(json["error"]["type"], "cache_error");
    assert!(json["error"]["message"].as_str().unwrap().contains("timeout"));
}
