// Error handling tests
// Author: kelexine (https://github.com/kelexine)

use axum::http::StatusCode;
use axum::response::IntoResponse;
use cachegate::error::GatewayError;

#[test]
fn test_error_display_messages() {
    let errors = vec![
        GatewayError::Config("bad limit".to_string()),
        GatewayError::Upstream("connection refused".to_string()),
        GatewayError::Timeout(1500),
        GatewayError::Storage("disk full".to_string()),
        GatewayError::Precache {
            path: "/index.html".to_string(),
            reason: "HTTP 500".to_string(),
        },
        GatewayError::InvalidRequest("Bad request".to_string()),
        GatewayError::Internal("oops".to_string()),
    ];

    for error in errors {
        let display = format!("{}", error);
        assert!(!display.is_empty(), "Error should have display message");
    }
}

#[test]
fn test_precache_error_names_path() {
    let error = GatewayError::Precache {
        path: "/index.html".to_string(),
        reason: "HTTP 503".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("/index.html"));
    assert!(display.contains("HTTP 503"));
}

#[test]
fn test_timeout_error() {
    let error = GatewayError::Timeout(1500);
    assert!(format!("{}", error).contains("1500ms"));
}

#[test]
fn test_status_mapping() {
    let cases = [
        (GatewayError::Upstream("down".into()), StatusCode::BAD_GATEWAY),
        (GatewayError::Timeout(10), StatusCode::GATEWAY_TIMEOUT),
        (GatewayError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
        (GatewayError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (GatewayError::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (error, expected) in cases {
        assert_eq!(error.into_response().status(), expected);
    }
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
    let error: GatewayError = io.into();
    assert!(matches!(error, GatewayError::Io(_)));
}
