mod common;

use axum::{
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use common::TestApp;

const FRONTEND: &str = "http://localhost:3000";

fn preflight(origin: &str) -> Request<Body> {
    Request::builder()
        .method("OPTIONS")
        .uri("/docker/user-containers")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
        .body(Body::empty())
        .expect("request")
}

fn header_str<'a>(resp: &'a Response<Body>, name: header::HeaderName) -> Option<&'a str> {
    resp.headers().get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn preflight_from_frontend_is_allowed_with_credentials() {
    // Trailing slash in config, none in the browser's Origin.
    let t = TestApp::with_config("cors-allowed", |cfg| {
        cfg.basic.frontend_url = Some(format!("{FRONTEND}/"));
    })
    .await;

    let resp = t.send(preflight(FRONTEND)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        header_str(&resp, header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(FRONTEND)
    );
    assert_eq!(
        header_str(&resp, header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
        Some("true")
    );
    assert_eq!(
        header_str(&resp, header::ACCESS_CONTROL_ALLOW_METHODS),
        Some("GET")
    );
    assert!(
        header_str(&resp, header::ACCESS_CONTROL_ALLOW_HEADERS)
            .is_some_and(|h| h.contains("authorization"))
    );

    t.cleanup().await;
}

#[tokio::test]
async fn foreign_origin_gets_no_allow_origin() {
    let t = TestApp::with_config("cors-foreign", |cfg| {
        cfg.basic.frontend_url = Some(FRONTEND.to_string());
    })
    .await;

    let resp = t.send(preflight("http://evil.example")).await;
    assert!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );

    let resp = t
        .send(
            Request::builder()
                .uri("/auth/me")
                .header(header::ORIGIN, "http://evil.example")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );

    t.cleanup().await;
}

#[tokio::test]
async fn no_frontend_configured_allows_no_origin() {
    let t = TestApp::new("cors-unset").await;

    let resp = t.send(preflight(FRONTEND)).await;
    assert!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );

    t.cleanup().await;
}

#[tokio::test]
async fn simple_request_from_frontend_is_tagged() {
    let t = TestApp::with_config("cors-simple", |cfg| {
        cfg.basic.frontend_url = Some(FRONTEND.to_string());
    })
    .await;

    let resp = t
        .send(
            Request::builder()
                .uri("/auth/me")
                .header(header::ORIGIN, FRONTEND)
                .body(Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        header_str(&resp, header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(FRONTEND)
    );

    t.cleanup().await;
}
