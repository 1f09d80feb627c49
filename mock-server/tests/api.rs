use std::collections::HashMap;

use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, sample_page, Echo, MoviePage};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- fixtures ---

#[tokio::test]
async fn ok_returns_true() {
    let resp = app().oneshot(get("/ok")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&body_bytes(resp).await[..], br#"{"ok":true}"#);
}

#[tokio::test]
async fn movies_success_returns_page() {
    let resp = app().oneshot(get("/movies/success")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let page: MoviePage = body_json(resp).await;
    assert_eq!(page, sample_page());
}

#[tokio::test]
async fn movies_failure_returns_structured_401() {
    let resp = app().oneshot(get("/movies/failure")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let payload: Value = body_json(resp).await;
    assert_eq!(payload["message"], "Invalid API key");
    assert_eq!(payload["code"], "AUTH_INVALID");
}

// --- echo ---

#[tokio::test]
async fn search_echoes_query_in_order() {
    let resp = app().oneshot(get("/search?q=rust&page=1&q=again")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let pairs: Vec<(String, String)> = body_json(resp).await;
    assert_eq!(
        pairs,
        vec![
            ("q".to_string(), "rust".to_string()),
            ("page".to_string(), "1".to_string()),
            ("q".to_string(), "again".to_string()),
        ]
    );
}

#[tokio::test]
async fn users_echoes_body_and_content_type() {
    let req = Request::builder()
        .method("POST")
        .uri("/users")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(r#"{"name":"Luis","age":25}"#.to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.content_type.as_deref(), Some("application/json"));
    assert_eq!(echo.body["name"], "Luis");
    assert_eq!(echo.body["age"], 25);
}

#[tokio::test]
async fn users_rejects_non_json_content_type() {
    let req = Request::builder()
        .method("POST")
        .uri("/users")
        .body("name=Luis".to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn headers_echoes_lowercase_names() {
    let req = Request::builder()
        .uri("/headers")
        .header("X-Test", "1")
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    let headers: HashMap<String, String> = body_json(resp).await;
    assert_eq!(headers.get("x-test").map(String::as_str), Some("1"));
}

// --- flaky ---

#[tokio::test]
async fn flaky_fails_once_per_key() {
    let app = app();

    let first = app.clone().oneshot(get("/flaky/a")).await.unwrap();
    let second = app.clone().oneshot(get("/flaky/a")).await.unwrap();
    let other = app.oneshot(get("/flaky/b")).await.unwrap();

    assert_eq!(first.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(other.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let resp = app().oneshot(get("/nope")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
