use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Movie {
    pub id: u32,
    pub title: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoviePage {
    pub page: u32,
    pub results: Vec<Movie>,
    pub total_pages: u32,
}

/// Echo of a `POST /users` call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Echo {
    pub content_type: Option<String>,
    pub body: Value,
}

/// Hit counters for `/flaky/{key}`.
pub type Hits = Arc<RwLock<HashMap<String, u32>>>;

pub fn app() -> Router {
    let hits: Hits = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/ok", get(ok))
        .route("/movies/success", get(movies_success))
        .route("/movies/failure", get(movies_failure))
        .route("/search", get(search))
        .route("/users", post(create_user))
        .route("/flaky/{key}", get(flaky))
        .route("/headers", get(echo_headers))
        .with_state(hits)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub fn sample_page() -> MoviePage {
    MoviePage {
        page: 1,
        results: vec![
            Movie {
                id: 949,
                title: "Heat".to_string(),
            },
            Movie {
                id: 680,
                title: "Pulp Fiction".to_string(),
            },
        ],
        total_pages: 1,
    }
}

async fn ok() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn movies_success() -> Json<MoviePage> {
    Json(sample_page())
}

async fn movies_failure() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Invalid API key", "code": "AUTH_INVALID" })),
    )
}

/// Query pairs in arrival order, duplicates kept.
async fn search(Query(pairs): Query<Vec<(String, String)>>) -> Json<Vec<(String, String)>> {
    Json(pairs)
}

async fn create_user(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Echo>) {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    (StatusCode::CREATED, Json(Echo { content_type, body }))
}

/// `503` on the first hit for a key, `200` afterwards.
async fn flaky(State(hits): State<Hits>, Path(key): Path<String>) -> (StatusCode, Json<Value>) {
    let mut hits = hits.write().await;
    let count = hits.entry(key).or_insert(0);
    *count += 1;
    if *count == 1 {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "message": "try again" })))
    } else {
        (StatusCode::OK, Json(json!({ "ok": true })))
    }
}

/// Request headers as a lowercase-name map.
async fn echo_headers(headers: HeaderMap) -> Json<HashMap<String, String>> {
    let echoed = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    Json(echoed)
}
