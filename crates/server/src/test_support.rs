use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, header},
    response::Response,
};
use db::DBService;
use utils_jwt::TokenService;

use crate::{AppState, http};

/// State against a throwaway file-backed database. In-memory SQLite would
/// hand each pooled connection its own database, so tests use real files.
pub(crate) async fn test_state() -> AppState {
    let path = std::env::temp_dir().join(format!(
        "todo-server-test-{}.sqlite",
        uuid::Uuid::new_v4()
    ));
    let url = format!("sqlite://{}", path.to_string_lossy());
    let db = DBService::new(&url).await.expect("test database");
    AppState::new(db, TokenService::new("test-secret"))
}

pub(crate) async fn test_app() -> (AppState, Router) {
    let state = test_state().await;
    (state.clone(), http::router(state, None))
}

pub(crate) fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub(crate) async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
