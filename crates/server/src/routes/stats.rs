use axum::{
    Extension, Router, extract::State, middleware::from_fn_with_state,
    response::Json as ResponseJson, routing::get,
};
use db::models::todo::{Todo, TodoStats};
use utils::response::ApiResponse;

use crate::{
    AppState,
    error::ApiError,
    http::auth::{CurrentUser, require_auth},
};

/// Per-status counts for the caller's own todos.
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<ResponseJson<ApiResponse<TodoStats>>, ApiError> {
    let stats = Todo::stats_for_user(&state.db().conn, user.id).await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/stats", get(get_stats))
        .layer(from_fn_with_state(state.clone(), require_auth))
}
