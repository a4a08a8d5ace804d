use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use db::models::todo::Todo;

use crate::{AppState, error::ApiError, http::auth::CurrentUser};

/// Load the todo named by the path and prove the caller owns it before any
/// handler runs. A row owned by someone else reads exactly like a missing
/// one, so ids never leak across accounts.
pub async fn load_todo_middleware(
    State(state): State<AppState>,
    Path(todo_id): Path<i64>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = request
        .extensions()
        .get::<CurrentUser>()
        .map(|user| user.id)
        .ok_or(ApiError::Unauthorized)?;

    match Todo::find_by_id(&state.db().conn, todo_id).await {
        Ok(Some(todo)) if todo.user_id == user_id => {
            request.extensions_mut().insert(todo);
            Ok(next.run(request).await)
        }
        Ok(_) => {
            tracing::warn!(todo_id, user_id, "Todo missing or not owned by caller");
            Err(ApiError::NotFound("Todo not found".to_string()))
        }
        Err(err) => {
            tracing::error!(todo_id, error = %err, "Failed to load todo");
            Err(ApiError::Database(err))
        }
    }
}
