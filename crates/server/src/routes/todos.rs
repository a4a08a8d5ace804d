use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get, patch, put},
};
use db::models::todo::{CreateTodo, Todo, UpdateTodo};
use serde::{Deserialize, Serialize};
use utils::response::ApiResponse;

use crate::{
    AppState,
    error::ApiError,
    http::auth::{CurrentUser, require_auth},
    middleware::load_todo_middleware,
};

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TodosData {
    pub todos: Vec<Todo>,
}

#[derive(Debug, Serialize)]
pub struct TodoData {
    pub todo: Todo,
}

#[derive(Debug, Serialize)]
pub struct DeletedData {
    pub message: &'static str,
}

pub async fn list_todos(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<ResponseJson<ApiResponse<TodosData>>, ApiError> {
    let todos = Todo::find_by_user_id(&state.db().conn, user.id).await?;
    Ok(ResponseJson(ApiResponse::success(TodosData { todos })))
}

pub async fn create_todo(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateTodoRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<TodoData>>), ApiError> {
    let Some(title) = payload.title.filter(|title| !title.trim().is_empty()) else {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    };

    tracing::debug!(user_id = user.id, "Creating todo '{}'", title);

    let todo = Todo::create(
        &state.db().conn,
        user.id,
        &CreateTodo {
            title,
            description: payload.description,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(TodoData { todo })),
    ))
}

pub async fn update_todo(
    Extension(existing): Extension<Todo>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateTodo>,
) -> Result<ResponseJson<ApiResponse<TodoData>>, ApiError> {
    let todo = Todo::update(&state.db().conn, existing.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(TodoData { todo })))
}

pub async fn toggle_todo(
    Extension(existing): Extension<Todo>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<TodoData>>, ApiError> {
    let todo = Todo::toggle(&state.db().conn, existing.id).await?;
    Ok(ResponseJson(ApiResponse::success(TodoData { todo })))
}

/// Deletes skip the loader so re-deleting an already-gone id stays a
/// success; a row that exists but belongs to someone else still reads as
/// not found.
pub async fn delete_todo(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(todo_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<DeletedData>>, ApiError> {
    let conn = &state.db().conn;
    let deleted = DeletedData {
        message: "Todo deleted successfully",
    };

    if Todo::belongs_to_user(conn, todo_id, user.id).await? {
        Todo::delete(conn, todo_id).await?;
        return Ok(ResponseJson(ApiResponse::success(deleted)));
    }

    match Todo::find_by_id(conn, todo_id).await? {
        None => Ok(ResponseJson(ApiResponse::success(deleted))),
        Some(_) => Err(ApiError::NotFound("Todo not found".to_string())),
    }
}

pub fn router(state: &AppState) -> Router<AppState> {
    let todo_actions = Router::new()
        .route("/", put(update_todo))
        .route("/toggle", patch(toggle_todo))
        .layer(from_fn_with_state(state.clone(), load_todo_middleware));

    let todo_id_router = Router::new()
        .route("/", delete(delete_todo))
        .merge(todo_actions);

    let inner = Router::new()
        .route("/", get(list_todos).post(create_todo))
        .nest("/{id}", todo_id_router)
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new().nest("/todos", inner)
}
