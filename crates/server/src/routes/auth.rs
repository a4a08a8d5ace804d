use std::sync::OnceLock;

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::user::{CreateUser, User, UserProfile};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utils::{password, response::ApiResponse};

use crate::{
    AppState,
    error::ApiError,
    http::auth::{CurrentUser, require_auth},
};

const MIN_PASSWORD_LEN: usize = 6;

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthData {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct MeData {
    pub user: CurrentUser,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<AuthData>>), ApiError> {
    let username = payload
        .username
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    let password = payload.password.as_deref().unwrap_or_default();
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(
            "Password must be at least 6 characters long".to_string(),
        ));
    }
    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty());
    if let Some(email) = email
        && !email_regex().is_match(email)
    {
        return Err(ApiError::BadRequest("Invalid email format".to_string()));
    }

    let conn = &state.db().conn;

    // Pre-check for friendlier messages; the unique indexes in the store
    // remain authoritative and are mapped in `UserError` either way.
    if User::find_by_username(conn, username).await?.is_some() {
        return Err(ApiError::Conflict("Username already taken".to_string()));
    }
    if let Some(email) = email
        && User::find_by_email(conn, email).await?.is_some()
    {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let password_hash = password::hash_password(password)?;
    let user = User::create(
        conn,
        &CreateUser {
            username: username.to_string(),
            email: email.map(str::to_string),
            password_hash,
        },
    )
    .await?;

    let token = state.tokens().issue(user.id, &user.username)?;
    tracing::info!(user_id = user.id, "Registered new user");

    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(AuthData {
            token,
            user: UserProfile::from(&user),
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<AuthData>>, ApiError> {
    let password = payload.password.as_deref().unwrap_or_default();
    if password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".to_string()));
    }

    let username = payload
        .username
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty());

    let conn = &state.db().conn;
    let user = match (username, email) {
        (Some(username), _) => {
            let mut found = User::find_by_username(conn, username).await?;
            // Login forms routinely put an email in the username field.
            if found.is_none() && username.contains('@') {
                found = User::find_by_email(conn, username).await?;
            }
            found
        }
        (None, Some(email)) => User::find_by_email(conn, email).await?,
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Username or email is required".to_string(),
            ));
        }
    };

    // One message for both failure modes, so login never confirms whether
    // an account exists.
    let Some(user) = user else {
        return Err(ApiError::InvalidCredentials);
    };
    if !password::verify_password(password, &user.password_hash)? {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.tokens().issue(user.id, &user.username)?;

    Ok(ResponseJson(ApiResponse::success(AuthData {
        token,
        user: UserProfile::from(&user),
    })))
}

pub async fn me(
    Extension(user): Extension<CurrentUser>,
) -> ResponseJson<ApiResponse<MeData>> {
    ResponseJson(ApiResponse::success(MeData { user }))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(me))
        .layer(from_fn_with_state(state.clone(), require_auth));

    let inner = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected);

    Router::new().nest("/auth", inner)
}
