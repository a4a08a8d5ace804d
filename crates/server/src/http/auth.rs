use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use db::models::user::User;
use serde::Serialize;
use utils::response::ApiResponse;

use crate::AppState;

/// The authenticated caller, resolved from the bearer token and attached to
/// the request extensions for downstream handlers.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

fn parse_authorization_bearer(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let (prefix, rest) = trimmed.split_once(' ')?;
    if !prefix.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

/// Validation gate for protected routes: extract the bearer token, verify
/// it, and resolve the acting user. Never mutates state.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization_bearer)
        .map(str::to_string);

    let Some(token) = token else {
        return unauthorized(&req, "missing_token", "No token provided");
    };

    let claims = match state.tokens().verify(&token) {
        Ok(claims) => claims,
        Err(_) => return unauthorized(&req, "invalid_token", "Invalid or expired token"),
    };

    // A token naming a user that no longer exists is as good as invalid.
    let user = match User::find_by_id(&state.db().conn, claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => return unauthorized(&req, "unknown_user", "Invalid or expired token"),
        Err(err) => {
            tracing::error!(error = %err, "Failed to resolve authenticated user");
            let response = ApiResponse::<()>::error("Internal server error");
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response();
        }
    };

    req.extensions_mut().insert(CurrentUser::from(user));
    next.run(req).await
}

fn unauthorized(req: &Request, reason: &'static str, message: &str) -> Response {
    tracing::warn!(
        path = %req.uri().path(),
        method = %req.method(),
        reason,
        "Unauthorized API request"
    );
    let response = ApiResponse::<()>::error(message);
    (StatusCode::UNAUTHORIZED, Json(response)).into_response()
}

#[cfg(test)]
mod tests {
    use super::parse_authorization_bearer;

    #[test]
    fn parses_well_formed_bearer_headers() {
        assert_eq!(parse_authorization_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_authorization_bearer("bearer abc"), Some("abc"));
        assert_eq!(parse_authorization_bearer("  Bearer   abc  "), Some("abc"));
    }

    #[test]
    fn rejects_malformed_headers() {
        assert_eq!(parse_authorization_bearer("abc"), None);
        assert_eq!(parse_authorization_bearer("Bearer "), None);
        assert_eq!(parse_authorization_bearer("Basic abc"), None);
        assert_eq!(parse_authorization_bearer(""), None);
    }
}
