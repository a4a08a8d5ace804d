use db::models::{
    todo::{Todo, UpdateTodo},
    user::UserProfile,
};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a decodable envelope; the cause is for
    /// logs, not for end users.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server's `error` field, surfaced verbatim.
    #[error("{0}")]
    Api(String),
    #[error("response envelope carried no data")]
    MissingData,
    #[error("not signed in")]
    NotAuthenticated,
}

#[derive(Debug, Deserialize)]
struct AuthData {
    token: String,
    user: UserProfile,
}

#[derive(Debug, Deserialize)]
struct UserData {
    user: UserProfile,
}

#[derive(Debug, Deserialize)]
struct TodosData {
    todos: Vec<Todo>,
}

#[derive(Debug, Deserialize)]
struct TodoData {
    todo: Todo,
}

/// Thin typed wrapper over the REST surface. Holds the bearer token from
/// the last successful register/login.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            token: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn sign_out(&mut self) {
        self.token = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> Result<&str, ClientError> {
        self.token.as_deref().ok_or(ClientError::NotAuthenticated)
    }

    /// The envelope is decoded whatever the HTTP status, so API failures
    /// surface the server's `error` message rather than a bare status code.
    async fn unwrap_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let envelope: ApiResponse<T> = response.json().await?;
        if envelope.success {
            envelope.data.ok_or(ClientError::MissingData)
        } else {
            Err(ClientError::Api(
                envelope
                    .error
                    .unwrap_or_else(|| "Request failed".to_string()),
            ))
        }
    }

    pub async fn register(
        &mut self,
        username: &str,
        email: Option<&str>,
        password: &str,
    ) -> Result<UserProfile, ClientError> {
        let response = self
            .http
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({
                "username": username,
                "email": email,
                "password": password,
            }))
            .send()
            .await?;
        let data: AuthData = Self::unwrap_envelope(response).await?;
        self.token = Some(data.token);
        Ok(data.user)
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<UserProfile, ClientError> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await?;
        let data: AuthData = Self::unwrap_envelope(response).await?;
        self.token = Some(data.token);
        Ok(data.user)
    }

    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        let response = self
            .http
            .get(self.url("/api/auth/me"))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        let data: UserData = Self::unwrap_envelope(response).await?;
        Ok(data.user)
    }

    pub async fn list_todos(&self) -> Result<Vec<Todo>, ClientError> {
        let response = self
            .http
            .get(self.url("/api/todos"))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        let data: TodosData = Self::unwrap_envelope(response).await?;
        Ok(data.todos)
    }

    pub async fn create_todo(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<Todo, ClientError> {
        let response = self
            .http
            .post(self.url("/api/todos"))
            .bearer_auth(self.bearer()?)
            .json(&serde_json::json!({
                "title": title,
                "description": description,
            }))
            .send()
            .await?;
        let data: TodoData = Self::unwrap_envelope(response).await?;
        Ok(data.todo)
    }

    pub async fn update_todo(&self, id: i64, updates: &UpdateTodo) -> Result<Todo, ClientError> {
        let response = self
            .http
            .put(self.url(&format!("/api/todos/{id}")))
            .bearer_auth(self.bearer()?)
            .json(updates)
            .send()
            .await?;
        let data: TodoData = Self::unwrap_envelope(response).await?;
        Ok(data.todo)
    }

    pub async fn toggle_todo(&self, id: i64) -> Result<Todo, ClientError> {
        let response = self
            .http
            .patch(self.url(&format!("/api/todos/{id}/toggle")))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        let data: TodoData = Self::unwrap_envelope(response).await?;
        Ok(data.todo)
    }

    pub async fn delete_todo(&self, id: i64) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/api/todos/{id}")))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        let _: serde_json::Value = Self::unwrap_envelope(response).await?;
        Ok(())
    }
}
