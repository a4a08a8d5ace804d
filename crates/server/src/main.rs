use axum::http::HeaderValue;
use db::DBService;
use server::{AppState, http};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, prelude::*};
use utils_jwt::TokenService;

const DEFAULT_DATABASE_URL: &str = "sqlite://todos.sqlite";
const DEFAULT_JWT_SECRET: &str = "change-me-in-production";
const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Error)]
pub enum TodoServerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[tokio::main]
async fn main() -> Result<(), TodoServerError> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},db={level},utils={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string).expect("Failed to create tracing filter");
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let db = DBService::new(&database_url).await?;
    tracing::info!("Database ready at {database_url}");

    let secret = match std::env::var("JWT_SECRET") {
        Ok(secret) if !secret.trim().is_empty() => secret,
        _ => {
            tracing::warn!("JWT_SECRET is not set; using the built-in development secret");
            DEFAULT_JWT_SECRET.to_string()
        }
    };
    let state = AppState::new(db, TokenService::new(&secret));

    let allowed_origin = std::env::var("CLIENT_URL")
        .ok()
        .and_then(|url| url.parse::<HeaderValue>().ok());
    let app_router = http::router(state, allowed_origin);

    let port = std::env::var("PORT")
        .or_else(|_| std::env::var("BACKEND_PORT"))
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    let actual_port = listener.local_addr()?.port();
    tracing::info!("Server running on http://{host}:{actual_port}");

    axum::serve(listener, app_router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sig) => Some(sig),
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {err}");
                None
            }
        };

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    tracing::error!("Failed to install Ctrl+C handler: {err}");
                    std::future::pending::<()>().await;
                }
            }
            _ = async {
                match sigterm.as_mut() {
                    Some(sigterm) => { sigterm.recv().await; }
                    None => std::future::pending::<()>().await,
                }
            } => {}
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    }

    tracing::info!("Shutdown signal received, draining in-flight requests");
}
