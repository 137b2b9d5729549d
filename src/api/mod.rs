use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::instrument;

use crate::db::{ClientStore, StoreError};
use crate::models::{Client, ClientPatch, NewClient};

pub(crate) mod context;

use context::AppState;

/// Bind the listener and serve the client API until the process is stopped.
pub async fn setup_and_serve(state: AppState) -> anyhow::Result<()> {
    let port = state.config.port;
    let app = api_router(state).layer(cors_layer());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .with_context(|| format!("could not bind port {port}"))?;

    tracing::info!("client registry is up and running on port {}", port);

    axum::serve(listener, app.into_make_service())
        .await
        .context("error starting service")
}

// The record book frontend is served from another origin.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/api/clients", get(list_clients).post(register_client))
        .route(
            "/api/clients/:id",
            get(get_client).put(update_client).delete(delete_client),
        )
        .with_state(state)
}

/// A plain old json error response.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            message: message.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match self {
            StoreError::Validation(_) | StoreError::InvalidId(_) => StatusCode::BAD_REQUEST,
            StoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        error_response(status, self.to_string())
    }
}

async fn liveness() -> &'static str {
    "ok"
}

#[instrument(skip(store, new), level = "info")]
async fn register_client(
    State(store): State<Arc<dyn ClientStore>>,
    Json(new): Json<NewClient>,
) -> Result<Json<Client>, StoreError> {
    let client = store.create(new).await?;
    tracing::info!("registered client {}", client.id);

    Ok(Json(client))
}

async fn list_clients(
    State(store): State<Arc<dyn ClientStore>>,
) -> Result<Json<Vec<Client>>, StoreError> {
    let clients = store.list().await?;

    Ok(Json(clients))
}

// A well-formed id that matches nothing answers 200 with a JSON `null` body,
// which is what the frontend expects from this route.
async fn get_client(
    State(store): State<Arc<dyn ClientStore>>,
    Path(id): Path<String>,
) -> Result<Json<Option<Client>>, StoreError> {
    let client = store.get(&id).await?;

    Ok(Json(client))
}

#[instrument(skip(store, patch), level = "info")]
async fn update_client(
    State(store): State<Arc<dyn ClientStore>>,
    Path(id): Path<String>,
    Json(patch): Json<ClientPatch>,
) -> Response {
    match store.update(&id, patch).await {
        Ok(Some(client)) => Json(client).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("client {id} does not exist"),
        ),
        Err(err) => err.into_response(),
    }
}

#[instrument(skip(store), level = "info")]
async fn delete_client(
    State(store): State<Arc<dyn ClientStore>>,
    Path(id): Path<String>,
) -> Response {
    match store.delete(&id).await {
        Ok(Some(client)) => {
            tracing::info!("deleted client {}", client.id);
            "client deleted".into_response()
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("client {id} does not exist"),
        ),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
fn test_api_router() -> Router {
    api_router(AppState::new_testing())
}
