use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use reveal::MessagingLinkBuilder;
use serde::Deserialize;
use server_api::{
    create_proposal, get_proposal, resolve_proposal, ApiContext, CreatedProposal,
    ResolvedProposal,
};
use shared::{
    domain::{NewProposal, ProposalRecord},
    error::{ApiError, ErrorCode},
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use url::Url;

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, normalize_database_url};

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    #[serde(default)]
    fragment: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

type HttpError = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings();
    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; check the path and its permissions"
        );
        error
    })?;
    let api = ApiContext {
        store: Arc::new(storage),
        public_base_url: Url::parse(&settings.public_base_url)
            .with_context(|| format!("invalid public base url '{}'", settings.public_base_url))?,
        contact: Arc::new(
            MessagingLinkBuilder::new(&settings.contact_base_url).with_context(|| {
                format!("invalid contact base url '{}'", settings.contact_base_url)
            })?,
        ),
    };

    let app = build_router(Arc::new(AppState { api }), settings.max_body_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/proposals", post(http_create_proposal))
        .route("/proposals/:id", get(http_get_proposal))
        .route("/resolve", post(http_resolve))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Storage => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn http_error(err: ApiError) -> HttpError {
    (status_for(err.code), Json(err))
}

async fn http_create_proposal(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewProposal>,
) -> Result<(StatusCode, Json<CreatedProposal>), HttpError> {
    let created = create_proposal(&state.api, req).await.map_err(http_error)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn http_get_proposal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProposalRecord>, HttpError> {
    get_proposal(&state.api, &id)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_resolve(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<ResolvedProposal>, HttpError> {
    resolve_proposal(&state.api, req.fragment.as_deref(), req.id.as_deref())
        .await
        .map(Json)
        .map_err(http_error)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
