//! HTTP API for the Keep.
//!
//! Presentation clients read the session here and submit their intents;
//! they never hold membership state of their own.

use crate::node::KeepState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use knightfall_session::gate;
use knightfall_session::{
    Address, Annotation, AnnotationStore, Error, RefreshOutcome, RouteDecision, SessionView,
    VaultToken,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

type AppState = Arc<KeepState>;

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    // CORS layer for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        // Session
        .route("/api/v1/session", get(get_session))
        .route("/api/v1/session/connect", post(connect))
        .route("/api/v1/session/refresh", post(refresh))
        .route("/api/v1/session/disconnect", post(disconnect))
        .route("/api/v1/session/accounts", post(accounts_changed))
        // Contract writes
        .route("/api/v1/mint", post(mint))
        .route("/api/v1/whitelist", post(whitelist))
        // Gated views
        .route("/api/v1/gate", get(resolve_gate))
        .route("/api/v1/vault", get(vault))
        .route("/api/v1/whitelisted", get(whitelisted))
        // Member map
        .route("/api/v1/annotations", get(list_annotations).post(pin_location))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// --- Errors ---

/// Session error rendered as a JSON body with a matching status.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            Error::WalletUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Error::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
            Error::TransactionFailed(_) => StatusCode::BAD_GATEWAY,
            Error::IntentInFlight(_) | Error::NotConnected => StatusCode::CONFLICT,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::MissingMemberData => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(%status, "request failed: {}", self.0);
        }
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// --- Health ---

async fn health() -> &'static str {
    "OK"
}

// --- Session endpoints ---

/// Outcome of a trigger plus the session as it stands afterwards.
#[derive(Debug, Serialize)]
struct SessionResponse {
    /// `false` when a newer trigger superseded this one.
    applied: bool,
    session: SessionView,
}

impl SessionResponse {
    fn new(outcome: RefreshOutcome, state: &KeepState) -> Self {
        Self {
            applied: matches!(outcome, RefreshOutcome::Applied(_)),
            session: state.session.view(),
        }
    }
}

async fn get_session(State(state): State<AppState>) -> Json<SessionView> {
    Json(state.session.view())
}

async fn connect(State(state): State<AppState>) -> ApiResult<SessionResponse> {
    let outcome = state.session.connect().await?;
    Ok(Json(SessionResponse::new(outcome, &state)))
}

async fn refresh(State(state): State<AppState>) -> ApiResult<SessionResponse> {
    let outcome = state.session.refresh().await?;
    Ok(Json(SessionResponse::new(outcome, &state)))
}

async fn disconnect(State(state): State<AppState>) -> Json<SessionView> {
    state.session.disconnect().await;
    Json(state.session.view())
}

#[derive(Debug, Deserialize)]
struct AccountsRequest {
    accounts: Vec<Address>,
}

async fn accounts_changed(
    State(state): State<AppState>,
    Json(req): Json<AccountsRequest>,
) -> ApiResult<SessionResponse> {
    let outcome = state.session.accounts_changed(&req.accounts).await?;
    Ok(Json(SessionResponse::new(outcome, &state)))
}

// --- Contract writes ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MintRequest {
    name: String,
    token_uri: String,
}

async fn mint(
    State(state): State<AppState>,
    Json(req): Json<MintRequest>,
) -> ApiResult<SessionResponse> {
    let outcome = state.session.mint(&req.name, &req.token_uri).await?;
    Ok(Json(SessionResponse::new(outcome, &state)))
}

#[derive(Debug, Deserialize)]
struct WhitelistRequest {
    address: Address,
}

async fn whitelist(
    State(state): State<AppState>,
    Json(req): Json<WhitelistRequest>,
) -> ApiResult<SessionResponse> {
    let outcome = state.session.whitelist(req.address).await?;
    Ok(Json(SessionResponse::new(outcome, &state)))
}

// --- Gated views ---

#[derive(Debug, Deserialize)]
struct GateQuery {
    path: String,
}

async fn resolve_gate(
    State(state): State<AppState>,
    Query(query): Query<GateQuery>,
) -> Json<RouteDecision> {
    Json(gate::resolve(&query.path, &state.session.view()))
}

async fn vault(State(state): State<AppState>) -> ApiResult<Vec<VaultToken>> {
    Ok(Json(state.session.vault().await?))
}

#[derive(Debug, Serialize)]
struct WhitelistedResponse {
    whitelisted: bool,
}

async fn whitelisted(State(state): State<AppState>) -> ApiResult<WhitelistedResponse> {
    let whitelisted = state.session.is_whitelisted().await?;
    Ok(Json(WhitelistedResponse { whitelisted }))
}

// --- Member map ---

async fn list_annotations(State(state): State<AppState>) -> ApiResult<Vec<Annotation>> {
    Ok(Json(AnnotationStore::list_annotations(state.storage.as_ref()).await?))
}

#[derive(Debug, Deserialize)]
struct PinRequest {
    lon: f64,
    lat: f64,
}

async fn pin_location(
    State(state): State<AppState>,
    Json(req): Json<PinRequest>,
) -> std::result::Result<(StatusCode, Json<Annotation>), ApiError> {
    let annotation = state
        .session
        .pin_location(state.storage.as_ref(), req.lon, req.lat)
        .await?;
    Ok((StatusCode::CREATED, Json(annotation)))
}
