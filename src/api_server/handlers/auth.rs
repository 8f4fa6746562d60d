/**
 * Auth Handlers
 */
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::api_server::auth::client_addr;
use crate::api_server::models::*;
use crate::api_server::state::AppState;
use crate::api_service::models::{AuthUser, WmkUpload};
use crate::api_service::{ApiError, RateScope};

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = RegisterResponse),
        (status = 400, description = "Invalid login or password", body = ErrorResponse),
        (status = 409, description = "Login already taken", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let addr = client_addr(&headers, peer.as_ref());
    state.api.rate.check(RateScope::Address, &addr)?;
    state.api.rate.check(RateScope::Login, &req.login)?;

    let outcome = state.api.auth.register(&req.login, &req.password).await?;

    Ok((StatusCode::CREATED, Json(RegisterResponse::from(outcome))))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = LoginResponse),
        (status = 401, description = "Bad credentials", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let addr = client_addr(&headers, peer.as_ref());
    state.api.rate.check(RateScope::Address, &addr)?;
    state.api.rate.check(RateScope::Login, &req.login)?;

    let outcome = state.api.auth.login(&req.login, &req.password).await?;

    Ok(Json(LoginResponse::from(outcome)))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    state.api.auth.logout(&auth).await?;
    Ok(Json(OkResponse::new()))
}

pub async fn session(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let info = state.api.auth.introspect(&auth).await?;
    Ok(Json(SessionResponse::from(info)))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    // Refresh gets its own keyspace so a runaway client cannot starve the
    // credential endpoints (and vice versa).
    state.api.rate.check(RateScope::User, &auth.user_id)?;

    let outcome = state.api.auth.refresh(&auth).await?;

    Ok(Json(RefreshResponse {
        token: outcome.token,
        expires_at: outcome.expires_at,
    }))
}

pub async fn upload_wmk(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<WmkUpload>,
) -> Result<impl IntoResponse, ApiError> {
    state.api.auth.upload_wrapped_key(&auth, req).await?;
    Ok(Json(OkResponse::new()))
}
