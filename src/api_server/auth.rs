/**
 * Authentication Middleware
 *
 * Verifies the bearer token against the signing key and the session store,
 * then attaches the resolved identity to the request as a typed extension.
 */
use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use std::net::SocketAddr;
use std::sync::Arc;

use super::state::AppState;
use crate::api_service::ApiError;

/// Reject the request unless it carries a token whose session is active.
/// Handlers downstream read the identity via `Extension<AuthUser>`.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::Unauthorized)?;
    let auth = state.api.auth.authenticate(bearer.token()).await?;

    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}

/// Resolve the client address for rate limiting. The order is intentional
/// and matches reverse-proxy deployments: first forwarded-for entry, then
/// the real-ip header, then the connection peer.
pub fn client_addr(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(first) = forwarded
            .split(',')
            .next()
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
        {
            return first.to_string();
        }
    }

    if let Some(real_ip) = headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
    {
        return real_ip.to_string();
    }

    peer.map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
