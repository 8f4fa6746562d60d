/**
 * Link Handlers
 */
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use std::sync::Arc;

use crate::api_server::models::*;
use crate::api_server::state::AppState;
use crate::api_service::models::AuthUser;
use crate::api_service::ApiError;

#[utoipa::path(
    post,
    path = "/bookmark-tags",
    request_body = LinkRequest,
    responses(
        (status = 201, description = "Link created", body = LinkResponse),
        (status = 200, description = "Link already existed", body = LinkResponse),
        (status = 404, description = "Bookmark or tag not found", body = ErrorResponse),
    ),
    tag = "links"
)]
pub async fn link(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<LinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .api
        .links
        .link(&auth.user_id, &req.item_id, &req.tag_id, req.created_at)
        .await?;

    let status = if outcome.newly_created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(LinkResponse {
            linked: outcome.linked,
        }),
    ))
}

pub async fn unlink(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UnlinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .api
        .links
        .unlink(&auth.user_id, &req.item_id, &req.tag_id)
        .await?;

    Ok(Json(LinkResponse {
        linked: outcome.linked,
    }))
}

pub async fn bookmark_tags(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(item_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tag_ids = state.api.links.tags_of(&auth.user_id, &item_id).await?;
    Ok(Json(TagIdsResponse { tag_ids }))
}
