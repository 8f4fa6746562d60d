/**
 * Tag Handlers
 */
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use std::sync::Arc;

use super::{if_match, ETAG_HEADER};
use crate::api_server::models::*;
use crate::api_server::state::AppState;
use crate::api_service::models::{
    AuthUser, ItemDelete, ListOptions, NewTag, TagListOptions, TagUpdate,
};
use crate::api_service::ApiError;

pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<TagListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let options = TagListOptions {
        base: ListOptions {
            limit: query.limit,
            cursor: query.cursor,
            include_deleted: query.include_deleted.unwrap_or(false),
            updated_after: query.updated_after,
        },
        by_token: query.by_token,
    };

    let page = state.api.tags.list(&auth.user_id, options).await?;
    Ok(Json(TagsListResponse::from(page)))
}

pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<NewTag>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.api.tags.create(&auth.user_id, req).await?;

    Ok((
        StatusCode::CREATED,
        [(ETAG_HEADER, record.etag.clone())],
        Json(TagResponse::from(record)),
    ))
}

pub async fn get_tag(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(tag_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.api.tags.get(&auth.user_id, &tag_id).await?;

    Ok((
        [(ETAG_HEADER, record.etag.clone())],
        Json(TagResponse::from(record)),
    ))
}

pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(tag_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<TagUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let guard = if_match(&headers);
    let record = state
        .api
        .tags
        .update(&auth.user_id, &tag_id, req, guard.as_deref())
        .await?;

    Ok((
        [(ETAG_HEADER, record.etag.clone())],
        Json(TagResponse::from(record)),
    ))
}

pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(tag_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ItemDelete>,
) -> Result<impl IntoResponse, ApiError> {
    let guard = if_match(&headers);
    let record = state
        .api
        .tags
        .soft_delete(&auth.user_id, &tag_id, req, guard.as_deref())
        .await?;

    Ok((
        [(ETAG_HEADER, record.etag.clone())],
        Json(TagResponse::from(record)),
    ))
}
