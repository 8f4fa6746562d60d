/**
 * Bookmark Handlers
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
    AuthUser, BookmarkUpdate, ItemDelete, ListOptions, NewBookmark,
};
use crate::api_service::ApiError;

#[utoipa::path(
    get,
    path = "/bookmarks",
    params(BookmarkListQuery),
    responses(
        (status = 200, description = "Page of bookmarks", body = BookmarksListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    ),
    tag = "bookmarks"
)]
pub async fn list_bookmarks(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<BookmarkListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let options = ListOptions {
        limit: query.limit,
        cursor: query.cursor,
        include_deleted: query.include_deleted.unwrap_or(false),
        updated_after: query.updated_after,
    };

    let page = state.api.bookmarks.list(&auth.user_id, options).await?;
    Ok(Json(BookmarksListResponse::from(page)))
}

pub async fn create_bookmark(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<NewBookmark>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.api.bookmarks.create(&auth.user_id, req).await?;

    Ok((
        StatusCode::CREATED,
        [(ETAG_HEADER, record.etag.clone())],
        Json(BookmarkResponse::from(record)),
    ))
}

pub async fn get_bookmark(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(item_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.api.bookmarks.get(&auth.user_id, &item_id).await?;

    Ok((
        [(ETAG_HEADER, record.etag.clone())],
        Json(BookmarkResponse::from(record)),
    ))
}

pub async fn update_bookmark(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<BookmarkUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let guard = if_match(&headers);
    let record = state
        .api
        .bookmarks
        .update(&auth.user_id, &item_id, req, guard.as_deref())
        .await?;

    Ok((
        [(ETAG_HEADER, record.etag.clone())],
        Json(BookmarkResponse::from(record)),
    ))
}

pub async fn delete_bookmark(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ItemDelete>,
) -> Result<impl IntoResponse, ApiError> {
    let guard = if_match(&headers);
    let record = state
        .api
        .bookmarks
        .soft_delete(&auth.user_id, &item_id, req, guard.as_deref())
        .await?;

    Ok((
        [(ETAG_HEADER, record.etag.clone())],
        Json(BookmarkResponse::from(record)),
    ))
}
