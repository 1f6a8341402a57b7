//! Nextcloud News request handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::Config;
use crate::storage::{Database, ItemQuery};

use super::auth::AuthUser;
use super::dto::{
    decode_guid_hash, parse_selection, ApiLevels, FeedDto, FeedReadParams, FeedsResponse,
    FolderDto, FoldersResponse, ItemIdsBody, ItemsParams, ItemsResponse, StarBody, UpdatedParams,
    UserResponse, VersionResponse, API_VERSION,
};
use super::error::ApiError;

/// Shared state of the API handlers.
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
}

type ApiResult<T> = Result<T, ApiError>;

const STARRED_FEED_ID: i64 = 0;

// ============================================================================
// Meta
// ============================================================================

pub async fn api_levels() -> Json<ApiLevels> {
    Json(ApiLevels {
        api_levels: vec!["v1-2"],
    })
}

pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: API_VERSION,
    })
}

pub async fn user(Extension(AuthUser(username)): Extension<AuthUser>) -> Json<UserResponse> {
    Json(UserResponse {
        display_name: username.clone(),
        user_id: username,
        last_login_timestamp: Utc::now().timestamp(),
        avatar: None,
    })
}

// ============================================================================
// Folders and Feeds
// ============================================================================

pub async fn folders(State(state): State<Arc<AppState>>) -> ApiResult<Json<FoldersResponse>> {
    let folders = state.db.list_folders().await?;
    Ok(Json(FoldersResponse {
        folders: folders.into_iter().map(FolderDto::from).collect(),
    }))
}

pub async fn feeds(State(state): State<Arc<AppState>>) -> ApiResult<Json<FeedsResponse>> {
    let feeds = state.db.list_feeds_with_counts().await?;
    let starred_count = state.db.starred_count().await?;
    let newest_item_id = state.db.newest_item_id().await?;

    Ok(Json(FeedsResponse {
        feeds: feeds.into_iter().map(FeedDto::from).collect(),
        starred_count,
        newest_item_id,
    }))
}

pub async fn mark_feed_read(
    State(state): State<Arc<AppState>>,
    Path(feed_id): Path<i64>,
    Query(params): Query<FeedReadParams>,
) -> ApiResult<StatusCode> {
    let newest_item_id = params
        .newest_item_id
        .ok_or_else(|| ApiError::bad_request("Missing newestItemId parameter"))?;

    // Feed 0 is the starred pseudo-feed
    let marked = if feed_id == STARRED_FEED_ID {
        state.db.mark_starred_read(newest_item_id).await?
    } else {
        if state.db.get_feed_by_id(feed_id).await?.is_none() {
            return Err(ApiError::not_found(format!("Feed {} not found", feed_id)));
        }
        state.db.mark_feed_read(feed_id, newest_item_id).await?
    };
    tracing::debug!(feed_id = feed_id, marked = marked, "Feed marked read");
    Ok(StatusCode::OK)
}

// ============================================================================
// Items
// ============================================================================

pub async fn items(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ItemsParams>,
) -> ApiResult<Json<ItemsResponse>> {
    let mut query = ItemQuery::new(parse_selection(params.kind, params.id)?);
    query.get_read = params.get_read.unwrap_or(true);
    query.oldest_first = params.oldest_first.unwrap_or(false);
    query.offset = params.offset;
    query.batch_size = params.batch_size;

    let items = state.db.query_items(&query).await?;
    Ok(Json(items.into()))
}

pub async fn updated_items(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UpdatedParams>,
) -> ApiResult<Json<ItemsResponse>> {
    let selection = parse_selection(params.kind, params.id)?;
    let last_modified = params
        .last_modified
        .ok_or_else(|| ApiError::bad_request("Missing lastModified parameter"))?;
    let since = DateTime::from_timestamp(last_modified, 0)
        .ok_or_else(|| ApiError::bad_request("lastModified out of range"))?;

    let items = state.db.query_items_updated(selection, since).await?;
    Ok(Json(items.into()))
}

async fn set_read(state: &AppState, item_id: i64, read: bool) -> ApiResult<StatusCode> {
    if !state.db.set_item_read(item_id, read).await? {
        return Err(ApiError::not_found(format!("Item {} not found", item_id)));
    }
    Ok(StatusCode::OK)
}

pub async fn mark_item_read(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i64>,
) -> ApiResult<StatusCode> {
    set_read(&state, item_id, true).await
}

pub async fn mark_item_unread(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i64>,
) -> ApiResult<StatusCode> {
    set_read(&state, item_id, false).await
}

pub async fn mark_items_read(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ItemIdsBody>,
) -> ApiResult<StatusCode> {
    state.db.set_items_read(&body.items, true).await?;
    Ok(StatusCode::OK)
}

pub async fn mark_items_unread(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ItemIdsBody>,
) -> ApiResult<StatusCode> {
    state.db.set_items_read(&body.items, false).await?;
    Ok(StatusCode::OK)
}

/// Every hash is decoded before anything is written, so a bad hash
/// leaves the store untouched.
async fn set_starred(state: &AppState, body: StarBody, starred: bool) -> ApiResult<StatusCode> {
    let targets = body
        .items
        .into_iter()
        .map(|t| Ok((t.feed_id, decode_guid_hash(&t.guid_hash)?)))
        .collect::<ApiResult<Vec<_>>>()?;

    for (feed_id, guid) in targets {
        if !state.db.set_starred_by_guid(feed_id, &guid, starred).await? {
            tracing::debug!(feed_id = feed_id, guid = %guid, "No item to (un)star");
        }
    }
    Ok(StatusCode::OK)
}

pub async fn star_items(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StarBody>,
) -> ApiResult<StatusCode> {
    set_starred(&state, body, true).await
}

pub async fn unstar_items(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StarBody>,
) -> ApiResult<StatusCode> {
    set_starred(&state, body, false).await
}
