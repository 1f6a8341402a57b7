//! Router configuration for the Nextcloud News API.

use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::auth::require_basic_auth;
use super::handlers::{
    api_levels, feeds, folders, items, mark_feed_read, mark_item_read, mark_item_unread,
    mark_items_read, mark_items_unread, star_items, unstar_items, updated_items, user, version,
    AppState,
};

pub const API_BASE: &str = "/index.php/apps/news/api";

/// Create the API router.
///
/// The API level listing is public; everything under `/v1-2` requires
/// basic auth.
pub fn create_router(state: Arc<AppState>) -> Router {
    let v1_2 = Router::new()
        .route("/user", get(user))
        .route("/version", get(version))
        .route("/status", get(version))
        .route("/folders", get(folders))
        .route("/feeds", get(feeds))
        .route("/feeds/:feed_id/read", put(mark_feed_read))
        .route("/items", get(items))
        .route("/items/updated", get(updated_items))
        .route("/items/:item_id/read", put(mark_item_read))
        .route("/items/:item_id/unread", put(mark_item_unread))
        .route("/items/read/multiple", put(mark_items_read))
        .route("/items/unread/multiple", put(mark_items_unread))
        .route("/items/star/multiple", put(star_items))
        .route("/items/unstar/multiple", put(unstar_items))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_basic_auth,
        ));

    Router::new()
        .route(API_BASE, get(api_levels))
        .nest(&format!("{}/v1-2", API_BASE), v1_2)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
