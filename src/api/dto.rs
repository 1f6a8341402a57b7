//! JSON shapes of the Nextcloud News API.
//!
//! Field names are camelCase and every timestamp is integer epoch seconds.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::storage::{FeedWithUnread, Folder, Item, ItemSelection};

use super::error::ApiError;

pub const API_VERSION: &str = "6.0.5";

// ============================================================================
// Guid Hashes
// ============================================================================

/// Clients address items for starring by the base64 of their guid.
pub fn guid_hash(guid: &str) -> String {
    STANDARD.encode(guid.as_bytes())
}

pub fn decode_guid_hash(hash: &str) -> Result<String, ApiError> {
    let bytes = STANDARD
        .decode(hash)
        .map_err(|_| ApiError::bad_request(format!("Invalid guidHash: {}", hash)))?;
    String::from_utf8(bytes)
        .map_err(|_| ApiError::bad_request(format!("Invalid guidHash: {}", hash)))
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLevels {
    pub api_levels: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: String,
    pub display_name: String,
    pub last_login_timestamp: i64,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FolderDto {
    pub id: i64,
    pub name: String,
}

impl From<Folder> for FolderDto {
    fn from(folder: Folder) -> Self {
        Self {
            id: folder.id,
            name: folder.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FoldersResponse {
    pub folders: Vec<FolderDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDto {
    pub id: i64,
    pub url: String,
    /// Fetched display title, else the configured name
    pub title: String,
    pub favicon_link: Option<String>,
    pub added: i64,
    pub folder_id: i64,
    pub unread_count: i64,
    pub link: Option<String>,
}

impl From<FeedWithUnread> for FeedDto {
    fn from(row: FeedWithUnread) -> Self {
        let feed = row.feed;
        Self {
            id: feed.id,
            url: feed.url,
            title: feed.title.unwrap_or(feed.name),
            favicon_link: feed.favicon_link,
            added: feed.added.timestamp(),
            folder_id: feed.folder_id,
            unread_count: row.unread_count,
            link: feed.link,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedsResponse {
    pub feeds: Vec<FeedDto>,
    pub starred_count: i64,
    pub newest_item_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDto {
    pub id: i64,
    pub guid: String,
    pub guid_hash: String,
    pub url: String,
    pub title: String,
    pub author: String,
    pub pub_date: i64,
    pub body: String,
    pub feed_id: i64,
    pub unread: bool,
    pub starred: bool,
    pub last_modified: i64,
}

impl From<Item> for ItemDto {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            guid_hash: guid_hash(&item.guid),
            guid: item.guid,
            url: item.url,
            title: item.title,
            author: item.author,
            pub_date: item.pub_date.timestamp(),
            body: item.content,
            feed_id: item.feed_id,
            unread: !item.read,
            starred: item.starred,
            last_modified: item.updated.timestamp(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    pub items: Vec<ItemDto>,
}

impl From<Vec<Item>> for ItemsResponse {
    fn from(items: Vec<Item>) -> Self {
        Self {
            items: items.into_iter().map(ItemDto::from).collect(),
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// `type` and `id` query parameters shared by the item listings.
///
/// Types: 0 = feed, 1 = folder, 2 = starred, 3 = all.
pub fn parse_selection(kind: Option<i64>, id: Option<i64>) -> Result<ItemSelection, ApiError> {
    let need_id = || id.ok_or_else(|| ApiError::bad_request("Missing id parameter"));
    match kind {
        Some(0) => Ok(ItemSelection::Feed(need_id()?)),
        Some(1) => Ok(ItemSelection::Folder(need_id()?)),
        Some(2) => Ok(ItemSelection::Starred),
        Some(3) => Ok(ItemSelection::All),
        Some(other) => Err(ApiError::bad_request(format!("Unknown type: {}", other))),
        None => Err(ApiError::bad_request("Missing type parameter")),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsParams {
    pub batch_size: Option<i64>,
    pub offset: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<i64>,
    pub id: Option<i64>,
    pub get_read: Option<bool>,
    pub oldest_first: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedParams {
    pub last_modified: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<i64>,
    pub id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedReadParams {
    pub newest_item_id: Option<i64>,
}

/// Body of `items/{read,unread}/multiple`.
#[derive(Debug, Deserialize)]
pub struct ItemIdsBody {
    pub items: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarTarget {
    pub feed_id: i64,
    pub guid_hash: String,
}

/// Body of `items/{star,unstar}/multiple`.
#[derive(Debug, Deserialize)]
pub struct StarBody {
    pub items: Vec<StarTarget>,
}
