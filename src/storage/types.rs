use chrono::{DateTime, Utc};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with operator-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The database file is locked by another process or cannot be opened
    #[error("Database is locked or cannot be opened. Is another ncnews instance running?")]
    Locked,

    /// Schema creation failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_error(&err.to_string()) {
            return DatabaseError::Locked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) messages.
pub(crate) fn is_lock_error(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// Timestamps
// ============================================================================

/// `updated` columns hold microseconds since the Unix epoch.
pub(crate) fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

pub(crate) fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}

/// `pub_date` columns hold whole seconds since the Unix epoch.
pub(crate) fn from_secs(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

// ============================================================================
// Helper Types
// ============================================================================

/// Internal row type for Feed queries (used by sqlx FromRow)
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FeedDbRow {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub folder_id: i64,
    pub link: Option<String>,
    pub title: Option<String>,
    pub favicon_link: Option<String>,
    pub added: i64,
    pub updated: i64,
}

impl FeedDbRow {
    pub(crate) fn into_feed(self) -> Feed {
        Feed {
            id: self.id,
            name: self.name,
            url: self.url,
            folder_id: self.folder_id,
            link: self.link,
            title: self.title,
            favicon_link: self.favicon_link,
            added: from_micros(self.added),
            updated: from_micros(self.updated),
        }
    }
}

/// Feed row joined with its unread count.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FeedCountDbRow {
    #[sqlx(flatten)]
    pub feed: FeedDbRow,
    pub unread_count: i64,
}

/// Internal row type for Item queries (used by sqlx FromRow)
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ItemDbRow {
    pub id: i64,
    pub guid: String,
    pub url: String,
    pub title: String,
    pub author: String,
    pub content: String,
    pub pub_date: i64,
    pub feed_id: i64,
    pub read: bool,
    pub starred: bool,
    pub updated: i64,
}

impl ItemDbRow {
    pub(crate) fn into_item(self) -> Item {
        Item {
            id: self.id,
            guid: self.guid,
            url: self.url,
            title: self.title,
            author: self.author,
            content: self.content,
            pub_date: from_secs(self.pub_date),
            feed_id: self.feed_id,
            read: self.read,
            starred: self.starred,
            updated: from_micros(self.updated),
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// Folder data from database. Seeded from configuration, never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub id: i64,
    pub name: String,
    pub updated: DateTime<Utc>,
}

/// Feed data from database
///
/// `name`, `url` and `folder_id` come from configuration. `link`, `title`
/// and `favicon_link` are derived metadata refreshed by the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub folder_id: i64,
    pub link: Option<String>,
    pub title: Option<String>,
    pub favicon_link: Option<String>,
    /// When the feed was first seeded. Never changes afterwards.
    pub added: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Feed with its unread item count, for the API feed listing.
#[derive(Debug, Clone)]
pub struct FeedWithUnread {
    pub feed: Feed,
    pub unread_count: i64,
}

/// Item data from database
///
/// Everything except `read`, `starred` and `updated` is immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: i64,
    pub guid: String,
    pub url: String,
    pub title: String,
    pub author: String,
    pub content: String,
    pub pub_date: DateTime<Utc>,
    pub feed_id: i64,
    pub read: bool,
    pub starred: bool,
    pub updated: DateTime<Utc>,
}

/// Fields of an item about to be created. New items are unread and unstarred.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub guid: String,
    pub url: String,
    pub title: String,
    pub author: String,
    pub content: String,
    pub pub_date: DateTime<Utc>,
    pub feed_id: i64,
}

/// The changed-field set of a feed's derived metadata.
///
/// A `Some` field is written, a `None` field is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedChanges {
    pub title: Option<String>,
    pub link: Option<String>,
    pub favicon_link: Option<String>,
}

impl FeedChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.link.is_none() && self.favicon_link.is_none()
    }

    /// Names of the fields this change set writes, for logging.
    pub fn field_names(&self) -> Vec<&'static str> {
        [
            ("title", self.title.is_some()),
            ("link", self.link.is_some()),
            ("favicon_link", self.favicon_link.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

/// Which items an item query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSelection {
    Feed(i64),
    Folder(i64),
    Starred,
    All,
}

/// Item listing parameters.
#[derive(Debug, Clone, Copy)]
pub struct ItemQuery {
    pub selection: ItemSelection,
    /// Include items already marked read.
    pub get_read: bool,
    /// Ascending publication order instead of newest first.
    pub oldest_first: bool,
    /// When set, only items with `id <= offset`.
    pub offset: Option<i64>,
    /// When set, at most this many items.
    pub batch_size: Option<i64>,
}

impl ItemQuery {
    pub fn new(selection: ItemSelection) -> Self {
        Self {
            selection,
            get_read: true,
            oldest_first: false,
            offset: None,
            batch_size: None,
        }
    }
}
