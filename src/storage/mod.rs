//! Feed store: folders, feeds and items in SQLite.
//!
//! [`Database`] is a cloneable handle over a connection pool. Operations are
//! split by record kind across `folders`, `feeds` and `items`; each is a
//! single statement, so the store's per-statement atomicity is the only
//! consistency boundary between the synchronizer and API mutations.

mod feeds;
mod folders;
mod items;
mod schema;
mod types;

pub use schema::Database;
pub use types::{
    DatabaseError, Feed, FeedChanges, FeedWithUnread, Folder, Item, ItemQuery, ItemSelection,
    NewItem,
};
