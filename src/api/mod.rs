//! A subset of the Nextcloud News v1-2 REST API over the feed store.
//!
//! Reads and writes go straight to [`Database`](crate::storage::Database)
//! and run concurrently with the synchronizer.

mod auth;
mod dto;
mod error;
mod handlers;
mod router;

pub use auth::AuthUser;
pub use dto::{guid_hash, API_VERSION};
pub use error::{ApiError, ErrorCode};
pub use handlers::AppState;
pub use router::{create_router, API_BASE};
