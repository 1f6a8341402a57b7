//! URL helpers shared by configuration loading and feed synchronization.
//!
//! - **Feed URL validation**: only `http`/`https` sources are accepted
//! - **Icon normalization**: favicon URLs are stored without trailing slashes
//!
//! # Examples
//!
//! ```
//! use ncnews::util::{normalize_icon_url, validate_feed_url};
//!
//! assert!(validate_feed_url("https://example.com/feed.xml").is_ok());
//! assert!(validate_feed_url("file:///etc/passwd").is_err());
//!
//! assert_eq!(
//!     normalize_icon_url("https://x.example/icon.png/"),
//!     "https://x.example/icon.png"
//! );
//! ```

mod url_validator;

pub use url_validator::{normalize_icon_url, validate_feed_url, UrlValidationError};
