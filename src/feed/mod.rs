//! Feed retrieval and parsing.
//!
//! - `fetcher` - HTTP retrieval with optional basic auth, retry with
//!   exponential backoff, per-attempt timeout and a 10MB body limit
//! - `parser` - RSS/Atom/JSON Feed normalization on top of `feed-rs`
//!
//! Every failure leaves this module as a [`FetchError`] naming the feed;
//! deciding what to do about it is the synchronizer's job.

mod fetcher;
mod parser;

pub use fetcher::{FeedFetcher, FetchError, FetchFailure};
pub use parser::{parse_feed, FeedMetadata, ParsedEntry, ParsedFeed};
