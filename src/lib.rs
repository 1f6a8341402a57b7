//! ncnews: a personal RSS/Atom aggregator that serves a subset of the
//! Nextcloud News API.
//!
//! A background scheduler ([`sync::spawn_scheduler`]) periodically runs the
//! [`sync::Synchronizer`], which fetches every configured feed through the
//! [`feed`] module and reconciles the result into the SQLite-backed
//! [`storage::Database`]. The [`api`] module reads and mutates the same store
//! on behalf of news clients.

pub mod api;
pub mod config;
pub mod feed;
pub mod storage;
pub mod sync;
pub mod util;
