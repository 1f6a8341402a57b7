use anyhow::{Context, Result};
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;
use crate::feed::{FeedFetcher, FeedMetadata, ParsedEntry};
use crate::storage::{Database, Feed, FeedChanges, NewItem};
use crate::util::normalize_icon_url;

const DEFAULT_AUTHOR: &str = "N/A";

/// Why a single entry was skipped. Never aborts the rest of the feed.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("entry has no guid")]
    MissingGuid,

    #[error("entry {guid} has no {field}")]
    MissingField { guid: String, field: &'static str },

    #[error("failed to store entry {guid}: {message}")]
    Store { guid: String, message: String },
}

/// What happened to one feed during a pass, for the summary log line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct FeedOutcome {
    created: usize,
    existing: usize,
    skipped: usize,
    metadata_saved: bool,
}

// ============================================================================
// Seeding
// ============================================================================

/// Create the configured folders, then the configured feeds.
///
/// Safe to call on every start: existing rows are kept as they are.
pub async fn seed_store(db: &Database, config: &Config) -> Result<()> {
    for folder in &config.folders {
        db.get_or_create_folder(&folder.name)
            .await
            .with_context(|| format!("Failed to create folder {}", folder.name))?;
    }

    for feed in &config.feeds {
        let folder = db
            .get_or_create_folder(&feed.folder)
            .await
            .with_context(|| format!("Failed to resolve folder {}", feed.folder))?;
        db.get_or_create_feed(&feed.name, &feed.url, folder.id)
            .await
            .with_context(|| format!("Failed to create feed {}", feed.name))?;
    }

    tracing::info!(
        folders = config.folders.len(),
        feeds = config.feeds.len(),
        "Store seeded from configuration"
    );
    Ok(())
}

// ============================================================================
// Synchronizer
// ============================================================================

/// Runs sync passes: fetch every feed, refresh its metadata, store new entries.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    db: Database,
    fetcher: FeedFetcher,
    config: Arc<Config>,
}

impl Synchronizer {
    pub fn new(db: Database, fetcher: FeedFetcher, config: Arc<Config>) -> Self {
        Self {
            db,
            fetcher,
            config,
        }
    }

    /// One full pass over every feed in the store, strictly sequential.
    ///
    /// Never fails: a broken feed or entry is logged and skipped, and the
    /// outcome is only visible through logs and the store.
    pub async fn sync_all(&self) {
        let feeds = match self.db.select_all_feeds().await {
            Ok(feeds) => feeds,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list feeds, skipping sync pass");
                return;
            }
        };

        tracing::info!(feeds = feeds.len(), "Sync pass started");
        let started = std::time::Instant::now();
        let mut failed = 0usize;
        let mut created = 0usize;

        for feed in &feeds {
            match self.sync_feed(feed).await {
                Some(outcome) => created += outcome.created,
                None => failed += 1,
            }
        }

        tracing::info!(
            feeds = feeds.len(),
            failed = failed,
            new_items = created,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Sync pass finished"
        );
    }

    /// Sync one feed. `None` when the document could not be fetched.
    async fn sync_feed(&self, feed: &Feed) -> Option<FeedOutcome> {
        let credentials = self.config.feed_credentials(&feed.name);
        let parsed = match self.fetcher.fetch(&feed.name, &feed.url, credentials).await {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(feed = %feed.name, url = %feed.url, error = %e.cause, "Feed fetch failed");
                return None;
            }
        };

        let mut outcome = FeedOutcome::default();

        let changes = metadata_changes(feed, &parsed.metadata);
        if !changes.is_empty() {
            match self.db.save_feed_if_dirty(feed.id, &changes).await {
                Ok(saved) => {
                    outcome.metadata_saved = saved;
                    tracing::debug!(feed = %feed.name, fields = ?changes.field_names(), "Feed metadata updated");
                }
                Err(e) => {
                    tracing::warn!(feed = %feed.name, error = %e, "Failed to save feed metadata");
                }
            }
        }

        for entry in parsed.entries {
            match self.store_entry(feed.id, entry).await {
                Ok(true) => outcome.created += 1,
                Ok(false) => outcome.existing += 1,
                Err(e) => {
                    outcome.skipped += 1;
                    tracing::warn!(feed = %feed.name, error = %e, "Skipping entry");
                }
            }
        }

        if outcome.created > 0 || outcome.skipped > 0 {
            tracing::info!(
                feed = %feed.name,
                new_items = outcome.created,
                existing = outcome.existing,
                skipped = outcome.skipped,
                "Feed synced"
            );
        } else {
            tracing::debug!(feed = %feed.name, existing = outcome.existing, "Feed unchanged");
        }

        Some(outcome)
    }

    /// Store an entry unless its guid is already known. Returns whether an
    /// item was created.
    async fn store_entry(&self, feed_id: i64, entry: ParsedEntry) -> Result<bool, EntryError> {
        let item = new_item(feed_id, entry)?;

        let store_err = |e: anyhow::Error| EntryError::Store {
            guid: item.guid.clone(),
            message: e.to_string(),
        };

        if self
            .db
            .get_item_by_guid(&item.guid)
            .await
            .map_err(store_err)?
            .is_some()
        {
            return Ok(false);
        }

        // A concurrent writer may have taken the guid since the lookup
        let created = self.db.create_item(&item).await.map_err(store_err)?;
        Ok(created.is_some())
    }
}

// ============================================================================
// Reconciliation Helpers
// ============================================================================

/// Fields of `metadata` that are present and differ from the stored feed.
///
/// Absent fields are left out, so a document without a link never clears
/// a stored link. The icon is compared after trailing-slash removal.
pub fn metadata_changes(feed: &Feed, metadata: &FeedMetadata) -> FeedChanges {
    fn changed(new: Option<&str>, old: Option<&str>) -> Option<String> {
        match new {
            Some(new) if !new.is_empty() && Some(new) != old => Some(new.to_string()),
            _ => None,
        }
    }

    FeedChanges {
        title: changed(metadata.title.as_deref(), feed.title.as_deref()),
        link: changed(metadata.link.as_deref(), feed.link.as_deref()),
        favicon_link: changed(
            metadata.icon.as_deref().map(normalize_icon_url),
            feed.favicon_link.as_deref(),
        ),
    }
}

/// Map a parsed entry to a new item, filling the author and content defaults.
pub fn new_item(feed_id: i64, entry: ParsedEntry) -> Result<NewItem, EntryError> {
    if entry.guid.is_empty() {
        return Err(EntryError::MissingGuid);
    }
    let guid = entry.guid;

    let missing = |field| EntryError::MissingField {
        guid: guid.clone(),
        field,
    };
    let url = entry.link.ok_or_else(|| missing("link"))?;
    let title = entry.title.ok_or_else(|| missing("title"))?;
    let pub_date = entry.published.ok_or_else(|| missing("publication time"))?;

    Ok(NewItem {
        guid,
        url,
        title,
        author: entry.author.unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
        content: entry.content.unwrap_or_default(),
        pub_date,
        feed_id,
    })
}
