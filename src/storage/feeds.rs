use anyhow::Result;
use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{now_micros, Feed, FeedChanges, FeedCountDbRow, FeedDbRow, FeedWithUnread};

const FEED_COLUMNS: &str = "id, name, url, folder_id, link, title, favicon_link, added, updated";

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Seed a feed from configuration, keyed by name.
    ///
    /// A new feed is inserted. An existing feed keeps its derived metadata;
    /// its url and folder are rewritten only when the configuration changed
    /// them, so an unchanged configuration leaves the row untouched.
    pub async fn get_or_create_feed(&self, name: &str, url: &str, folder_id: i64) -> Result<Feed> {
        let now = now_micros();
        sqlx::query(
            r#"
                INSERT INTO feeds (name, url, folder_id, added, updated)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(name) DO UPDATE SET
                    url = excluded.url,
                    folder_id = excluded.folder_id,
                    updated = excluded.updated
                WHERE feeds.url IS NOT excluded.url
                   OR feeds.folder_id IS NOT excluded.folder_id
            "#,
        )
        .bind(name)
        .bind(url)
        .bind(folder_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let row: FeedDbRow = sqlx::query_as(&format!(
            "SELECT {} FROM feeds WHERE name = ?",
            FEED_COLUMNS
        ))
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_feed())
    }

    /// Every feed in the store, in id order.
    pub async fn select_all_feeds(&self) -> Result<Vec<Feed>> {
        let rows: Vec<FeedDbRow> =
            sqlx::query_as(&format!("SELECT {} FROM feeds ORDER BY id", FEED_COLUMNS))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(FeedDbRow::into_feed).collect())
    }

    pub async fn get_feed_by_id(&self, id: i64) -> Result<Option<Feed>> {
        let row: Option<FeedDbRow> =
            sqlx::query_as(&format!("SELECT {} FROM feeds WHERE id = ?", FEED_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(FeedDbRow::into_feed))
    }

    /// Get all feeds with their unread item counts
    pub async fn list_feeds_with_counts(&self) -> Result<Vec<FeedWithUnread>> {
        let rows: Vec<FeedCountDbRow> = sqlx::query_as(
            r#"
                SELECT
                    f.id, f.name, f.url, f.folder_id, f.link, f.title, f.favicon_link,
                    f.added, f.updated,
                    COUNT(CASE WHEN i.read = 0 THEN 1 END) as unread_count
                FROM feeds f
                LEFT JOIN items i ON f.id = i.feed_id
                GROUP BY f.id
                ORDER BY f.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| FeedWithUnread {
                feed: row.feed.into_feed(),
                unread_count: row.unread_count,
            })
            .collect())
    }

    /// Write a feed's changed metadata fields in a single UPDATE.
    ///
    /// Only the `Some` fields of `changes` are written, together with the
    /// `updated` timestamp. An empty change set issues no statement at all.
    /// Returns whether a row was written.
    pub async fn save_feed_if_dirty(&self, feed_id: i64, changes: &FeedChanges) -> Result<bool> {
        if changes.is_empty() {
            return Ok(false);
        }

        let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE feeds SET ");
        let mut set = builder.separated(", ");
        if let Some(title) = &changes.title {
            set.push("title = ").push_bind_unseparated(title);
        }
        if let Some(link) = &changes.link {
            set.push("link = ").push_bind_unseparated(link);
        }
        if let Some(favicon_link) = &changes.favicon_link {
            set.push("favicon_link = ").push_bind_unseparated(favicon_link);
        }
        set.push("updated = ").push_bind_unseparated(now_micros());

        builder.push(" WHERE id = ");
        builder.push_bind(feed_id);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
