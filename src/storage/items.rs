use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{now_micros, Item, ItemDbRow, ItemQuery, ItemSelection, NewItem};

const ITEM_COLUMNS: &str =
    "id, guid, url, title, author, content, pub_date, feed_id, read, starred, updated";

/// Appends the `WHERE` condition for a selection. Always leaves the builder
/// inside a `WHERE` clause so callers can continue with `AND ...`.
fn push_selection(builder: &mut QueryBuilder<'_, sqlx::Sqlite>, selection: ItemSelection) {
    match selection {
        ItemSelection::Feed(feed_id) => {
            builder.push(" WHERE feed_id = ");
            builder.push_bind(feed_id);
        }
        ItemSelection::Folder(folder_id) => {
            builder.push(" WHERE feed_id IN (SELECT id FROM feeds WHERE folder_id = ");
            builder.push_bind(folder_id);
            builder.push(")");
        }
        ItemSelection::Starred => {
            builder.push(" WHERE starred = 1");
        }
        ItemSelection::All => {
            builder.push(" WHERE 1 = 1");
        }
    }
}

impl Database {
    // ========================================================================
    // Item Creation (synchronizer)
    // ========================================================================

    pub async fn get_item_by_guid(&self, guid: &str) -> Result<Option<Item>> {
        let row: Option<ItemDbRow> =
            sqlx::query_as(&format!("SELECT {} FROM items WHERE guid = ?", ITEM_COLUMNS))
                .bind(guid)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(ItemDbRow::into_item))
    }

    /// Create an unread, unstarred item.
    ///
    /// The guid is unique across the whole store: if any feed already owns an
    /// item with this guid nothing is written and `None` is returned.
    /// Otherwise returns the new item's id.
    pub async fn create_item(&self, item: &NewItem) -> Result<Option<i64>> {
        let id: Option<(i64,)> = sqlx::query_as(
            r#"
                INSERT INTO items (guid, url, title, author, content, pub_date, feed_id, updated)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(guid) DO NOTHING
                RETURNING id
            "#,
        )
        .bind(&item.guid)
        .bind(&item.url)
        .bind(&item.title)
        .bind(&item.author)
        .bind(&item.content)
        .bind(item.pub_date.timestamp())
        .bind(item.feed_id)
        .bind(now_micros())
        .fetch_optional(&self.pool)
        .await?;

        Ok(id.map(|(id,)| id))
    }

    // ========================================================================
    // Item Queries (API)
    // ========================================================================

    /// List items by publication time, newest first unless `oldest_first`.
    pub async fn query_items(&self, query: &ItemQuery) -> Result<Vec<Item>> {
        let mut builder: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM items", ITEM_COLUMNS));
        push_selection(&mut builder, query.selection);

        if !query.get_read {
            builder.push(" AND read = 0");
        }
        if let Some(offset) = query.offset.filter(|&o| o > 0) {
            builder.push(" AND id <= ");
            builder.push_bind(offset);
        }

        if query.oldest_first {
            builder.push(" ORDER BY pub_date ASC, id ASC");
        } else {
            builder.push(" ORDER BY pub_date DESC, id DESC");
        }

        if let Some(limit) = query.batch_size.filter(|&l| l > 0) {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }

        let rows: Vec<ItemDbRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(ItemDbRow::into_item).collect())
    }

    /// Items of a selection modified at or after `since`.
    pub async fn query_items_updated(
        &self,
        selection: ItemSelection,
        since: DateTime<Utc>,
    ) -> Result<Vec<Item>> {
        let mut builder: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM items", ITEM_COLUMNS));
        push_selection(&mut builder, selection);
        builder.push(" AND updated >= ");
        builder.push_bind(since.timestamp_micros());
        builder.push(" ORDER BY pub_date DESC, id DESC");

        let rows: Vec<ItemDbRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(ItemDbRow::into_item).collect())
    }

    /// Number of starred items in the store
    pub async fn starred_count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items WHERE starred = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    /// Highest item id, `None` on an empty store
    pub async fn newest_item_id(&self) -> Result<Option<i64>> {
        let max: (Option<i64>,) = sqlx::query_as("SELECT MAX(id) FROM items")
            .fetch_one(&self.pool)
            .await?;
        Ok(max.0)
    }

    // ========================================================================
    // Item State Mutations (API)
    // ========================================================================

    /// Set one item's read flag. Returns false when no such item exists.
    pub async fn set_item_read(&self, id: i64, read: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE items SET read = ?, updated = ? WHERE id = ?")
            .bind(read)
            .bind(now_micros())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the read flag on every listed item. Unknown ids are ignored.
    /// Returns the number of items written.
    pub async fn set_items_read(&self, ids: &[i64], read: bool) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE items SET read = ");
        builder.push_bind(read);
        builder.push(", updated = ");
        builder.push_bind(now_micros());
        builder.push(" WHERE id IN (");

        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Mark every unread item of a feed with `id <= newest_item_id` as read.
    ///
    /// Items that arrived after the client's newest known item stay unread.
    pub async fn mark_feed_read(&self, feed_id: i64, newest_item_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE items SET read = 1, updated = ? WHERE feed_id = ? AND id <= ? AND read = 0",
        )
        .bind(now_micros())
        .bind(feed_id)
        .bind(newest_item_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Mark every unread starred item with `id <= newest_item_id` as read,
    /// across all feeds.
    pub async fn mark_starred_read(&self, newest_item_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE items SET read = 1, updated = ? WHERE starred = 1 AND id <= ? AND read = 0",
        )
        .bind(now_micros())
        .bind(newest_item_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Set the starred flag of the item with this guid in this feed.
    /// Returns false when the feed has no such item.
    pub async fn set_starred_by_guid(&self, feed_id: i64, guid: &str, starred: bool) -> Result<bool> {
        let result =
            sqlx::query("UPDATE items SET starred = ?, updated = ? WHERE feed_id = ? AND guid = ?")
                .bind(starred)
                .bind(now_micros())
                .bind(feed_id)
                .bind(guid)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, ItemQuery, ItemSelection, NewItem};
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    async fn seeded_feed(db: &Database, folder: &str, name: &str) -> i64 {
        let folder = db.get_or_create_folder(folder).await.unwrap();
        db.get_or_create_feed(name, &format!("https://{}.example.com/rss", name), folder.id)
            .await
            .unwrap()
            .id
    }

    /// `day` sets the publication date so ordering is predictable.
    fn test_item(guid: &str, feed_id: i64, day: u32) -> NewItem {
        NewItem {
            guid: guid.to_string(),
            url: format!("https://example.com/{}", guid),
            title: format!("Item {}", guid),
            author: "Jane".to_string(),
            content: "<p>body</p>".to_string(),
            pub_date: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
            feed_id,
        }
    }

    fn guids(items: &[crate::storage::Item]) -> Vec<&str> {
        items.iter().map(|i| i.guid.as_str()).collect()
    }

    #[tokio::test]
    async fn test_create_item_defaults_unread_unstarred() {
        let db = test_db().await;
        let feed_id = seeded_feed(&db, "News", "alpha").await;

        let id = db.create_item(&test_item("g1", feed_id, 1)).await.unwrap();
        assert!(id.is_some());

        let item = db.get_item_by_guid("g1").await.unwrap().unwrap();
        assert_eq!(Some(item.id), id);
        assert!(!item.read);
        assert!(!item.starred);
        assert_eq!(item.feed_id, feed_id);
        assert_eq!(item.author, "Jane");
        assert_eq!(
            item.pub_date,
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_get_item_by_guid_missing() {
        let db = test_db().await;
        assert!(db.get_item_by_guid("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_item_duplicate_guid_across_feeds_is_noop() {
        let db = test_db().await;
        let alpha = seeded_feed(&db, "News", "alpha").await;
        let beta = seeded_feed(&db, "News", "beta").await;

        db.create_item(&test_item("shared", alpha, 1)).await.unwrap();
        let mut dup = test_item("shared", beta, 2);
        dup.title = "Second".to_string();
        let id = db.create_item(&dup).await.unwrap();

        assert_eq!(id, None);
        let item = db.get_item_by_guid("shared").await.unwrap().unwrap();
        assert_eq!(item.feed_id, alpha, "first observation wins");
        assert_eq!(item.title, "Item shared");
    }

    #[tokio::test]
    async fn test_query_items_newest_first_and_oldest_first() {
        let db = test_db().await;
        let feed_id = seeded_feed(&db, "News", "alpha").await;
        db.create_item(&test_item("mid", feed_id, 2)).await.unwrap();
        db.create_item(&test_item("old", feed_id, 1)).await.unwrap();
        db.create_item(&test_item("new", feed_id, 3)).await.unwrap();

        let newest = db.query_items(&ItemQuery::new(ItemSelection::All)).await.unwrap();
        assert_eq!(guids(&newest), vec!["new", "mid", "old"]);

        let mut query = ItemQuery::new(ItemSelection::All);
        query.oldest_first = true;
        let oldest = db.query_items(&query).await.unwrap();
        assert_eq!(guids(&oldest), vec!["old", "mid", "new"]);
    }

    #[tokio::test]
    async fn test_query_items_by_feed_and_folder() {
        let db = test_db().await;
        let alpha = seeded_feed(&db, "News", "alpha").await;
        let beta = seeded_feed(&db, "Tech", "beta").await;
        db.create_item(&test_item("a", alpha, 1)).await.unwrap();
        db.create_item(&test_item("b", beta, 2)).await.unwrap();

        let by_feed = db
            .query_items(&ItemQuery::new(ItemSelection::Feed(beta)))
            .await
            .unwrap();
        assert_eq!(guids(&by_feed), vec!["b"]);

        let tech = db.get_or_create_folder("Tech").await.unwrap();
        let by_folder = db
            .query_items(&ItemQuery::new(ItemSelection::Folder(tech.id)))
            .await
            .unwrap();
        assert_eq!(guids(&by_folder), vec!["b"]);
    }

    #[tokio::test]
    async fn test_query_items_get_read_offset_batch() {
        let db = test_db().await;
        let feed_id = seeded_feed(&db, "News", "alpha").await;
        let mut ids = Vec::new();
        for (day, guid) in [(1, "a"), (2, "b"), (3, "c"), (4, "d")] {
            ids.push(db.create_item(&test_item(guid, feed_id, day)).await.unwrap().unwrap());
        }
        db.set_item_read(ids[3], true).await.unwrap();

        let mut query = ItemQuery::new(ItemSelection::All);
        query.get_read = false;
        let unread = db.query_items(&query).await.unwrap();
        assert_eq!(guids(&unread), vec!["c", "b", "a"]);

        query.offset = Some(ids[1]);
        let page = db.query_items(&query).await.unwrap();
        assert_eq!(guids(&page), vec!["b", "a"]);

        query.offset = None;
        query.batch_size = Some(1);
        let limited = db.query_items(&query).await.unwrap();
        assert_eq!(guids(&limited), vec!["c"]);

        // Non-positive values disable paging
        query.batch_size = Some(-1);
        query.offset = Some(0);
        assert_eq!(db.query_items(&query).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_starred_selection_and_count() {
        let db = test_db().await;
        let feed_id = seeded_feed(&db, "News", "alpha").await;
        db.create_item(&test_item("a", feed_id, 1)).await.unwrap();
        db.create_item(&test_item("b", feed_id, 2)).await.unwrap();

        assert!(db.set_starred_by_guid(feed_id, "a", true).await.unwrap());
        assert!(!db.set_starred_by_guid(feed_id, "missing", true).await.unwrap());
        assert!(!db.set_starred_by_guid(feed_id + 1, "b", true).await.unwrap());

        assert_eq!(db.starred_count().await.unwrap(), 1);
        let starred = db
            .query_items(&ItemQuery::new(ItemSelection::Starred))
            .await
            .unwrap();
        assert_eq!(guids(&starred), vec!["a"]);

        db.set_starred_by_guid(feed_id, "a", false).await.unwrap();
        assert_eq!(db.starred_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_item_read_unknown_item() {
        let db = test_db().await;
        assert!(!db.set_item_read(99, true).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_items_read_bulk() {
        let db = test_db().await;
        let feed_id = seeded_feed(&db, "News", "alpha").await;
        let a = db.create_item(&test_item("a", feed_id, 1)).await.unwrap().unwrap();
        let b = db.create_item(&test_item("b", feed_id, 2)).await.unwrap().unwrap();
        db.create_item(&test_item("c", feed_id, 3)).await.unwrap();

        let written = db.set_items_read(&[a, b, 1000], true).await.unwrap();
        assert_eq!(written, 2);
        assert_eq!(db.set_items_read(&[], true).await.unwrap(), 0);

        let feeds = db.list_feeds_with_counts().await.unwrap();
        assert_eq!(feeds[0].unread_count, 1);

        db.set_items_read(&[a], false).await.unwrap();
        let feeds = db.list_feeds_with_counts().await.unwrap();
        assert_eq!(feeds[0].unread_count, 2);
    }

    #[tokio::test]
    async fn test_mark_feed_read_respects_newest_item_id() {
        let db = test_db().await;
        let alpha = seeded_feed(&db, "News", "alpha").await;
        let beta = seeded_feed(&db, "News", "beta").await;
        let a1 = db.create_item(&test_item("a1", alpha, 1)).await.unwrap().unwrap();
        let a2 = db.create_item(&test_item("a2", alpha, 2)).await.unwrap().unwrap();
        db.create_item(&test_item("b1", beta, 1)).await.unwrap();
        db.create_item(&test_item("a3", alpha, 3)).await.unwrap();

        let written = db.mark_feed_read(alpha, a2).await.unwrap();
        assert_eq!(written, 2);

        assert!(db.get_item_by_guid("a1").await.unwrap().unwrap().read);
        assert!(db.get_item_by_guid("a2").await.unwrap().unwrap().read);
        assert!(!db.get_item_by_guid("a3").await.unwrap().unwrap().read);
        assert!(!db.get_item_by_guid("b1").await.unwrap().unwrap().read);
        assert!(a1 < a2);
    }

    #[tokio::test]
    async fn test_mark_starred_read_spans_feeds() {
        let db = test_db().await;
        let alpha = seeded_feed(&db, "News", "alpha").await;
        let beta = seeded_feed(&db, "Tech", "beta").await;
        db.create_item(&test_item("a1", alpha, 1)).await.unwrap();
        db.create_item(&test_item("a2", alpha, 2)).await.unwrap();
        let b1 = db.create_item(&test_item("b1", beta, 3)).await.unwrap().unwrap();
        db.create_item(&test_item("b2", beta, 4)).await.unwrap();
        for (feed_id, guid) in [(alpha, "a1"), (beta, "b1"), (beta, "b2")] {
            db.set_starred_by_guid(feed_id, guid, true).await.unwrap();
        }

        let written = db.mark_starred_read(b1).await.unwrap();
        assert_eq!(written, 2);

        assert!(db.get_item_by_guid("a1").await.unwrap().unwrap().read);
        assert!(db.get_item_by_guid("b1").await.unwrap().unwrap().read);
        assert!(!db.get_item_by_guid("a2").await.unwrap().unwrap().read, "not starred");
        assert!(!db.get_item_by_guid("b2").await.unwrap().unwrap().read, "newer");
    }

    #[tokio::test]
    async fn test_newest_item_id() {
        let db = test_db().await;
        assert_eq!(db.newest_item_id().await.unwrap(), None);

        let feed_id = seeded_feed(&db, "News", "alpha").await;
        db.create_item(&test_item("a", feed_id, 5)).await.unwrap();
        let b = db.create_item(&test_item("b", feed_id, 1)).await.unwrap();
        assert_eq!(db.newest_item_id().await.unwrap(), b);
    }

    #[tokio::test]
    async fn test_query_items_updated_sees_mutations() {
        let db = test_db().await;
        let feed_id = seeded_feed(&db, "News", "alpha").await;
        let a = db.create_item(&test_item("a", feed_id, 1)).await.unwrap().unwrap();
        db.create_item(&test_item("b", feed_id, 2)).await.unwrap();

        let before = db
            .query_items_updated(ItemSelection::All, Utc::now() - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(before.len(), 2);

        let future = db
            .query_items_updated(ItemSelection::All, Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        assert!(future.is_empty());

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let mark = Utc::now();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        db.set_item_read(a, true).await.unwrap();

        let changed = db
            .query_items_updated(ItemSelection::Feed(feed_id), mark)
            .await
            .unwrap();
        assert_eq!(guids(&changed), vec!["a"]);
        assert!(changed[0].read);
    }
}
