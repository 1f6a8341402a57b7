use anyhow::Result;

use super::schema::Database;
use super::types::{from_micros, now_micros, Folder};

impl Database {
    // ========================================================================
    // Folder Operations
    // ========================================================================

    /// Return the folder with this name, creating it if it does not exist.
    ///
    /// Existing folders are returned untouched.
    pub async fn get_or_create_folder(&self, name: &str) -> Result<Folder> {
        sqlx::query("INSERT INTO folders (name, updated) VALUES (?, ?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .bind(now_micros())
            .execute(&self.pool)
            .await?;

        let (id, name, updated): (i64, String, i64) =
            sqlx::query_as("SELECT id, name, updated FROM folders WHERE name = ?")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;

        Ok(Folder {
            id,
            name,
            updated: from_micros(updated),
        })
    }

    /// All folders in id order
    pub async fn list_folders(&self) -> Result<Vec<Folder>> {
        let rows: Vec<(i64, String, i64)> =
            sqlx::query_as("SELECT id, name, updated FROM folders ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, updated)| Folder {
                id,
                name,
                updated: from_micros(updated),
            })
            .collect())
    }
}
