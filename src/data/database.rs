//! SQLite database operations
//!
//! All local persistence goes through this module: the pending-upload
//! outbox, the feed cache and the signed-in session.

use chrono::Utc;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
///
/// Owned by [`crate::AppState`] and handed to services as `Arc<Database>`.
/// Call [`Database::close`] at shutdown so pending writes are flushed.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close all pooled connections
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("Database pool closed");
    }

    // =========================================================================
    // Pending uploads (outbox)
    // =========================================================================

    /// Queue a post for the next sync
    pub async fn insert_pending_upload(&self, upload: &PendingUpload) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO pending_uploads (id, image_path, caption, category, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&upload.id)
        .bind(&upload.image_path)
        .bind(&upload.caption)
        .bind(upload.category)
        .bind(upload.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All queued posts, oldest first
    pub async fn get_pending_uploads(&self) -> Result<Vec<PendingUpload>, AppError> {
        let uploads = sqlx::query_as::<_, PendingUpload>(
            "SELECT * FROM pending_uploads ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(uploads)
    }

    /// Get a queued post by ID
    pub async fn get_pending_upload(&self, id: &str) -> Result<Option<PendingUpload>, AppError> {
        let upload =
            sqlx::query_as::<_, PendingUpload>("SELECT * FROM pending_uploads WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(upload)
    }

    /// Remove a queued post
    ///
    /// # Returns
    /// `true` if a row was deleted
    pub async fn delete_pending_upload(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM pending_uploads WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Number of queued posts
    pub async fn count_pending_uploads(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pending_uploads")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Drop every queued post
    ///
    /// # Returns
    /// The removed rows, so callers can clean up image copies
    pub async fn clear_pending_uploads(&self) -> Result<Vec<PendingUpload>, AppError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query_as::<_, PendingUpload>("SELECT * FROM pending_uploads")
            .fetch_all(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM pending_uploads")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(removed)
    }

    // =========================================================================
    // Feed cache
    // =========================================================================

    /// Insert or replace feed items by observation id
    ///
    /// Rows not present in `items` are left untouched.
    pub async fn upsert_cached_feed_items(&self, items: &[CachedFeedItem]) -> Result<(), AppError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO cached_feed_items (
                    observation_id, image_url, caption, category,
                    author_label, timestamp, cached_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(item.observation_id)
            .bind(&item.image_url)
            .bind(&item.caption)
            .bind(&item.category)
            .bind(&item.author_label)
            .bind(&item.timestamp)
            .bind(item.cached_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Cached items for a category tag, newest observation first
    pub async fn get_cached_feed_items(
        &self,
        category: &str,
    ) -> Result<Vec<CachedFeedItem>, AppError> {
        let items = sqlx::query_as::<_, CachedFeedItem>(
            "SELECT * FROM cached_feed_items WHERE category = ? ORDER BY observation_id DESC",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Delete cached items for a category tag
    pub async fn clear_cached_feed_items(&self, category: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM cached_feed_items WHERE category = ?")
            .bind(category)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete the whole feed cache
    pub async fn clear_all_cached_feed_items(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM cached_feed_items")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Session (single user)
    // =========================================================================

    /// Get the signed-in user
    ///
    /// # Returns
    /// The session or None if nobody is logged in
    pub async fn get_session(&self) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM session LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// Store the signed-in user, replacing any previous session
    pub async fn upsert_session(&self, session: &Session) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM session WHERE user_id != ?")
            .bind(session.user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO session (
                user_id, username, email, full_name, session_token,
                profile_picture_url, background_picture_url, bio,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.user_id)
        .bind(&session.username)
        .bind(&session.email)
        .bind(&session.full_name)
        .bind(&session.session_token)
        .bind(&session.profile_picture_url)
        .bind(&session.background_picture_url)
        .bind(&session.bio)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Update profile text fields of the current session
    ///
    /// `None` leaves a field unchanged.
    pub async fn update_session_profile(
        &self,
        bio: Option<&str>,
        full_name: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE session SET
                bio = COALESCE(?, bio),
                full_name = COALESCE(?, full_name),
                updated_at = ?
            "#,
        )
        .bind(bio)
        .bind(full_name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a new avatar URL for the current session
    pub async fn update_session_profile_picture(&self, url: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE session SET profile_picture_url = ?, updated_at = ?")
            .bind(url)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Record a new background picture URL for the current session
    pub async fn update_session_background_picture(&self, url: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE session SET background_picture_url = ?, updated_at = ?")
            .bind(url)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Log out
    pub async fn clear_session(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM session")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
