//! Social service
//!
//! Friends, likes and edits to already published posts. Everything here
//! acts as the signed-in user and goes straight to the backend.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::api::dto::{ObservationItem, UserSummary};
use crate::data::{Category, Database};
use crate::error::{AppError, Result};

/// Social service
pub struct SocialService {
    db: Arc<Database>,
    api: Arc<ApiClient>,
}

impl SocialService {
    pub fn new(db: Arc<Database>, api: Arc<ApiClient>) -> Self {
        Self { db, api }
    }

    async fn user_id(&self) -> Result<i64> {
        Ok(self
            .db
            .get_session()
            .await?
            .ok_or(AppError::Unauthorized)?
            .user_id)
    }

    // =========================================================================
    // Friends
    // =========================================================================

    /// Search users by name or username
    pub async fn search_users(&self, query: &str) -> Result<Vec<UserSummary>> {
        let user_id = self.user_id().await?;
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.api.search_users(user_id, query).await
    }

    pub async fn add_friend(&self, friend_id: i64) -> Result<()> {
        let user_id = self.user_id().await?;
        if friend_id == user_id {
            return Err(AppError::Validation(
                "You cannot add yourself as a friend.".to_string(),
            ));
        }
        self.api.add_friend(user_id, friend_id).await?;
        tracing::info!(user_id, friend_id, "Friend added");
        Ok(())
    }

    // =========================================================================
    // Observations
    // =========================================================================

    pub async fn fetch_observation(&self, observation_id: i64) -> Result<ObservationItem> {
        self.user_id().await?;
        self.api.fetch_observation(observation_id).await
    }

    /// Change category and caption of one of the user's posts
    pub async fn update_observation(
        &self,
        observation_id: i64,
        category: Category,
        caption: &str,
    ) -> Result<()> {
        let user_id = self.user_id().await?;
        let caption = caption.trim();
        if caption.is_empty() {
            return Err(AppError::Validation("Caption cannot be empty.".to_string()));
        }

        self.api
            .update_observation(user_id, observation_id, category, caption)
            .await?;
        tracing::info!(observation_id, %category, "Observation updated");
        Ok(())
    }

    pub async fn delete_observation(&self, observation_id: i64) -> Result<()> {
        let user_id = self.user_id().await?;
        self.api.delete_observation(user_id, observation_id).await?;
        tracing::info!(observation_id, "Observation deleted");
        Ok(())
    }

    /// Like or unlike; returns the backend's message
    pub async fn toggle_like(&self, observation_id: i64) -> Result<String> {
        let user_id = self.user_id().await?;
        self.api.toggle_like(user_id, observation_id).await
    }
}
