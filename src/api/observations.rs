//! Observation endpoints

use async_trait::async_trait;

use super::ApiClient;
use super::dto::{
    Ack, CategoryItems, DataPayload, ObservationItem, ObservationRequest,
    UpdateObservationRequest,
};
use crate::data::Category;
use crate::error::AppError;

/// Source of category feeds
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch_category_items(
        &self,
        category: Category,
    ) -> Result<Vec<ObservationItem>, AppError>;
}

#[async_trait]
impl FeedClient for ApiClient {
    async fn fetch_category_items(
        &self,
        category: Category,
    ) -> Result<Vec<ObservationItem>, AppError> {
        ApiClient::fetch_category_items(self, category).await
    }
}

impl ApiClient {
    /// Fetch every observation of a category
    pub async fn fetch_category_items(
        &self,
        category: Category,
    ) -> Result<Vec<ObservationItem>, AppError> {
        let payload: CategoryItems = self
            .get_json(
                "get_category_items.php",
                &[("category_id", category.id().to_string())],
            )
            .await?;

        tracing::debug!(
            category = %category,
            count = payload.items.len(),
            "Fetched category items"
        );
        Ok(payload.items)
    }

    /// Fetch a single observation
    pub async fn fetch_observation(
        &self,
        observation_id: i64,
    ) -> Result<ObservationItem, AppError> {
        let payload: DataPayload<ObservationItem> = self
            .get_json(
                "get_single_observation.php",
                &[("observation_id", observation_id.to_string())],
            )
            .await?;

        Ok(payload.data)
    }

    /// Change the category and caption of one of the user's posts
    pub async fn update_observation(
        &self,
        user_id: i64,
        observation_id: i64,
        category: Category,
        caption: &str,
    ) -> Result<(), AppError> {
        let request = UpdateObservationRequest {
            observation_id,
            user_id,
            category_id: category.id(),
            title: caption.to_string(),
        };
        let _: Ack = self.post_json("update_observation.php", &request).await?;
        Ok(())
    }

    /// Delete one of the user's posts
    pub async fn delete_observation(
        &self,
        user_id: i64,
        observation_id: i64,
    ) -> Result<(), AppError> {
        let request = ObservationRequest {
            observation_id,
            user_id,
        };
        let _: Ack = self.post_json("delete_observation.php", &request).await?;
        Ok(())
    }

    /// Like or unlike a post
    ///
    /// # Returns
    /// The backend's message ("liked"/"unliked" on current servers)
    pub async fn toggle_like(&self, user_id: i64, observation_id: i64) -> Result<String, AppError> {
        let request = ObservationRequest {
            observation_id,
            user_id,
        };
        let ack: Ack = self.post_json("toggle_like.php", &request).await?;
        Ok(ack.message)
    }
}
