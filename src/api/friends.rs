//! Friend endpoints

use super::ApiClient;
use super::dto::{Ack, AddFriendRequest, DataPayload, SearchUsersRequest, UserSummary, UsersData};
use crate::error::AppError;

impl ApiClient {
    /// Search users by name or username
    pub async fn search_users(
        &self,
        user_id: i64,
        query: &str,
    ) -> Result<Vec<UserSummary>, AppError> {
        let request = SearchUsersRequest { query, user_id };
        let payload: DataPayload<UsersData> = self.post_json("search_friends.php", &request).await?;

        tracing::debug!(query, count = payload.data.users.len(), "User search finished");
        Ok(payload.data.users)
    }

    /// Add `friend_id` to the user's friends
    pub async fn add_friend(&self, user_id: i64, friend_id: i64) -> Result<(), AppError> {
        let request = AddFriendRequest { user_id, friend_id };
        let _: Ack = self.post_json("add_friend.php", &request).await?;
        Ok(())
    }
}
