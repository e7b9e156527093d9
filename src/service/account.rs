//! Account service
//!
//! Sign-in state for the single local user plus profile maintenance.

use chrono::Utc;
use std::path::Path;
use std::sync::Arc;

use crate::api::dto::{ProfileData, SignupData};
use crate::api::{ApiClient, ProfileImage};
use crate::data::{Database, Session};
use crate::error::AppError;

const MIN_PASSWORD_CHARS: usize = 6;

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Account service
pub struct AccountService {
    db: Arc<Database>,
    api: Arc<ApiClient>,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>, api: Arc<ApiClient>) -> Self {
        Self { db, api }
    }

    /// The signed-in user, if any
    pub async fn current_session(&self) -> Result<Option<Session>, AppError> {
        self.db.get_session().await
    }

    /// The signed-in user or `Unauthorized`
    pub async fn require_session(&self) -> Result<Session, AppError> {
        self.db.get_session().await?.ok_or(AppError::Unauthorized)
    }

    /// Sign in and store the session
    ///
    /// Replaces any previous session. The outbox is left alone.
    ///
    /// # Errors
    /// Returns `Validation` for empty fields and `Server` when the backend
    /// refuses the credentials
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Please enter email and password.".to_string(),
            ));
        }

        let data = self.api.login(email, password).await?;

        let now = Utc::now();
        let session = Session {
            user_id: data.user_id,
            username: data.username,
            email: data.email,
            full_name: data.full_name,
            session_token: data.session_token,
            profile_picture_url: data.profile_picture_url,
            background_picture_url: data.background_picture_url,
            bio: data.bio,
            created_at: now,
            updated_at: now,
        };
        self.db.upsert_session(&session).await?;

        tracing::info!(user_id = session.user_id, username = %session.username, "Signed in");
        Ok(session)
    }

    /// Register a new account
    ///
    /// Does not sign in; call [`login`](Self::login) afterwards.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<SignupData, AppError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AppError::Validation("Please fill in all fields.".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::Validation(
                "Password must be at least 6 characters.".to_string(),
            ));
        }

        let data = self.api.signup(name, email, password).await?;
        tracing::info!(user_id = data.user_id, username = %data.username, "Account created");
        Ok(data)
    }

    /// Forget the session
    ///
    /// Pending uploads stay queued and sync after the next sign-in.
    pub async fn logout(&self) -> Result<(), AppError> {
        self.db.clear_session().await?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// Fetch a profile, the signed-in user's when `user_id` is `None`
    pub async fn fetch_profile(&self, user_id: Option<i64>) -> Result<ProfileData, AppError> {
        let user_id = match user_id {
            Some(id) => id,
            None => self.require_session().await?.user_id,
        };
        self.api.fetch_profile(user_id).await
    }

    /// Update bio and/or display name
    ///
    /// Values left out keep what the session holds.
    pub async fn update_profile_text(
        &self,
        bio: Option<&str>,
        full_name: Option<&str>,
    ) -> Result<Session, AppError> {
        let session = self.require_session().await?;

        let bio = normalize_optional_text(bio);
        let full_name = normalize_optional_text(full_name);
        if bio.is_none() && full_name.is_none() {
            return Err(AppError::Validation("Nothing to update.".to_string()));
        }

        let send_bio = bio.as_deref().or(session.bio.as_deref()).unwrap_or("");
        let send_name = full_name
            .as_deref()
            .or(session.full_name.as_deref())
            .unwrap_or("");
        self.api
            .update_profile_text(session.user_id, send_bio, send_name)
            .await?;

        self.db
            .update_session_profile(bio.as_deref(), full_name.as_deref())
            .await?;

        tracing::info!(user_id = session.user_id, "Profile updated");
        self.require_session().await
    }

    /// Upload a new avatar and remember its URL
    pub async fn upload_profile_picture(&self, path: &Path) -> Result<String, AppError> {
        let session = self.require_session().await?;
        let url = self
            .api
            .upload_profile_image(session.user_id, ProfileImage::Avatar, path)
            .await?;
        self.db.update_session_profile_picture(&url).await?;
        Ok(url)
    }

    /// Upload a new profile background and remember its URL
    pub async fn upload_background_picture(&self, path: &Path) -> Result<String, AppError> {
        let session = self.require_session().await?;
        let url = self
            .api
            .upload_profile_image(session.user_id, ProfileImage::Background, path)
            .await?;
        self.db.update_session_background_picture(&url).await?;
        Ok(url)
    }
}
