//! Account and profile endpoints

use reqwest::multipart::Form;
use std::path::Path;

use super::ApiClient;
use super::dto::{
    Ack, DataPayload, LoginData, LoginRequest, ProfileData, ProfileTextRequest, SignupData,
    SignupRequest,
};
use crate::error::AppError;

/// Which profile image an upload replaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileImage {
    Avatar,
    Background,
}

impl ProfileImage {
    fn endpoint(self) -> &'static str {
        match self {
            Self::Avatar => "upload_profile_picture.php",
            Self::Background => "upload_background.php",
        }
    }

    /// Multipart field name; the response carries `<field>_url`
    fn field(self) -> &'static str {
        match self {
            Self::Avatar => "profile_picture",
            Self::Background => "background_picture",
        }
    }
}

impl ApiClient {
    /// Exchange credentials for a session
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginData, AppError> {
        let payload: DataPayload<LoginData> = self
            .post_json("login.php", &LoginRequest { email, password })
            .await?;
        Ok(payload.data)
    }

    /// Create an account
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<SignupData, AppError> {
        let payload: DataPayload<SignupData> = self
            .post_json(
                "signup.php",
                &SignupRequest {
                    name,
                    email,
                    password,
                },
            )
            .await?;
        Ok(payload.data)
    }

    /// Fetch a user's public profile with their posts
    pub async fn fetch_profile(&self, user_id: i64) -> Result<ProfileData, AppError> {
        let payload: DataPayload<ProfileData> = self
            .get_json("get_profile.php", &[("user_id", user_id.to_string())])
            .await?;
        Ok(payload.data)
    }

    /// Update bio and full name
    pub async fn update_profile_text(
        &self,
        user_id: i64,
        bio: &str,
        full_name: &str,
    ) -> Result<(), AppError> {
        let request = ProfileTextRequest {
            user_id,
            bio,
            full_name,
        };
        let _: Ack = self.post_json("update_profile_bio.php", &request).await?;
        Ok(())
    }

    /// Upload a new avatar or background picture
    ///
    /// # Returns
    /// The URL the backend assigned to the image
    pub async fn upload_profile_image(
        &self,
        user_id: i64,
        kind: ProfileImage,
        image_path: &Path,
    ) -> Result<String, AppError> {
        let file_name = image_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload.jpg")
            .to_string();
        let image = super::image_part(image_path, &file_name).await?;
        let form = Form::new()
            .text("user_id", user_id.to_string())
            .part(kind.field(), image);

        let payload: DataPayload<serde_json::Map<String, serde_json::Value>> =
            self.post_multipart(kind.endpoint(), form).await?;

        let key = format!("{}_url", kind.field());
        payload
            .data
            .get(&key)
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::MalformedResponse(format!("{} has no data.{key}", kind.endpoint()))
            })
    }
}
