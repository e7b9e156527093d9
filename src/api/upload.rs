//! Observation upload
//!
//! The one endpoint the outbox depends on. Kept behind the
//! [`UploadClient`] trait so the sync coordinator can be driven without a
//! backend.

use async_trait::async_trait;
use reqwest::multipart::Form;
use std::path::PathBuf;
use thiserror::Error;

use super::ApiClient;
use super::dto::Ack;
use crate::data::Category;
use crate::error::AppError;

const UPLOAD_ENDPOINT: &str = "upload_discovery.php";

/// Why an upload did not go through
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// Timeout, refused connection, unreadable file, malformed response
    #[error("Network/IO Error: {0}")]
    Network(String),

    /// Backend answered `success: false`
    #[error("{0}")]
    Rejected(String),
}

/// Successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Server message (or assigned URL)
    pub message: String,
}

/// Fields sent for one observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationUpload {
    pub user_id: i64,
    pub category: Category,
    pub caption: String,
    pub image_path: PathBuf,
}

/// Performs the multipart observation upload
#[async_trait]
pub trait UploadClient: Send + Sync {
    async fn upload_observation(
        &self,
        upload: &ObservationUpload,
    ) -> Result<UploadReceipt, UploadError>;
}

#[async_trait]
impl UploadClient for ApiClient {
    /// POST `upload_discovery.php`
    ///
    /// Form fields: `user_id`, `category_id`, `title` (the caption) and
    /// `image_file`. Any failure, including an unreadable local file, is
    /// returned as an [`UploadError`].
    async fn upload_observation(
        &self,
        upload: &ObservationUpload,
    ) -> Result<UploadReceipt, UploadError> {
        let file_name = format!(
            "discovery_image.{}",
            super::image_extension(&upload.image_path)
        );

        let result = async {
            let image = super::image_part(&upload.image_path, &file_name).await?;
            let form = Form::new()
                .text("user_id", upload.user_id.to_string())
                .text("category_id", upload.category.id().to_string())
                .text("title", upload.caption.clone())
                .part("image_file", image);

            self.post_multipart::<Ack>(UPLOAD_ENDPOINT, form).await
        }
        .await;

        match result {
            Ok(ack) => {
                tracing::info!(
                    user_id = upload.user_id,
                    category = %upload.category,
                    "Observation uploaded"
                );
                Ok(UploadReceipt {
                    message: ack.message,
                })
            }
            Err(error) => {
                tracing::warn!(
                    user_id = upload.user_id,
                    category = %upload.category,
                    %error,
                    "Observation upload failed"
                );
                Err(into_upload_error(error))
            }
        }
    }
}

fn into_upload_error(error: AppError) -> UploadError {
    match error {
        AppError::Server(message) => UploadError::Rejected(message),
        AppError::HttpClient(e) => UploadError::Network(e.to_string()),
        AppError::Io(e) => UploadError::Network(e.to_string()),
        AppError::MalformedResponse(reason) => UploadError::Network(reason),
        other => UploadError::Network(other.to_string()),
    }
}
