//! Post composition
//!
//! Validates a new observation and either publishes it straight away or,
//! when offline, parks it in the outbox for the next sync.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::{ObservationUpload, UploadClient};
use crate::connectivity::Connectivity;
use crate::data::{Category, Database, EntityId, PendingUpload};
use crate::error::AppError;
use crate::metrics::OUTBOX_DEPTH;

const MIN_CAPTION_CHARS: usize = 5;

/// A post as entered by the user
///
/// Category and image are optional so that "nothing selected" can be
/// reported with the right message.
#[derive(Debug, Clone, Default)]
pub struct ComposeRequest {
    pub category: Option<Category>,
    pub caption: String,
    pub image_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeOutcome {
    /// Saved to the outbox
    Queued(PendingUpload),
    /// Uploaded now
    Published { message: String },
}

/// Post composer
pub struct PostComposer {
    db: Arc<Database>,
    uploader: Arc<dyn UploadClient>,
    connectivity: Arc<dyn Connectivity>,
    outbox_dir: PathBuf,
}

impl PostComposer {
    pub fn new(
        db: Arc<Database>,
        uploader: Arc<dyn UploadClient>,
        connectivity: Arc<dyn Connectivity>,
        outbox_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            db,
            uploader,
            connectivity,
            outbox_dir: outbox_dir.into(),
        }
    }

    /// Validate and publish or queue a post
    ///
    /// Validation runs before anything touches the network. An online
    /// upload that fails is returned as an error and not queued.
    ///
    /// # Errors
    /// - `Validation` for missing image, category or short caption
    /// - `Unauthorized` when nobody is signed in
    /// - `Upload` when an online upload fails
    pub async fn compose(&self, request: ComposeRequest) -> Result<ComposeOutcome, AppError> {
        let (image_path, category, caption) = validate(&request)?;

        let session = self.db.get_session().await?.ok_or(AppError::Unauthorized)?;

        let metadata = tokio::fs::metadata(image_path).await.ok();
        if !metadata.is_some_and(|m| m.is_file()) {
            return Err(AppError::Validation(format!(
                "Image not found: {}",
                image_path.display()
            )));
        }

        if !self.connectivity.is_online().await {
            let entry = self.enqueue(image_path, category, caption).await?;
            return Ok(ComposeOutcome::Queued(entry));
        }

        let upload = ObservationUpload {
            user_id: session.user_id,
            category,
            caption: caption.to_string(),
            image_path: image_path.to_path_buf(),
        };
        let receipt = self.uploader.upload_observation(&upload).await?;

        tracing::info!(user_id = session.user_id, %category, "Observation published");
        Ok(ComposeOutcome::Published {
            message: receipt.message,
        })
    }

    async fn enqueue(
        &self,
        image_path: &Path,
        category: Category,
        caption: &str,
    ) -> Result<PendingUpload, AppError> {
        tokio::fs::create_dir_all(&self.outbox_dir).await?;

        let file_name = format!(
            "offline_{}.{}",
            EntityId::new().0,
            crate::api::image_extension(image_path)
        );
        let copy = self.outbox_dir.join(file_name);
        tokio::fs::copy(image_path, &copy).await?;

        let entry = PendingUpload::new(
            copy.to_string_lossy().into_owned(),
            caption.to_string(),
            category,
        );

        if let Err(error) = self.db.insert_pending_upload(&entry).await {
            if let Err(cleanup) = tokio::fs::remove_file(&copy).await {
                tracing::debug!(
                    path = %copy.display(),
                    error = %cleanup,
                    "Image copy not removed"
                );
            }
            return Err(error);
        }

        if let Ok(depth) = self.db.count_pending_uploads().await {
            OUTBOX_DEPTH.set(depth);
        }
        tracing::info!(upload_id = %entry.id, %category, "Observation queued for sync");
        Ok(entry)
    }

    /// Entries waiting for sync, oldest first
    pub async fn pending(&self) -> Result<Vec<PendingUpload>, AppError> {
        self.db.get_pending_uploads().await
    }

    /// Drop one pending upload and its image copy
    ///
    /// # Errors
    /// Returns `NotFound` if no entry has this id
    pub async fn discard(&self, id: &str) -> Result<PendingUpload, AppError> {
        let entry = self
            .db
            .get_pending_upload(id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !self.db.delete_pending_upload(id).await? {
            return Err(AppError::NotFound);
        }
        self.remove_copy(Path::new(&entry.image_path)).await;

        if let Ok(depth) = self.db.count_pending_uploads().await {
            OUTBOX_DEPTH.set(depth);
        }
        tracing::info!(upload_id = %entry.id, "Pending upload discarded");
        Ok(entry)
    }

    /// Empty the outbox and delete the image copies it owns
    pub async fn clear_outbox(&self) -> Result<Vec<PendingUpload>, AppError> {
        let removed = self.db.clear_pending_uploads().await?;
        for entry in &removed {
            self.remove_copy(Path::new(&entry.image_path)).await;
        }

        OUTBOX_DEPTH.set(0);
        tracing::info!(removed = removed.len(), "Outbox cleared");
        Ok(removed)
    }

    async fn remove_copy(&self, path: &Path) {
        if !path.starts_with(&self.outbox_dir) {
            return;
        }
        if let Err(error) = tokio::fs::remove_file(path).await {
            tracing::debug!(path = %path.display(), %error, "Image copy not removed");
        }
    }
}

fn validate(request: &ComposeRequest) -> Result<(&Path, Category, &str), AppError> {
    let image_path = request
        .image_path
        .as_deref()
        .ok_or_else(|| AppError::Validation("Please select an image first.".to_string()))?;

    let category = request
        .category
        .ok_or_else(|| AppError::Validation("Please select a valid category.".to_string()))?;

    let caption = request.caption.trim();
    if caption.chars().count() < MIN_CAPTION_CHARS {
        return Err(AppError::Validation(
            "Caption must be at least 5 characters.".to_string(),
        ));
    }

    Ok((image_path, category, caption))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{UploadError, UploadReceipt};
    use crate::connectivity::StaticConnectivity;
    use crate::data::Session;
    use async_trait::async_trait;
    use chrono::Utc;
    use mockall::mock;
    use tempfile::TempDir;

    mock! {
        Uploader {}

        #[async_trait]
        impl UploadClient for Uploader {
            async fn upload_observation(
                &self,
                upload: &ObservationUpload,
            ) -> Result<UploadReceipt, UploadError>;
        }
    }

    struct Fixture {
        dir: TempDir,
        db: Arc<Database>,
        image: PathBuf,
    }

    impl Fixture {
        async fn new(signed_in: bool) -> Self {
            let dir = TempDir::new().unwrap();
            let db = Arc::new(Database::connect(&dir.path().join("test.db")).await.unwrap());
            let image = dir.path().join("picked.PNG");
            std::fs::write(&image, b"\x89PNG").unwrap();

            if signed_in {
                let now = Utc::now();
                db.upsert_session(&Session {
                    user_id: 3,
                    username: "wanderer".to_string(),
                    email: "wanderer@example.com".to_string(),
                    full_name: None,
                    session_token: "token".to_string(),
                    profile_picture_url: None,
                    background_picture_url: None,
                    bio: None,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
            }

            Self { dir, db, image }
        }

        fn composer(&self, uploader: MockUploader, online: bool) -> PostComposer {
            PostComposer::new(
                self.db.clone(),
                Arc::new(uploader),
                Arc::new(StaticConnectivity::new(online)),
                self.dir.path().join("outbox"),
            )
        }

        fn request(&self, category: Option<Category>, caption: &str) -> ComposeRequest {
            ComposeRequest {
                category,
                caption: caption.to_string(),
                image_path: Some(self.image.clone()),
            }
        }
    }

    fn silent_uploader() -> MockUploader {
        let mut uploader = MockUploader::new();
        uploader.expect_upload_observation().never();
        uploader
    }

    #[tokio::test]
    async fn short_caption_is_rejected_before_network() {
        let fixture = Fixture::new(true).await;
        let composer = fixture.composer(silent_uploader(), true);

        let error = composer
            .compose(fixture.request(Some(Category::Strata), "  rock "))
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "Caption must be at least 5 characters.");
    }

    #[tokio::test]
    async fn validation_messages_follow_field_order() {
        let fixture = Fixture::new(false).await;
        let composer = fixture.composer(silent_uploader(), true);

        let no_image = ComposeRequest {
            category: None,
            caption: String::new(),
            image_path: None,
        };
        assert_eq!(
            composer.compose(no_image).await.unwrap_err().to_string(),
            "Please select an image first."
        );

        let no_category = fixture.request(None, "");
        assert_eq!(
            composer.compose(no_category).await.unwrap_err().to_string(),
            "Please select a valid category."
        );

        let signed_out = fixture.request(Some(Category::Fauna), "A heron fishing");
        assert!(matches!(
            composer.compose(signed_out).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn offline_compose_copies_image_into_outbox() {
        let fixture = Fixture::new(true).await;
        let composer = fixture.composer(silent_uploader(), false);

        let outcome = composer
            .compose(fixture.request(Some(Category::Verdant), "  Moss on granite  "))
            .await
            .unwrap();

        let ComposeOutcome::Queued(entry) = outcome else {
            panic!("expected queued outcome");
        };
        assert_eq!(entry.caption, "Moss on granite");
        assert_eq!(entry.category, Category::Verdant);

        let copy = PathBuf::from(&entry.image_path);
        let name = copy.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("offline_"));
        assert!(name.ends_with(".png"));
        assert!(copy.exists());
        assert_eq!(composer.pending().await.unwrap(), vec![entry]);
    }

    #[tokio::test]
    async fn failed_enqueue_leaves_no_copy_behind() {
        let fixture = Fixture::new(true).await;
        let composer = fixture.composer(silent_uploader(), false);
        sqlx::query("DROP TABLE pending_uploads")
            .execute(fixture.db.pool())
            .await
            .unwrap();

        let error = composer
            .compose(fixture.request(Some(Category::Verdant), "Moss on granite"))
            .await
            .unwrap_err();

        assert!(matches!(error, AppError::Database(_)));
        let leftovers = std::fs::read_dir(fixture.dir.path().join("outbox"))
            .unwrap()
            .count();
        assert_eq!(leftovers, 0);
        assert!(fixture.image.exists());
    }

    #[tokio::test]
    async fn online_compose_publishes() {
        let fixture = Fixture::new(true).await;
        let mut uploader = MockUploader::new();
        uploader
            .expect_upload_observation()
            .withf(|upload| upload.user_id == 3 && upload.caption == "A heron fishing")
            .times(1)
            .returning(|_| {
                Ok(UploadReceipt {
                    message: "Discovery uploaded successfully".to_string(),
                })
            });
        let composer = fixture.composer(uploader, true);

        let outcome = composer
            .compose(fixture.request(Some(Category::Fauna), "A heron fishing"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ComposeOutcome::Published {
                message: "Discovery uploaded successfully".to_string()
            }
        );
        assert!(composer.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn online_failure_is_not_queued() {
        let fixture = Fixture::new(true).await;
        let mut uploader = MockUploader::new();
        uploader
            .expect_upload_observation()
            .returning(|_| Err(UploadError::Rejected("Invalid category".to_string())));
        let composer = fixture.composer(uploader, true);

        let error = composer
            .compose(fixture.request(Some(Category::Fauna), "A heron fishing"))
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "Invalid category");
        assert!(composer.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn discard_removes_one_entry() {
        let fixture = Fixture::new(true).await;
        let composer = fixture.composer(silent_uploader(), false);

        let ComposeOutcome::Queued(entry) = composer
            .compose(fixture.request(Some(Category::Fauna), "Otter slide"))
            .await
            .unwrap()
        else {
            panic!("expected queued outcome");
        };

        let discarded = composer.discard(&entry.id).await.unwrap();
        assert_eq!(discarded, entry);
        assert!(!Path::new(&entry.image_path).exists());
        assert!(composer.pending().await.unwrap().is_empty());

        assert!(matches!(
            composer.discard(&entry.id).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn clear_outbox_removes_copies() {
        let fixture = Fixture::new(true).await;
        let composer = fixture.composer(silent_uploader(), false);

        let ComposeOutcome::Queued(entry) = composer
            .compose(fixture.request(Some(Category::Strata), "Folded shale"))
            .await
            .unwrap()
        else {
            panic!("expected queued outcome");
        };

        let removed = composer.clear_outbox().await.unwrap();
        assert_eq!(removed.len(), 1);
        assert!(!Path::new(&entry.image_path).exists());
        assert!(fixture.image.exists());
    }
}
