//! Outbox sync
//!
//! Drains pending uploads when the app comes to the foreground. The drain
//! is strictly sequential: one upload at a time, in creation order, with
//! no batching or backoff. An entry leaves the outbox only when its
//! upload succeeds.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::api::{ObservationUpload, UploadClient};
use crate::connectivity::Connectivity;
use crate::data::{Database, PendingUpload};
use crate::error::AppError;
use crate::metrics::{OUTBOX_DEPTH, OUTBOX_ENTRIES_TOTAL, SYNC_RUNS_TOTAL};

/// How a sync run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// No network; nothing was attempted
    Offline,
    /// Nobody is signed in; nothing was attempted
    SignedOut,
    /// Every entry was visited
    Completed,
    /// The outbox could not be read
    Aborted { reason: String },
}

impl SyncStatus {
    fn label(&self) -> &'static str {
        match self {
            SyncStatus::Offline => "offline",
            SyncStatus::SignedOut => "signed_out",
            SyncStatus::Completed => "completed",
            SyncStatus::Aborted { .. } => "aborted",
        }
    }
}

/// Outcome of one sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub status: SyncStatus,
    /// Uploaded and removed from the outbox
    pub uploaded: Vec<String>,
    /// Upload (or removal after upload) failed; entry kept unless noted
    pub failed: Vec<FailedUpload>,
    /// Image file missing; entry kept
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUpload {
    pub id: String,
    pub reason: String,
}

impl SyncReport {
    fn with_status(status: SyncStatus) -> Self {
        Self {
            status,
            uploaded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Nothing was uploaded, failed or skipped
    pub fn is_empty(&self) -> bool {
        self.uploaded.is_empty() && self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Sync coordinator
pub struct SyncCoordinator {
    db: Arc<Database>,
    uploader: Arc<dyn UploadClient>,
    connectivity: Arc<dyn Connectivity>,
    /// Image copies made by the composer live here and are removed after upload
    outbox_dir: Option<PathBuf>,
}

impl SyncCoordinator {
    pub fn new(
        db: Arc<Database>,
        uploader: Arc<dyn UploadClient>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            db,
            uploader,
            connectivity,
            outbox_dir: None,
        }
    }

    /// Remove uploaded image copies that live under `dir`
    pub fn with_outbox_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.outbox_dir = Some(dir.into());
        self
    }

    /// Run one sync on a background task
    ///
    /// The handle can be awaited for the report or aborted. Errors are
    /// folded into [`SyncStatus::Aborted`].
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<SyncReport> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            match coordinator.sync_pending_uploads().await {
                Ok(report) => report,
                Err(error) => {
                    tracing::error!(%error, "Outbox sync aborted");
                    crate::metrics::record_error(&error, "sync");
                    let status = SyncStatus::Aborted {
                        reason: error.to_string(),
                    };
                    SYNC_RUNS_TOTAL.with_label_values(&[status.label()]).inc();
                    SyncReport::with_status(status)
                }
            }
        })
    }

    /// Drain the outbox once
    ///
    /// Returns immediately when offline or signed out. Upload failures
    /// never abort the drain; only failing to read the outbox does.
    ///
    /// # Errors
    /// Returns error if the session or the outbox cannot be read
    pub async fn sync_pending_uploads(&self) -> Result<SyncReport, AppError> {
        if !self.connectivity.is_online().await {
            tracing::debug!("Skipping outbox sync: offline");
            return Ok(self.finish(SyncReport::with_status(SyncStatus::Offline)));
        }

        let Some(session) = self.db.get_session().await? else {
            tracing::debug!("Skipping outbox sync: no session");
            return Ok(self.finish(SyncReport::with_status(SyncStatus::SignedOut)));
        };

        let pending = self.db.get_pending_uploads().await?;
        if !pending.is_empty() {
            tracing::info!(
                count = pending.len(),
                user_id = session.user_id,
                "Syncing pending uploads"
            );
        }

        let mut report = SyncReport::with_status(SyncStatus::Completed);
        for entry in pending {
            self.sync_entry(session.user_id, entry, &mut report).await;
        }

        if let Ok(depth) = self.db.count_pending_uploads().await {
            OUTBOX_DEPTH.set(depth);
        }

        tracing::info!(
            uploaded = report.uploaded.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Outbox sync finished"
        );
        Ok(self.finish(report))
    }

    async fn sync_entry(&self, user_id: i64, entry: PendingUpload, report: &mut SyncReport) {
        let image_path = PathBuf::from(&entry.image_path);

        if !is_file(&image_path).await {
            tracing::warn!(
                upload_id = %entry.id,
                path = %image_path.display(),
                "Pending upload image missing; leaving in outbox"
            );
            OUTBOX_ENTRIES_TOTAL.with_label_values(&["skipped"]).inc();
            report.skipped.push(entry.id);
            return;
        }

        let upload = ObservationUpload {
            user_id,
            category: entry.category,
            caption: entry.caption.clone(),
            image_path: image_path.clone(),
        };

        if let Err(error) = self.uploader.upload_observation(&upload).await {
            tracing::warn!(upload_id = %entry.id, %error, "Pending upload failed; will retry");
            OUTBOX_ENTRIES_TOTAL.with_label_values(&["failed"]).inc();
            report.failed.push(FailedUpload {
                id: entry.id,
                reason: error.to_string(),
            });
            return;
        }

        match self.db.delete_pending_upload(&entry.id).await {
            Ok(_) => {
                tracing::info!(upload_id = %entry.id, "Pending upload synced");
                OUTBOX_ENTRIES_TOTAL.with_label_values(&["uploaded"]).inc();
                self.remove_image_copy(&image_path).await;
                report.uploaded.push(entry.id);
            }
            Err(error) => {
                // Uploaded but still queued: the next sync posts it again.
                tracing::error!(
                    upload_id = %entry.id,
                    %error,
                    "Uploaded entry could not be removed from the outbox"
                );
                crate::metrics::record_error(&error, "sync_delete");
                OUTBOX_ENTRIES_TOTAL.with_label_values(&["failed"]).inc();
                report.failed.push(FailedUpload {
                    id: entry.id,
                    reason: error.to_string(),
                });
            }
        }
    }

    async fn remove_image_copy(&self, image_path: &Path) {
        let Some(dir) = &self.outbox_dir else {
            return;
        };
        if !image_path.starts_with(dir) {
            return;
        }
        if let Err(error) = tokio::fs::remove_file(image_path).await {
            tracing::warn!(path = %image_path.display(), %error, "Failed to remove image copy");
        }
    }

    fn finish(&self, report: SyncReport) -> SyncReport {
        SYNC_RUNS_TOTAL
            .with_label_values(&[report.status.label()])
            .inc();
        report
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}
