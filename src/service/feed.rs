//! Feed loading
//!
//! Online loads refresh the local cache; offline loads read it back. The
//! cache is only ever added to or replaced by id, never pruned.

use chrono::Utc;
use std::sync::Arc;

use crate::api::FeedClient;
use crate::api::dto::ObservationItem;
use crate::connectivity::Connectivity;
use crate::data::{CachedFeedItem, Category, Database};
use crate::error::AppError;
use crate::metrics::FEED_LOADS_TOTAL;

/// Where the returned items came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    /// Fresh from the backend
    Remote,
    /// Cached snapshot, device offline
    Offline,
    /// Cached snapshot, backend fetch failed
    Fallback { reason: String },
}

impl FeedSource {
    fn label(&self) -> &'static str {
        match self {
            FeedSource::Remote => "remote",
            FeedSource::Offline => "offline",
            FeedSource::Fallback { .. } => "fallback",
        }
    }

    /// Items may be out of date
    pub fn is_cached(&self) -> bool {
        !matches!(self, FeedSource::Remote)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub category: Category,
    pub source: FeedSource,
    pub items: Vec<CachedFeedItem>,
}

/// Feed loader
pub struct FeedLoader {
    db: Arc<Database>,
    client: Arc<dyn FeedClient>,
    connectivity: Arc<dyn Connectivity>,
}

impl FeedLoader {
    pub fn new(
        db: Arc<Database>,
        client: Arc<dyn FeedClient>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            db,
            client,
            connectivity,
        }
    }

    /// Load the feed for a category
    ///
    /// # Errors
    /// Returns error only if the local cache cannot be read or written;
    /// backend failures fall back to the cache
    pub async fn load(&self, category: Category) -> Result<Feed, AppError> {
        let feed = if self.connectivity.is_online().await {
            match self.client.fetch_category_items(category).await {
                Ok(items) => self.refresh(category, items).await?,
                Err(error) => {
                    tracing::warn!(%category, %error, "Feed fetch failed; using cache");
                    crate::metrics::record_error(&error, "feed_load");
                    self.cached(
                        category,
                        FeedSource::Fallback {
                            reason: error.to_string(),
                        },
                    )
                    .await?
                }
            }
        } else {
            self.cached(category, FeedSource::Offline).await?
        };

        FEED_LOADS_TOTAL
            .with_label_values(&[category.name(), feed.source.label()])
            .inc();
        tracing::debug!(
            %category,
            source = feed.source.label(),
            count = feed.items.len(),
            "Feed loaded"
        );
        Ok(feed)
    }

    async fn refresh(
        &self,
        category: Category,
        items: Vec<ObservationItem>,
    ) -> Result<Feed, AppError> {
        let cached_at = Utc::now();
        let items: Vec<CachedFeedItem> = items
            .into_iter()
            .map(|item| to_cached(item, category, cached_at))
            .collect();

        self.db.upsert_cached_feed_items(&items).await?;

        Ok(Feed {
            category,
            source: FeedSource::Remote,
            items,
        })
    }

    async fn cached(&self, category: Category, source: FeedSource) -> Result<Feed, AppError> {
        let items = self.db.get_cached_feed_items(category.name()).await?;
        Ok(Feed {
            category,
            source,
            items,
        })
    }

    /// Drop cached items of one category
    pub async fn clear_cache(&self, category: Category) -> Result<u64, AppError> {
        let removed = self.db.clear_cached_feed_items(category.name()).await?;
        tracing::info!(%category, removed, "Feed cache cleared");
        Ok(removed)
    }

    /// Drop every cached item
    pub async fn clear_all(&self) -> Result<u64, AppError> {
        let removed = self.db.clear_all_cached_feed_items().await?;
        tracing::info!(removed, "Feed cache cleared");
        Ok(removed)
    }
}

fn to_cached(
    item: ObservationItem,
    category: Category,
    cached_at: chrono::DateTime<Utc>,
) -> CachedFeedItem {
    CachedFeedItem {
        observation_id: item.observation_id,
        image_url: item.image_url,
        caption: item.description,
        category: category.name().to_string(),
        author_label: item.title,
        timestamp: item.created_at.unwrap_or_default(),
        cached_at,
    }
}
