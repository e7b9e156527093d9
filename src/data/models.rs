//! Data models
//!
//! Rust structs representing database entities.
//! Generated IDs are ULIDs; timestamps use chrono.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Category
// =============================================================================

/// Observation category
///
/// The numeric ids are shared with the backend's category table and must
/// not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
pub enum Category {
    Fauna = 1,
    Verdant = 2,
    Strata = 3,
    Phenomenon = 4,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Fauna,
        Category::Verdant,
        Category::Strata,
        Category::Phenomenon,
    ];

    /// Backend category id
    pub fn id(self) -> i32 {
        self as i32
    }

    /// Display name, also used as the feed cache tag
    pub fn name(self) -> &'static str {
        match self {
            Self::Fauna => "Fauna",
            Self::Verdant => "Verdant",
            Self::Strata => "Strata",
            Self::Phenomenon => "Phenomenon",
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Self::Fauna),
            2 => Some(Self::Verdant),
            3 => Some(Self::Strata),
            4 => Some(Self::Phenomenon),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts the numeric id or the case-insensitive name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<i64>() {
            return Self::from_id(id).ok_or_else(|| format!("unknown category id: {id}"));
        }

        Self::ALL
            .into_iter()
            .find(|category| category.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

// =============================================================================
// Pending Upload (outbox)
// =============================================================================

/// A post composed while offline, waiting for the next sync
///
/// Never mutated after creation. Removed when its upload succeeds or when
/// the outbox is cleared by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PendingUpload {
    pub id: String,
    /// Absolute path to the local image copy
    pub image_path: String,
    pub caption: String,
    pub category: Category,
    pub created_at: DateTime<Utc>,
}

impl PendingUpload {
    pub fn new(image_path: String, caption: String, category: Category) -> Self {
        Self {
            id: EntityId::new().0,
            image_path,
            caption,
            category,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Cached Feed Item
// =============================================================================

/// Last-known copy of a feed entry
///
/// Stale-tolerant read cache keyed by observation id. Rows are replaced
/// when a fresh fetch returns the same id and are never pruned
/// automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CachedFeedItem {
    pub observation_id: i64,
    pub image_url: String,
    pub caption: String,
    /// Category tag (see [`Category::name`])
    pub category: String,
    pub author_label: String,
    pub timestamp: String,
    pub cached_at: DateTime<Utc>,
}

// =============================================================================
// Session (single user)
// =============================================================================

/// The signed-in user
///
/// At most one row exists. Its presence is what "logged in" means.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub session_token: String,
    pub profile_picture_url: Option<String>,
    pub background_picture_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
