//! Backend wire types
//!
//! The PHP backend is loose with JSON types: ids may arrive as numbers or
//! numeric strings, flags as `true`/`1`/`"1"`. The `lenient` helpers accept
//! all of these.

use serde::{Deserialize, Serialize};

// =============================================================================
// Observations
// =============================================================================

/// One row of the `observations` table as returned by the API
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservationItem {
    #[serde(deserialize_with = "lenient::int")]
    pub observation_id: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub user_id: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub category_id: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub image_url: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub latitude: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub longitude: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub created_at: Option<String>,
}

/// `get_category_items.php` payload
#[derive(Debug, Deserialize)]
pub struct CategoryItems {
    #[serde(default)]
    pub items: Vec<ObservationItem>,
}

/// Generic `{ "data": ... }` payload
#[derive(Debug, Deserialize)]
pub struct DataPayload<T> {
    pub data: T,
}

/// Acknowledgement carrying only the envelope message
#[derive(Debug, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ObservationRequest {
    pub observation_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct UpdateObservationRequest {
    pub observation_id: i64,
    pub user_id: i64,
    pub category_id: i32,
    pub title: String,
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `login.php` data
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    #[serde(deserialize_with = "lenient::int")]
    pub user_id: i64,
    pub username: String,
    pub email: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub full_name: Option<String>,
    pub session_token: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub profile_picture_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub background_picture_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub bio: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// `signup.php` data
#[derive(Debug, Clone, Deserialize)]
pub struct SignupData {
    #[serde(deserialize_with = "lenient::int")]
    pub user_id: i64,
    pub username: String,
    pub email: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub full_name: String,
}

/// `get_profile.php` data
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileData {
    #[serde(default, deserialize_with = "lenient::string")]
    pub full_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub username: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub profile_picture_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub background_picture_url: Option<String>,
    #[serde(deserialize_with = "lenient::int")]
    pub posts_count: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub friends_count: i64,
    #[serde(default)]
    pub posts: Vec<ProfilePost>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfilePost {
    #[serde(deserialize_with = "lenient::int")]
    pub observation_id: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub image_url: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileTextRequest<'a> {
    pub user_id: i64,
    pub bio: &'a str,
    pub full_name: &'a str,
}

// =============================================================================
// Friends
// =============================================================================

#[derive(Debug, Serialize)]
pub struct SearchUsersRequest<'a> {
    pub query: &'a str,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct AddFriendRequest {
    pub user_id: i64,
    pub friend_id: i64,
}

/// A user as listed by `search_friends.php`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserSummary {
    #[serde(deserialize_with = "lenient::int")]
    pub user_id: i64,
    pub username: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub full_name: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub profile_picture_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub is_friend: bool,
}

#[derive(Debug, Deserialize)]
pub struct UsersData {
    #[serde(default)]
    pub users: Vec<UserSummary>,
}

pub(crate) mod lenient {
    use serde::de::{Deserializer, Error};
    use serde::Deserialize;
    use serde_json::Value;

    pub fn int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| D::Error::custom(format!("expected integer, got {n}"))),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("expected integer, got {s:?}"))),
            other => Err(D::Error::custom(format!("expected integer, got {other}"))),
        }
    }

    /// Null and missing values become an empty string; scalars become strings
    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(String::new()),
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(D::Error::custom(format!("expected string, got {other}"))),
        }
    }

    /// Null, missing and empty values become `None`; scalars become strings
    pub fn opt_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() || s == "null" => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            Some(other) => {
                return Err(D::Error::custom(format!("expected scalar, got {other}")));
            }
        })
    }

    pub fn boolean<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
            Value::String(s) => matches!(s.trim(), "1" | "true" | "TRUE" | "True"),
            _ => false,
        })
    }
}
