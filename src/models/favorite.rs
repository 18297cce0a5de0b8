//! Favorite models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry of "my favorites"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteItem {
    pub item_id: i64,
    pub title: String,
    pub status: String,
    pub mode: String,
    pub owner_id: i64,
    pub favorited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FavoriteStatus {
    pub is_favorite: bool,
}
