use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::MediaKind;

/// Progress percentage above which an item counts as finished
pub const COMPLETED_PROGRESS: f64 = 90.0;

/// One entry of a user's watch history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchHistoryItem {
    pub id: u64,
    pub media_kind: MediaKind,
    /// Percentage watched, 0-100
    pub progress: f64,
    pub last_watched: DateTime<Utc>,
}

impl WatchHistoryItem {
    pub fn is_completed(&self) -> bool {
        self.progress > COMPLETED_PROGRESS
    }
}

/// An item the user marked as a favorite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteItem {
    pub id: u64,
    pub media_kind: MediaKind,
}

/// Everything the recommendation engine reads about a user
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub watch_history: Vec<WatchHistoryItem>,
    pub favorites: Vec<FavoriteItem>,
}

impl UserProfile {
    /// Creates an empty profile
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            watch_history: Vec::new(),
            favorites: Vec::new(),
        }
    }

    /// True when there is nothing to derive genre preferences from
    pub fn is_empty(&self) -> bool {
        self.watch_history.is_empty() && self.favorites.is_empty()
    }

    /// Ids the user has already seen or saved; never recommended back
    pub fn excluded_ids(&self) -> HashSet<u64> {
        self.watch_history
            .iter()
            .map(|h| h.id)
            .chain(self.favorites.iter().map(|f| f.id))
            .collect()
    }

    /// Adds a favorite unless it is already present
    pub fn add_favorite(&mut self, favorite: FavoriteItem) {
        if !self.favorites.contains(&favorite) {
            self.favorites.push(favorite);
        }
    }

    /// Removes a favorite, returning whether it was present
    pub fn remove_favorite(&mut self, id: u64, media_kind: MediaKind) -> bool {
        let before = self.favorites.len();
        self.favorites
            .retain(|f| !(f.id == id && f.media_kind == media_kind));
        self.favorites.len() != before
    }

    /// Records progress for an item, replacing any earlier entry for it
    pub fn record_watch(&mut self, item: WatchHistoryItem) {
        self.watch_history
            .retain(|h| !(h.id == item.id && h.media_kind == item.media_kind));
        self.watch_history.insert(0, item);
    }
}
