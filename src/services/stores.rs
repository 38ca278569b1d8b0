/// Storage seams used by the recommendation engine and the API layer
use crate::{
    error::AppResult,
    models::{FavoriteItem, MediaKind, RecommendationSnapshot, UserProfile, WatchHistoryItem},
};

/// Per-user watch history and favorites
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Returns `None` when the user has never stored anything
    async fn get_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>>;

    /// Adds a favorite, creating the profile if needed. Adding twice is a no-op.
    async fn add_favorite(&self, user_id: &str, favorite: FavoriteItem) -> AppResult<()>;

    /// Returns whether a favorite was removed
    async fn remove_favorite(&self, user_id: &str, id: u64, kind: MediaKind) -> AppResult<bool>;

    /// Upserts the history entry for `(item.id, item.media_kind)`
    async fn record_watch(&self, user_id: &str, item: WatchHistoryItem) -> AppResult<()>;
}

/// One recommendation snapshot per user, replaced wholesale on write
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn read_snapshot(&self, user_id: &str) -> AppResult<Option<RecommendationSnapshot>>;

    async fn write_snapshot(&self, user_id: &str, snapshot: &RecommendationSnapshot)
        -> AppResult<()>;
}
