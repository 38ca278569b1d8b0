use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::{
    error::AppResult,
    models::{FavoriteItem, MediaKind, RecommendationSnapshot, UserProfile, WatchHistoryItem},
    services::stores::{ProfileStore, SnapshotStore},
};

/// Profile store held in process memory
///
/// Used by tests and for running the API without Postgres.
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored profile for `profile.user_id`
    pub async fn insert_profile(&self, profile: UserProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
    }
}

#[async_trait::async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn add_favorite(&self, user_id: &str, favorite: FavoriteItem) -> AppResult<()> {
        let mut profiles = self.profiles.write().await;
        profiles
            .entry(user_id.to_string())
            .or_insert_with(|| UserProfile::new(user_id))
            .add_favorite(favorite);
        Ok(())
    }

    async fn remove_favorite(&self, user_id: &str, id: u64, kind: MediaKind) -> AppResult<bool> {
        let mut profiles = self.profiles.write().await;
        Ok(profiles
            .get_mut(user_id)
            .map(|p| p.remove_favorite(id, kind))
            .unwrap_or(false))
    }

    async fn record_watch(&self, user_id: &str, item: WatchHistoryItem) -> AppResult<()> {
        let mut profiles = self.profiles.write().await;
        profiles
            .entry(user_id.to_string())
            .or_insert_with(|| UserProfile::new(user_id))
            .record_watch(item);
        Ok(())
    }
}

/// Snapshot store held in process memory
#[derive(Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<HashMap<String, RecommendationSnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn read_snapshot(&self, user_id: &str) -> AppResult<Option<RecommendationSnapshot>> {
        Ok(self.snapshots.read().await.get(user_id).cloned())
    }

    async fn write_snapshot(
        &self,
        user_id: &str,
        snapshot: &RecommendationSnapshot,
    ) -> AppResult<()> {
        self.snapshots
            .write()
            .await
            .insert(user_id.to_string(), snapshot.clone());
        Ok(())
    }
}
