use super::{Cache, CacheKey};
use crate::{
    error::AppResult,
    models::RecommendationSnapshot,
    services::stores::SnapshotStore,
};

/// How long Redis keeps a snapshot nobody asks for
///
/// Freshness is decided from `created_at`; this only bounds storage.
const SNAPSHOT_RETENTION: u64 = 604800; // 1 week

/// Recommendation snapshots stored as JSON under `recs:{user_id}`
#[derive(Clone)]
pub struct RedisSnapshotStore {
    cache: Cache,
}

impl RedisSnapshotStore {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }
}

#[async_trait::async_trait]
impl SnapshotStore for RedisSnapshotStore {
    async fn read_snapshot(&self, user_id: &str) -> AppResult<Option<RecommendationSnapshot>> {
        self.cache
            .get_from_cache(&CacheKey::Snapshot(user_id.to_string()))
            .await
    }

    async fn write_snapshot(
        &self,
        user_id: &str,
        snapshot: &RecommendationSnapshot,
    ) -> AppResult<()> {
        // Awaited rather than backgrounded: the engine reports failed writes
        self.cache
            .set(
                &CacheKey::Snapshot(user_id.to_string()),
                snapshot,
                SNAPSHOT_RETENTION,
            )
            .await
    }
}
