use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{Recommendation, RecommendationSet, RecommendationSnapshot, RecommendationSource},
    services::{
        genre_analysis::analyze_genre_preferences,
        providers::CatalogProvider,
        scoring::{generate_recommendations, trending_fallback},
        stores::{ProfileStore, SnapshotStore},
    },
};

/// Default age under which a stored snapshot is served as-is
pub const DEFAULT_FRESHNESS_HOURS: i64 = 24;

/// Generates personalized recommendations and keeps one snapshot per user
///
/// Every collaborator is injected, so one engine is built at startup and
/// shared across requests.
#[derive(Clone)]
pub struct RecommendationEngine {
    profiles: Arc<dyn ProfileStore>,
    catalog: Arc<dyn CatalogProvider>,
    snapshots: Arc<dyn SnapshotStore>,
    freshness: Duration,
}

impl RecommendationEngine {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        catalog: Arc<dyn CatalogProvider>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            profiles,
            catalog,
            snapshots,
            freshness: Duration::hours(DEFAULT_FRESHNESS_HOURS),
        }
    }

    /// Overrides the snapshot freshness window
    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    /// Returns the stored snapshot while it is fresh, otherwise regenerates
    #[instrument(skip(self))]
    pub async fn get_recommendations(&self, user_id: &str) -> AppResult<RecommendationSet> {
        let cached = match self.snapshots.read_snapshot(user_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "Snapshot read failed, regenerating");
                None
            }
        };

        if let Some(mut snapshot) = cached {
            if snapshot.is_fresh(Utc::now(), self.freshness) {
                // Items favorited or watched since the snapshot was taken are never served
                if let Some(profile) = self.profiles.get_profile(user_id).await? {
                    let excluded = profile.excluded_ids();
                    let before = snapshot.recommendations.len();
                    snapshot
                        .recommendations
                        .retain(|r| !excluded.contains(&r.id));
                    let dropped = before - snapshot.recommendations.len();
                    if dropped > 0 {
                        tracing::debug!(dropped, "Filtered newly excluded items from snapshot");
                    }
                }

                tracing::debug!(created_at = %snapshot.created_at, "Serving stored recommendations");
                return Ok(RecommendationSet::from_snapshot(snapshot));
            }
            tracing::debug!(created_at = %snapshot.created_at, "Stored recommendations are stale");
        }

        self.regenerate(user_id).await
    }

    /// Regenerates and overwrites the snapshot regardless of its age
    #[instrument(skip(self))]
    pub async fn refresh_recommendations(&self, user_id: &str) -> AppResult<RecommendationSet> {
        self.regenerate(user_id).await
    }

    async fn regenerate(&self, user_id: &str) -> AppResult<RecommendationSet> {
        let recommendations = self.generate(user_id).await?;
        let snapshot = RecommendationSnapshot::new(recommendations, Utc::now());

        // A failed write must not hide a successful computation
        let persisted = match self.snapshots.write_snapshot(user_id, &snapshot).await {
            Ok(()) => true,
            Err(e) => {
                let e = AppError::CacheWrite(e.to_string());
                tracing::error!(error = %e, "Recommendations generated but not stored");
                false
            }
        };

        tracing::info!(
            count = snapshot.recommendations.len(),
            persisted,
            "Recommendations generated"
        );

        Ok(RecommendationSet {
            recommendations: snapshot.recommendations,
            created_at: snapshot.created_at,
            source: RecommendationSource::Generated,
            persisted,
        })
    }

    /// Full pipeline: profile, genre analysis, discovery and scoring
    async fn generate(&self, user_id: &str) -> AppResult<Vec<Recommendation>> {
        let profile = match self.profiles.get_profile(user_id).await? {
            Some(profile) => profile,
            None => return Err(AppError::ProfileNotFound(user_id.to_string())),
        };

        if profile.is_empty() {
            tracing::debug!("No history or favorites, using trending");
            return trending_fallback(self.catalog.as_ref()).await;
        }

        let preferences = analyze_genre_preferences(
            self.catalog.as_ref(),
            &profile.watch_history,
            &profile.favorites,
            Utc::now(),
        )
        .await?;

        generate_recommendations(
            Arc::clone(&self.catalog),
            &preferences,
            &profile.excluded_ids(),
        )
        .await
    }
}
