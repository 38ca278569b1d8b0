use std::sync::Arc;

use chrono::Duration;

use crate::db::{InMemoryProfileStore, InMemorySnapshotStore};
use crate::services::{
    providers::CatalogProvider,
    recommendations::DEFAULT_FRESHNESS_HOURS,
    session::{SessionTransition, TransitionListener},
    stores::{ProfileStore, SnapshotStore},
    RecommendationEngine, SessionRegistry,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    pub profiles: Arc<dyn ProfileStore>,
    pub catalog: Arc<dyn CatalogProvider>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    /// Wires the engine and session registry over the given collaborators
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        catalog: Arc<dyn CatalogProvider>,
        snapshots: Arc<dyn SnapshotStore>,
        freshness: Duration,
    ) -> Self {
        let engine = Arc::new(
            RecommendationEngine::new(profiles.clone(), catalog.clone(), snapshots)
                .with_freshness(freshness),
        );

        let sessions = Arc::new(SessionRegistry::new());
        sessions.subscribe(warm_recommendations_on_sign_in(engine.clone()));

        Self {
            engine,
            profiles,
            catalog,
            sessions,
        }
    }

    /// State backed by in-memory stores, for tests and local runs without databases
    pub fn in_memory(catalog: Arc<dyn CatalogProvider>) -> Self {
        Self::new(
            Arc::new(InMemoryProfileStore::new()),
            catalog,
            Arc::new(InMemorySnapshotStore::new()),
            Duration::hours(DEFAULT_FRESHNESS_HOURS),
        )
    }
}

/// Precomputes recommendations in the background when a user signs in
fn warm_recommendations_on_sign_in(engine: Arc<RecommendationEngine>) -> TransitionListener {
    Arc::new(move |transition| {
        let SessionTransition::SignedIn { user_id, .. } = transition else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let engine = engine.clone();
        let user_id = user_id.clone();
        runtime.spawn(async move {
            match engine.get_recommendations(&user_id).await {
                Ok(set) => tracing::debug!(
                    user_id = %user_id,
                    count = set.recommendations.len(),
                    "Recommendations warmed on sign-in"
                ),
                Err(e) => tracing::debug!(user_id = %user_id, error = %e, "Recommendation warm-up skipped"),
            }
        });
    })
}
