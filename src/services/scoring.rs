/// Candidate generation and scoring from ranked genre preferences
use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogItem, GenrePreference, MediaKind, Recommendation},
    services::providers::{CatalogProvider, DiscoverSort},
};

/// Number of top genres that get discover queries
pub const TOP_GENRES: usize = 3;
/// Longest list ever returned
pub const MAX_RECOMMENDATIONS: usize = 20;
/// Size of the trending fallback list
pub const TRENDING_LIMIT: usize = 10;

pub const TRENDING_REASON: &str = "Trending now";

/// Catalogs queried per genre, in result order
const DISCOVER_CATALOGS: [MediaKind; 2] = [MediaKind::Movie, MediaKind::Tv];

/// Recommendations for users with nothing to learn from
pub async fn trending_fallback(catalog: &dyn CatalogProvider) -> AppResult<Vec<Recommendation>> {
    let trending = catalog
        .trending_now()
        .await
        .map_err(|e| AppError::Discovery(format!("trending lookup failed: {}", e)))?;

    Ok(trending
        .into_iter()
        .take(TRENDING_LIMIT)
        .map(|item| Recommendation {
            id: item.id,
            media_kind: item.media_kind,
            title: item.title,
            poster_path: item.poster_path,
            score: 1.0,
            reason: TRENDING_REASON.to_string(),
        })
        .collect())
}

/// In-flight discover queries, aborted when dropped
///
/// Covers both an early return on the first failure and the caller dropping
/// the whole future mid-flight. Aborting an already finished task is a no-op.
struct DiscoverTasks(Vec<JoinHandle<AppResult<Vec<CatalogItem>>>>);

impl Drop for DiscoverTasks {
    fn drop(&mut self) {
        for task in &self.0 {
            task.abort();
        }
    }
}

/// Builds the human-readable justification for a pick
fn reason_for(genre_name: &str, media_kind: MediaKind) -> String {
    let noun = match media_kind {
        MediaKind::Movie => "movies",
        MediaKind::Anime => "anime",
        MediaKind::Tv => "shows",
    };
    format!("Because you like {} {}", genre_name, noun)
}

fn score_item(preference: &GenrePreference, catalog: MediaKind, item: CatalogItem) -> Recommendation {
    let media_kind = match catalog {
        MediaKind::Movie => MediaKind::Movie,
        MediaKind::Tv | MediaKind::Anime if item.is_anime() => MediaKind::Anime,
        MediaKind::Tv | MediaKind::Anime => MediaKind::Tv,
    };

    Recommendation {
        id: item.id,
        media_kind,
        score: preference.normalized_weight * (item.rating / 10.0),
        reason: reason_for(&preference.name, media_kind),
        title: item.title,
        poster_path: item.poster_path,
    }
}

/// Turns ranked genre preferences into a scored, de-duplicated list
///
/// ## Algorithm
/// 1. No preferences: fall back to the top trending items
/// 2. Discover the top [`TOP_GENRES`] genres in the movie and TV catalogs
/// 3. Skip anything in `excluded_ids` or already picked in this pass
/// 4. Score `normalized_weight * rating / 10`, sort descending, keep [`MAX_RECOMMENDATIONS`]
///
/// The discover queries run as parallel tasks but are consumed in genre
/// order, movies before TV, so ties resolve the same way on every call.
/// A single failed query fails the whole call and cancels the rest, as does
/// dropping the returned future.
pub async fn generate_recommendations(
    catalog: Arc<dyn CatalogProvider>,
    preferences: &[GenrePreference],
    excluded_ids: &HashSet<u64>,
) -> AppResult<Vec<Recommendation>> {
    if preferences.is_empty() {
        return trending_fallback(catalog.as_ref()).await;
    }

    let mut tasks = DiscoverTasks(Vec::with_capacity(TOP_GENRES * DISCOVER_CATALOGS.len()));
    let mut queries = Vec::with_capacity(tasks.0.capacity());
    for preference in preferences.iter().take(TOP_GENRES) {
        for kind in DISCOVER_CATALOGS {
            let catalog = Arc::clone(&catalog);
            let genre_id = preference.genre_id;
            tasks.0.push(tokio::spawn(async move {
                catalog
                    .discover_by_genre(genre_id, kind, DiscoverSort::Popularity)
                    .await
            }));
            queries.push((preference, kind));
        }
    }

    let mut discovered = Vec::with_capacity(queries.len());
    for ((preference, kind), task) in queries.into_iter().zip(tasks.0.iter_mut()) {
        let outcome = match task.await {
            Ok(Ok(items)) => Ok(items),
            Ok(Err(e)) => Err(AppError::Discovery(format!(
                "{} discover for genre {} failed: {}",
                kind, preference.genre_id, e
            ))),
            Err(e) => Err(AppError::Internal(e.to_string())),
        };

        match outcome {
            Ok(items) => discovered.push((preference, kind, items)),
            Err(e) => {
                tracing::error!(error = %e, provider = catalog.name(), "Recommendation discovery aborted");
                return Err(e);
            }
        }
    }
    drop(tasks);

    let mut seen = HashSet::new();
    let mut recommendations = Vec::new();
    for (preference, kind, items) in discovered {
        for item in items {
            if excluded_ids.contains(&item.id) || !seen.insert(item.id) {
                continue;
            }
            recommendations.push(score_item(preference, kind, item));
        }
    }

    let candidates = recommendations.len();
    // Stable: equal scores keep discovery order
    recommendations.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    recommendations.truncate(MAX_RECOMMENDATIONS);

    tracing::info!(
        genres = preferences.len().min(TOP_GENRES),
        candidates,
        returned = recommendations.len(),
        "Recommendations scored"
    );

    Ok(recommendations)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::models::{Genre, ItemDetails};
    use crate::services::providers::MockCatalogProvider;

    fn preference(genre_id: u32, name: &str, weight: f64) -> GenrePreference {
        GenrePreference {
            genre_id,
            name: name.to_string(),
            accumulated_weight: weight,
            normalized_weight: weight,
        }
    }

    fn item(id: u64, kind: MediaKind, rating: f64) -> CatalogItem {
        CatalogItem {
            id,
            media_kind: kind,
            title: format!("Title {}", id),
            poster_path: Some(format!("/p{}.jpg", id)),
            rating,
            genres: vec![],
        }
    }

    fn mock_catalog() -> MockCatalogProvider {
        let mut mock = MockCatalogProvider::new();
        mock.expect_name().return_const("mock");
        mock
    }

    #[tokio::test]
    async fn test_action_favorite_scenario() {
        let mut mock = mock_catalog();
        mock.expect_discover_by_genre()
            .withf(|genre, kind, sort| {
                *genre == 28 && *kind == MediaKind::Movie && *sort == DiscoverSort::Popularity
            })
            .times(1)
            .returning(|_, _, _| {
                let mut die_hard = item(555, MediaKind::Movie, 8.0);
                die_hard.title = "Die Hard".to_string();
                Ok(vec![die_hard, item(101, MediaKind::Movie, 9.0)])
            });
        mock.expect_discover_by_genre()
            .withf(|_, kind, _| *kind == MediaKind::Tv)
            .times(1)
            .returning(|_, _, _| Ok(vec![]));

        let excluded: HashSet<u64> = [101].into_iter().collect();
        let recs = generate_recommendations(
            Arc::new(mock),
            &[preference(28, "Action", 3.0)],
            &excluded,
        )
        .await
        .unwrap();

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].id, 555);
        assert_eq!(recs[0].title, "Die Hard");
        assert_eq!(recs[0].reason, "Because you like Action movies");
        assert!((recs[0].score - 2.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_tv_items_split_into_anime_and_shows() {
        let mut mock = mock_catalog();
        mock.expect_discover_by_genre()
            .withf(|_, kind, _| *kind == MediaKind::Movie)
            .returning(|_, _, _| Ok(vec![]));
        mock.expect_discover_by_genre()
            .withf(|_, kind, _| *kind == MediaKind::Tv)
            .returning(|_, _, _| {
                let mut anime = item(1, MediaKind::Tv, 9.0);
                anime.genres = vec![Genre::new(16, "Animation")];
                Ok(vec![anime, item(2, MediaKind::Tv, 8.0)])
            });

        let recs = generate_recommendations(
            Arc::new(mock),
            &[preference(10759, "Action & Adventure", 1.0)],
            &HashSet::new(),
        )
        .await
        .unwrap();

        assert_eq!(recs[0].media_kind, MediaKind::Anime);
        assert_eq!(recs[0].reason, "Because you like Action & Adventure anime");
        assert_eq!(recs[1].media_kind, MediaKind::Tv);
        assert_eq!(recs[1].reason, "Because you like Action & Adventure shows");
    }

    #[tokio::test]
    async fn test_only_top_three_genres_are_queried() {
        let mut mock = mock_catalog();
        mock.expect_discover_by_genre()
            .withf(|genre, _, _| *genre != 99)
            .times(6)
            .returning(|_, _, _| Ok(vec![]));

        let prefs = vec![
            preference(1, "A", 4.0),
            preference(2, "B", 3.0),
            preference(3, "C", 2.0),
            preference(99, "D", 1.0),
        ];
        let recs = generate_recommendations(Arc::new(mock), &prefs, &HashSet::new())
            .await
            .unwrap();
        assert!(recs.is_empty());
    }

    #[tokio::test]
    async fn test_results_capped_and_sorted() {
        let mut mock = mock_catalog();
        mock.expect_discover_by_genre().returning(|genre, kind, _| {
            let base = genre as u64 * 1000 + if kind == MediaKind::Movie { 0 } else { 500 };
            Ok((0..10)
                .map(|i| item(base + i, kind, (i % 10) as f64 + 0.5))
                .collect())
        });

        let prefs = vec![
            preference(1, "A", 3.0),
            preference(2, "B", 2.0),
            preference(3, "C", 1.0),
        ];
        let recs = generate_recommendations(Arc::new(mock), &prefs, &HashSet::new())
            .await
            .unwrap();

        assert_eq!(recs.len(), MAX_RECOMMENDATIONS);
        assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_duplicate_across_genres_keeps_first_genre() {
        let mut mock = mock_catalog();
        mock.expect_discover_by_genre().returning(|genre, kind, _| {
            if kind == MediaKind::Movie {
                // Same movie is tagged with both genres
                Ok(vec![item(7, MediaKind::Movie, 8.0), item(genre as u64 * 100, kind, 5.0)])
            } else {
                Ok(vec![])
            }
        });

        let prefs = vec![preference(1, "Thriller", 1.0), preference(2, "Crime", 2.0)];
        let recs = generate_recommendations(Arc::new(mock), &prefs, &HashSet::new())
            .await
            .unwrap();

        let dup: Vec<_> = recs.iter().filter(|r| r.id == 7).collect();
        assert_eq!(dup.len(), 1);
        assert_eq!(dup[0].reason, "Because you like Thriller movies");
        assert_eq!(recs.len(), 3);
    }

    #[tokio::test]
    async fn test_equal_scores_keep_discovery_order() {
        let mut mock = mock_catalog();
        mock.expect_discover_by_genre().returning(|_, kind, _| {
            if kind == MediaKind::Movie {
                Ok(vec![item(1, kind, 8.0)])
            } else {
                Ok(vec![item(2, kind, 8.0)])
            }
        });

        let recs = generate_recommendations(
            Arc::new(mock),
            &[preference(1, "Drama", 1.0)],
            &HashSet::new(),
        )
        .await
        .unwrap();

        assert_eq!(recs.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_single_discover_failure_aborts() {
        let mut mock = mock_catalog();
        mock.expect_discover_by_genre().returning(|genre, kind, _| {
            if genre == 2 && kind == MediaKind::Tv {
                Err(AppError::ExternalApi("503".to_string()))
            } else {
                Ok(vec![item(genre as u64, kind, 7.0)])
            }
        });

        let prefs = vec![preference(1, "A", 2.0), preference(2, "B", 1.0)];
        let result = generate_recommendations(Arc::new(mock), &prefs, &HashSet::new()).await;

        assert!(matches!(result, Err(AppError::Discovery(_))));
    }

    #[tokio::test]
    async fn test_empty_preferences_use_trending() {
        let mut mock = mock_catalog();
        mock.expect_discover_by_genre().never();
        mock.expect_trending_now().times(1).returning(|| {
            Ok((0..15)
                .map(|i| item(i, if i % 2 == 0 { MediaKind::Movie } else { MediaKind::Tv }, 6.0))
                .collect())
        });

        let recs = generate_recommendations(Arc::new(mock), &[], &HashSet::new())
            .await
            .unwrap();

        assert_eq!(recs.len(), TRENDING_LIMIT);
        assert!(recs.iter().all(|r| r.score == 1.0 && r.reason == TRENDING_REASON));
        assert_eq!(recs[0].id, 0);
        assert_eq!(recs[9].id, 9);
    }

    #[tokio::test]
    async fn test_trending_failure_is_discovery_error() {
        let mut mock = mock_catalog();
        mock.expect_trending_now()
            .returning(|| Err(AppError::ExternalApi("down".to_string())));

        let result = trending_fallback(&mock).await;
        assert!(matches!(result, Err(AppError::Discovery(_))));
    }

    #[derive(Default)]
    struct HangingCatalog {
        started: Arc<AtomicUsize>,
        dropped: Arc<AtomicUsize>,
    }

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl CatalogProvider for HangingCatalog {
        async fn genre_list(&self, _kind: MediaKind) -> AppResult<Vec<Genre>> {
            Ok(vec![])
        }

        async fn item_details(&self, id: u64, _kind: MediaKind) -> AppResult<ItemDetails> {
            Err(AppError::NotFound(format!("item {}", id)))
        }

        async fn discover_by_genre(
            &self,
            _genre_id: u32,
            _kind: MediaKind,
            _sort_by: DiscoverSort,
        ) -> AppResult<Vec<CatalogItem>> {
            let _guard = DropCounter(self.dropped.clone());
            self.started.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<()>().await;
            Ok(vec![])
        }

        async fn trending_now(&self) -> AppResult<Vec<CatalogItem>> {
            Ok(vec![])
        }

        fn name(&self) -> &'static str {
            "hanging"
        }
    }

    #[tokio::test]
    async fn test_dropping_the_call_cancels_discover_tasks() {
        let catalog = Arc::new(HangingCatalog::default());
        let prefs = vec![
            preference(1, "A", 3.0),
            preference(2, "B", 2.0),
            preference(3, "C", 1.0),
        ];

        let seen = HashSet::new();
        let call = generate_recommendations(catalog.clone(), &prefs, &seen);
        let result = tokio::time::timeout(std::time::Duration::from_millis(50), call).await;
        assert!(result.is_err());
        assert_eq!(catalog.started.load(Ordering::SeqCst), 6);

        // Aborted tasks are torn down the next time the runtime polls them
        for _ in 0..50 {
            if catalog.dropped.load(Ordering::SeqCst) == 6 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        assert_eq!(catalog.dropped.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_reason_for() {
        assert_eq!(reason_for("Drama", MediaKind::Movie), "Because you like Drama movies");
        assert_eq!(reason_for("Drama", MediaKind::Tv), "Because you like Drama shows");
        assert_eq!(reason_for("Comedy", MediaKind::Anime), "Because you like Comedy anime");
    }
}
