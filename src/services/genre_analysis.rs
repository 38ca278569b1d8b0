/// Turns a user's watch history and favorites into a ranked genre preference list
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{FavoriteItem, Genre, GenrePreference, ItemDetails, MediaKind, WatchHistoryItem},
    services::providers::CatalogProvider,
};

/// Flat weight a favorite adds to each of its genres
pub const FAVORITE_WEIGHT: f64 = 3.0;

/// Weight multiplier for history entries watched past the completion threshold
const COMPLETED_MULTIPLIER: f64 = 2.0;

/// Recency decay `1 / ln(days_ago + 1)`, with `days_ago` clamped to at least 1
pub fn recency_weight(last_watched: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days_ago = (now - last_watched).num_days().max(1);
    1.0 / ((days_ago as f64) + 1.0).ln()
}

/// Weight a single history entry adds to each of its genres
pub fn history_weight(item: &WatchHistoryItem, now: DateTime<Utc>) -> f64 {
    let progress_weight = if item.is_completed() {
        COMPLETED_MULTIPLIER
    } else {
        1.0
    };
    progress_weight * recency_weight(item.last_watched, now)
}

/// Genre buckets kept in first-seen order
#[derive(Default)]
struct GenreBuckets {
    buckets: Vec<GenrePreference>,
    index: HashMap<u32, usize>,
}

impl GenreBuckets {
    fn add(&mut self, genre: &Genre, weight: f64) {
        match self.index.get(&genre.id) {
            Some(&i) => self.buckets[i].accumulated_weight += weight,
            None => {
                self.index.insert(genre.id, self.buckets.len());
                self.buckets.push(GenrePreference {
                    genre_id: genre.id,
                    name: genre.name.clone(),
                    accumulated_weight: weight,
                    normalized_weight: 0.0,
                });
            }
        }
    }

    fn into_ranked(mut self, total_inputs: usize) -> Vec<GenrePreference> {
        let divisor = total_inputs.max(1) as f64;
        for bucket in &mut self.buckets {
            bucket.normalized_weight = bucket.accumulated_weight / divisor;
        }
        // Vec::sort_by is stable: equal weights keep first-seen order
        self.buckets.sort_by(|a, b| {
            b.normalized_weight
                .partial_cmp(&a.normalized_weight)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.buckets
    }
}

/// Tracks per-item lookup failures so a total outage can be told apart from
/// a few titles that dropped out of the catalog
#[derive(Default)]
struct LookupStats {
    attempted: usize,
    failed: usize,
    last_transient: Option<AppError>,
}

impl LookupStats {
    async fn details(
        &mut self,
        catalog: &dyn CatalogProvider,
        id: u64,
        kind: MediaKind,
    ) -> Option<ItemDetails> {
        self.attempted += 1;
        match catalog.item_details(id, kind).await {
            Ok(details) => Some(details),
            Err(e) => {
                self.failed += 1;
                tracing::warn!(
                    item_id = id,
                    media_kind = %kind,
                    provider = catalog.name(),
                    error = %e,
                    "Skipping item with unavailable metadata"
                );
                if !e.is_not_found() {
                    self.last_transient = Some(e);
                }
                None
            }
        }
    }

    fn total_failure(self) -> Option<AppError> {
        if self.attempted > 0 && self.failed == self.attempted {
            self.last_transient
        } else {
            None
        }
    }
}

/// Ranks genres by how strongly the user's history and favorites point at them
///
/// ## Algorithm
/// 1. Every history entry adds `progress_weight / ln(days_ago + 1)` to each of its genres
/// 2. Every favorite adds a flat [`FAVORITE_WEIGHT`] to each of its genres
/// 3. Weights are divided by the number of inputs and sorted descending
///
/// Items whose metadata cannot be fetched are skipped. Only when every lookup
/// fails, and not all of them because the item is gone, is the error returned.
pub async fn analyze_genre_preferences(
    catalog: &dyn CatalogProvider,
    watch_history: &[WatchHistoryItem],
    favorites: &[FavoriteItem],
    now: DateTime<Utc>,
) -> AppResult<Vec<GenrePreference>> {
    let mut buckets = GenreBuckets::default();
    let mut stats = LookupStats::default();

    for item in watch_history {
        let Some(details) = stats.details(catalog, item.id, item.media_kind).await else {
            continue;
        };
        let weight = history_weight(item, now);
        for genre in &details.genres {
            buckets.add(genre, weight);
        }
    }

    for favorite in favorites {
        let Some(details) = stats.details(catalog, favorite.id, favorite.media_kind).await else {
            continue;
        };
        for genre in &details.genres {
            buckets.add(genre, FAVORITE_WEIGHT);
        }
    }

    if let Some(e) = stats.total_failure() {
        return Err(AppError::MetadataLookup(e.to_string()));
    }

    let ranked = buckets.into_ranked(watch_history.len() + favorites.len());

    tracing::debug!(
        genres = ranked.len(),
        top_genre = ranked.first().map(|g| g.name.as_str()).unwrap_or("-"),
        "Genre preferences analyzed"
    );

    Ok(ranked)
}
