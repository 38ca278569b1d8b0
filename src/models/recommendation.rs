use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MediaKind;

/// Weight the user has shown for one genre, recomputed on every generation
#[derive(Debug, Clone, PartialEq)]
pub struct GenrePreference {
    pub genre_id: u32,
    pub name: String,
    pub accumulated_weight: f64,
    pub normalized_weight: f64,
}

/// A single recommended title with the reason it was picked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: u64,
    pub media_kind: MediaKind,
    pub title: String,
    pub poster_path: Option<String>,
    pub score: f64,
    pub reason: String,
}

/// Stored recommendation list for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSnapshot {
    pub recommendations: Vec<Recommendation>,
    pub created_at: DateTime<Utc>,
}

impl RecommendationSnapshot {
    pub fn new(recommendations: Vec<Recommendation>, created_at: DateTime<Utc>) -> Self {
        Self {
            recommendations,
            created_at,
        }
    }

    /// A snapshot is fresh while strictly younger than `ttl`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.created_at < ttl
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    /// Served from a stored snapshot
    Snapshot,
    /// Computed during this request
    Generated,
}

/// What the engine hands back to the API layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub recommendations: Vec<Recommendation>,
    pub created_at: DateTime<Utc>,
    pub source: RecommendationSource,
    /// False when the list was generated but could not be stored
    pub persisted: bool,
}

impl RecommendationSet {
    pub fn from_snapshot(snapshot: RecommendationSnapshot) -> Self {
        Self {
            recommendations: snapshot.recommendations,
            created_at: snapshot.created_at,
            source: RecommendationSource::Snapshot,
            persisted: true,
        }
    }
}
