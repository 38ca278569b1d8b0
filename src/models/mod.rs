use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

pub mod profile;
pub mod recommendation;

pub use profile::{FavoriteItem, UserProfile, WatchHistoryItem};
pub use recommendation::{
    GenrePreference, Recommendation, RecommendationSet, RecommendationSnapshot,
    RecommendationSource,
};

/// TMDB genre id for "Animation", shared by the movie and TV taxonomies
pub const ANIMATION_GENRE_ID: u32 = 16;

/// Kind of catalog entry
///
/// Anime has no catalog of its own: it lives in the TV catalog and is told
/// apart by its genre tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
    Anime,
}

impl MediaKind {
    /// Catalog that actually serves this kind
    pub fn catalog(self) -> MediaKind {
        match self {
            MediaKind::Movie => MediaKind::Movie,
            MediaKind::Tv | MediaKind::Anime => MediaKind::Tv,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
            MediaKind::Anime => "anime",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "movie" => Ok(MediaKind::Movie),
            "tv" => Ok(MediaKind::Tv),
            "anime" => Ok(MediaKind::Anime),
            other => Err(format!("unknown media kind '{}'", other)),
        }
    }
}

/// A catalog genre tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

impl Genre {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Whether this tag marks an item as anime when it sits in the TV catalog
    pub fn is_animation(&self) -> bool {
        let name = self.name.to_lowercase();
        self.id == ANIMATION_GENRE_ID || name.contains("animation") || name.contains("anime")
    }
}

/// Metadata needed to weigh a single watched or favorited item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub genres: Vec<Genre>,
    /// Average rating on a 0-10 scale
    pub rating: f64,
}

/// A movie or TV entry returned by discover and trending queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: u64,
    pub media_kind: MediaKind,
    pub title: String,
    pub poster_path: Option<String>,
    pub rating: f64,
    #[serde(default)]
    pub genres: Vec<Genre>,
}

impl CatalogItem {
    pub fn is_anime(&self) -> bool {
        self.media_kind == MediaKind::Anime || self.genres.iter().any(Genre::is_animation)
    }
}
