/// Catalog metadata provider abstraction
///
/// The recommendation engine only ever talks to the catalog through this trait,
/// so the TMDB client can be swapped for a fake in tests or another metadata
/// source later.
use crate::{
    error::AppResult,
    models::{CatalogItem, Genre, ItemDetails, MediaKind},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Ordering requested from a discover query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverSort {
    Popularity,
}

impl DiscoverSort {
    /// Value of the `sort_by` query parameter
    pub fn as_param(self) -> &'static str {
        match self {
            DiscoverSort::Popularity => "popularity.desc",
        }
    }
}

/// Trait for catalog metadata providers
///
/// `MediaKind::Anime` is accepted everywhere and is served from the TV catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// All genres of one catalog
    async fn genre_list(&self, kind: MediaKind) -> AppResult<Vec<Genre>>;

    /// Genres and rating of a single item
    ///
    /// Fails with `AppError::NotFound` when the catalog no longer has the item.
    async fn item_details(&self, id: u64, kind: MediaKind) -> AppResult<ItemDetails>;

    /// Items tagged with `genre_id`, in the requested order
    async fn discover_by_genre(
        &self,
        genre_id: u32,
        kind: MediaKind,
        sort_by: DiscoverSort,
    ) -> AppResult<Vec<CatalogItem>>;

    /// Items trending right now across movies and TV
    async fn trending_now(&self) -> AppResult<Vec<CatalogItem>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
