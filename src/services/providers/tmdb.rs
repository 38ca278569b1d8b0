/// TMDB (The Movie Database) catalog provider
///
/// Serves genre lists, item details, discover and trending queries from the
/// TMDB v3 REST API. Anime has no endpoint of its own and is read from the TV
/// endpoints, then told apart by the Animation genre tag.
///
/// API Flow:
/// 1. Genres: /genre/{movie|tv}/list
/// 2. Details: /{movie|tv}/{id}
/// 3. Discover: /discover/{movie|tv}?with_genres=..&sort_by=..
/// 4. Trending: /trending/all/day
///
/// Discover and trending results only carry genre ids, which are resolved
/// through the (cached) genre lists.
use std::collections::HashMap;

use reqwest::{Client as HttpClient, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{CatalogItem, Genre, ItemDetails, MediaKind},
    services::providers::{CatalogProvider, DiscoverSort},
};

const GENRE_CACHE_TTL: u64 = 604800; // 1 week
const DETAILS_CACHE_TTL: u64 = 86400; // 1 day
const LIST_CACHE_TTL: u64 = 3600; // 1 hour

#[derive(Debug, Deserialize)]
struct TmdbGenreList {
    genres: Vec<TmdbGenre>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    id: u32,
    name: String,
}

impl From<TmdbGenre> for Genre {
    fn from(genre: TmdbGenre) -> Self {
        Genre::new(genre.id, genre.name)
    }
}

/// Subset of `/movie/{id}` and `/tv/{id}` we care about
#[derive(Debug, Deserialize)]
struct TmdbDetails {
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    #[serde(default)]
    vote_average: f64,
}

#[derive(Debug, Deserialize)]
struct TmdbPage<T> {
    results: Vec<T>,
}

/// Entry of a discover or trending page; movies use `title`, TV uses `name`
#[derive(Debug, Deserialize)]
struct TmdbListItem {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    genre_ids: Vec<u32>,
    #[serde(default)]
    media_type: Option<String>,
}

/// Genre id to display name, per catalog
type GenreNames = HashMap<u32, String>;

fn genre_names(genres: Vec<Genre>) -> GenreNames {
    genres.into_iter().map(|g| (g.id, g.name)).collect()
}

/// Converts a list entry from `catalog` into our item type
fn to_catalog_item(item: TmdbListItem, catalog: MediaKind, names: &GenreNames) -> CatalogItem {
    let genres: Vec<Genre> = item
        .genre_ids
        .iter()
        .map(|id| {
            let name = names.get(id).cloned().unwrap_or_else(|| "Unknown".to_string());
            Genre::new(*id, name)
        })
        .collect();

    let media_kind = match catalog {
        MediaKind::Movie => MediaKind::Movie,
        _ if genres.iter().any(Genre::is_animation) => MediaKind::Anime,
        _ => MediaKind::Tv,
    };

    CatalogItem {
        id: item.id,
        media_kind,
        title: item.title.or(item.name).unwrap_or_default(),
        poster_path: item.poster_path,
        rating: item.vote_average,
        genres,
    }
}

/// Maps a trending entry's `media_type` to the catalog it belongs to
fn trending_catalog(media_type: Option<&str>) -> Option<MediaKind> {
    match media_type {
        Some("movie") => Some(MediaKind::Movie),
        Some("tv") => Some(MediaKind::Tv),
        _ => None,
    }
}

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl TmdbProvider {
    pub fn new(cache: Cache, api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    /// GETs `path` and decodes the JSON body
    ///
    /// A 404 becomes `AppError::NotFound`, any other failure status `ExternalApi`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("TMDB resource {}", path)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, path = %path, "Failed to deserialize TMDB response");
            AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
        })
    }

    async fn names_for(&self, catalog: MediaKind) -> AppResult<GenreNames> {
        Ok(genre_names(self.genre_list(catalog).await?))
    }
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbProvider {
    async fn genre_list(&self, kind: MediaKind) -> AppResult<Vec<Genre>> {
        let catalog = kind.catalog();

        cached!(
            self.cache,
            CacheKey::GenreList(catalog),
            GENRE_CACHE_TTL,
            async move {
                let list: TmdbGenreList = self
                    .get_json(&format!("/genre/{}/list", catalog), &[])
                    .await?;
                Ok::<_, AppError>(list.genres.into_iter().map(Genre::from).collect::<Vec<_>>())
            }
        )
    }

    async fn item_details(&self, id: u64, kind: MediaKind) -> AppResult<ItemDetails> {
        let catalog = kind.catalog();

        cached!(
            self.cache,
            CacheKey::ItemDetails(catalog, id),
            DETAILS_CACHE_TTL,
            async move {
                let details: TmdbDetails =
                    self.get_json(&format!("/{}/{}", catalog, id), &[]).await?;
                Ok::<_, AppError>(ItemDetails {
                    genres: details.genres.into_iter().map(Genre::from).collect(),
                    rating: details.vote_average,
                })
            }
        )
    }

    async fn discover_by_genre(
        &self,
        genre_id: u32,
        kind: MediaKind,
        sort_by: DiscoverSort,
    ) -> AppResult<Vec<CatalogItem>> {
        let catalog = kind.catalog();

        cached!(
            self.cache,
            CacheKey::Discover {
                kind: catalog,
                genre_id,
                sort_by: sort_by.as_param(),
            },
            LIST_CACHE_TTL,
            async move {
                let page: TmdbPage<TmdbListItem> = self
                    .get_json(
                        &format!("/discover/{}", catalog),
                        &[
                            ("with_genres", genre_id.to_string()),
                            ("sort_by", sort_by.as_param().to_string()),
                            ("page", "1".to_string()),
                        ],
                    )
                    .await?;
                let names = self.names_for(catalog).await?;

                let items: Vec<CatalogItem> = page
                    .results
                    .into_iter()
                    .map(|item| to_catalog_item(item, catalog, &names))
                    .collect();

                tracing::info!(
                    genre_id,
                    catalog = %catalog,
                    results = items.len(),
                    provider = "tmdb",
                    "Discover query completed"
                );

                Ok::<_, AppError>(items)
            }
        )
    }

    async fn trending_now(&self) -> AppResult<Vec<CatalogItem>> {
        cached!(self.cache, CacheKey::Trending, LIST_CACHE_TTL, async move {
            let page: TmdbPage<TmdbListItem> = self.get_json("/trending/all/day", &[]).await?;
            let movie_names = self.names_for(MediaKind::Movie).await?;
            let tv_names = self.names_for(MediaKind::Tv).await?;

            let items: Vec<CatalogItem> = page
                .results
                .into_iter()
                .filter_map(|item| {
                    let catalog = trending_catalog(item.media_type.as_deref())?;
                    let names = match catalog {
                        MediaKind::Movie => &movie_names,
                        _ => &tv_names,
                    };
                    Some(to_catalog_item(item, catalog, names))
                })
                .collect();

            Ok::<_, AppError>(items)
        })
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
