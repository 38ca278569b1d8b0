use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        CatalogItem, FavoriteItem, Genre, MediaKind, RecommendationSet, UserProfile,
        WatchHistoryItem,
    },
    services::session::Session,
};

use super::AppState;

// Request types

#[derive(Debug, Deserialize)]
pub struct RecordWatchRequest {
    pub id: u64,
    pub media_kind: MediaKind,
    /// Percentage watched, 0-100
    pub progress: f64,
    /// Defaults to now
    pub last_watched: Option<DateTime<Utc>>,
}

impl RecordWatchRequest {
    fn into_history_item(self) -> AppResult<WatchHistoryItem> {
        if !self.progress.is_finite() || !(0.0..=100.0).contains(&self.progress) {
            return Err(AppError::InvalidInput(format!(
                "progress must be between 0 and 100, got {}",
                self.progress
            )));
        }
        Ok(WatchHistoryItem {
            id: self.id,
            media_kind: self.media_kind,
            progress: self.progress,
            last_watched: self.last_watched.unwrap_or_else(Utc::now),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub user_id: String,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Recommendations for a user, served from the snapshot while fresh
pub async fn get_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<RecommendationSet>> {
    let set = state.engine.get_recommendations(&user_id).await?;
    Ok(Json(set))
}

/// Regenerates recommendations regardless of snapshot age
pub async fn refresh_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<RecommendationSet>> {
    let set = state.engine.refresh_recommendations(&user_id).await?;
    Ok(Json(set))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<UserProfile>> {
    match state.profiles.get_profile(&user_id).await? {
        Some(profile) => Ok(Json(profile)),
        None => Err(AppError::ProfileNotFound(user_id)),
    }
}

pub async fn add_favorite(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(favorite): Json<FavoriteItem>,
) -> AppResult<StatusCode> {
    state.profiles.add_favorite(&user_id, favorite).await?;
    Ok(StatusCode::CREATED)
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Path((user_id, media_kind, id)): Path<(String, MediaKind, u64)>,
) -> AppResult<StatusCode> {
    if state.profiles.remove_favorite(&user_id, id, media_kind).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "favorite {} {} for user {}",
            media_kind, id, user_id
        )))
    }
}

/// Records watch progress for an item
pub async fn record_watch(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<RecordWatchRequest>,
) -> AppResult<StatusCode> {
    let item = request.into_history_item()?;
    state.profiles.record_watch(&user_id, item).await?;
    Ok(StatusCode::OK)
}

pub async fn trending(State(state): State<AppState>) -> AppResult<Json<Vec<CatalogItem>>> {
    let items = state.catalog.trending_now().await?;
    Ok(Json(items))
}

pub async fn genres(
    State(state): State<AppState>,
    Path(media_kind): Path<MediaKind>,
) -> AppResult<Json<Vec<Genre>>> {
    let genres = state.catalog.genre_list(media_kind).await?;
    Ok(Json(genres))
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> AppResult<(StatusCode, Json<Session>)> {
    let session = state.sessions.sign_in(&request.user_id).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<Session>> {
    Ok(Json(state.sessions.get(session_id).await?))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<Session>> {
    Ok(Json(state.sessions.sign_out(session_id).await?))
}
