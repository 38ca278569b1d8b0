use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

use crate::{
    error::{AppError, AppResult},
    models::{FavoriteItem, MediaKind, UserProfile, WatchHistoryItem},
    services::stores::ProfileStore,
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, FromRow)]
struct WatchHistoryRow {
    item_id: i64,
    media_kind: String,
    progress: f64,
    last_watched: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct FavoriteRow {
    item_id: i64,
    media_kind: String,
}

fn parse_kind(raw: &str) -> AppResult<MediaKind> {
    raw.parse()
        .map_err(|e: String| AppError::Internal(format!("Corrupt profile row: {}", e)))
}

fn item_id_from_db(raw: i64) -> AppResult<u64> {
    u64::try_from(raw).map_err(|_| AppError::Internal(format!("Negative item id {} in profile", raw)))
}

fn item_id_to_db(id: u64) -> AppResult<i64> {
    i64::try_from(id).map_err(|_| AppError::InvalidInput(format!("Item id {} out of range", id)))
}

impl TryFrom<WatchHistoryRow> for WatchHistoryItem {
    type Error = AppError;

    fn try_from(row: WatchHistoryRow) -> AppResult<Self> {
        Ok(WatchHistoryItem {
            id: item_id_from_db(row.item_id)?,
            media_kind: parse_kind(&row.media_kind)?,
            progress: row.progress,
            last_watched: row.last_watched,
        })
    }
}

impl TryFrom<FavoriteRow> for FavoriteItem {
    type Error = AppError;

    fn try_from(row: FavoriteRow) -> AppResult<Self> {
        Ok(FavoriteItem {
            id: item_id_from_db(row.item_id)?,
            media_kind: parse_kind(&row.media_kind)?,
        })
    }
}

/// User profiles backed by the `users`, `watch_history` and `favorites` tables
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProfileStore for PgProfileStore {
    async fn get_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE user_id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        if !exists {
            return Ok(None);
        }

        let history_rows: Vec<WatchHistoryRow> = sqlx::query_as(
            r#"
            SELECT item_id, media_kind, progress, last_watched
            FROM watch_history
            WHERE user_id = $1
            ORDER BY last_watched DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let favorite_rows: Vec<FavoriteRow> = sqlx::query_as(
            r#"
            SELECT item_id, media_kind
            FROM favorites
            WHERE user_id = $1
            ORDER BY added_at, item_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let watch_history = history_rows
            .into_iter()
            .map(WatchHistoryItem::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        let favorites = favorite_rows
            .into_iter()
            .map(FavoriteItem::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Some(UserProfile {
            user_id: user_id.to_string(),
            watch_history,
            favorites,
        }))
    }

    async fn add_favorite(&self, user_id: &str, favorite: FavoriteItem) -> AppResult<()> {
        let item_id = item_id_to_db(favorite.id)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO users (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO favorites (user_id, item_id, media_kind)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(item_id)
        .bind(favorite.media_kind.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove_favorite(&self, user_id: &str, id: u64, kind: MediaKind) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM favorites WHERE user_id = $1 AND item_id = $2 AND media_kind = $3",
        )
        .bind(user_id)
        .bind(item_id_to_db(id)?)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_watch(&self, user_id: &str, item: WatchHistoryItem) -> AppResult<()> {
        let item_id = item_id_to_db(item.id)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO users (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO watch_history (user_id, item_id, media_kind, progress, last_watched)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, item_id, media_kind)
            DO UPDATE SET progress = EXCLUDED.progress, last_watched = EXCLUDED.last_watched
            "#,
        )
        .bind(user_id)
        .bind(item_id)
        .bind(item.media_kind.as_str())
        .bind(item.progress)
        .bind(item.last_watched)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
