use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use mediabox_api::api::{create_router, AppState};
use mediabox_api::error::{AppError, AppResult};
use mediabox_api::models::{CatalogItem, Genre, ItemDetails, MediaKind};
use mediabox_api::services::providers::{CatalogProvider, DiscoverSort};

/// Small fixed catalog that counts discover calls
#[derive(Default)]
struct StubCatalog {
    discover_calls: AtomicUsize,
}

fn catalog_item(id: u64, kind: MediaKind, title: &str, rating: f64) -> CatalogItem {
    CatalogItem {
        id,
        media_kind: kind,
        title: title.to_string(),
        poster_path: Some(format!("/{}.jpg", id)),
        rating,
        genres: vec![],
    }
}

#[async_trait::async_trait]
impl CatalogProvider for StubCatalog {
    async fn genre_list(&self, kind: MediaKind) -> AppResult<Vec<Genre>> {
        match kind.catalog() {
            MediaKind::Movie => Ok(vec![Genre::new(28, "Action")]),
            _ => Ok(vec![Genre::new(16, "Animation"), Genre::new(10759, "Action & Adventure")]),
        }
    }

    async fn item_details(&self, id: u64, _kind: MediaKind) -> AppResult<ItemDetails> {
        match id {
            101 | 555 => Ok(ItemDetails {
                genres: vec![Genre::new(28, "Action")],
                rating: 7.0,
            }),
            _ => Err(AppError::NotFound(format!("item {}", id))),
        }
    }

    async fn discover_by_genre(
        &self,
        genre_id: u32,
        kind: MediaKind,
        _sort_by: DiscoverSort,
    ) -> AppResult<Vec<CatalogItem>> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        match (genre_id, kind) {
            (28, MediaKind::Movie) => Ok(vec![
                catalog_item(555, MediaKind::Movie, "Die Hard", 8.0),
                catalog_item(101, MediaKind::Movie, "Speed", 9.0),
            ]),
            (28, _) => {
                let mut anime = catalog_item(900, MediaKind::Tv, "Cowboy Bebop", 9.0);
                anime.genres = vec![Genre::new(16, "Animation")];
                Ok(vec![anime])
            }
            _ => Ok(vec![]),
        }
    }

    async fn trending_now(&self) -> AppResult<Vec<CatalogItem>> {
        Ok((1..=12)
            .map(|i| catalog_item(i, MediaKind::Movie, &format!("Trending {}", i), 6.5))
            .collect())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

fn create_test_server() -> (TestServer, Arc<StubCatalog>) {
    let catalog = Arc::new(StubCatalog::default());
    let state = AppState::in_memory(catalog.clone());
    let app = create_router(state);
    (TestServer::new(app).unwrap(), catalog)
}

#[tokio::test]
async fn test_health_check() {
    let (server, _) = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(response.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn test_recommendations_for_unknown_user_is_404() {
    let (server, _) = create_test_server();
    let response = server.get("/api/v1/users/ghost/recommendations").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Profile not found for user ghost");
}

#[tokio::test]
async fn test_empty_profile_gets_trending() {
    let (server, catalog) = create_test_server();

    server
        .post("/api/v1/users/alice/favorites")
        .json(&json!({ "id": 101, "media_kind": "movie" }))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .delete("/api/v1/users/alice/favorites/movie/101")
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let response = server.get("/api/v1/users/alice/recommendations").await;
    response.assert_status_ok();
    let body: Value = response.json();
    let recs = body["recommendations"].as_array().unwrap();

    assert_eq!(recs.len(), 10);
    assert!(recs
        .iter()
        .all(|r| r["score"] == 1.0 && r["reason"] == "Trending now"));
    assert_eq!(catalog.discover_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_favorite_drives_recommendations_and_snapshot_is_reused() {
    let (server, catalog) = create_test_server();

    server
        .post("/api/v1/users/bob/favorites")
        .json(&json!({ "id": 101, "media_kind": "movie" }))
        .await
        .assert_status(StatusCode::CREATED);

    let first = server.get("/api/v1/users/bob/recommendations").await;
    first.assert_status_ok();
    let first: Value = first.json();
    assert_eq!(first["source"], "generated");
    assert_eq!(first["persisted"], true);

    let recs = first["recommendations"].as_array().unwrap();
    assert!(recs.iter().all(|r| r["id"] != 101));

    assert_eq!(recs[0]["id"], 900);
    assert_eq!(recs[0]["media_kind"], "anime");
    assert_eq!(recs[0]["reason"], "Because you like Action anime");

    let die_hard = recs.iter().find(|r| r["id"] == 555).unwrap();
    assert_eq!(die_hard["reason"], "Because you like Action movies");
    assert!((die_hard["score"].as_f64().unwrap() - 2.4).abs() < 1e-9);

    let calls_after_first = catalog.discover_calls.load(Ordering::SeqCst);
    assert_eq!(calls_after_first, 2);

    let second: Value = server.get("/api/v1/users/bob/recommendations").await.json();
    assert_eq!(second["source"], "snapshot");
    assert_eq!(second["recommendations"], first["recommendations"]);
    assert_eq!(second["created_at"], first["created_at"]);
    assert_eq!(catalog.discover_calls.load(Ordering::SeqCst), calls_after_first);
}

#[tokio::test]
async fn test_profile_writes_hide_items_from_stored_recommendations() {
    let (server, catalog) = create_test_server();

    server
        .post("/api/v1/users/hana/favorites")
        .json(&json!({ "id": 101, "media_kind": "movie" }))
        .await
        .assert_status(StatusCode::CREATED);

    let first: Value = server.get("/api/v1/users/hana/recommendations").await.json();
    let ids: Vec<u64> = first["recommendations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![900, 555]);

    server
        .post("/api/v1/users/hana/favorites")
        .json(&json!({ "id": 555, "media_kind": "movie" }))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/api/v1/users/hana/history")
        .json(&json!({ "id": 900, "media_kind": "anime", "progress": 40.0 }))
        .await
        .assert_status_ok();

    let second: Value = server.get("/api/v1/users/hana/recommendations").await.json();
    assert_eq!(second["source"], "snapshot");
    assert_eq!(second["created_at"], first["created_at"]);
    assert!(second["recommendations"].as_array().unwrap().is_empty());
    assert_eq!(catalog.discover_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_refresh_regenerates() {
    let (server, catalog) = create_test_server();

    server
        .post("/api/v1/users/carol/favorites")
        .json(&json!({ "id": 101, "media_kind": "movie" }))
        .await
        .assert_status(StatusCode::CREATED);

    server
        .get("/api/v1/users/carol/recommendations")
        .await
        .assert_status_ok();
    let refreshed = server
        .post("/api/v1/users/carol/recommendations/refresh")
        .await;
    refreshed.assert_status_ok();

    let body: Value = refreshed.json();
    assert_eq!(body["source"], "generated");
    assert_eq!(catalog.discover_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_record_watch_and_profile() {
    let (server, _) = create_test_server();

    server
        .post("/api/v1/users/dave/history")
        .json(&json!({ "id": 555, "media_kind": "movie", "progress": 95.0 }))
        .await
        .assert_status_ok();

    let profile: Value = server.get("/api/v1/users/dave/profile").await.json();
    assert_eq!(profile["user_id"], "dave");
    assert_eq!(profile["watch_history"][0]["id"], 555);
    assert_eq!(profile["watch_history"][0]["progress"], 95.0);

    let recs: Value = server.get("/api/v1/users/dave/recommendations").await.json();
    let recs = recs["recommendations"].as_array().unwrap();
    assert!(recs.iter().all(|r| r["id"] != 555));
}

#[tokio::test]
async fn test_record_watch_rejects_bad_progress() {
    let (server, _) = create_test_server();

    let response = server
        .post("/api/v1/users/erin/history")
        .json(&json!({ "id": 1, "media_kind": "tv", "progress": 150.0 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    server
        .get("/api/v1/users/erin/profile")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_remove_missing_favorite_is_404() {
    let (server, _) = create_test_server();
    server
        .delete("/api/v1/users/frank/favorites/tv/42")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catalog_passthrough() {
    let (server, _) = create_test_server();

    let trending: Vec<Value> = server.get("/api/v1/trending").await.json();
    assert_eq!(trending.len(), 12);

    let genres: Vec<Value> = server.get("/api/v1/genres/anime").await.json();
    assert_eq!(genres[0]["name"], "Animation");

    server
        .get("/api/v1/genres/podcast")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_lifecycle() {
    let (server, _) = create_test_server();

    let created = server
        .post("/api/v1/sessions")
        .json(&json!({ "user_id": "gina" }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let session: Value = created.json();
    assert_eq!(session["state"], "authenticated");
    assert_eq!(session["user_id"], "gina");
    let id = session["id"].as_str().unwrap().to_string();

    let fetched: Value = server.get(&format!("/api/v1/sessions/{}", id)).await.json();
    assert_eq!(fetched["user_id"], "gina");

    let signed_out = server.delete(&format!("/api/v1/sessions/{}", id)).await;
    signed_out.assert_status_ok();
    let signed_out: Value = signed_out.json();
    assert_eq!(signed_out["state"], "anonymous");

    server
        .delete(&format!("/api/v1/sessions/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_requires_user_id() {
    let (server, _) = create_test_server();
    server
        .post("/api/v1/sessions")
        .json(&json!({ "user_id": "" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
