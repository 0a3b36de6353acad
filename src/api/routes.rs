use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::db::{HistoryEntry, SeriesRecord, SeriesStore};
use crate::error::AppError;
use crate::types::SeriesOutcome;
use crate::updater::Updater;

#[derive(Clone)]
pub struct ApiState {
    pub store: SeriesStore,
    pub updater: Updater,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/fetch-store", get(fetch_store))
        .route("/series", get(list_series))
        .route("/history", get(list_all_history))
        .route("/history/:series_id", get(list_history))
        .route("/update-latest", get(update_latest))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct UpdateLatestResponse {
    pub message: &'static str,
    pub updated: usize,
    pub failed: Vec<SeriesOutcome>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn home() -> &'static str {
    "Home"
}

async fn fetch_store(State(state): State<ApiState>) -> Result<String, AppError> {
    let sync = state.updater.sync_catalog().await?;
    info!(fetched = sync.fetched, inserted = sync.report.inserted, "Catalog stored via /fetch-store");
    Ok(format!("Series stored successfully! Count: {}", sync.fetched))
}

async fn list_series(State(state): State<ApiState>) -> Result<Json<Vec<SeriesRecord>>, AppError> {
    Ok(Json(state.store.list_series().await?))
}

async fn list_all_history(
    State(state): State<ApiState>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    Ok(Json(state.store.list_history(None).await?))
}

async fn list_history(
    State(state): State<ApiState>,
    Path(series_id): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    Ok(Json(state.store.list_history(Some(&series_id)).await?))
}

async fn update_latest(
    State(state): State<ApiState>,
) -> Result<Json<UpdateLatestResponse>, AppError> {
    let report = state.updater.update_latest_values().await?;
    Ok(Json(UpdateLatestResponse {
        message: "Latest values updated",
        updated: report.updated(),
        failed: report.failures().cloned().collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpdateSettings;
    use crate::db::store::tests::memory_store;
    use crate::fetcher::Fetcher;
    use crate::testutil::spawn_upstream;
    use axum::http::StatusCode;
    use serde_json::{json, Value};
    use std::time::Duration;

    async fn serve(upstream_base: &str) -> (String, SeriesStore) {
        let store = memory_store(3).await;
        let fetcher = Fetcher::with_urls(
            &format!("{upstream_base}/Series"),
            &format!("{upstream_base}/Observations/Latest/"),
            Duration::from_millis(500),
        )
        .unwrap();
        let updater = Updater::new(store.clone(), fetcher, UpdateSettings::default());
        let base = spawn_upstream(router(ApiState { store: store.clone(), updater })).await;
        (base, store)
    }

    async fn fake_upstream() -> String {
        spawn_upstream(
            Router::new()
                .route("/Series", get(|| async { Json(json!([{ "seriesId": "A" }, { "seriesId": "B" }])) }))
                .route(
                    "/Observations/Latest/:id",
                    get(|Path(id): Path<String>| async move {
                        if id == "A" {
                            Json(json!({ "date": "2024-01-02", "value": 2.0 }))
                        } else {
                            Json(json!({ "date": "2024-01-02", "value": "--" }))
                        }
                    }),
                ),
        )
        .await
    }

    #[tokio::test]
    async fn home_is_alive() {
        let (base, _) = serve("http://127.0.0.1:9").await;
        let resp = reqwest::get(format!("{base}/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.text().await.unwrap(), "Home");
    }

    #[tokio::test]
    async fn fetch_store_then_list_series() {
        let (base, _) = serve(&fake_upstream().await).await;

        let resp = reqwest::get(format!("{base}/fetch-store")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.text().await.unwrap(), "Series stored successfully! Count: 2");

        let series: Value = reqwest::get(format!("{base}/series")).await.unwrap().json().await.unwrap();
        assert_eq!(
            series,
            json!([
                { "id": 1, "seriesId": "A", "date": null, "latest_value": null },
                { "id": 2, "seriesId": "B", "date": null, "latest_value": null }
            ])
        );
    }

    #[tokio::test]
    async fn fetch_store_upstream_failure_is_500_json() {
        let (base, store) = serve("http://127.0.0.1:9").await;

        let resp = reqwest::get(format!("{base}/fetch-store")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().is_some_and(|m| !m.is_empty()));
        assert!(store.list_series().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_latest_reports_partial_success() {
        let (base, store) = serve(&fake_upstream().await).await;
        store.insert_series(&["A".to_string(), "B".to_string()]).await.unwrap();

        let body: Value = reqwest::get(format!("{base}/update-latest"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["message"], "Latest values updated");
        assert_eq!(body["updated"], 1);
        assert_eq!(body["failed"][0]["seriesId"], "B");

        let history: Value = reqwest::get(format!("{base}/history/A")).await.unwrap().json().await.unwrap();
        assert_eq!(history.as_array().unwrap().len(), 1);
        assert_eq!(history[0]["seriesId"], "A");
        assert_eq!(history[0]["date"], "2024-01-02");
        assert_eq!(history[0]["value"], 2.0);
        assert!(history[0]["recorded_at"].is_string());

        let empty: Value = reqwest::get(format!("{base}/history/B")).await.unwrap().json().await.unwrap();
        assert_eq!(empty, json!([]));
    }

    #[tokio::test]
    async fn full_history_lists_every_series() {
        let (base, store) = serve("http://127.0.0.1:9").await;
        store.update_latest("B", "b1", 1.0).await.unwrap();
        store.update_latest("A", "a1", 1.0).await.unwrap();

        let all: Value = reqwest::get(format!("{base}/history")).await.unwrap().json().await.unwrap();
        let ids: Vec<_> = all.as_array().unwrap().iter().map(|h| h["seriesId"].clone()).collect();
        assert_eq!(ids, vec![json!("A"), json!("B")]);
    }
}
