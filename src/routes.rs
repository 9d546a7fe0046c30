use std::fs;
use std::sync::atomic::Ordering;

use ats_flow::error::AppError;
use ats_flow::workflows::ats::latest_snapshot;
use ats_flow::workflows::jobs::{ReviewItem, ReviewStatus, StoreError};
use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::infra::{AppState, ProfileData};

/// Error body returned by every API handler.
#[derive(Debug)]
pub(crate) enum ApiError {
    App(AppError),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::App(err) => {
                let status = match &err {
                    AppError::Store(StoreError::ReviewNotFound(_)) => StatusCode::NOT_FOUND,
                    AppError::Store(StoreError::ReviewClosed { .. }) => StatusCode::CONFLICT,
                    err if err.is_client_error() => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self::App(value)
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        Self::App(value.into())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(value: std::io::Error) -> Self {
        Self::App(value.into())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewQuery {
    #[serde(default)]
    pub(crate) status: Option<ReviewStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResolveRequest {
    pub(crate) resolution: String,
    pub(crate) reviewer: String,
}

pub(crate) fn router() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/reviews", get(list_reviews))
        .route("/api/v1/reviews/:id/resolve", post(resolve_review))
        .route("/api/v1/reviews/:id/skip", post(skip_review))
        .route("/api/v1/optimizer/snapshot", get(optimizer_snapshot))
}

pub(crate) async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn list_reviews(
    Extension(data): Extension<ProfileData>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<Vec<ReviewItem>>, ApiError> {
    Ok(Json(data.store.reviews(query.status)?))
}

pub(crate) async fn resolve_review(
    Extension(data): Extension<ProfileData>,
    Path(id): Path<u64>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ReviewItem>, ApiError> {
    let item = data
        .store
        .resolve_review(id, &request.resolution, &request.reviewer)?;
    Ok(Json(item))
}

pub(crate) async fn skip_review(
    Extension(data): Extension<ProfileData>,
    Path(id): Path<u64>,
) -> Result<Json<ReviewItem>, ApiError> {
    Ok(Json(data.store.skip_review(id)?))
}

/// Latest persisted optimizer snapshot for the active profile.
pub(crate) async fn optimizer_snapshot(
    Extension(data): Extension<ProfileData>,
) -> Result<Json<Value>, ApiError> {
    let path = latest_snapshot(&data.snapshot_dir, &data.profile)?.ok_or_else(|| {
        ApiError::NotFound(format!("no optimizer snapshot for profile {}", data.profile))
    })?;
    let raw = fs::read_to_string(&path)?;
    let snapshot = serde_json::from_str(&raw)
        .map_err(|err| ApiError::App(AppError::Io(std::io::Error::other(err))))?;
    Ok(Json(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::Path as FsPath;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use ats_flow::workflows::ats::{write_snapshot, ApplicationMetrics, PatternCatalog};
    use ats_flow::workflows::jobs::{Job, JobStore, MemoryJobStore, NewReview};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    fn app(store: Arc<MemoryJobStore>, snapshot_dir: &FsPath, ready: bool) -> Router {
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let data = ProfileData {
            profile: "jane".to_string(),
            store,
            snapshot_dir: snapshot_dir.to_path_buf(),
        };
        router().layer(Extension(data)).layer(Extension(state))
    }

    fn queue_review(store: &MemoryJobStore, priority: u8) -> ReviewItem {
        let job = Job::new("https://careers.acme.example/7", "Engineer", "Acme");
        store
            .enqueue_review(NewReview {
                job_id: job.id(),
                review_type: "manual_application".to_string(),
                title: "Apply manually: Engineer at Acme".to_string(),
                description: "No automated submitter is available for this posting.".to_string(),
                context: BTreeMap::new(),
                priority,
                screenshot_path: None,
            })
            .expect("review queued")
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        serde_json::from_slice(&bytes).expect("body is json")
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request builds")
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    #[tokio::test]
    async fn readiness_reports_initializing_until_bound() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(MemoryJobStore::new());

        let response = app(store.clone(), dir.path(), false)
            .oneshot(get_request("/ready"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app(store, dir.path(), true)
            .oneshot(get_request("/health"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn reviews_are_listed_by_priority_and_filtered_by_status() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(MemoryJobStore::new());
        queue_review(&store, 3);
        let urgent = queue_review(&store, 1);
        store.skip_review(urgent.id).expect("skip");
        let pending = queue_review(&store, 2);

        let response = app(store.clone(), dir.path(), true)
            .oneshot(get_request("/api/v1/reviews"))
            .await
            .expect("response");
        let all = body_json(response).await;
        let priorities: Vec<_> = all
            .as_array()
            .expect("array")
            .iter()
            .map(|item| item["priority"].as_u64().expect("priority"))
            .collect();
        assert_eq!(priorities, vec![1, 2, 3]);

        let response = app(store, dir.path(), true)
            .oneshot(get_request("/api/v1/reviews?status=pending"))
            .await
            .expect("response");
        let listed = body_json(response).await;
        assert_eq!(listed.as_array().expect("array").len(), 2);
        assert_eq!(listed[0]["id"], pending.id);
    }

    #[tokio::test]
    async fn resolving_twice_is_a_conflict() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(MemoryJobStore::new());
        let item = queue_review(&store, 2);
        let uri = format!("/api/v1/reviews/{}/resolve", item.id);
        let body = json!({ "resolution": "applied on site", "reviewer": "sam" });

        let response = app(store.clone(), dir.path(), true)
            .oneshot(post_json(&uri, body.clone()))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let resolved = body_json(response).await;
        assert_eq!(resolved["status"], "resolved");
        assert_eq!(resolved["reviewer"], "sam");

        let response = app(store, dir.path(), true)
            .oneshot(post_json(&uri, body))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn skipping_an_unknown_review_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = app(Arc::new(MemoryJobStore::new()), dir.path(), true)
            .oneshot(post_json("/api/v1/reviews/42/skip", json!({})))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "store error: review 42 not found");
    }

    #[tokio::test]
    async fn snapshot_endpoint_serves_latest_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(MemoryJobStore::new());

        let response = app(store.clone(), dir.path(), true)
            .oneshot(get_request("/api/v1/optimizer/snapshot"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let catalog = PatternCatalog::standard();
        write_snapshot(
            dir.path(),
            "jane",
            &ApplicationMetrics::for_catalog(&catalog),
            &catalog,
        )
        .expect("snapshot written");

        let response = app(store, dir.path(), true)
            .oneshot(get_request("/api/v1/optimizer/snapshot"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let snapshot = body_json(response).await;
        assert_eq!(snapshot["metrics"]["total_attempts"], 0);
        assert_eq!(snapshot["ats_patterns"]["lever"]["url_patterns"][0], "lever.co");
    }
}
