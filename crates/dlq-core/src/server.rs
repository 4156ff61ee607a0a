//! HTTP API over the directory and the batch actions.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::actions::{purge, redrive, BatchRequest, OperationResult, RedriveMode};
use crate::backend::QueueBackend;
use crate::directory::{build_directory, QueueDescriptor};
use crate::error::QueueError;

#[derive(Debug, Clone)]
pub struct ServerParams {
    pub host: String,
    pub port: u16,
}

/// State shared by every handler. Immutable for the life of the process.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn QueueBackend>,
    pub redrive_mode: RedriveMode,
}

/// Errors a handler turns into a JSON `{"error": ...}` response.
///
/// * `Backend` -> 500 Internal Server Error
/// * `BadRequest` -> 400 Bad Request
/// * `NotFound` -> 404 Not Found
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Backend(#[from] QueueError),

    #[error("{0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        };

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_checker_handler))
        .route("/dlqs", get(list_dlqs))
        .route("/dlqs/redrive", post(redrive_dlqs))
        .route("/dlqs/purge", post(purge_dlqs))
        .fallback(handler_404)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Binds `params` and serves the API until the process is stopped.
pub async fn serve(params: &ServerParams, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind((params.host.as_str(), params.port)).await?;
    log::info!(
        "serving dead letter queue API on http://{} (redrive mode: {})",
        listener.local_addr()?,
        state.redrive_mode
    );

    axum::serve(listener, router(state)).await
}

async fn health_checker_handler() -> &'static str {
    "UP"
}

async fn handler_404() -> ApiError {
    ApiError::NotFound
}

async fn list_dlqs(State(state): State<AppState>) -> Result<Json<Vec<QueueDescriptor>>, ApiError> {
    let directory = build_directory(state.backend.as_ref()).await.map_err(|e| {
        log::error!("listing queues failed: {e}");
        e
    })?;

    log::info!("listed {} queues", directory.len());
    Ok(Json(directory))
}

async fn redrive_dlqs(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<Vec<OperationResult>>, ApiError> {
    let Json(request) = payload?;
    log::info!("redriving {} queues ({})", request.queues.len(), state.redrive_mode);

    Ok(Json(
        redrive(state.backend.as_ref(), state.redrive_mode, &request.queues).await,
    ))
}

async fn purge_dlqs(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<Vec<OperationResult>>, ApiError> {
    let Json(request) = payload?;
    log::info!("purging {} queues", request.queues.len());

    Ok(Json(purge(state.backend.as_ref(), &request.queues).await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockQueueBackend, QueueAttributes};
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(backend: MockQueueBackend) -> Router {
        router(AppState {
            backend: Arc::new(backend),
            redrive_mode: RedriveMode::Stub,
        })
    }

    async fn call(app: Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn lists_queue_descriptors() {
        let mut backend = MockQueueBackend::new();
        backend
            .expect_list_queues()
            .returning(|| Ok(vec!["q-dlq".to_string(), "q".to_string()]));
        backend.expect_get_queue_attributes().returning(|queue_url| {
            Ok(QueueAttributes {
                queue_arn: Some(format!("arn:aws:sqs:us-east-1:0:{queue_url}")),
                redrive_policy: (queue_url == "q-dlq")
                    .then(|| r#"{"sourceQueueArn":"arn:aws:sqs:us-east-1:0:q","maxReceiveCount":4}"#.to_string()),
            })
        });

        let (status, body) = call(app(backend), Method::GET, "/dlqs", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                {"queue_url": "q-dlq", "queue_arn": "arn:aws:sqs:us-east-1:0:q-dlq", "source_queue_arn": "arn:aws:sqs:us-east-1:0:q"},
                {"queue_url": "q", "queue_arn": "arn:aws:sqs:us-east-1:0:q", "source_queue_arn": ""},
            ])
        );
    }

    #[tokio::test]
    async fn listing_failure_is_a_single_error_object() {
        let mut backend = MockQueueBackend::new();
        backend
            .expect_list_queues()
            .returning(|| Err(QueueError::ListQueues("Unable to locate credentials".to_string())));

        let (status, body) = call(app(backend), Method::GET, "/dlqs", None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.is_object());
        assert!(body["error"].as_str().unwrap().contains("Unable to locate credentials"));
    }

    #[tokio::test]
    async fn purge_reports_each_queue() {
        let mut backend = MockQueueBackend::new();
        backend.expect_purge_queue().returning(|queue_url| {
            if queue_url == "b" {
                Err(QueueError::PurgeQueue {
                    queue_url: queue_url.to_string(),
                    message: "The specified queue does not exist.".to_string(),
                })
            } else {
                Ok(())
            }
        });

        let (status, body) = call(
            app(backend),
            Method::POST,
            "/dlqs/purge",
            Some(r#"{"queues":[{"queue_url":"a"},{"queue_url":"b"},{"queue_url":"c"}]}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let results = body.as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], json!({"queue_url": "a", "status": "Purged successfully"}));
        assert!(results[1]["error"].as_str().unwrap().contains("does not exist"));
        assert!(results[1].get("status").is_none());
        assert_eq!(results[2], json!({"queue_url": "c", "status": "Purged successfully"}));
    }

    #[tokio::test]
    async fn stub_redrive_reports_success_for_every_queue() {
        let (status, body) = call(
            app(MockQueueBackend::new()),
            Method::POST,
            "/dlqs/redrive",
            Some(r#"{"queues":[{"queue_url":"a","source_queue_arn":"arn:aws:sqs:us-east-1:0:x"},{"queue_url":"b"}]}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                {"queue_url": "a", "status": "Redriven successfully"},
                {"queue_url": "b", "status": "Redriven successfully"},
            ])
        );
    }

    #[tokio::test]
    async fn missing_queues_key_is_an_empty_batch() {
        let (status, body) = call(app(MockQueueBackend::new()), Method::POST, "/dlqs/purge", Some("{}")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn malformed_body_is_a_json_bad_request() {
        let (status, body) = call(
            app(MockQueueBackend::new()),
            Method::POST,
            "/dlqs/purge",
            Some(r#"{"queues":[{"source_queue_arn":"x"}]}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (status, body) = call(app(MockQueueBackend::new()), Method::GET, "/queues", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "not found"}));
    }

    #[tokio::test]
    async fn allows_any_origin() {
        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap();

        let response = app(MockQueueBackend::new()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }
}
