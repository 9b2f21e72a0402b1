//! Web server implementation
//!
//! JSON API over a single comparison session plus optional static asset
//! serving. Each handler locks the session, applies one interaction to
//! completion, and returns; fetches settle in the background and land in
//! the table on the next read.

use alignview_common::{ColumnId, Error, ParamValue, ParameterKey, VERSION};
use alignview_session::{ColumnContext, Session};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Web server configuration
#[derive(Debug, Clone, Default)]
pub struct WebServerConfig {
    /// Directory of static frontend assets; API-only when unset
    pub static_dir: Option<PathBuf>,
}

#[derive(Clone)]
struct AppState {
    session: Arc<Mutex<Session>>,
}

/// API error wrapper mapping the error taxonomy onto status codes
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::ColumnNotFound { .. } => StatusCode::NOT_FOUND,
            Error::InvalidValue { .. } | Error::LimitExceeded { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::UnknownParameter(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Build the router for a session
pub fn router(session: Session, config: &WebServerConfig) -> Router {
    let state = AppState {
        session: Arc::new(Mutex::new(session)),
    };

    let api = Router::new()
        .route("/health", get(health))
        .route("/table", get(table))
        .route("/columns", post(add_column))
        .route("/columns/:id", delete(remove_column))
        .route("/columns/:id/selection", put(set_selection))
        .route("/columns/:id/selection/:key", delete(clear_selection))
        .route("/columns/:id/options", get(options))
        .route("/links", get(links))
        .route("/links/:key", post(toggle_link))
        .with_state(state);

    let mut router = Router::new().nest("/api", api);
    if let Some(dir) = &config.static_dir {
        info!("Serving static assets from {}", dir.display());
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Run the server until shutdown
pub async fn serve(
    addr: SocketAddr,
    config: WebServerConfig,
    session: Session,
) -> anyhow::Result<()> {
    let app = router(session, &config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("AlignView web API listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    session: String,
    version: &'static str,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let session = state.session.lock().await;
    Json(HealthResponse {
        status: "ok",
        session: session.id().to_string(),
        version: VERSION,
    })
}

async fn table(State(state): State<AppState>) -> Json<alignview_session::TableProjection> {
    let mut session = state.session.lock().await;
    Json(session.project())
}

#[derive(Serialize)]
struct ColumnCreated {
    id: ColumnId,
}

async fn add_column(State(state): State<AppState>) -> Json<ColumnCreated> {
    let mut session = state.session.lock().await;
    let id = session.add_column();
    Json(ColumnCreated { id })
}

async fn remove_column(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let mut session = state.session.lock().await;
    session.remove_column(ColumnId(id))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct SelectionRequest {
    key: ParameterKey,
    value: ParamValue,
}

async fn set_selection(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<SelectionRequest>,
) -> Result<StatusCode, ApiError> {
    let mut session = state.session.lock().await;
    session.set_selection(ColumnId(id), request.key, request.value)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_selection(
    State(state): State<AppState>,
    Path((id, key)): Path<(u64, String)>,
) -> Result<StatusCode, ApiError> {
    let key: ParameterKey = key.parse()?;
    let mut session = state.session.lock().await;
    session.clear_selection(ColumnId(id), key)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn options(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<BTreeMap<String, Vec<ParamValue>>>, ApiError> {
    let session = state.session.lock().await;
    let column = session.column(ColumnId(id))?;
    let ctx = ColumnContext::of(column);

    let registry = session.registry();
    let options = registry
        .parameter_keys()
        .into_iter()
        .map(|key| {
            let values = registry.valid_options(&key, ctx);
            (key.to_string(), values)
        })
        .collect();
    Ok(Json(options))
}

async fn links(State(state): State<AppState>) -> Json<Vec<ParameterKey>> {
    let session = state.session.lock().await;
    Json(session.linked_keys())
}

#[derive(Serialize)]
struct LinkToggled {
    key: ParameterKey,
    linked: bool,
}

async fn toggle_link(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<LinkToggled>, ApiError> {
    let key: ParameterKey = key.parse()?;
    let mut session = state.session.lock().await;
    let linked = session.toggle_link(key.clone())?;
    Ok(Json(LinkToggled { key, linked }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignview_common::MetadataIndex;
    use alignview_session::{FetchOutcome, ResultFetcher};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct NoDataFetcher;

    #[async_trait]
    impl ResultFetcher for NoDataFetcher {
        async fn fetch(&self, _tuple: &alignview_common::SelectionTuple) -> FetchOutcome {
            FetchOutcome::NoData
        }
    }

    fn app() -> Router {
        let mut index = MetadataIndex::default();
        index.insert_run("S1", None, "pipeline_baseline", None, &[]);
        let session = Session::new(Arc::new(index), Arc::new(NoDataFetcher));
        router(session, &WebServerConfig::default())
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_column_lifecycle() {
        let app = app();

        let response = app
            .clone()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");

        let response = app
            .clone()
            .oneshot(Request::post("/api/columns").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let id = body_json(response).await["id"].as_u64().unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::delete(format!("/api/columns/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let app = app();

        // Unknown column
        let response = app
            .clone()
            .oneshot(
                Request::delete("/api/columns/999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Unknown parameter key
        let response = app
            .clone()
            .oneshot(
                Request::post("/api/links/bogus")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Invalid value
        let column = app
            .clone()
            .oneshot(Request::post("/api/columns").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let id = body_json(column).await["id"].as_u64().unwrap();
        let response = app
            .clone()
            .oneshot(
                Request::put(format!("/api/columns/{}/selection", id))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"key": "scenario", "value": "UNKNOWN"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_toggle_link_roundtrip() {
        let app = app();

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/links/scenario")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(response).await["linked"], true);

        let response = app
            .clone()
            .oneshot(Request::get("/api/links").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await, serde_json::json!(["scenario"]));
    }
}
