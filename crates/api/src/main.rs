use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sentiment_core::error::RouteError;
use sentiment_core::query::{router, QueryParams};
use sentiment_core::snapshot::{self, SnapshotLoader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = sentiment_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let http = settings.http_client()?;
    let source = snapshot::source_from_settings(&settings, http)?;
    let loader = SnapshotLoader::from_boxed(source);

    // Warm the cache; a failure here leaves the server up and answering 503
    // until the snapshot becomes readable.
    if let Err(e) = loader.load().await {
        let err = anyhow::Error::new(e);
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "snapshot load failed; starting API in degraded mode");
    }

    let app = app(AppState {
        snapshot: Arc::new(loader),
    });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "snapshot api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Debug, Clone)]
struct AppState {
    snapshot: Arc<SnapshotLoader>,
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/*route", get(snapshot_route))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl std::fmt::Display) -> ApiError {
    (status, Json(json!({ "error": message.to_string() })))
}

async fn snapshot_route(
    State(state): State<AppState>,
    Path(route): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<Value>, ApiError> {
    let snapshot = state.snapshot.load().await.map_err(|e| {
        tracing::warn!(error = %e, "snapshot unavailable");
        api_error(StatusCode::SERVICE_UNAVAILABLE, e)
    })?;

    let path = format!("/api/{route}");
    let params = QueryParams::parse(query.as_deref().unwrap_or_default());

    match router::resolve(&snapshot, &path, &params) {
        Ok(body) => Ok(Json(body)),
        Err(e @ RouteError::NoRouteMatch(_)) => Err(api_error(StatusCode::NOT_FOUND, e)),
        Err(e) => {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(%path, error = %err, "snapshot route failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, err))
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &sentiment_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use sentiment_core::snapshot::FileSnapshotSource;
    use tower::ServiceExt;

    fn state_with_file(name: &str, contents: Option<&str>) -> AppState {
        let dir = std::env::temp_dir().join(format!("sentiment-api-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("snapshot.json");
        if let Some(contents) = contents {
            std::fs::write(&file, contents).unwrap();
        }
        AppState {
            snapshot: Arc::new(SnapshotLoader::new(FileSnapshotSource::new(file))),
        }
    }

    async fn get(state: AppState, uri: &str) -> (StatusCode, Value) {
        let res = app(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    const SNAPSHOT: &str = r#"{
        "generatedAt": "2026-01-27T10:00:00Z",
        "feed": [
            {"id": "a", "source": "news", "title": "Apple beats", "tickers": ["AAPL"],
             "sentiment": {"label": "positive"}, "publishedAt": "2026-01-27T09:00:00Z"},
            {"id": "b", "source": "reddit", "title": "Tesla slump", "tickers": ["TSLA"],
             "sentiment": {"label": "negative"}, "publishedAt": "2026-01-27T08:00:00Z"}
        ]
    }"#;

    #[tokio::test]
    async fn serves_routes_with_query_params() {
        let state = state_with_file("routes", Some(SNAPSHOT));

        let (status, body) = get(state.clone(), "/api/feed?sentiment=negative").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], json!(1));
        assert_eq!(body["items"][0]["id"], json!("b"));

        let (status, body) = get(state, "/api/ticker/aapl").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticker"], json!("AAPL"));
        assert_eq!(body["mentions"], json!(1));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let state = state_with_file("unknown", Some(SNAPSHOT));
        let (status, body) = get(state, "/api/unknown").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("/api/unknown"));
    }

    #[tokio::test]
    async fn missing_snapshot_is_service_unavailable() {
        let state = state_with_file("missing", None);
        let (status, _) = get(state, "/api/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
