use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::cli::ServeArgs;
use crate::config::{CatalogConfig, SourceDescriptor};
use crate::favorites::Favorites;
use crate::fetch::{HttpLoader, SourceLoader};
use crate::filter::{FilterState, SortMode};
use crate::view::CatalogContext;

#[derive(Clone)]
pub struct AppState {
    context: Arc<Mutex<CatalogContext>>,
    loader: Arc<dyn SourceLoader>,
    config: Arc<CatalogConfig>,
}

impl AppState {
    pub fn new(
        config: CatalogConfig,
        loader: Arc<dyn SourceLoader>,
        favorites: Favorites,
    ) -> Self {
        let context = CatalogContext::new(config.batch_size, favorites);
        Self {
            context: Arc::new(Mutex::new(context)),
            loader,
            config: Arc::new(config),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/catalog/:source", get(view_source))
        .route("/catalog/:source/more", post(advance))
        .route("/search", get(search))
        .route("/favorites/:id/toggle", post(toggle_favorite))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    let (config, base_dir) = crate::config::load(PathBuf::from(&args.config).as_path())?;
    let favorites_path = match &args.favorites {
        Some(path) => PathBuf::from(path),
        None => base_dir.join("favorites.json"),
    };
    let favorites = Favorites::load(&favorites_path);
    let loader: Arc<dyn SourceLoader> = Arc::new(HttpLoader::new(base_dir)?);
    let state = AppState::new(config, loader, favorites);

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("bind {}", args.addr))?;
    tracing::info!(addr = %args.addr, "serving catalog");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve catalog")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "failed to listen for ctrl-c");
    }
}

/// Fetches a source on first request and caches it for the process
/// lifetime. The fetch runs in a detached task so a client disconnect mid
/// fetch still completes and still populates the cache.
async fn ensure_loaded(state: &AppState, descriptor: &SourceDescriptor) {
    {
        let context = state.context.lock().await;
        if context.catalog().contains(&descriptor.key) {
            return;
        }
    }

    let loader = Arc::clone(&state.loader);
    let context = Arc::clone(&state.context);
    let descriptor = descriptor.clone();
    let handle = tokio::spawn(async move {
        let records = crate::fetch::load_records(loader.as_ref(), &descriptor).await;
        let mut context = context.lock().await;
        // Another request may have won the race; first insert stands.
        if !context.catalog().contains(&descriptor.key) {
            context.insert_source(&descriptor.key, records);
        }
    });
    if let Err(err) = handle.await {
        tracing::warn!(%err, "source load task failed");
    }
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let mut sections = Vec::new();
    for descriptor in &state.config.sources {
        ensure_loaded(&state, descriptor).await;
        let mut context = state.context.lock().await;
        tracing::debug!(
            key = %descriptor.key,
            fetched_at = ?context.catalog().fetched_at(&descriptor.key),
            "rendering section"
        );
        let fragment = context.view_source(&descriptor.key);
        sections.push((descriptor.key.clone(), descriptor.label.clone(), fragment));
    }
    Html(crate::render::render_page(state.config.title(), &sections))
}

#[derive(Debug, Default, Deserialize)]
struct FilterParams {
    category: Option<String>,
    language: Option<String>,
    license: Option<String>,
    query: Option<String>,
    #[serde(default)]
    favorites: bool,
    sort: Option<SortMode>,
}

impl FilterParams {
    fn into_state(self) -> FilterState {
        FilterState {
            category: self.category,
            language: self.language,
            license: self.license,
            query: self.query,
            favorites_only: self.favorites,
            sort: self.sort.unwrap_or_default(),
        }
    }
}

async fn view_source(
    Path(source): Path<String>,
    Query(params): Query<FilterParams>,
    State(state): State<AppState>,
) -> Response {
    let Some(descriptor) = state.config.source(&source).cloned() else {
        return (StatusCode::NOT_FOUND, "unknown source").into_response();
    };
    ensure_loaded(&state, &descriptor).await;

    let mut context = state.context.lock().await;
    context.set_filter(params.into_state());
    Html(context.view_source(&source)).into_response()
}

#[derive(Debug, Deserialize)]
struct AdvanceRequest {
    sentinel: String,
}

async fn advance(
    Path(source): Path<String>,
    State(state): State<AppState>,
    axum::Json(request): axum::Json<AdvanceRequest>,
) -> Response {
    let mut context = state.context.lock().await;
    match context.advance(&source, &request.sentinel) {
        Some(fragment) => Html(fragment).into_response(),
        // Spent token or exhausted source; nothing to append.
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn search(
    Query(params): Query<SearchParams>,
    State(state): State<AppState>,
) -> Html<String> {
    let sources = state.config.sources.clone();
    for descriptor in &sources {
        ensure_loaded(&state, descriptor).await;
    }
    Html(state.context.lock().await.search(&params.q))
}

async fn toggle_favorite(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> axum::Json<serde_json::Value> {
    let favorite = state.context.lock().await.toggle_favorite(&id);
    axum::Json(serde_json::json!({ "favorite": favorite }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt as _;

    use super::{AppState, app};
    use crate::config::{CatalogConfig, SourceDescriptor};
    use crate::favorites::Favorites;
    use crate::fetch::SourceLoader;

    struct StubLoader {
        bodies: std::collections::HashMap<String, Value>,
    }

    #[async_trait]
    impl SourceLoader for StubLoader {
        async fn load_body(&self, descriptor: &SourceDescriptor) -> anyhow::Result<Value> {
            self.bodies
                .get(&descriptor.key)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no stub body for {}", descriptor.key))
        }
    }

    fn test_state(batch_size: usize, record_count: usize) -> AppState {
        let records: Vec<Value> = (0..record_count)
            .map(|index| json!({"name": format!("r{index}"), "task": "nlp"}))
            .collect();
        let mut bodies = std::collections::HashMap::new();
        bodies.insert("src".to_owned(), json!({ "items": records }));

        let config = CatalogConfig {
            title: Some("Test".to_owned()),
            batch_size,
            sources: vec![SourceDescriptor {
                key: "src".to_owned(),
                location: "stubbed".to_owned(),
                label: "Stub Source".to_owned(),
            }],
        };
        AppState::new(config, Arc::new(StubLoader { bodies }), Favorites::in_memory())
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    fn sentinel_token(fragment: &str) -> Option<String> {
        let marker = "data-sentinel=\"";
        let start = fragment.find(marker)? + marker.len();
        let end = fragment[start..].find('"')? + start;
        Some(fragment[start..end].to_owned())
    }

    #[tokio::test]
    async fn view_then_advance_until_exhausted() {
        let state = test_state(4, 6);
        let router = app(state);

        let response = router
            .clone()
            .oneshot(
                Request::get("/catalog/src")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fragment = body_text(response).await;
        assert_eq!(fragment.matches("catalog-card").count(), 4);
        let token = sentinel_token(&fragment).expect("sentinel present");

        let advance = |token: String| {
            let router = router.clone();
            async move {
                router
                    .oneshot(
                        Request::post("/catalog/src/more")
                            .header(header::CONTENT_TYPE, "application/json")
                            .body(Body::from(format!(r#"{{"sentinel":"{token}"}}"#)))
                            .unwrap(),
                    )
                    .await
                    .unwrap()
            }
        };

        let response = advance(token.clone()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let appended = body_text(response).await;
        assert_eq!(appended.matches("catalog-card").count(), 2);

        // Replay of a spent token appends nothing.
        let replay = advance(token).await;
        assert_eq!(replay.status(), StatusCode::NO_CONTENT);

        // The fresh token hits the exhausted source.
        let last = sentinel_token(&appended).expect("fresh sentinel");
        let response = advance(last).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn filtered_view_has_no_sentinel() {
        let state = test_state(4, 10);
        let router = app(state);

        let response = router
            .oneshot(
                Request::get("/catalog/src?category=nlp")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let fragment = body_text(response).await;
        assert_eq!(fragment.matches("catalog-card").count(), 10);
        assert!(!fragment.contains("load-sentinel"));
    }

    #[tokio::test]
    async fn unknown_source_is_404() {
        let state = test_state(4, 1);
        let response = app(state)
            .oneshot(Request::get("/catalog/ghost").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn toggle_favorite_round_trips() {
        let state = test_state(4, 1);
        let router = app(state);

        let toggle = |router: axum::Router| async move {
            let response = router
                .oneshot(
                    Request::post("/favorites/r0/toggle")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            body_text(response).await
        };

        assert_eq!(toggle(router.clone()).await, r#"{"favorite":true}"#);
        assert_eq!(toggle(router).await, r#"{"favorite":false}"#);
    }

    #[tokio::test]
    async fn search_spans_sources() {
        let state = test_state(4, 3);
        let response = app(state)
            .oneshot(Request::get("/search?q=r1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let fragment = body_text(response).await;
        assert_eq!(fragment.matches("catalog-card").count(), 1);
        assert!(fragment.contains("r1"));
    }
}
