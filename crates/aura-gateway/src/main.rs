//! Aura Gateway — dashboard homepage at 127.0.0.1:8000 (configurable).
//! Shortcut grid (sled/file/memory backed) and grounded smart search behind one small JSON API.

use aura_core::{
    resolve_icon, web_search_url, Confirmation, DashboardConfig, IconSource, SearchRejection,
    SearchResult, ShortcutRecord, ShortcutStore, SmartSearch, StorageError, Theme,
};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
struct AppState {
    shortcuts: Arc<Mutex<ShortcutStore>>,
    search: Arc<SmartSearch>,
    theme: Arc<Mutex<Theme>>,
}

impl AppState {
    fn new(shortcuts: ShortcutStore, search: SmartSearch) -> Self {
        Self {
            shortcuts: Arc::new(Mutex::new(shortcuts)),
            search: Arc::new(search),
            theme: Arc::new(Mutex::new(Theme::default())),
        }
    }
}

/// A shortcut as the grid draws it: the stored record plus its resolved icon.
#[derive(Serialize)]
struct ShortcutView {
    #[serde(flatten)]
    record: ShortcutRecord,
    icon: IconSource,
}

#[derive(Deserialize)]
struct AddShortcutRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
}

#[derive(Deserialize)]
struct RemoveParams {
    #[serde(default)]
    confirm: bool,
}

#[derive(Serialize)]
struct RemoveResponse {
    removed: Option<ShortcutRecord>,
    shortcuts: Vec<ShortcutView>,
}

#[derive(Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: String,
}

#[derive(Deserialize)]
struct WebSearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
struct ThemeResponse {
    theme: Theme,
}

type ApiError = (StatusCode, String);

fn storage_error(e: StorageError) -> ApiError {
    tracing::error!(error = %e, "shortcut persist failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn views(records: &[ShortcutRecord]) -> Vec<ShortcutView> {
    records
        .iter()
        .map(|r| ShortcutView {
            icon: resolve_icon(r),
            record: r.clone(),
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[aura-gateway] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DashboardConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "config not loaded; using defaults");
        DashboardConfig::default()
    });

    let storage = config.open_storage()?;
    let shortcuts = ShortcutStore::load(storage);
    let search = SmartSearch::new(config.search_provider());
    if !search.is_configured() {
        tracing::warn!("no Gemini API key configured; smart search will return a placeholder");
    }

    tracing::info!(
        bind_addr = %config.bind_addr,
        storage_backend = ?config.storage_backend,
        storage_path = %config.storage_path,
        model = %config.gemini_model,
        "Aura gateway starting"
    );

    let app = router(AppState::new(shortcuts, search));
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("CTRL-C received; shutting down gateway");
        })
        .await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(serve_dashboard))
        .route("/api/shortcuts", get(list_shortcuts).post(add_shortcut))
        .route("/api/shortcuts/:id", delete(remove_shortcut))
        .route("/go/:id", get(open_shortcut))
        .route("/api/search", post(search_handler))
        .route("/api/search/web", get(web_search_handler))
        .route("/api/theme", get(get_theme))
        .route("/api/theme/toggle", post(toggle_theme))
        .with_state(state)
        .layer(axum::middleware::from_fn(log_requests))
}

async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;
    tracing::info!(%method, %uri, status = response.status().as_u16(), "request");
    response
}

async fn health() -> &'static str {
    "OK"
}

/// Dashboard page: profile card, widgets, shortcut grid, and search box.
async fn serve_dashboard() -> Html<&'static str> {
    const INDEX: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/index.html"));
    Html(INDEX)
}

async fn list_shortcuts(State(state): State<AppState>) -> Json<Vec<ShortcutView>> {
    let store = state.shortcuts.lock().await;
    Json(views(store.records()))
}

/// POST /api/shortcuts: blank name or url leaves the grid unchanged (still 200).
async fn add_shortcut(
    State(state): State<AppState>,
    Json(body): Json<AddShortcutRequest>,
) -> Result<Json<Vec<ShortcutView>>, ApiError> {
    let mut store = state.shortcuts.lock().await;
    let records = store.add(&body.name, &body.url).map_err(storage_error)?;
    Ok(Json(views(records)))
}

/// DELETE /api/shortcuts/:id?confirm=true. Without confirmation nothing is removed.
async fn remove_shortcut(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<RemoveParams>,
) -> Result<Json<RemoveResponse>, ApiError> {
    let mut store = state.shortcuts.lock().await;
    let removed = store
        .remove(&id, Confirmation::from_flag(params.confirm))
        .map_err(storage_error)?;
    Ok(Json(RemoveResponse {
        removed,
        shortcuts: views(store.records()),
    }))
}

/// GET /go/:id: hand the browser the shortcut's url. Reachability is not checked.
/// A stored url that cannot be sent as a `Location` header is answered with 422.
async fn open_shortcut(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let store = state.shortcuts.lock().await;
    let record = store
        .get(&id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no shortcut with id {}", id)))?;
    let location = HeaderValue::try_from(record.url.as_str()).map_err(|e| {
        tracing::warn!(id = %record.id, error = %e, "shortcut url is not a valid redirect target");
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("shortcut {} has an invalid url", record.id),
        )
    })?;
    Ok((StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response())
}

async fn search_handler(
    State(state): State<AppState>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<SearchResult>, ApiError> {
    match state.search.search(&body.query).await {
        Ok(result) => Ok(Json(result)),
        Err(e @ SearchRejection::EmptyQuery) => Err((StatusCode::BAD_REQUEST, e.to_string())),
        Err(e @ SearchRejection::InFlight) => Err((StatusCode::CONFLICT, e.to_string())),
    }
}

async fn web_search_handler(Query(params): Query<WebSearchParams>) -> Response {
    match web_search_url(&params.q) {
        Some(url) => Redirect::to(&url).into_response(),
        None => (StatusCode::BAD_REQUEST, "query is empty").into_response(),
    }
}

async fn get_theme(State(state): State<AppState>) -> Json<ThemeResponse> {
    let theme = *state.theme.lock().await;
    Json(ThemeResponse { theme })
}

async fn toggle_theme(State(state): State<AppState>) -> Json<ThemeResponse> {
    let mut theme = state.theme.lock().await;
    *theme = theme.toggle();
    Json(ThemeResponse { theme: *theme })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use aura_core::{
        BridgeError, Citation, GroundedAnswer, GroundedQuery, MemoryStorage, SearchProvider,
    };
    use tower::ServiceExt;

    struct CannedProvider;

    #[async_trait]
    impl SearchProvider for CannedProvider {
        async fn ground(&self, request: &GroundedQuery) -> Result<GroundedAnswer, BridgeError> {
            Ok(GroundedAnswer {
                text: Some(format!("answer to {}", request.query)),
                citations: vec![Citation {
                    title: None,
                    uri: "https://source.example".into(),
                }],
            })
        }
    }

    fn test_app(search: SmartSearch) -> Router {
        let store = ShortcutStore::load(Arc::new(MemoryStorage::new()));
        router(AppState::new(store, search))
    }

    async fn json_body(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_and_dashboard_page() {
        let app = test_app(SmartSearch::unconfigured());
        let res = app.clone().oneshot(empty_request("GET", "/health")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app.oneshot(empty_request("GET", "/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("<html"));
    }

    #[tokio::test]
    async fn test_list_shortcuts_includes_icons() {
        let app = test_app(SmartSearch::unconfigured());
        let res = app.oneshot(empty_request("GET", "/api/shortcuts")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = json_body(res).await;
        let list = json.as_array().unwrap();
        assert_eq!(list.len(), 6);
        assert_eq!(list[0]["name"], "CSDN");
        assert_eq!(list[0]["type"], "preset");
        assert_eq!(list[0]["icon"]["source"], "builtin");
        assert_eq!(list[0]["icon"]["icon"], "code");
    }

    #[tokio::test]
    async fn test_add_shortcut_normalizes_url() {
        let app = test_app(SmartSearch::unconfigured());
        let res = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/shortcuts",
                serde_json::json!({ "name": "Test", "url": "example.com" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = json_body(res).await;
        let list = json.as_array().unwrap();
        assert_eq!(list.len(), 7);
        let added = &list[6];
        assert_eq!(added["name"], "Test");
        assert_eq!(added["url"], "https://example.com");
        assert_eq!(added["type"], "custom");
        assert_eq!(added["icon"]["source"], "favicon");
        assert_eq!(
            added["icon"]["url"],
            "https://www.google.com/s2/favicons?domain=example.com&sz=64"
        );

        let res = app
            .oneshot(json_request(
                "POST",
                "/api/shortcuts",
                serde_json::json!({ "name": "  ", "url": "example.com" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await.as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_remove_shortcut_needs_confirm() {
        let app = test_app(SmartSearch::unconfigured());

        let res = app
            .clone()
            .oneshot(empty_request("DELETE", "/api/shortcuts/2"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = json_body(res).await;
        assert!(json["removed"].is_null());
        assert_eq!(json["shortcuts"].as_array().unwrap().len(), 6);

        let res = app
            .clone()
            .oneshot(empty_request("DELETE", "/api/shortcuts/2?confirm=true"))
            .await
            .unwrap();
        let json = json_body(res).await;
        assert_eq!(json["removed"]["name"], "NetPan");
        assert_eq!(json["shortcuts"].as_array().unwrap().len(), 5);

        let res = app
            .oneshot(empty_request("DELETE", "/api/shortcuts/missing?confirm=true"))
            .await
            .unwrap();
        let json = json_body(res).await;
        assert!(json["removed"].is_null());
        assert_eq!(json["shortcuts"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_open_shortcut_redirects() {
        let app = test_app(SmartSearch::unconfigured());
        let res = app.clone().oneshot(empty_request("GET", "/go/6")).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "https://github.com");

        let res = app.oneshot(empty_request("GET", "/go/nope")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_open_shortcut_with_unsendable_url_is_rejected() {
        let storage = MemoryStorage::with_contents(
            r#"[{"id":"odd","name":"Odd","url":"https://exa\nmple.com","type":"custom"}]"#,
        );
        let store = ShortcutStore::load(Arc::new(storage));
        assert_eq!(store.get("odd").unwrap().url, "https://exa\nmple.com");
        let app = router(AppState::new(store, SmartSearch::unconfigured()));

        let res = app.oneshot(empty_request("GET", "/go/odd")).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_added_url_with_newline_redirects_cleanly() {
        let app = test_app(SmartSearch::unconfigured());
        let res = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/shortcuts",
                serde_json::json!({ "name": "Odd", "url": "exa\nmple.com" }),
            ))
            .await
            .unwrap();
        let json = json_body(res).await;
        let added = &json.as_array().unwrap()[6];
        assert_eq!(added["url"], "https://example.com/");
        let id = added["id"].as_str().unwrap().to_string();

        let res = app
            .oneshot(empty_request("GET", &format!("/go/{}", id)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "https://example.com/");
    }

    #[tokio::test]
    async fn test_search_without_key_returns_placeholder() {
        let app = test_app(SmartSearch::unconfigured());
        let res = app
            .oneshot(json_request(
                "POST",
                "/api/search",
                serde_json::json!({ "query": "weather in Lisbon" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = json_body(res).await;
        assert_eq!(json["text"], aura_core::search::MISSING_KEY_TEXT);
        assert!(json.get("sources").is_none());
    }

    #[tokio::test]
    async fn test_search_with_provider_and_blank_query() {
        let app = test_app(SmartSearch::new(Some(Arc::new(CannedProvider))));
        let res = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/search",
                serde_json::json!({ "query": "tides" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = json_body(res).await;
        assert_eq!(json["text"], "answer to tides");
        assert_eq!(json["sources"][0]["title"], "Web Source");
        assert_eq!(json["sources"][0]["uri"], "https://source.example");

        let res = app
            .oneshot(json_request("POST", "/api/search", serde_json::json!({ "query": " " })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_web_search_redirect() {
        let app = test_app(SmartSearch::unconfigured());
        let res = app
            .clone()
            .oneshot(empty_request("GET", "/api/search/web?q=rust%20axum"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            res.headers()[header::LOCATION],
            "https://www.google.com/search?q=rust%20axum"
        );

        let res = app.oneshot(empty_request("GET", "/api/search/web")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_theme_toggle() {
        let app = test_app(SmartSearch::unconfigured());
        let res = app.clone().oneshot(empty_request("GET", "/api/theme")).await.unwrap();
        assert_eq!(json_body(res).await["theme"], "dark");

        let res = app
            .clone()
            .oneshot(empty_request("POST", "/api/theme/toggle"))
            .await
            .unwrap();
        assert_eq!(json_body(res).await["theme"], "light");

        let res = app.oneshot(empty_request("GET", "/api/theme")).await.unwrap();
        assert_eq!(json_body(res).await["theme"], "light");
    }
}
