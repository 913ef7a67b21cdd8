//! compare-server library - product comparison HTTP service
//!
//! Thin request handlers over the comparison core in `compare-common`.
//! [`AppState::new`] is the composition root: store, bridge and projector
//! are built once and shared by every handler.

use axum::Router;
use compare_common::config::TomlConfig;
use compare_common::db::SqliteMetaStore;
use compare_common::{
    CatalogLookup, ComparisonProjector, ComparisonStore, SessionBridge, SqliteCatalog,
};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt::MakeWriter, EnvFilter};

pub mod api;
pub mod error;

pub use api::SESSION_HEADER;
pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Bootstrap configuration (capacity, access rules)
    pub config: Arc<TomlConfig>,
    pub store: ComparisonStore,
    pub bridge: SessionBridge,
    pub projector: ComparisonProjector,
}

impl AppState {
    /// Wire the core against the database-backed meta store and catalog
    pub fn new(db: SqlitePool, config: TomlConfig) -> Self {
        let catalog = Arc::new(SqliteCatalog::new(db.clone()));
        Self::with_catalog(db, config, catalog)
    }

    /// Same as [`AppState::new`] with a caller-supplied catalog
    pub fn with_catalog(
        db: SqlitePool,
        config: TomlConfig,
        catalog: Arc<dyn CatalogLookup>,
    ) -> Self {
        let meta = Arc::new(SqliteMetaStore::new(db.clone()));
        let store = ComparisonStore::new(meta, config.max_items);
        let bridge = SessionBridge::new(store.clone());
        let projector = ComparisonProjector::new(store.clone(), catalog);

        Self {
            db,
            config: Arc::new(config),
            store,
            bridge,
            projector,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::post;
    use tower_http::trace::TraceLayer;

    // Routes that require a verified session and token
    let protected = Router::new()
        .route("/api/compare/add", post(api::add_item))
        .route("/api/compare/remove", post(api::remove_item))
        .route("/api/compare/clear", post(api::clear_items))
        .route("/api/compare/list", post(api::get_list))
        .route("/api/compare/matrix", post(api::get_matrix))
        .route("/api/session/login", post(api::login))
        .route("/api/session/logout", post(api::logout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::session_middleware,
        ));

    // Public routes
    let public = Router::new()
        .route("/api/session", post(api::create_session))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load bootstrap configuration before the global subscriber is installed
///
/// Loading runs under a scoped subscriber (`RUST_LOG`, else `info`) so a
/// missing or defaulted config file is still reported.
pub fn load_config<W>(path: Option<&Path>, make_writer: W) -> compare_common::Result<TomlConfig>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(make_writer)
        .with_ansi(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || TomlConfig::load(path))
}
