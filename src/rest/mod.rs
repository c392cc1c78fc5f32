use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    auth::{GoogleOAuth, SessionStore},
    storage::Storage,
};

mod auth_handlers;
pub mod form;
mod handlers;
pub mod models;
pub mod session;
mod templates;

pub use templates::Templates;

#[derive(Clone)]
pub struct AppState<S: Storage> {
    pub storage: S,
    pub sessions: SessionStore,
    pub templates: Arc<Templates>,
    pub google: Option<GoogleOAuth>,
    pub secure_cookies: bool,
    pub started_at: std::time::SystemTime,
}

impl<S: Storage> AppState<S> {
    pub fn new(storage: S, google: Option<GoogleOAuth>, secure_cookies: bool) -> anyhow::Result<Self> {
        Ok(Self {
            storage,
            sessions: SessionStore::new(),
            templates: Arc::new(Templates::new()?),
            google,
            secure_cookies,
            started_at: std::time::SystemTime::now(),
        })
    }
}

pub fn router<S: Storage + Clone + Send + Sync + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/", get(handlers::index::<S>))
        .route("/health", get(handlers::health::<S>))
        .route("/static/:file", get(handlers::static_asset))
        .route("/register", post(auth_handlers::register::<S>))
        .route("/login", post(auth_handlers::login::<S>))
        .route("/logout", get(auth_handlers::logout::<S>))
        .route("/google_login", get(auth_handlers::google_login::<S>))
        .route(
            "/google_login/callback",
            get(auth_handlers::google_callback::<S>),
        )
        .route("/dashboard", get(handlers::dashboard::<S>))
        .route(
            "/create_plan",
            get(handlers::create_plan_form::<S>).post(handlers::create_plan::<S>),
        )
        .route("/exercise_library", get(handlers::exercise_library::<S>))
        .route("/start_workout/:plan_id", get(handlers::start_workout::<S>))
        .route("/complete_exercise", post(handlers::complete_exercise::<S>))
        .route("/finish_workout", post(handlers::finish_workout::<S>))
        .route("/progress", get(handlers::progress::<S>))
        .fallback(handlers::not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(::tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(::tracing::Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve<S: Storage + Clone + Send + Sync + 'static>(
    addr: SocketAddr,
    state: AppState<S>,
    shutdown: tokio_util::sync::CancellationToken,
) -> anyhow::Result<()> {
    log::info!("🌐 Web service on http://{}", addr);

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            log::info!("🛑 Web shutdown requested");
        })
        .await?;
    log::info!("👋 Web server exited");
    Ok(())
}
