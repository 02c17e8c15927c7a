use axum::{
    Router, middleware,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, IdRegistry, ReportCases};
use crate::state::SharedState;

pub mod auth;
mod error;
mod follow;
mod messages;
mod observability;
mod profile;
mod projects;
mod reports;
pub mod session;
mod types;
pub mod validation;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn new(shared: Arc<SharedState>, prometheus_handle: Option<PrometheusHandle>) -> Arc<Self> {
        Arc::new(Self {
            shared,
            start_time: std::time::Instant::now(),
            prometheus_handle,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    #[must_use]
    pub fn ids(&self) -> &IdRegistry {
        &self.shared.ids
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn report_cases(&self) -> &ReportCases {
        &self.shared.report_cases
    }
}

pub async fn router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let server = state.config().server.clone();

    let session_store = SqliteStore::new(state.store().conn.get_sqlite_connection_pool().clone());
    session_store.migrate().await?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(server.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            server.session_inactivity_minutes,
        )));

    let protected_routes = create_protected_router(state.clone());

    Ok(Router::new()
        .merge(protected_routes)
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/register", get(auth::register_page).post(auth::register))
        .route(
            "/reset_password_request",
            get(auth::reset_password_request_page).post(auth::reset_password_request),
        )
        .route(
            "/reset_password/{token}",
            get(auth::reset_password_page).post(auth::reset_password),
        )
        .route("/metrics", get(observability::get_metrics))
        .layer(session_layer)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware)))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(projects::index))
        .route("/index", get(projects::index))
        .route("/home", get(projects::index))
        .route("/explore", get(projects::explore))
        .route("/profile/{username}", get(profile::profile))
        .route(
            "/edit_profile",
            get(profile::edit_profile_page).post(profile::edit_profile),
        )
        .route("/my_projects/{username}", get(projects::my_projects))
        .route(
            "/create_project/{username}",
            get(projects::create_project_page).post(projects::create_project),
        )
        .route("/follow/{username}", post(follow::follow))
        .route("/unfollow/{username}", post(follow::unfollow))
        .route("/project/{projectid}/apply", post(projects::apply))
        .route(
            "/project/{projectid}/applications",
            get(projects::applications),
        )
        .route(
            "/applications/{appliedid}/accept",
            post(projects::accept_application),
        )
        .route("/project/{projectid}/like", post(projects::toggle_like))
        .route(
            "/channel/{channel}",
            get(messages::channel).post(messages::post_message),
        )
        .route(
            "/report/{username}",
            get(reports::report_page).post(reports::report),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            session::require_login,
        ))
}
