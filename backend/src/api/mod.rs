//! HTTP layer: shared state, router assembly and the middleware pipeline.

pub mod extract;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{handler::HandlerWithoutStateExt, middleware::from_fn_with_state, Router};
use sqlx::PgPool;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::SessionStore;

use crate::config::Config;
use crate::session::session_layer;
use crate::templates::Templates;

/// Application state shared by every handler.
pub struct AppState {
    pub config: Config,
    pub db: PgPool,
    pub templates: Templates,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Config, db: PgPool, templates: Templates) -> SharedState {
        Arc::new(Self {
            config,
            db,
            templates,
        })
    }
}

/// Build the application router.
///
/// Request flow, outermost first: access log (`TraceLayer`), parameter
/// pollution guard (production only), error page rendering, then either
/// static files or session + current user + route groups. Anything unmatched,
/// including a known path with another method, ends in the 404 page.
pub fn build_router<S>(state: SharedState, store: S) -> Router
where
    S: SessionStore + Clone,
{
    let routes = Router::new()
        .merge(handlers::page::router())
        .nest("/auth", handlers::auth::router())
        .nest("/post", handlers::post::router())
        .nest("/user", handlers::user::router())
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth::load_user,
        ))
        .layer(session_layer(store, &state.config));

    let access_log = middleware::access_log::AccessLog::new(&state.config);

    let uploads = ServeDir::new(&state.config.uploads_dir)
        .call_fallback_on_method_not_allowed(true)
        .fallback(handlers::fallback::not_found.into_service());
    let public = ServeDir::new(&state.config.public_dir)
        .call_fallback_on_method_not_allowed(true)
        .fallback(handlers::fallback::not_found.into_service());

    Router::new()
        .merge(routes)
        .nest_service("/img", uploads)
        .fallback_service(public)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::error_page::render_error_page,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::hpp::parameter_pollution,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(access_log)
                .on_response(access_log),
        )
        .with_state(state)
}
