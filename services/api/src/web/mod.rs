pub mod auth;
pub mod dashboard;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    response::Redirect,
    routing::{get, post},
    Router,
};
use guardian_core::Route;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;
use auth::{login_handler, login_view_handler, logout_handler, signup_handler};
use middleware::{require_session, session_gate};
use rest::*;
use state::AppState;

// Re-export the pieces the binary needs to build the web server.
pub use dashboard::{Dashboard, DashboardDeps};

/// Builds the complete application router.
pub fn router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS origin: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Page navigations: redirected by the session gate before any handler runs.
    let page_routes = Router::new()
        .route("/", get(|| async { Redirect::to(Route::Login.path()) }))
        .route("/auth", get(login_view_handler))
        .route("/dashboard", get(dashboard_view_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            session_gate,
        ));

    // Public auth actions (no session required)
    let auth_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Dashboard actions (session required)
    let action_routes = Router::new()
        .route("/dashboard/reload", post(reload_handler))
        .route("/dashboard/panel", post(select_panel_handler))
        .route("/dashboard/vault/open", post(open_vault_handler))
        .route("/dashboard/vault/close", post(close_vault_handler))
        .route("/dashboard/secrets/{id}/open", post(open_secret_handler))
        .route("/dashboard/secrets/{id}/delete", post(delete_secret_handler))
        .route("/dashboard/drawer/close", post(close_drawer_handler))
        .route("/dashboard/drawer/reveal", post(toggle_reveal_handler))
        .route("/dashboard/drawer/copy", post(copy_handler))
        .route("/dashboard/create", axum::routing::put(update_create_form_handler))
        .route("/dashboard/create/save", post(save_created_secret_handler))
        .route(
            "/dashboard/generate",
            post(generate_handler).put(update_generated_name_handler),
        )
        .route("/dashboard/generate/save", post(save_generated_secret_handler))
        .route("/dashboard/diary", axum::routing::put(update_diary_form_handler))
        .route("/dashboard/diary/save", post(save_diary_entry_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_session,
        ));

    let api_router = Router::new()
        .merge(page_routes)
        .merge(auth_routes)
        .merge(action_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
