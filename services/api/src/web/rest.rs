//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the dashboard endpoints and the master
//! definition for the OpenAPI specification.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{Json, Redirect},
    Extension,
};
use guardian_core::{GateDecision, Route, Session};
use std::sync::Arc;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::error::{DashboardError, ErrorResponse};
use crate::web::{
    auth,
    dashboard::Dashboard,
    middleware::session_token,
    protocol::{
        ActionResponse, CopyResponse, CreateFormRequest, DiaryFormRequest, GeneratedNameRequest,
        SelectPanelRequest,
    },
    state::AppState,
};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_view_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        dashboard_view_handler,
        reload_handler,
        select_panel_handler,
        open_vault_handler,
        close_vault_handler,
        open_secret_handler,
        delete_secret_handler,
        close_drawer_handler,
        toggle_reveal_handler,
        copy_handler,
        update_create_form_handler,
        save_created_secret_handler,
        generate_handler,
        update_generated_name_handler,
        save_generated_secret_handler,
        update_diary_form_handler,
        save_diary_entry_handler,
    ),
    components(
        schemas(ActionResponse, CopyResponse, ErrorResponse)
    ),
    tags(
        (name = "Guardian API", description = "Password vault and diary behind a local re-authentication gate.")
    )
)]
pub struct ApiDoc;

type ActionResult = Result<Json<ActionResponse>, DashboardError>;

async fn mounted(state: &AppState, session: &Session) -> Arc<Dashboard> {
    state.dashboard_for(session).await.0
}

//=========================================================================================
// Mounting
//=========================================================================================

/// Render the dashboard, mounting it on first visit.
///
/// The routing layer has already checked the session; the dashboard checks again
/// through the same gate before it mounts.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Current dashboard view", body = ActionResponse),
        (status = 303, description = "Not signed in; redirect to /auth")
    )
)]
pub async fn dashboard_view_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ActionResponse>, Redirect> {
    let (decision, session) = state
        .session_gate
        .check(Route::Main, session_token(&headers))
        .await;
    let session = match (decision, session) {
        (GateDecision::Proceed, Some(session)) => session,
        _ => return Err(Redirect::to(Route::Login.path())),
    };

    let (dashboard, notices) = state.dashboard_for(&session).await;
    Ok(Json(dashboard.respond(notices).await))
}

/// Discard all view state and mount afresh, like a full page reload.
#[utoipa::path(
    post,
    path = "/dashboard/reload",
    responses((status = 200, description = "Fresh dashboard view", body = ActionResponse))
)]
pub async fn reload_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Json<ActionResponse> {
    let (dashboard, notices) = state.remount(&session).await;
    Json(dashboard.respond(notices).await)
}

//=========================================================================================
// Panels
//=========================================================================================

#[utoipa::path(
    post,
    path = "/dashboard/panel",
    request_body = SelectPanelRequest,
    responses(
        (status = 200, description = "Panel selected", body = ActionResponse),
        (status = 403, description = "Diary unlock denied", body = ErrorResponse)
    )
)]
pub async fn select_panel_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(req): Json<SelectPanelRequest>,
) -> ActionResult {
    let dashboard = mounted(&state, &session).await;
    let notices = dashboard.select_panel(req.panel.into()).await?;
    Ok(Json(dashboard.respond(notices).await))
}

//=========================================================================================
// Vault and Drawer
//=========================================================================================

#[utoipa::path(
    post,
    path = "/dashboard/vault/open",
    responses(
        (status = 200, description = "Vault unlocked", body = ActionResponse),
        (status = 403, description = "Gate denied", body = ErrorResponse),
        (status = 408, description = "Gate timed out", body = ErrorResponse)
    )
)]
pub async fn open_vault_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> ActionResult {
    let dashboard = mounted(&state, &session).await;
    let notices = dashboard.open_vault().await?;
    Ok(Json(dashboard.respond(notices).await))
}

#[utoipa::path(
    post,
    path = "/dashboard/vault/close",
    responses((status = 200, description = "Vault and drawer closed", body = ActionResponse))
)]
pub async fn close_vault_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Json<ActionResponse> {
    let dashboard = mounted(&state, &session).await;
    dashboard.close_vault().await;
    Json(dashboard.respond(Vec::new()).await)
}

#[utoipa::path(
    post,
    path = "/dashboard/secrets/{id}/open",
    params(("id" = Uuid, Path, description = "The secret to open.")),
    responses(
        (status = 200, description = "Drawer open", body = ActionResponse),
        (status = 404, description = "Not in the vault", body = ErrorResponse),
        (status = 409, description = "Vault is closed", body = ErrorResponse)
    )
)]
pub async fn open_secret_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ActionResult {
    let dashboard = mounted(&state, &session).await;
    let notices = dashboard.open_secret(id).await?;
    Ok(Json(dashboard.respond(notices).await))
}

#[utoipa::path(
    post,
    path = "/dashboard/secrets/{id}/delete",
    params(("id" = Uuid, Path, description = "The secret to delete.")),
    responses(
        (status = 200, description = "Deleted (or already gone)", body = ActionResponse),
        (status = 502, description = "Store failure", body = ErrorResponse)
    )
)]
pub async fn delete_secret_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ActionResult {
    let dashboard = mounted(&state, &session).await;
    let notices = dashboard.delete_secret(id).await?;
    Ok(Json(dashboard.respond(notices).await))
}

#[utoipa::path(
    post,
    path = "/dashboard/drawer/close",
    responses((status = 200, description = "Drawer closed", body = ActionResponse))
)]
pub async fn close_drawer_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Json<ActionResponse> {
    let dashboard = mounted(&state, &session).await;
    dashboard.close_drawer().await;
    Json(dashboard.respond(Vec::new()).await)
}

#[utoipa::path(
    post,
    path = "/dashboard/drawer/reveal",
    responses(
        (status = 200, description = "Reveal flag toggled", body = ActionResponse),
        (status = 409, description = "No drawer open", body = ErrorResponse)
    )
)]
pub async fn toggle_reveal_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> ActionResult {
    let dashboard = mounted(&state, &session).await;
    dashboard.toggle_reveal().await?;
    Ok(Json(dashboard.respond(Vec::new()).await))
}

#[utoipa::path(
    post,
    path = "/dashboard/drawer/copy",
    responses(
        (status = 200, description = "Plaintext for the clipboard", body = CopyResponse),
        (status = 409, description = "No drawer open", body = ErrorResponse)
    )
)]
pub async fn copy_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<CopyResponse>, DashboardError> {
    let dashboard = mounted(&state, &session).await;
    let (value, notices) = dashboard.copy_value().await?;
    Ok(Json(CopyResponse {
        value,
        view: dashboard.view().await,
        notices,
    }))
}

//=========================================================================================
// Create Panel
//=========================================================================================

#[utoipa::path(
    put,
    path = "/dashboard/create",
    request_body = CreateFormRequest,
    responses((status = 200, description = "Form updated", body = ActionResponse))
)]
pub async fn update_create_form_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateFormRequest>,
) -> Json<ActionResponse> {
    let dashboard = mounted(&state, &session).await;
    dashboard.set_create_form(req.name, req.value).await;
    Json(dashboard.respond(Vec::new()).await)
}

#[utoipa::path(
    post,
    path = "/dashboard/create/save",
    responses(
        (status = 200, description = "Secret saved", body = ActionResponse),
        (status = 422, description = "Missing name or value", body = ErrorResponse)
    )
)]
pub async fn save_created_secret_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> ActionResult {
    let dashboard = mounted(&state, &session).await;
    let notices = dashboard.save_created_secret().await?;
    Ok(Json(dashboard.respond(notices).await))
}

//=========================================================================================
// Generate Panel
//=========================================================================================

#[utoipa::path(
    post,
    path = "/dashboard/generate",
    responses((status = 200, description = "A new value was generated", body = ActionResponse))
)]
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Json<ActionResponse> {
    let dashboard = mounted(&state, &session).await;
    dashboard.generate().await;
    Json(dashboard.respond(Vec::new()).await)
}

#[utoipa::path(
    put,
    path = "/dashboard/generate",
    request_body = GeneratedNameRequest,
    responses((status = 200, description = "Name updated", body = ActionResponse))
)]
pub async fn update_generated_name_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(req): Json<GeneratedNameRequest>,
) -> Json<ActionResponse> {
    let dashboard = mounted(&state, &session).await;
    dashboard.set_generated_name(req.name).await;
    Json(dashboard.respond(Vec::new()).await)
}

#[utoipa::path(
    post,
    path = "/dashboard/generate/save",
    responses(
        (status = 200, description = "Secret saved", body = ActionResponse),
        (status = 422, description = "Missing name or generated value", body = ErrorResponse)
    )
)]
pub async fn save_generated_secret_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> ActionResult {
    let dashboard = mounted(&state, &session).await;
    let notices = dashboard.save_generated_secret().await?;
    Ok(Json(dashboard.respond(notices).await))
}

//=========================================================================================
// Diary Panel
//=========================================================================================

#[utoipa::path(
    put,
    path = "/dashboard/diary",
    request_body = DiaryFormRequest,
    responses((status = 200, description = "Form updated", body = ActionResponse))
)]
pub async fn update_diary_form_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(req): Json<DiaryFormRequest>,
) -> Json<ActionResponse> {
    let dashboard = mounted(&state, &session).await;
    dashboard.set_diary_form(req.title, req.content, req.date).await;
    Json(dashboard.respond(Vec::new()).await)
}

#[utoipa::path(
    post,
    path = "/dashboard/diary/save",
    responses(
        (status = 200, description = "Entry saved", body = ActionResponse),
        (status = 422, description = "Missing title/content or bad date", body = ErrorResponse)
    )
)]
pub async fn save_diary_entry_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> ActionResult {
    let dashboard = mounted(&state, &session).await;
    let notices = dashboard.save_diary_entry().await?;
    Ok(Json(dashboard.respond(notices).await))
}
