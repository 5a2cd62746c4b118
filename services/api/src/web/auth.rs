//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: the login view, signup, login, and logout.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use guardian_core::{PortError, Route, Session};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::appearance::AuthUiConfig;
use crate::web::middleware::{session_token, SESSION_COOKIE};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    /// Where the client should navigate next.
    pub redirect_to: String,
}

/// The login view: everything needed to render the sign-in form.
#[derive(Serialize, ToSchema)]
pub struct LoginViewResponse {
    pub appearance: AuthUiConfig,
    pub signup_path: String,
    pub login_path: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn session_cookie(state: &AppState, session: &Session) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        session.token,
        state.config.session_ttl.num_seconds()
    )
}

fn cleared_cookie() -> String {
    format!("{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE)
}

fn validate_credentials(email: &str, password: &str) -> Result<(), (StatusCode, String)> {
    if email.trim().is_empty() || password.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Email and password are required".to_string()));
    }
    Ok(())
}

async fn start_session(
    state: &AppState,
    user_id: Uuid,
) -> Result<Session, (StatusCode, String)> {
    state
        .identity
        .create_session(user_id, state.config.session_ttl)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
        })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /auth - The login view. Signed-in users are redirected before reaching it.
#[utoipa::path(
    get,
    path = "/auth",
    responses(
        (status = 200, description = "Sign-in form configuration", body = LoginViewResponse),
        (status = 303, description = "Already signed in; redirect to /dashboard")
    )
)]
pub async fn login_view_handler(State(state): State<Arc<AppState>>) -> Json<LoginViewResponse> {
    Json(LoginViewResponse {
        appearance: state.config.auth_ui.clone(),
        signup_path: "/auth/signup".to_string(),
        login_path: "/auth/login".to_string(),
    })
}

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate_credentials(&req.email, &req.password)?;

    // 1. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
        })?
        .to_string();

    // 2. Create user with the identity provider
    let user = state
        .identity
        .create_user(&req.email, &password_hash)
        .await
        .map_err(|e| {
            error!("Failed to create user: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user".to_string())
        })?;

    // 3. Sign the new user in
    let session = start_session(&state, user.user_id).await?;
    info!("User {} signed up.", user.user_id);

    let response = AuthResponse {
        user_id: user.user_id,
        email: user.email,
        redirect_to: Route::Main.path().to_string(),
    };
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_cookie(&state, &session))],
        Json(response),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate_credentials(&req.email, &req.password)?;

    // 1. Get user by email
    let user_creds = state
        .identity
        .get_credentials(&req.email)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => {
                (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string())
            }
            e => {
                error!("Failed to get user: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
            }
        })?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&user_creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();

    if !valid {
        return Err((StatusCode::UNAUTHORIZED, "Invalid email or password".to_string()));
    }

    // 3. Start the session
    let session = start_session(&state, user_creds.user_id).await?;
    info!("User {} signed in.", user_creds.user_id);

    let response = AuthResponse {
        user_id: user_creds.user_id,
        email: user_creds.email,
        redirect_to: Route::Main.path().to_string(),
    };
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&state, &session))],
        Json(response),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Extract session token from cookie
    let token = session_token(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    // 2. Delete the session with the identity provider
    state.identity.delete_session(token).await.map_err(|e| {
        error!("Failed to delete auth session: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string())
    })?;

    // 3. Drop the view state now rather than waiting for the change notification
    state.dashboards.unmount(token).await;

    // 4. Clear cookie
    Ok((StatusCode::OK, [(header::SET_COOKIE, cleared_cookie())]))
}
