//! services/api/src/error.rs
//!
//! Defines the primary error type for the API service and the typed outcome of
//! failed dashboard actions.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use guardian_core::{GateOutcome, PortError, ValidationError};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

//=========================================================================================
// Dashboard Action Errors
//=========================================================================================

/// Why a dashboard action did not complete. Every variant leaves the view state as it
/// was before the action started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DashboardError {
    #[error("Authentication was denied")]
    GateDenied,
    #[error("Authentication timed out")]
    GateTimedOut,
    #[error("Authentication was cancelled")]
    GateCancelled,
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("You are not signed in")]
    Unauthorized,
    #[error("Open the vault first")]
    VaultClosed,
    #[error("No secret is selected")]
    NoSecretSelected,
    #[error("Secret {0} is not in the vault")]
    UnknownSecret(Uuid),
    #[error("{action} failed: {source}")]
    Store {
        action: &'static str,
        #[source]
        source: PortError,
    },
}

pub type DashboardResult<T> = Result<T, DashboardError>;

impl DashboardError {
    /// Maps a gate outcome that was not `Granted`.
    pub fn from_gate(outcome: GateOutcome) -> Option<Self> {
        match outcome {
            GateOutcome::Granted => None,
            GateOutcome::Denied => Some(DashboardError::GateDenied),
            GateOutcome::TimedOut => Some(DashboardError::GateTimedOut),
            GateOutcome::Cancelled => Some(DashboardError::GateCancelled),
        }
    }

    pub fn store(action: &'static str, source: PortError) -> Self {
        match source {
            PortError::Unauthorized => DashboardError::Unauthorized,
            source => DashboardError::Store { action, source },
        }
    }

    /// Stable machine-readable identifier, independent of the display text.
    pub fn code(&self) -> &'static str {
        match self {
            DashboardError::GateDenied => "gate_denied",
            DashboardError::GateTimedOut => "gate_timed_out",
            DashboardError::GateCancelled => "gate_cancelled",
            DashboardError::Validation(_) => "validation_failed",
            DashboardError::Unauthorized => "unauthorized",
            DashboardError::VaultClosed => "vault_closed",
            DashboardError::NoSecretSelected => "no_secret_selected",
            DashboardError::UnknownSecret(_) => "unknown_secret",
            DashboardError::Store { .. } => "store_failed",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            DashboardError::GateDenied => StatusCode::FORBIDDEN,
            DashboardError::GateTimedOut => StatusCode::REQUEST_TIMEOUT,
            DashboardError::GateCancelled => StatusCode::CONFLICT,
            DashboardError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DashboardError::Unauthorized => StatusCode::UNAUTHORIZED,
            DashboardError::VaultClosed | DashboardError::NoSecretSelected => StatusCode::CONFLICT,
            DashboardError::UnknownSecret(_) => StatusCode::NOT_FOUND,
            DashboardError::Store { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

/// The JSON body of every failed dashboard action.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
