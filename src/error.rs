use crate::handlers::ui;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                Html(ui::error_page("Not Found", "The requested page does not exist.")),
            )
                .into_response(),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                Html(ui::error_page("Forbidden", "You do not have access to this page.")),
            )
                .into_response(),
            err => {
                let error_id = Uuid::new_v4();
                tracing::error!(error_id = %error_id, error = %err, "unhandled error occurred");

                // Don't expose internal error details in release builds
                let detail = if cfg!(debug_assertions) {
                    format!("Internal server error: {} (ID: {})", err, error_id)
                } else {
                    format!("Internal server error (ID: {})", error_id)
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(ui::error_page("Server Error", &detail)),
                )
                    .into_response()
            }
        }
    }
}
