// src/handlers/mod.rs
pub mod account;
pub mod admin;
pub mod auth;
pub mod messages;
pub mod status;
pub mod ui;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

/// Re-rendered form with validation errors.
pub(crate) fn form_error(page: String) -> Response {
    (StatusCode::BAD_REQUEST, Html(page)).into_response()
}
