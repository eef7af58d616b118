use super::auth::CurrentUserExtractor;
use crate::error::AppError;
use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

/// Staff or superuser only. Must run after the session middleware.
pub async fn staff_required(request: Request, next: Next) -> Response {
    let access = request
        .current_user()
        .map(|current| (current.user.id, current.user.is_admin()));

    match access {
        Some((_, true)) => next.run(request).await,
        Some((user_id, false)) => {
            tracing::warn!(user_id = user_id, "non-staff user denied admin access");
            AppError::Forbidden.into_response()
        }
        None => Redirect::to("/login/").into_response(),
    }
}
