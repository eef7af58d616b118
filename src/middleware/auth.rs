use crate::session::{self, CurrentUser, SESSION_COOKIE};
use crate::AppState;
use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;

/// Resolves the `sessionid` cookie and, when it names a live session, puts
/// the [`CurrentUser`] into the request extensions. Anonymous requests pass
/// through untouched.
pub async fn session_middleware(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let mut resolved = None;
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        match session::resolve_session(state.store.as_ref(), &state.config, cookie.value()).await {
            Ok(Some(current)) => {
                request.extensions_mut().insert(current.clone());
                resolved = Some(current);
            }
            Ok(None) => {
                tracing::debug!("Stale session cookie ignored");
            }
            Err(e) => {
                tracing::warn!("Session lookup failed: {}", e);
            }
        }
    }

    let mut response = next.run(request).await;
    // lets the request logger attribute the response
    if let Some(current) = resolved {
        response.extensions_mut().insert(current);
    }
    response
}

/// Sends anonymous visitors to the login page.
pub async fn login_required(request: Request, next: Next) -> Response {
    if request.extensions().get::<CurrentUser>().is_none() {
        return Redirect::to("/login/").into_response();
    }
    next.run(request).await
}

// Extension trait to easily extract the current user from request extensions
pub trait CurrentUserExtractor {
    fn current_user(&self) -> Option<&CurrentUser>;
}

impl CurrentUserExtractor for Request {
    fn current_user(&self) -> Option<&CurrentUser> {
        self.extensions().get::<CurrentUser>()
    }
}
