use super::{form_error, ui};
use crate::error::AppResult;
use crate::middleware::auth::login_required;
use crate::middleware::rate_limit::credential_rate_limit_middleware;
use crate::models::auth::{LoginForm, NewUser, SignupForm};
use crate::session::{self, CurrentUser, SessionExpiry};
use crate::store::{StoreError, USERNAME_TAKEN};
use crate::validators::{validate_new_password, validate_username};
use crate::AppState;
use axum::{
    extract::{Extension, Form},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post, Router},
};
use axum_extra::extract::CookieJar;
use bcrypt::{hash, verify};
use std::sync::Arc;

const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

pub fn auth_routes() -> Router {
    let public = Router::new()
        .route("/login/", get(login_form).post(login))
        .route("/signup/", get(signup_form).post(signup))
        .route_layer(axum::middleware::from_fn(credential_rate_limit_middleware));

    let protected = Router::new()
        .route("/logout/", post(logout))
        .route_layer(axum::middleware::from_fn(login_required));

    public.merge(protected)
}

async fn signup_form(current: Option<Extension<CurrentUser>>) -> Response {
    if current.is_some() {
        return Redirect::to("/").into_response();
    }
    Html(ui::signup_page(&[], "")).into_response()
}

async fn signup(
    Extension(state): Extension<Arc<AppState>>,
    current: Option<Extension<CurrentUser>>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> AppResult<Response> {
    if current.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let username = form.username.trim().to_string();

    let mut errors = Vec::new();
    if let Err(e) = validate_username(&username) {
        errors.push(e);
    }
    errors.extend(validate_new_password(&form.password1, &form.password2, &username));

    if errors.is_empty() && state.store.user_by_username(&username).await?.is_some() {
        errors.push(USERNAME_TAKEN.to_string());
    }
    if !errors.is_empty() {
        return Ok(form_error(ui::signup_page(&errors, &username)));
    }

    let password_hash = hash(&form.password1, state.config.bcrypt_cost)?;

    let new_user = NewUser {
        username: username.clone(),
        email: String::new(),
        password_hash,
        is_staff: false,
        is_superuser: false,
    };
    let user = match state.store.create_user(new_user).await {
        Ok(user) => user,
        // lost a race with another signup for the same name
        Err(StoreError::Conflict(message)) => {
            return Ok(form_error(ui::signup_page(&[message], &username)));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = user.id, username = %user.username, "user signed up");

    let cookie = session::start_session(
        state.store.as_ref(),
        &state.config,
        &user,
        SessionExpiry::BrowserClose,
    )
    .await?;

    Ok((jar.add(cookie), Redirect::to("/")).into_response())
}

async fn login_form(current: Option<Extension<CurrentUser>>) -> Response {
    if current.is_some() {
        return Redirect::to("/").into_response();
    }
    Html(ui::login_page(&[], "", false)).into_response()
}

async fn login(
    Extension(state): Extension<Arc<AppState>>,
    current: Option<Extension<CurrentUser>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    if current.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let username = form.username.trim();
    let remember_me = form.remember_me();

    if username.is_empty() || form.password.is_empty() {
        return Ok(form_error(ui::login_page(
            &["Please enter a username and password.".to_string()],
            username,
            remember_me,
        )));
    }

    let user = match state.store.user_by_username(username).await? {
        Some(user) if user.is_active => user,
        _ => {
            tracing::warn!(username = %username, "login failed: unknown or inactive user");
            return Ok(form_error(ui::login_page(
                &[INVALID_LOGIN.to_string()],
                username,
                remember_me,
            )));
        }
    };

    if !verify(&form.password, &user.password_hash)? {
        tracing::warn!(user_id = user.id, "login failed: wrong password");
        return Ok(form_error(ui::login_page(
            &[INVALID_LOGIN.to_string()],
            username,
            remember_me,
        )));
    }

    let expiry = SessionExpiry::from_remember_me(remember_me);
    let cookie = session::start_session(state.store.as_ref(), &state.config, &user, expiry).await?;

    tracing::info!(user_id = user.id, remember_me = remember_me, "user logged in");

    Ok((jar.add(cookie), Redirect::to("/")).into_response())
}

async fn logout(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> AppResult<Response> {
    session::end_session(state.store.as_ref(), current.session_id).await?;

    tracing::info!(user_id = current.user.id, "user logged out");

    Ok((jar.remove(session::removal_cookie()), Redirect::to("/login/")).into_response())
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_signup_creates_user_and_logs_in() {
        let state = test_state();

        let response = send(
            &state,
            form_post("/signup/", "username=ada&password1=analytical1&password2=analytical1", None),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        let cookie = session_cookie(&response).expect("signup should set a session cookie");
        assert!(!set_cookie_header(&response).unwrap().contains("Max-Age"));

        let user = state.store.user_by_username("ada").await.unwrap().unwrap();
        assert_ne!(user.password_hash, "analytical1");

        let response = send(&state, get("/", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Signed in as ada"));
    }

    #[tokio::test]
    async fn test_signup_rejects_mismatched_passwords_and_taken_names() {
        let state = test_state();
        create_user(&state, "ada", "analytical1").await;

        let response = send(
            &state,
            form_post("/signup/", "username=bob&password1=analytical1&password2=analytical2", None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("didn&#x27;t match"));

        let response = send(
            &state,
            form_post("/signup/", "username=ada&password1=analytical1&password2=analytical1", None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("already exists"));
        assert!(state.store.user_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_signup_redirects_authenticated_users() {
        let state = test_state();
        let ada = create_user(&state, "ada", "analytical1").await;
        let cookie = login_cookie(&state, &ada).await;

        let response = send(&state, get("/signup/", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_login_without_remember_me_uses_browser_session_cookie() {
        let state = test_state();
        create_user(&state, "ada", "analytical1").await;

        let response = send(
            &state,
            form_post("/login/", "username=ada&password=analytical1", None),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        let header = set_cookie_header(&response).unwrap();
        assert!(header.starts_with("sessionid="));
        assert!(header.contains("HttpOnly"));
        assert!(!header.contains("Max-Age"));
    }

    #[tokio::test]
    async fn test_login_with_remember_me_persists_two_weeks() {
        let state = test_state();
        let ada = create_user(&state, "ada", "analytical1").await;

        let response = send(
            &state,
            form_post("/login/", "username=ada&password=analytical1&remember_me=on", None),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let header = set_cookie_header(&response).unwrap();
        assert!(header.contains("Max-Age=1209600"));

        let refreshed = state.store.user_by_id(ada.id).await.unwrap().unwrap();
        assert!(refreshed.last_login.is_some());
    }

    #[tokio::test]
    async fn test_login_rejects_bad_password() {
        let state = test_state();
        create_user(&state, "ada", "analytical1").await;

        let response = send(
            &state,
            form_post("/login/", "username=ada&password=wrong-guess", None),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(session_cookie(&response).is_none());
        assert!(body_text(response).await.contains("correct username and password"));
    }

    #[tokio::test]
    async fn test_logout_revokes_session() {
        let state = test_state();
        let ada = create_user(&state, "ada", "analytical1").await;
        let cookie = login_cookie(&state, &ada).await;

        let response = send(&state, form_post("/logout/", "", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login/");
        assert!(set_cookie_header(&response).unwrap().starts_with("sessionid=;"));

        // the old cookie no longer authenticates
        let response = send(&state, get("/readmessage/", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login/");
    }

    #[tokio::test]
    async fn test_logout_requires_login() {
        let state = test_state();
        let response = send(&state, form_post("/logout/", "", None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login/");
    }

    #[tokio::test]
    async fn test_logout_link_does_not_end_session() {
        let state = test_state();
        let ada = create_user(&state, "ada", "analytical1").await;
        let cookie = login_cookie(&state, &ada).await;

        let response = send(&state, get("/logout/", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let response = send(&state, get("/readmessage/", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_signup_rejects_case_variant_of_taken_name() {
        let state = test_state();
        create_user(&state, "ada", "analytical1").await;

        let response = send(
            &state,
            form_post("/signup/", "username=ADA&password1=analytical1&password2=analytical1", None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("already exists"));
        assert!(state.store.user_by_username("ADA").await.unwrap().is_none());
    }
}
