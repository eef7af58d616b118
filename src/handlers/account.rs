use super::{form_error, ui};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::login_required;
use crate::models::auth::{ProfileForm, ProfileUpdate};
use crate::session::{self, CurrentUser};
use crate::store::StoreError;
use crate::validators::{validate_email, validate_name, validate_username};
use crate::AppState;
use axum::{
    extract::{Extension, Form},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, Router},
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;

pub fn account_routes() -> Router {
    Router::new()
        .route("/edit-profile/", get(edit_profile_form).post(edit_profile))
        .route("/delete-account/", get(delete_account_form).post(delete_account))
        .route_layer(axum::middleware::from_fn(login_required))
}

async fn edit_profile_form(Extension(current): Extension<CurrentUser>) -> Html<String> {
    let form = ProfileForm::from(&current.user);
    Html(ui::edit_profile_page(&current.user, &form, &[]))
}

async fn edit_profile(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Form(form): Form<ProfileForm>,
) -> AppResult<Response> {
    let update = ProfileUpdate::from(form);

    let errors: Vec<String> = [
        validate_username(&update.username),
        validate_email(&update.email),
        validate_name("First name", &update.first_name),
        validate_name("Last name", &update.last_name),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect();

    if !errors.is_empty() {
        return Ok(form_error(ui::edit_profile_page(
            &current.user,
            &profile_form(&update),
            &errors,
        )));
    }

    match state.store.update_profile(current.user.id, &update).await {
        Ok(Some(user)) => {
            tracing::info!(user_id = user.id, "profile updated");
            Ok(Redirect::to("/").into_response())
        }
        Ok(None) => Err(AppError::NotFound),
        Err(StoreError::Conflict(message)) => Ok(form_error(ui::edit_profile_page(
            &current.user,
            &profile_form(&update),
            &[message],
        ))),
        Err(e) => Err(e.into()),
    }
}

fn profile_form(update: &ProfileUpdate) -> ProfileForm {
    ProfileForm {
        username: update.username.clone(),
        email: update.email.clone(),
        first_name: update.first_name.clone(),
        last_name: update.last_name.clone(),
    }
}

async fn delete_account_form(Extension(current): Extension<CurrentUser>) -> Html<String> {
    Html(ui::delete_account_page(&current.user))
}

async fn delete_account(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> AppResult<Response> {
    match state.store.delete_user(current.user.id).await {
        Ok(true) => {
            tracing::info!(user_id = current.user.id, username = %current.user.username, "account deleted");
            Ok((jar.remove(session::removal_cookie()), Redirect::to("/login/")).into_response())
        }
        Ok(false) => Err(AppError::NotFound),
        Err(e) => {
            // the visitor only sees the confirmation page again
            tracing::warn!(user_id = current.user.id, error = %e, "account deletion failed");
            Ok(Redirect::to("/delete-account/").into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::models::auth::{NewUser, ProfileUpdate, Session, User};
    use crate::models::message::{Message, MessageView, NewMessage, UserActivity};
    use crate::store::{MemoryStore, Store, StoreError, StoreResult};
    use crate::test_support::*;
    use axum::http::StatusCode;
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_edit_profile_updates_own_record() {
        let state = test_state();
        let ada = create_user(&state, "ada", "analytical1").await;
        let cookie = login_cookie(&state, &ada).await;

        let response = send(&state, get("/edit-profile/", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains(r#"value="ada""#));

        let response = send(
            &state,
            form_post(
                "/edit-profile/",
                "username=countess&email=ada%40example.com&first_name=Ada&last_name=Lovelace",
                Some(&cookie),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let updated = state.store.user_by_id(ada.id).await.unwrap().unwrap();
        assert_eq!(updated.username, "countess");
        assert_eq!(updated.email, "ada@example.com");
        assert_eq!(updated.display_name(), "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_edit_profile_rejects_taken_username() {
        let state = test_state();
        let ada = create_user(&state, "ada", "analytical1").await;
        create_user(&state, "bob", "analytical1").await;
        let cookie = login_cookie(&state, &ada).await;

        let response = send(
            &state,
            form_post("/edit-profile/", "username=bob&email=", Some(&cookie)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("already exists"));
        assert_eq!(
            state.store.user_by_id(ada.id).await.unwrap().unwrap().username,
            "ada"
        );
    }

    #[tokio::test]
    async fn test_edit_profile_requires_login() {
        let state = test_state();
        let response = send(&state, get("/edit-profile/", None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login/");
    }

    #[tokio::test]
    async fn test_delete_account_cascades_messages() {
        let state = test_state();
        let ada = create_user(&state, "ada", "analytical1").await;
        let bob = create_user(&state, "bob", "analytical1").await;
        let cy = create_user(&state, "cy", "analytical1").await;
        for (from, to) in [(ada.id, bob.id), (bob.id, ada.id), (bob.id, cy.id)] {
            state
                .store
                .create_message(NewMessage {
                    description: "hello".to_string(),
                    user_id: from,
                    to_user_id: to,
                })
                .await
                .unwrap();
        }
        let cookie = login_cookie(&state, &ada).await;

        let response = send(&state, get("/delete-account/", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&state, form_post("/delete-account/", "", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login/");

        assert!(state.store.user_by_id(ada.id).await.unwrap().is_none());
        let bob_sent = state.store.messages_sent_by(bob.id).await.unwrap();
        assert_eq!(bob_sent.len(), 1);
        assert_eq!(bob_sent[0].to_user_id, cy.id);
        assert!(state.store.messages_sent_by(ada.id).await.unwrap().is_empty());

        // the session went with the account
        let response = send(&state, get("/", Some(&cookie))).await;
        assert_eq!(location(&response), "/login/");
    }

    /// Store whose account deletion always fails.
    struct BrokenDeletes(MemoryStore);

    #[async_trait::async_trait]
    impl Store for BrokenDeletes {
        async fn create_user(&self, u: NewUser) -> StoreResult<User> {
            self.0.create_user(u).await
        }
        async fn user_by_id(&self, id: i32) -> StoreResult<Option<User>> {
            self.0.user_by_id(id).await
        }
        async fn user_by_username(&self, name: &str) -> StoreResult<Option<User>> {
            self.0.user_by_username(name).await
        }
        async fn list_users(&self) -> StoreResult<Vec<User>> {
            self.0.list_users().await
        }
        async fn update_profile(
            &self,
            id: i32,
            update: &ProfileUpdate,
        ) -> StoreResult<Option<User>> {
            self.0.update_profile(id, update).await
        }
        async fn record_login(&self, id: i32, at: DateTime<Utc>) -> StoreResult<()> {
            self.0.record_login(id, at).await
        }
        async fn delete_user(&self, _id: i32) -> StoreResult<bool> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn create_session(
            &self,
            user_id: i32,
            persistent: bool,
            expires_at: DateTime<Utc>,
        ) -> StoreResult<Session> {
            self.0.create_session(user_id, persistent, expires_at).await
        }
        async fn session_by_id(&self, id: Uuid) -> StoreResult<Option<Session>> {
            self.0.session_by_id(id).await
        }
        async fn delete_session(&self, id: Uuid) -> StoreResult<()> {
            self.0.delete_session(id).await
        }
        async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
            self.0.purge_expired_sessions(now).await
        }
        async fn create_message(&self, m: NewMessage) -> StoreResult<Message> {
            self.0.create_message(m).await
        }
        async fn messages_sent_by(&self, sender: i32) -> StoreResult<Vec<MessageView>> {
            self.0.messages_sent_by(sender).await
        }
        async fn messages_received_by(&self, recipient: i32) -> StoreResult<Vec<MessageView>> {
            self.0.messages_received_by(recipient).await
        }
        async fn messages_between(
            &self,
            sender: i32,
            recipient: i32,
        ) -> StoreResult<Vec<MessageView>> {
            self.0.messages_between(sender, recipient).await
        }
        async fn user_activity(&self) -> StoreResult<Vec<UserActivity>> {
            self.0.user_activity().await
        }
        async fn ping(&self) -> StoreResult<()> {
            self.0.ping().await
        }
        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_failed_deletion_redirects_back() {
        let state = test_state_with(BrokenDeletes(MemoryStore::new()));
        let ada = create_user(&state, "ada", "analytical1").await;
        let cookie = login_cookie(&state, &ada).await;

        let response = send(&state, form_post("/delete-account/", "", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/delete-account/");
        assert!(state.store.user_by_id(ada.id).await.unwrap().is_some());
    }
}
