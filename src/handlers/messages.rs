use super::{form_error, ui};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::login_required;
use crate::models::message::{MessageForm, NewMessage};
use crate::session::CurrentUser;
use crate::validators::validate_message_text;
use crate::AppState;
use axum::{
    extract::{Extension, Form, Path},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, Router},
};
use std::sync::Arc;

const INVALID_RECIPIENT: &str =
    "Select a valid choice. That choice is not one of the available choices.";

pub fn message_routes() -> Router {
    Router::new()
        .route("/", get(compose_form).post(compose))
        .route("/readmessage/", get(mailbox))
        .route("/readmessage/:user_id", get(messages_to_user))
        .route_layer(axum::middleware::from_fn(login_required))
}

async fn compose_form(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Html<String>> {
    let recipients = state.store.list_users().await?;
    Ok(Html(ui::compose_page(
        &current.user,
        &recipients,
        &MessageForm::default(),
        &[],
    )))
}

async fn compose(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Form(form): Form<MessageForm>,
) -> AppResult<Response> {
    let mut errors = Vec::new();

    let recipient = match form.to_user.trim().parse::<i32>() {
        Ok(id) => state.store.user_by_id(id).await?,
        Err(_) => None,
    };
    if recipient.is_none() {
        errors.push(INVALID_RECIPIENT.to_string());
    }
    if let Err(e) = validate_message_text(&form.description) {
        errors.push(e);
    }

    let recipient = match recipient {
        Some(recipient) if errors.is_empty() => recipient,
        _ => {
            let recipients = state.store.list_users().await?;
            return Ok(form_error(ui::compose_page(
                &current.user,
                &recipients,
                &form,
                &errors,
            )));
        }
    };

    let message = state
        .store
        .create_message(NewMessage {
            description: form.description,
            user_id: current.user.id,
            to_user_id: recipient.id,
        })
        .await?;

    tracing::info!(
        message_id = message.id,
        user_id = message.user_id,
        to_user_id = message.to_user_id,
        "message sent"
    );

    Ok(Redirect::to(&format!("/readmessage/{}", recipient.id)).into_response())
}

async fn mailbox(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Html<String>> {
    let received = state.store.messages_received_by(current.user.id).await?;
    let sent = state.store.messages_sent_by(current.user.id).await?;
    Ok(Html(ui::mailbox_page(&current.user, &received, &sent)))
}

async fn messages_to_user(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<String>,
) -> AppResult<Html<String>> {
    // non-numeric ids are simply unknown users
    let user_id: i32 = user_id.parse().map_err(|_| AppError::NotFound)?;
    let recipient = state
        .store
        .user_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let messages = state
        .store
        .messages_between(current.user.id, recipient.id)
        .await?;

    Ok(Html(ui::message_list_page(
        &current.user,
        &format!("Messages to {}", recipient.username),
        &messages,
    )))
}
