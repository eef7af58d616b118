// src/store/mod.rs
//! Persistence for users, sessions and messages.
//!
//! Handlers only ever talk to [`Store`]. [`PgStore`] is the production
//! backend; [`MemoryStore`] keeps everything in process and is used when no
//! `DATABASE_URL` is configured.
//!
//! Both backends must honour the same cascade rules: removing a user removes
//! every session it owns and every message it sent or received.

pub mod memory;
pub mod postgres;

use crate::models::auth::{NewUser, ProfileUpdate, Session, User};
use crate::models::message::{Message, MessageView, NewMessage, UserActivity};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness rule was violated; the message is safe to show to users.
    #[error("{0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub const USERNAME_TAKEN: &str = "A user with that username already exists.";

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User>;

    async fn user_by_id(&self, id: i32) -> StoreResult<Option<User>>;

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// All users ordered by username.
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Returns `None` when the user no longer exists.
    async fn update_profile(&self, id: i32, update: &ProfileUpdate) -> StoreResult<Option<User>>;

    async fn record_login(&self, id: i32, at: DateTime<Utc>) -> StoreResult<()>;

    /// Deletes the user together with their sessions and messages.
    /// Returns `false` if there was no such user.
    async fn delete_user(&self, id: i32) -> StoreResult<bool>;

    async fn create_session(
        &self,
        user_id: i32,
        persistent: bool,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Session>;

    async fn session_by_id(&self, id: Uuid) -> StoreResult<Option<Session>>;

    async fn delete_session(&self, id: Uuid) -> StoreResult<()>;

    /// Removes sessions whose expiry is at or before `now`.
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64>;

    async fn create_message(&self, new_message: NewMessage) -> StoreResult<Message>;

    /// Messages sent by `sender`, oldest first.
    async fn messages_sent_by(&self, sender: i32) -> StoreResult<Vec<MessageView>>;

    /// Messages addressed to `recipient`, oldest first.
    async fn messages_received_by(&self, recipient: i32) -> StoreResult<Vec<MessageView>>;

    /// Messages sent by `sender` to `recipient`, oldest first.
    async fn messages_between(&self, sender: i32, recipient: i32) -> StoreResult<Vec<MessageView>>;

    async fn user_activity(&self) -> StoreResult<Vec<UserActivity>>;

    async fn ping(&self) -> StoreResult<()>;

    fn backend_name(&self) -> &'static str;
}
