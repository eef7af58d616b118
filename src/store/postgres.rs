use super::{Store, StoreError, StoreResult, USERNAME_TAKEN};
use crate::models::auth::{NewUser, ProfileUpdate, Session, User};
use crate::models::message::{Message, MessageView, NewMessage, UserActivity};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password_hash, \
     is_active, is_staff, is_superuser, last_login, created_at, updated_at";

const MESSAGE_VIEW_SELECT: &str = "SELECT m.id, m.description, m.user_id, s.username AS sender_username, \
            m.to_user_id, r.username AS recipient_username, m.created_at
     FROM messages m
     JOIN users s ON s.id = m.user_id
     JOIN users r ON r.id = m.to_user_id";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

fn map_unique_violation(e: sqlx::Error) -> StoreError {
    let is_unique = e
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);
    if is_unique {
        StoreError::Conflict(USERNAME_TAKEN.to_string())
    } else {
        StoreError::Database(e)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, is_active, is_staff, is_superuser, created_at, updated_at)
             VALUES ($1, $2, $3, true, $4, $5, NOW(), NOW())
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.is_staff)
        .bind(new_user.is_superuser)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)
    }

    async fn user_by_id(&self, id: i32) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn update_profile(&self, id: i32, update: &ProfileUpdate) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET username = $1, email = $2, first_name = $3, last_name = $4, updated_at = NOW()
             WHERE id = $5
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&update.username)
        .bind(&update.email)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_violation)
    }

    async fn record_login(&self, id: i32, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE users SET last_login = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, id: i32) -> StoreResult<bool> {
        // sessions and messages go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_session(
        &self,
        user_id: i32,
        persistent: bool,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Session> {
        let session = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, user_id, persistent, expires_at, created_at)
             VALUES ($1, $2, $3, $4, NOW())
             RETURNING id, user_id, persistent, expires_at, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(persistent)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(session)
    }

    async fn session_by_id(&self, id: Uuid) -> StoreResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, persistent, expires_at, created_at FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn delete_session(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn create_message(&self, new_message: NewMessage) -> StoreResult<Message> {
        let message = sqlx::query_as::<_, Message>(
            "INSERT INTO messages (description, user_id, to_user_id, created_at)
             VALUES ($1, $2, $3, NOW())
             RETURNING id, description, user_id, to_user_id, created_at",
        )
        .bind(&new_message.description)
        .bind(new_message.user_id)
        .bind(new_message.to_user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(message)
    }

    async fn messages_sent_by(&self, sender: i32) -> StoreResult<Vec<MessageView>> {
        let messages = sqlx::query_as::<_, MessageView>(&format!(
            "{MESSAGE_VIEW_SELECT} WHERE m.user_id = $1 ORDER BY m.created_at, m.id"
        ))
        .bind(sender)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    async fn messages_received_by(&self, recipient: i32) -> StoreResult<Vec<MessageView>> {
        let messages = sqlx::query_as::<_, MessageView>(&format!(
            "{MESSAGE_VIEW_SELECT} WHERE m.to_user_id = $1 ORDER BY m.created_at, m.id"
        ))
        .bind(recipient)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    async fn messages_between(&self, sender: i32, recipient: i32) -> StoreResult<Vec<MessageView>> {
        let messages = sqlx::query_as::<_, MessageView>(&format!(
            "{MESSAGE_VIEW_SELECT} WHERE m.user_id = $1 AND m.to_user_id = $2 ORDER BY m.created_at, m.id"
        ))
        .bind(sender)
        .bind(recipient)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    async fn user_activity(&self) -> StoreResult<Vec<UserActivity>> {
        let rows = sqlx::query_as::<_, UserActivity>(
            "SELECT u.id, u.username, u.email, u.is_staff, u.is_superuser,
                    (SELECT COUNT(*) FROM messages WHERE user_id = u.id) AS sent,
                    (SELECT COUNT(*) FROM messages WHERE to_user_id = u.id) AS received,
                    u.created_at
             FROM users u
             ORDER BY u.username",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
