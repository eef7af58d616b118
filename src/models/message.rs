use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: i64,
    pub description: String,
    pub user_id: i32,
    pub to_user_id: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A message joined with the usernames on both ends, for listings.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MessageView {
    pub id: i64,
    pub description: String,
    pub user_id: i32,
    pub sender_username: String,
    pub to_user_id: i32,
    pub recipient_username: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub description: String,
    pub user_id: i32,
    pub to_user_id: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageForm {
    #[serde(default)]
    pub to_user: String,
    #[serde(default)]
    pub description: String,
}

/// Per-user traffic shown on the admin overview.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserActivity {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub sent: i64,
    pub received: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
