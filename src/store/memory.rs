use super::{Store, StoreError, StoreResult, USERNAME_TAKEN};
use crate::models::auth::{NewUser, ProfileUpdate, Session, User};
use crate::models::message::{Message, MessageView, NewMessage, UserActivity};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    sessions: HashMap<Uuid, Session>,
    messages: Vec<Message>,
    last_user_id: i32,
    last_message_id: i64,
}

impl Tables {
    // matches the LOWER(username) unique index
    fn username_taken(&self, username: &str, except: Option<i32>) -> bool {
        let wanted = username.to_lowercase();
        self.users
            .values()
            .any(|u| u.username.to_lowercase() == wanted && Some(u.id) != except)
    }

    fn view(&self, message: &Message) -> Option<MessageView> {
        let sender = self.users.get(&message.user_id)?;
        let recipient = self.users.get(&message.to_user_id)?;
        Some(MessageView {
            id: message.id,
            description: message.description.clone(),
            user_id: message.user_id,
            sender_username: sender.username.clone(),
            to_user_id: message.to_user_id,
            recipient_username: recipient.username.clone(),
            created_at: message.created_at,
        })
    }

    fn views<F>(&self, keep: F) -> Vec<MessageView>
    where
        F: Fn(&Message) -> bool,
    {
        let mut views: Vec<MessageView> = self
            .messages
            .iter()
            .filter(|m| keep(*m))
            .filter_map(|m| self.view(m))
            .collect();
        views.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        views
    }
}

/// Process-local store. Data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.username_taken(&new_user.username, None) {
            return Err(StoreError::Conflict(USERNAME_TAKEN.to_string()));
        }

        tables.last_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: tables.last_user_id,
            username: new_user.username,
            email: new_user.email,
            first_name: String::new(),
            last_name: String::new(),
            password_hash: new_user.password_hash,
            is_active: true,
            is_staff: new_user.is_staff,
            is_superuser: new_user.is_superuser,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: i32) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.tables.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn update_profile(&self, id: i32, update: &ProfileUpdate) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&id) {
            return Ok(None);
        }
        if tables.username_taken(&update.username, Some(id)) {
            return Err(StoreError::Conflict(USERNAME_TAKEN.to_string()));
        }

        let user = match tables.users.get_mut(&id) {
            Some(user) => user,
            None => return Ok(None),
        };
        user.username = update.username.clone();
        user.email = update.email.clone();
        user.first_name = update.first_name.clone();
        user.last_name = update.last_name.clone();
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn record_login(&self, id: i32, at: DateTime<Utc>) -> StoreResult<()> {
        if let Some(user) = self.tables.write().await.users.get_mut(&id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn delete_user(&self, id: i32) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.sessions.retain(|_, s| s.user_id != id);
        tables.messages.retain(|m| m.user_id != id && m.to_user_id != id);
        Ok(true)
    }

    async fn create_session(
        &self,
        user_id: i32,
        persistent: bool,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Session> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::Database(sqlx::Error::RowNotFound));
        }

        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            persistent,
            expires_at,
            created_at: Utc::now(),
        };
        tables.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn session_by_id(&self, id: Uuid) -> StoreResult<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn delete_session(&self, id: Uuid) -> StoreResult<()> {
        self.tables.write().await.sessions.remove(&id);
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - tables.sessions.len()) as u64)
    }

    async fn create_message(&self, new_message: NewMessage) -> StoreResult<Message> {
        let mut tables = self.tables.write().await;
        // mirror the foreign keys on the messages table
        if !tables.users.contains_key(&new_message.user_id)
            || !tables.users.contains_key(&new_message.to_user_id)
        {
            return Err(StoreError::Database(sqlx::Error::RowNotFound));
        }

        tables.last_message_id += 1;
        let message = Message {
            id: tables.last_message_id,
            description: new_message.description,
            user_id: new_message.user_id,
            to_user_id: new_message.to_user_id,
            created_at: Utc::now(),
        };
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn messages_sent_by(&self, sender: i32) -> StoreResult<Vec<MessageView>> {
        let tables = self.tables.read().await;
        Ok(tables.views(|m| m.user_id == sender))
    }

    async fn messages_received_by(&self, recipient: i32) -> StoreResult<Vec<MessageView>> {
        let tables = self.tables.read().await;
        Ok(tables.views(|m| m.to_user_id == recipient))
    }

    async fn messages_between(&self, sender: i32, recipient: i32) -> StoreResult<Vec<MessageView>> {
        let tables = self.tables.read().await;
        Ok(tables.views(|m| m.user_id == sender && m.to_user_id == recipient))
    }

    async fn user_activity(&self) -> StoreResult<Vec<UserActivity>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<UserActivity> = tables
            .users
            .values()
            .map(|u| UserActivity {
                id: u.id,
                username: u.username.clone(),
                email: u.email.clone(),
                is_staff: u.is_staff,
                is_superuser: u.is_superuser,
                sent: tables.messages.iter().filter(|m| m.user_id == u.id).count() as i64,
                received: tables.messages.iter().filter(|m| m.to_user_id == u.id).count() as i64,
                created_at: u.created_at,
            })
            .collect();
        rows.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(rows)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: String::new(),
            password_hash: "hash".to_string(),
            is_staff: false,
            is_superuser: false,
        }
    }

    async fn send(store: &MemoryStore, from: i32, to: i32, text: &str) -> Message {
        store
            .create_message(NewMessage {
                description: text.to_string(),
                user_id: from,
                to_user_id: to,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("ada")).await.unwrap();
        let err = store.create_user(new_user("ada")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_user_cascades_messages_and_sessions() {
        let store = MemoryStore::new();
        let ada = store.create_user(new_user("ada")).await.unwrap();
        let bob = store.create_user(new_user("bob")).await.unwrap();
        let cy = store.create_user(new_user("cy")).await.unwrap();

        send(&store, ada.id, bob.id, "to bob").await;
        send(&store, bob.id, ada.id, "to ada").await;
        send(&store, bob.id, cy.id, "bob to cy").await;
        let session = store
            .create_session(ada.id, false, Utc::now() + Duration::days(1))
            .await
            .unwrap();

        assert!(store.delete_user(ada.id).await.unwrap());

        assert!(store.session_by_id(session.id).await.unwrap().is_none());
        let remaining = store.messages_sent_by(bob.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].description, "bob to cy");
        assert!(!store.delete_user(ada.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_messages_between_filters_both_ends() {
        let store = MemoryStore::new();
        let ada = store.create_user(new_user("ada")).await.unwrap();
        let bob = store.create_user(new_user("bob")).await.unwrap();
        let cy = store.create_user(new_user("cy")).await.unwrap();

        send(&store, ada.id, bob.id, "first").await;
        send(&store, ada.id, cy.id, "other").await;
        send(&store, bob.id, ada.id, "reply").await;
        send(&store, ada.id, bob.id, "second").await;

        let between = store.messages_between(ada.id, bob.id).await.unwrap();
        let texts: Vec<&str> = between.iter().map(|m| m.description.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(between
            .iter()
            .all(|m| m.user_id == ada.id && m.to_user_id == bob.id && m.recipient_username == "bob"));
    }

    #[tokio::test]
    async fn test_message_to_missing_user_is_rejected() {
        let store = MemoryStore::new();
        let ada = store.create_user(new_user("ada")).await.unwrap();
        let result = store
            .create_message(NewMessage {
                description: "hello?".to_string(),
                user_id: ada.id,
                to_user_id: 99,
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_usernames_are_unique_ignoring_case() {
        let store = MemoryStore::new();
        let ada = store.create_user(new_user("ada")).await.unwrap();
        let err = store.create_user(new_user("Ada")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // changing only the case of one's own name is allowed
        let update = ProfileUpdate {
            username: "ADA".to_string(),
            ..Default::default()
        };
        let updated = store.update_profile(ada.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.username, "ADA");
    }

    #[tokio::test]
    async fn test_session_for_missing_user_is_rejected() {
        let store = MemoryStore::new();
        let result = store
            .create_session(7, false, Utc::now() + Duration::days(1))
            .await;
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn test_purge_expired_sessions() {
        let store = MemoryStore::new();
        let ada = store.create_user(new_user("ada")).await.unwrap();
        let now = Utc::now();
        let stale = store
            .create_session(ada.id, false, now - Duration::seconds(1))
            .await
            .unwrap();
        let live = store
            .create_session(ada.id, true, now + Duration::days(14))
            .await
            .unwrap();

        assert_eq!(store.purge_expired_sessions(now).await.unwrap(), 1);
        assert!(store.session_by_id(stale.id).await.unwrap().is_none());
        assert!(store.session_by_id(live.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_profile_update_keeps_usernames_unique() {
        let store = MemoryStore::new();
        let ada = store.create_user(new_user("ada")).await.unwrap();
        store.create_user(new_user("bob")).await.unwrap();

        let update = ProfileUpdate {
            username: "bob".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            store.update_profile(ada.id, &update).await,
            Err(StoreError::Conflict(_))
        ));

        let update = ProfileUpdate {
            username: "ada".to_string(),
            first_name: "Ada".to_string(),
            ..Default::default()
        };
        let updated = store.update_profile(ada.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.first_name, "Ada");
        assert!(store.update_profile(42, &update).await.unwrap().is_none());
    }
}
