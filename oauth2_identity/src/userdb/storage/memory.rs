use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::userdb::{errors::UserError, types::User};

use super::store_type::UserStore;

/// Process-local [`UserStore`], for tests and single-instance demos.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.users.lock().await.len()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn init(&self) -> Result<(), UserError> {
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, UserError> {
        Ok(self.users.lock().await.get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .filter(|u| u.email.eq_ignore_ascii_case(email))
            .min_by_key(|u| u.created_at)
            .cloned())
    }

    async fn create_user(&self, user: User) -> Result<User, UserError> {
        let mut users = self.users.lock().await;
        if users.contains_key(&user.id) {
            return Err(UserError::Storage(format!("duplicate user id {}", user.id)));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn update_user(&self, mut user: User) -> Result<User, UserError> {
        let mut users = self.users.lock().await;
        let existing = users.get_mut(&user.id).ok_or(UserError::NotFound)?;
        user.created_at = existing.created_at;
        user.updated_at = Utc::now();
        *existing = user.clone();
        Ok(user)
    }

    async fn delete_user(&self, id: &str) -> Result<(), UserError> {
        self.users.lock().await.remove(id);
        Ok(())
    }
}
