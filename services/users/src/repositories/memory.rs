//! In-memory user store
//!
//! Keeps records in insertion order behind a `RwLock` and enforces the same
//! unique username and email constraints as the PostgreSQL schema.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::UserStore;
use crate::{
    error::{UserError, UserResult},
    models::{NewUser, UserChanges, UserField, UserRecord},
    search::SearchPredicate,
};

/// Process-local user store
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<Vec<UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_from(user: &NewUser) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            id: Uuid::new_v4(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            password: user.password.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fail if `candidate` shares a username or email with any record other
/// than the one identified by `except`
fn check_unique(
    users: &[UserRecord],
    candidate: &UserRecord,
    except: Option<Uuid>,
) -> UserResult<()> {
    for existing in users.iter().filter(|u| Some(u.id) != except) {
        if existing.username == candidate.username {
            return Err(UserError::duplicate(
                UserField::Username,
                &candidate.username,
            ));
        }
        if existing.email == candidate.email {
            return Err(UserError::duplicate(UserField::Email, &candidate.email));
        }
    }
    Ok(())
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: &NewUser) -> UserResult<UserRecord> {
        let mut users = self.users.write().await;
        let record = Self::record_from(user);
        check_unique(&users, &record, None)?;
        users.push(record.clone());
        Ok(record)
    }

    async fn insert_many(&self, batch: &[NewUser]) -> UserResult<Vec<UserRecord>> {
        let mut users = self.users.write().await;

        // Validate against a scratch copy so a failure leaves the store untouched
        let mut staged: Vec<UserRecord> = Vec::with_capacity(batch.len());
        for user in batch {
            let record = Self::record_from(user);
            check_unique(&users, &record, None)?;
            check_unique(&staged, &record, None)?;
            staged.push(record);
        }

        users.extend(staged.iter().cloned());
        Ok(staged)
    }

    async fn update(&self, id: Uuid, changes: &UserChanges) -> UserResult<Option<UserRecord>> {
        let mut users = self.users.write().await;
        let Some(index) = users.iter().position(|u| u.id == id) else {
            return Ok(None);
        };

        let mut updated = users[index].clone();
        changes.apply_to(&mut updated);
        check_unique(&users, &updated, Some(id))?;
        updated.updated_at = Utc::now().max(updated.updated_at);

        users[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid) -> UserResult<Option<UserRecord>> {
        let mut users = self.users.write().await;
        Ok(users
            .iter()
            .position(|u| u.id == id)
            .map(|index| users.remove(index)))
    }

    async fn find_by_id(&self, id: Uuid) -> UserResult<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> UserResult<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn search(&self, predicate: &SearchPredicate) -> UserResult<Vec<UserRecord>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .filter(|u| predicate.matches(u))
            .cloned()
            .collect())
    }
}
