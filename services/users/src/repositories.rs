//! Repositories for user records
//!
//! `UserStore` is the port a persistence backend implements. `UserRepository`
//! sits on top of an injected store and turns identifier parsing, missing
//! records and empty searches into `UserError` outcomes.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{UserError, UserResult},
    models::{NewUser, UserChanges, UserRecord},
    search::{SearchPredicate, UserSearch},
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;

/// Persistence backend for user records
///
/// Implementations assign identifiers and timestamps, enforce unique
/// usernames and emails (reporting `UserError::DuplicateKey`), and refresh
/// `updated_at` on every mutation.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert one record
    async fn insert(&self, user: &NewUser) -> UserResult<UserRecord>;

    /// Insert every record or none of them
    async fn insert_many(&self, users: &[NewUser]) -> UserResult<Vec<UserRecord>>;

    /// Apply a partial update, returning the updated record
    async fn update(&self, id: Uuid, changes: &UserChanges) -> UserResult<Option<UserRecord>>;

    /// Remove a record, returning what was removed
    async fn delete(&self, id: Uuid) -> UserResult<Option<UserRecord>>;

    async fn find_by_id(&self, id: Uuid) -> UserResult<Option<UserRecord>>;

    async fn find_by_username(&self, username: &str) -> UserResult<Option<UserRecord>>;

    /// All records matching the predicate, in the store's natural order
    async fn search(&self, predicate: &SearchPredicate) -> UserResult<Vec<UserRecord>>;
}

/// User repository for gateway operations
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn UserStore>,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Create a new user
    pub async fn create(&self, new_user: &NewUser) -> UserResult<UserRecord> {
        info!("Creating new user: {}", new_user.username);

        self.store.insert(new_user).await.inspect_err(|e| {
            warn!("Failed to create user {}: {}", new_user.username, e);
        })
    }

    /// Partially update a user
    pub async fn update(&self, id: &str, changes: &UserChanges) -> UserResult<UserRecord> {
        info!("Updating user: {}", id);
        let uuid = parse_id(id)?;

        self.store
            .update(uuid, changes)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Delete a user
    pub async fn delete(&self, id: &str) -> UserResult<UserRecord> {
        info!("Deleting user: {}", id);
        let uuid = parse_id(id)?;

        self.store.delete(uuid).await?.ok_or_else(|| not_found(id))
    }

    /// Find a user by ID
    pub async fn get_by_id(&self, id: &str) -> UserResult<UserRecord> {
        info!("Finding user by ID: {}", id);
        let uuid = parse_id(id)?;

        self.store
            .find_by_id(uuid)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Find a user by exact username
    pub async fn get_by_username(&self, username: &str) -> UserResult<UserRecord> {
        info!("Finding user by username: {}", username);

        self.store
            .find_by_username(username)
            .await?
            .ok_or_else(|| {
                warn!("User {} not found", username);
                UserError::NotFound(format!("User '{}' not found.", username))
            })
    }

    /// Search users by first name, last name and username
    ///
    /// An empty result is reported as `UserError::NotFound`.
    pub async fn search(&self, search: &UserSearch) -> UserResult<Vec<UserRecord>> {
        let predicate = SearchPredicate::build(search)?;
        info!("Searching users by {}", search.describe());

        let users = self.store.search(&predicate).await?;
        if users.is_empty() {
            warn!("No users matched {}", search.describe());
            return Err(UserError::NotFound(format!(
                "No users found for {}.",
                search.describe()
            )));
        }

        Ok(users)
    }

    /// Insert a batch of users; all of them are created or none are
    pub async fn import_batch(&self, users: &[NewUser]) -> UserResult<Vec<UserRecord>> {
        info!("Importing {} users", users.len());
        if users.is_empty() {
            return Ok(Vec::new());
        }

        let created = self.store.insert_many(users).await.inspect_err(|e| {
            warn!("User import aborted: {}", e);
        })?;

        info!("Imported {} users", created.len());
        Ok(created)
    }
}

fn parse_id(id: &str) -> UserResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| {
        warn!("Rejected malformed user id: {}", id);
        UserError::NotFound("Invalid user id".to_string())
    })
}

fn not_found(id: &str) -> UserError {
    warn!("User id {} not found", id);
    UserError::NotFound(format!("User id '{}' not found.", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserField;

    fn repository() -> UserRepository {
        UserRepository::new(Arc::new(InMemoryUserStore::new()))
    }

    fn new_user(first_name: &str, username: &str) -> NewUser {
        NewUser {
            first_name: first_name.to_string(),
            last_name: "Lee".to_string(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "plaintext".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_by_id_round_trips_fields() {
        let repo = repository();
        let input = new_user("Ann", "annlee");

        let created = repo.create(&input).await.unwrap();
        let fetched = repo.get_by_id(&created.id.to_string()).await.unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.first_name, input.first_name);
        assert_eq!(fetched.last_name, input.last_name);
        assert_eq!(fetched.username, input.username);
        assert_eq!(fetched.email, input.email);
        assert_eq!(fetched.password, input.password);
        assert_eq!(fetched.created_at, fetched.updated_at);
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email_are_rejected() {
        let repo = repository();
        repo.create(&new_user("Ann", "annlee")).await.unwrap();

        let same_username = NewUser {
            email: "other@example.com".to_string(),
            ..new_user("Anna", "annlee")
        };
        let err = repo.create(&same_username).await.unwrap_err();
        assert!(matches!(
            err,
            UserError::DuplicateKey { field: UserField::Username, ref value } if value == "annlee"
        ));

        let same_email = NewUser {
            email: "annlee@example.com".to_string(),
            ..new_user("Anna", "anna2")
        };
        let err = repo.create(&same_email).await.unwrap_err();
        assert!(matches!(
            err,
            UserError::DuplicateKey { field: UserField::Email, .. }
        ));
    }

    #[tokio::test]
    async fn test_update_changes_only_supplied_field() {
        let repo = repository();
        let created = repo.create(&new_user("Ann", "annlee")).await.unwrap();

        let changes = UserChanges {
            first_name: Some("Annabel".to_string()),
            ..UserChanges::default()
        };
        let updated = repo
            .update(&created.id.to_string(), &changes)
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.first_name, "Annabel");
        assert_eq!(updated.last_name, created.last_name);
        assert_eq!(updated.username, created.username);
        assert_eq!(updated.email, created.email);
        assert_eq!(updated.password, created.password);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_ids_are_not_found() {
        let repo = repository();
        let changes = UserChanges::default();

        for id in ["not-an-id", "", "12345"] {
            assert!(matches!(
                repo.get_by_id(id).await,
                Err(UserError::NotFound(msg)) if msg == "Invalid user id"
            ));
            assert!(matches!(
                repo.update(id, &changes).await,
                Err(UserError::NotFound(_))
            ));
            assert!(matches!(repo.delete(id).await, Err(UserError::NotFound(_))));
        }

        let unknown = Uuid::new_v4().to_string();
        assert!(matches!(
            repo.get_by_id(&unknown).await,
            Err(UserError::NotFound(msg)) if msg.contains(&unknown)
        ));
        assert!(matches!(
            repo.update(&unknown, &changes).await,
            Err(UserError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let repo = repository();
        let created = repo.create(&new_user("Ann", "annlee")).await.unwrap();
        let id = created.id.to_string();

        let deleted = repo.delete(&id).await.unwrap();
        assert_eq!(deleted, created);

        assert!(matches!(repo.get_by_id(&id).await, Err(UserError::NotFound(_))));
        assert!(matches!(repo.delete(&id).await, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_by_username_is_exact() {
        let repo = repository();
        let created = repo.create(&new_user("Ann", "annlee")).await.unwrap();

        assert_eq!(repo.get_by_username("annlee").await.unwrap(), created);
        assert!(matches!(
            repo.get_by_username("ANNLEE").await,
            Err(UserError::NotFound(_))
        ));
        assert!(matches!(
            repo.get_by_username("ann").await,
            Err(UserError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_matches_substrings_in_insertion_order() {
        let repo = repository();
        for (first_name, username) in [
            ("Ann", "u1"),
            ("Marcus", "u2"),
            ("ANNA", "u3"),
            ("Anna-Marie", "u4"),
            ("Hannah", "u5"),
        ] {
            repo.create(&new_user(first_name, username)).await.unwrap();
        }

        let search = UserSearch {
            first_name: Some("ann".to_string()),
            ..UserSearch::default()
        };
        let found: Vec<String> = repo
            .search(&search)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.first_name)
            .collect();

        assert_eq!(found, ["Ann", "ANNA", "Anna-Marie", "Hannah"]);
    }

    #[tokio::test]
    async fn test_search_errors() {
        let repo = repository();
        repo.create(&new_user("Ann", "annlee")).await.unwrap();

        assert!(matches!(
            repo.search(&UserSearch::default()).await,
            Err(UserError::InvalidQuery(_))
        ));

        let search = UserSearch {
            first_name: Some("zzz".to_string()),
            ..UserSearch::default()
        };
        assert!(matches!(
            repo.search(&search).await,
            Err(UserError::NotFound(msg)) if msg.contains("zzz")
        ));
    }

    #[tokio::test]
    async fn test_import_batch_assigns_ids() {
        let repo = repository();
        let batch = vec![new_user("Ann", "annlee"), new_user("Marcus", "mokafor")];

        let created = repo.import_batch(&batch).await.unwrap();

        assert_eq!(created.len(), batch.len());
        assert_ne!(created[0].id, created[1].id);
        for (record, input) in created.iter().zip(&batch) {
            assert_eq!(record.username, input.username);
            assert_eq!(
                repo.get_by_id(&record.id.to_string()).await.unwrap(),
                *record
            );
        }
    }

    #[tokio::test]
    async fn test_import_batch_is_all_or_nothing() {
        let repo = repository();
        repo.create(&new_user("Ann", "annlee")).await.unwrap();

        // Duplicate within the batch
        let batch = vec![new_user("Marcus", "mokafor"), new_user("Marc", "mokafor")];
        assert!(matches!(
            repo.import_batch(&batch).await,
            Err(UserError::DuplicateKey { field: UserField::Username, .. })
        ));
        assert!(repo.get_by_username("mokafor").await.is_err());

        // Duplicate against an existing record
        let batch = vec![new_user("Hannah", "hberg"), new_user("Ann", "annlee")];
        assert!(matches!(
            repo.import_batch(&batch).await,
            Err(UserError::DuplicateKey { .. })
        ));
        assert!(repo.get_by_username("hberg").await.is_err());
    }

    #[tokio::test]
    async fn test_import_empty_batch() {
        let repo = repository();
        assert!(repo.import_batch(&[]).await.unwrap().is_empty());
    }
}
