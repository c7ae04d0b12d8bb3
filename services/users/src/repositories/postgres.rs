//! PostgreSQL user store

use async_trait::async_trait;
use common::error::DatabaseError;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use tracing::{error, info};
use uuid::Uuid;

use super::UserStore;
use crate::{
    error::{UserError, UserResult},
    models::{NewUser, UserChanges, UserField, UserRecord},
    search::SearchPredicate,
};

const USER_COLUMNS: &str =
    "id, first_name, last_name, username, email, password, created_at, updated_at";

/// `translate` arguments for ASCII-only case folding
const ASCII_UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ASCII_LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

const USERNAME_CONSTRAINT: &str = "users_username_key";
const EMAIL_CONSTRAINT: &str = "users_email_key";

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        username TEXT NOT NULL CONSTRAINT users_username_key UNIQUE,
        email TEXT NOT NULL CONSTRAINT users_email_key UNIQUE,
        password TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CHECK (updated_at >= created_at)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS users_first_name_idx ON users (first_name)",
    "CREATE INDEX IF NOT EXISTS users_last_name_idx ON users (last_name)",
];

/// User store backed by the `users` table
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `users` table and its indexes if they are missing
    pub async fn ensure_schema(&self) -> UserResult<()> {
        info!("Ensuring users schema");
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        }
        Ok(())
    }
}

/// Field named by a unique-constraint violation, if that is what `err` is
fn unique_violation(err: &sqlx::Error) -> Option<UserField> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }
    match db_err.constraint() {
        Some(USERNAME_CONSTRAINT) => Some(UserField::Username),
        Some(EMAIL_CONSTRAINT) => Some(UserField::Email),
        _ => None,
    }
}

fn query_error(err: sqlx::Error) -> UserError {
    error!("User query failed: {}", err);
    UserError::Database(DatabaseError::Query(err))
}

fn insert_error(err: sqlx::Error, user: &NewUser) -> UserError {
    match unique_violation(&err) {
        Some(UserField::Username) => UserError::duplicate(UserField::Username, &user.username),
        Some(UserField::Email) => UserError::duplicate(UserField::Email, &user.email),
        _ => query_error(err),
    }
}

fn update_error(err: sqlx::Error, changes: &UserChanges) -> UserError {
    match unique_violation(&err) {
        Some(UserField::Username) => UserError::duplicate(
            UserField::Username,
            changes.username.clone().unwrap_or_default(),
        ),
        Some(UserField::Email) => {
            UserError::duplicate(UserField::Email, changes.email.clone().unwrap_or_default())
        }
        _ => query_error(err),
    }
}

async fn insert_one<'e, E>(executor: E, user: &NewUser) -> UserResult<UserRecord>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, UserRecord>(&format!(
        r#"
        INSERT INTO users (id, first_name, last_name, username, email, password, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, now(), now())
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password)
    .fetch_one(executor)
    .await
    .map_err(|e| insert_error(e, user))
}

/// `SELECT` for the predicate; needles are bound, never interpolated
fn search_query(predicate: &SearchPredicate) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE "));
    for (i, condition) in predicate.conditions().iter().enumerate() {
        if i > 0 {
            builder.push(" AND ");
        }
        builder
            .push(format!(
                "translate({}, '{ASCII_UPPER}', '{ASCII_LOWER}') LIKE ",
                condition.field.column()
            ))
            .push_bind(condition.like_pattern().to_ascii_lowercase())
            .push(" ESCAPE '\\'");
    }
    builder
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: &NewUser) -> UserResult<UserRecord> {
        insert_one(&self.pool, user).await
    }

    async fn insert_many(&self, users: &[NewUser]) -> UserResult<Vec<UserRecord>> {
        let mut tx = self.pool.begin().await.map_err(query_error)?;

        let mut created = Vec::with_capacity(users.len());
        for user in users {
            // Dropping `tx` on error rolls the whole batch back
            created.push(insert_one(&mut *tx, user).await?);
        }

        tx.commit().await.map_err(query_error)?;
        Ok(created)
    }

    async fn update(&self, id: Uuid, changes: &UserChanges) -> UserResult<Option<UserRecord>> {
        sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                username = COALESCE($4, username),
                email = COALESCE($5, email),
                password = COALESCE($6, password),
                updated_at = GREATEST(now(), updated_at)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.username)
        .bind(&changes.email)
        .bind(&changes.password)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| update_error(e, changes))
    }

    async fn delete(&self, id: Uuid) -> UserResult<Option<UserRecord>> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)
    }

    async fn find_by_id(&self, id: Uuid) -> UserResult<Option<UserRecord>> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)
    }

    async fn find_by_username(&self, username: &str) -> UserResult<Option<UserRecord>> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)
    }

    async fn search(&self, predicate: &SearchPredicate) -> UserResult<Vec<UserRecord>> {
        search_query(predicate)
            .build_query_as::<UserRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)
    }
}
