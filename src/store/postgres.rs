/// PostgreSQL-backed credential store
///
/// Each account is one row in `users`. Fingerprint writes are single-row
/// `UPDATE`s, so under read-committed isolation two racing swaps from the
/// same fingerprint serialize on the row lock and only the first matches.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Account, CredentialStore, FingerprintSwap, NewAccount, StoreError};
use crate::auth::Fingerprint;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    refresh_fingerprint: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            refresh_fingerprint: row.refresh_fingerprint.map(Fingerprint::from_digest),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err)
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                StoreError::Conflict("Email already registered".to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the schema migrations shipped in `./migrations`.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {}", e)))
    }

    async fn account_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait::async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO users (id, email, name, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, email, name, password_hash, refresh_fingerprint, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&account.email)
        .bind(&account.name)
        .bind(&account.password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Account, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, email, name, password_hash, refresh_fingerprint, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(row.into())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Account, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, email, name, password_hash, refresh_fingerprint, created_at, updated_at
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(row.into())
    }

    async fn set_fingerprint(
        &self,
        id: Uuid,
        fingerprint: Option<&Fingerprint>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_fingerprint = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(fingerprint.map(Fingerprint::as_str))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn swap_fingerprint(
        &self,
        id: Uuid,
        current: &Fingerprint,
        next: &Fingerprint,
    ) -> Result<FingerprintSwap, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_fingerprint = $3, updated_at = $4
            WHERE id = $1 AND refresh_fingerprint = $2
            "#,
        )
        .bind(id)
        .bind(current.as_str())
        .bind(next.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(FingerprintSwap::Swapped);
        }

        if self.account_exists(id).await? {
            Ok(FingerprintSwap::Stale)
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, refresh_fingerprint = NULL, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
