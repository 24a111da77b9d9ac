//! PostgreSQL user store

use async_trait::async_trait;
use sqlx::types::{
    chrono::{DateTime, Utc},
    Json,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::{AuthMethod, AuthMethodEntry, User};

use super::{AttachOutcome, UserStore};

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    auth_methods: Json<Vec<AuthMethodEntry>>,
    referred_by: Option<String>,
    experience: i64,
    refresh_token_hash: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            auth_methods: row.auth_methods.0,
            referred_by: row.referred_by,
            experience: row.experience,
            refresh_token_hash: row.refresh_token_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const USER_COLUMNS: &str =
    "u.id, u.auth_methods, u.referred_by, u.experience, u.refresh_token_hash, u.created_at, u.updated_at";

async fn claim_methods(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    methods: &[AuthMethodEntry],
) -> Result<(), StoreError> {
    for entry in methods {
        sqlx::query("INSERT INTO auth_method_owners (method, token, user_id) VALUES ($1, $2, $3)")
            .bind(entry.method.as_str())
            .bind(&entry.token)
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_auth_method(
        &self,
        method: AuthMethod,
        token: &str,
    ) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users u
            JOIN auth_method_owners o ON o.user_id = u.id
            WHERE o.method = $1 AND o.token = $2
            "#
        ))
        .bind(method.as_str())
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(User::from))
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, auth_methods, referred_by, experience, refresh_token_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(Json(&user.auth_methods))
        .bind(&user.referred_by)
        .bind(user.experience)
        .bind(&user.refresh_token_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await?;

        claim_methods(&mut tx, user.id, &user.auth_methods).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_auth_methods(
        &self,
        id: Uuid,
        methods: &[AuthMethodEntry],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE users SET auth_methods = $1, updated_at = NOW() WHERE id = $2")
            .bind(Json(methods))
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM auth_method_owners WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        claim_methods(&mut tx, id, methods).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn attach_method(
        &self,
        id: Uuid,
        entry: &AuthMethodEntry,
    ) -> Result<AttachOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(AttachOutcome::UserMissing);
        }

        // Blocks on a concurrent claim of the same pair until it commits
        sqlx::query(
            r#"
            INSERT INTO auth_method_owners (method, token, user_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (method, token) DO NOTHING
            "#,
        )
        .bind(entry.method.as_str())
        .bind(&entry.token)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let owner: Uuid = sqlx::query_scalar(
            "SELECT user_id FROM auth_method_owners WHERE method = $1 AND token = $2",
        )
        .bind(entry.method.as_str())
        .bind(&entry.token)
        .fetch_one(&mut *tx)
        .await?;
        if owner != id {
            return Ok(AttachOutcome::Taken);
        }

        let row: UserRow = sqlx::query_as(&format!(
            r#"
            UPDATE users u
            SET auth_methods = CASE
                    WHEN u.auth_methods @> $2 THEN u.auth_methods
                    ELSE u.auth_methods || $2
                END,
                updated_at = NOW()
            WHERE u.id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(Json(vec![entry]))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(AttachOutcome::Attached(row.into()))
    }

    async fn set_refresh_token_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET refresh_token_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn replace_refresh_token_hash(
        &self,
        id: Uuid,
        current: &str,
        new: &str,
    ) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE users SET refresh_token_hash = $1, updated_at = NOW()
            WHERE id = $2 AND refresh_token_hash = $3
            "#,
        )
        .bind(new)
        .bind(id)
        .bind(current)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected == 1)
    }
}
