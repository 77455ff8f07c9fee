use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Postgres};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<User>, UserError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, display_name, avatar_url, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(record)
    }

    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<User>, UserError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, display_name, avatar_url, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(executor)
        .await?;

        Ok(record)
    }

    pub async fn create<'e, E>(
        executor: E,
        email: String,
        display_name: String,
    ) -> Result<User, UserError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, display_name, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            RETURNING id, email, display_name, avatar_url, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(display_name)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn update_profile<'e, E>(
        executor: E,
        id: Uuid,
        display_name: String,
        avatar_url: Option<String>,
    ) -> Result<User, UserError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET display_name = $1, avatar_url = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING id, email, display_name, avatar_url, created_at, updated_at
            "#,
        )
        .bind(display_name)
        .bind(avatar_url)
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }
}
