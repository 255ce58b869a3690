use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::user::models::UserId;
use crate::domain::user::ports::FollowerRepository;
use crate::user::errors::UserError;

pub struct PostgresFollowerRepository {
    pool: PgPool,
}

impl PostgresFollowerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FollowerRepository for PostgresFollowerRepository {
    async fn follow(&self, user_id: &UserId, follower_id: &UserId) -> Result<(), UserError> {
        sqlx::query(
            r#"
            INSERT INTO followers (user_id, follower_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(user_id.0)
        .bind(follower_id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return UserError::AlreadyFollowing(user_id.to_string());
                }
                if db_err.is_foreign_key_violation() {
                    return UserError::NotFound(user_id.to_string());
                }
            }
            UserError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }

    async fn unfollow(&self, user_id: &UserId, follower_id: &UserId) -> Result<(), UserError> {
        sqlx::query("DELETE FROM followers WHERE user_id = $1 AND follower_id = $2")
            .bind(user_id.0)
            .bind(follower_id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
