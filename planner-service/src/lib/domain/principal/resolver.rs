use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::deadline;
use crate::domain::principal::ports::PrincipalResolver;
use crate::domain::principal::ports::UserCache;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::UserError;
use crate::user::ports::UserRepository;

/// Resolver that always reads from persistence.
pub struct DirectPrincipalResolver<UR>
where
    UR: UserRepository,
{
    repository: Arc<UR>,
    deadline: Duration,
}

impl<UR> DirectPrincipalResolver<UR>
where
    UR: UserRepository,
{
    pub fn new(repository: Arc<UR>, deadline: Duration) -> Self {
        Self {
            repository,
            deadline,
        }
    }
}

#[async_trait]
impl<UR> PrincipalResolver for DirectPrincipalResolver<UR>
where
    UR: UserRepository,
{
    async fn resolve(&self, id: &UserId) -> Result<User, UserError> {
        load_from_repository(self.repository.as_ref(), id, self.deadline).await
    }

    async fn invalidate(&self, _id: &UserId) -> Result<(), UserError> {
        Ok(())
    }
}

/// Read-through resolver in front of persistence.
///
/// Cache read failures fail the resolution rather than falling back to the
/// database. Population after a database hit is best-effort: a failed write is
/// logged and the loaded user is still returned.
pub struct CachedPrincipalResolver<UR, C>
where
    UR: UserRepository,
    C: UserCache,
{
    repository: Arc<UR>,
    cache: Arc<C>,
    deadline: Duration,
}

impl<UR, C> CachedPrincipalResolver<UR, C>
where
    UR: UserRepository,
    C: UserCache,
{
    pub fn new(repository: Arc<UR>, cache: Arc<C>, deadline: Duration) -> Self {
        Self {
            repository,
            cache,
            deadline,
        }
    }
}

#[async_trait]
impl<UR, C> PrincipalResolver for CachedPrincipalResolver<UR, C>
where
    UR: UserRepository,
    C: UserCache,
{
    async fn resolve(&self, id: &UserId) -> Result<User, UserError> {
        let cached = deadline::within(self.deadline, "cache get", async {
            self.cache.get(id).await.map_err(UserError::from)
        })
        .await?;

        if let Some(user) = cached {
            tracing::debug!(user_id = %id, "Principal cache hit");
            return Ok(user);
        }

        tracing::debug!(user_id = %id, "Principal cache miss");
        let user = load_from_repository(self.repository.as_ref(), id, self.deadline).await?;

        let populated = deadline::within(self.deadline, "cache set", async {
            self.cache.set(&user).await.map_err(UserError::from)
        })
        .await;
        if let Err(e) = populated {
            tracing::warn!(user_id = %id, error = %e, "Failed to populate principal cache");
        }

        Ok(user)
    }

    async fn invalidate(&self, id: &UserId) -> Result<(), UserError> {
        deadline::within(self.deadline, "cache delete", async {
            self.cache.delete(id).await.map_err(UserError::from)
        })
        .await
    }
}

async fn load_from_repository<UR>(
    repository: &UR,
    id: &UserId,
    deadline: Duration,
) -> Result<User, UserError>
where
    UR: UserRepository,
{
    deadline::within(deadline, "find user by id", repository.find_active_by_id(id))
        .await?
        .ok_or(UserError::NotFound(id.to_string()))
}
