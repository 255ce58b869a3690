use async_trait::async_trait;

use crate::domain::principal::errors::CacheError;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::UserError;

/// Resolves the authenticated principal for a user ID.
///
/// Selected once at startup: either straight to persistence or through a
/// read-through cache.
#[async_trait]
pub trait PrincipalResolver: Send + Sync + 'static {
    /// Load the active user behind `id`.
    ///
    /// # Errors
    /// * `NotFound` - No active user with this ID
    /// * `Cache` - Cache backend failed on read
    /// * `DatabaseError` / `Timeout` - Persistence failed
    async fn resolve(&self, id: &UserId) -> Result<User, UserError>;

    /// Drop any derived copy of the user so the next resolution reloads it.
    async fn invalidate(&self, id: &UserId) -> Result<(), UserError>;
}

/// Key-value store for derived user records.
///
/// A miss is `Ok(None)` and is distinct from a backend failure.
#[async_trait]
pub trait UserCache: Send + Sync + 'static {
    async fn get(&self, id: &UserId) -> Result<Option<User>, CacheError>;

    async fn set(&self, user: &User) -> Result<(), CacheError>;

    async fn delete(&self, id: &UserId) -> Result<(), CacheError>;
}
