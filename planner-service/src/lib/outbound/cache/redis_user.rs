use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Client;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::principal::errors::CacheError;
use crate::domain::principal::ports::UserCache;
use crate::domain::user::models::Credential;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::PersonName;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;

/// Redis-backed principal cache.
///
/// Entries are JSON under `user-{id}` and expire after the configured TTL.
pub struct RedisUserCache {
    connection: ConnectionManager,
    ttl: Duration,
}

impl RedisUserCache {
    /// Connect to Redis and verify the server answers.
    ///
    /// # Errors
    /// * `Connection` - URL invalid or server unreachable
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(|e| CacheError::Connection(e.to_string()))?;
        let mut connection = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let pong: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        tracing::info!(response = %pong, "Connected to Redis principal cache");

        Ok(Self { connection, ttl })
    }

    fn key(id: &UserId) -> String {
        format!("user-{}", id)
    }
}

#[async_trait]
impl UserCache for RedisUserCache {
    async fn get(&self, id: &UserId) -> Result<Option<User>, CacheError> {
        let mut connection = self.connection.clone();

        let payload: Option<String> = connection
            .get(Self::key(id))
            .await
            .map_err(|e| CacheError::Command(e.to_string()))?;

        payload
            .map(|json| {
                serde_json::from_str::<CachedUser>(&json)
                    .map_err(|e| CacheError::Serialization(e.to_string()))
                    .and_then(User::try_from)
            })
            .transpose()
    }

    async fn set(&self, user: &User) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        let payload = serde_json::to_string(&CachedUser::from(user))
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        let _: () = connection
            .set_ex(Self::key(&user.id), payload, self.ttl.as_secs().max(1))
            .await
            .map_err(|e| CacheError::Command(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, id: &UserId) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();

        let _: () = connection
            .del(Self::key(id))
            .await
            .map_err(|e| CacheError::Command(e.to_string()))?;

        Ok(())
    }
}

/// Serialized form of a cached user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CachedUser {
    id: Uuid,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    bio: String,
    password_hash: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<&User> for CachedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.0,
            username: user.username.as_str().to_string(),
            email: user.email.as_str().to_string(),
            first_name: user.first_name.as_str().to_string(),
            last_name: user.last_name.as_str().to_string(),
            bio: user.bio.clone(),
            password_hash: user.credential.as_hash().to_string(),
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

impl TryFrom<CachedUser> for User {
    type Error = CacheError;

    fn try_from(cached: CachedUser) -> Result<Self, Self::Error> {
        let invalid = |e: String| CacheError::Serialization(e);

        Ok(User {
            id: UserId(cached.id),
            username: Username::new(cached.username).map_err(|e| invalid(e.to_string()))?,
            email: EmailAddress::new(cached.email).map_err(|e| invalid(e.to_string()))?,
            first_name: PersonName::new(cached.first_name).map_err(|e| invalid(e.to_string()))?,
            last_name: PersonName::new(cached.last_name).map_err(|e| invalid(e.to_string()))?,
            bio: cached.bio,
            credential: Credential::from_stored_hash(cached.password_hash),
            is_active: cached.is_active,
            created_at: cached.created_at,
        })
    }
}
