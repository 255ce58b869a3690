use std::sync::Arc;
use std::time::Duration;

use auth::PasswordHasher;
use tokio::sync::OnceCell;
use tokio::sync::Semaphore;

use crate::domain::deadline;
use crate::domain::user::models::Credential;
use crate::domain::user::models::PlaintextPassword;
use crate::user::errors::PasswordError;
use crate::user::errors::UserError;

const PLACEHOLDER_PASSWORD: &str = "placeholder-for-unknown-accounts";

/// Password hashing and verification off the async runtime.
///
/// Hashing is CPU-bound and deliberately slow, so each call runs on the
/// blocking pool and at most `max_concurrent` of them run at once. Callers
/// beyond that wait for a permit inside the same deadline as the hash itself.
#[derive(Clone)]
pub struct CredentialStore {
    hasher: Arc<PasswordHasher>,
    permits: Arc<Semaphore>,
    deadline: Duration,
    placeholder: Arc<OnceCell<Credential>>,
}

impl CredentialStore {
    pub fn new(hasher: PasswordHasher, max_concurrent: usize, deadline: Duration) -> Self {
        Self {
            hasher: Arc::new(hasher),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            deadline,
            placeholder: Arc::new(OnceCell::new()),
        }
    }

    /// Derive a credential from a plaintext password.
    ///
    /// # Errors
    /// * `Password(HashingFailed)` - Hashing failed
    /// * `Timeout` - No permit or no result within the deadline
    pub async fn set(&self, password: PlaintextPassword) -> Result<Credential, UserError> {
        let password = password.into_inner();

        let hash = self
            .run_blocking("hash password", move |hasher| hasher.hash(&password))
            .await?
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(Credential::from_new_hash(hash))
    }

    /// Check a plaintext password against a stored credential.
    ///
    /// A mismatch is `Ok(false)`. An unparseable stored hash is logged and also
    /// reported as a mismatch so the caller cannot tell the cases apart.
    ///
    /// # Errors
    /// * `Timeout` / `Unknown` - The verification task did not complete
    pub async fn verify(&self, password: &str, credential: &Credential) -> Result<bool, UserError> {
        let password = password.to_string();
        let hash = credential.as_hash().to_string();

        let outcome = self
            .run_blocking("verify password", move |hasher| hasher.verify(&password, &hash))
            .await?;

        Ok(outcome.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Stored credential could not be parsed");
            false
        }))
    }

    /// Spend one verification on a password that has no account behind it.
    ///
    /// Login for an unknown email then costs as much as a wrong password. The
    /// placeholder credential is hashed on first use and reused afterwards.
    ///
    /// # Errors
    /// * `Password(HashingFailed)` - The placeholder could not be hashed
    /// * `Timeout` / `Unknown` - The verification task did not complete
    pub async fn verify_absent(&self, password: &str) -> Result<(), UserError> {
        let placeholder = self
            .placeholder
            .get_or_try_init(|| async {
                let hash = self
                    .run_blocking("hash placeholder", |hasher| hasher.hash(PLACEHOLDER_PASSWORD))
                    .await?
                    .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;
                Ok::<_, UserError>(Credential::from_new_hash(hash))
            })
            .await?;

        self.verify(password, placeholder).await?;
        Ok(())
    }

    async fn run_blocking<T, F>(&self, operation: &'static str, work: F) -> Result<T, UserError>
    where
        F: FnOnce(&PasswordHasher) -> T + Send + 'static,
        T: Send + 'static,
    {
        let hasher = Arc::clone(&self.hasher);
        let permits = Arc::clone(&self.permits);

        deadline::within(self.deadline, operation, async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|e| UserError::Unknown(format!("{operation}: {e}")))?;

            // The permit moves into the task so it is held until hashing ends,
            // even if the caller gives up waiting.
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                work(hasher.as_ref())
            })
            .await
            .map_err(|e| UserError::Unknown(format!("{operation} task failed: {e}")))
        })
        .await
    }
}
