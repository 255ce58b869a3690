use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth::InvitationToken;
use chrono::Utc;

use crate::domain::deadline;
use crate::domain::principal::ports::PrincipalResolver;
use crate::domain::user::credentials::CredentialStore;
use crate::domain::user::models::Invitation;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::Registration;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::WelcomeEmail;
use crate::user::errors::UserError;
use crate::user::ports::FollowerRepository;
use crate::user::ports::Mailer;
use crate::user::ports::UserRepository;
use crate::user::ports::UserServicePort;

/// Tunables for the registration flow.
#[derive(Debug, Clone)]
pub struct RegistrationSettings {
    /// How long an invitation stays redeemable.
    pub invitation_ttl: chrono::Duration,
    /// Base URL the plaintext token is appended to in the welcome email.
    pub activation_url: String,
    /// Deadline for every persistence call.
    pub deadline: Duration,
    /// Deadline for the whole welcome email delivery, retries included.
    pub mail_deadline: Duration,
}

/// Domain service implementation for user operations.
///
/// Concrete implementation of UserServicePort with dependency injection.
pub struct UserService<UR, FR, M>
where
    UR: UserRepository,
    FR: FollowerRepository,
    M: Mailer,
{
    repository: Arc<UR>,
    followers: Arc<FR>,
    mailer: Arc<M>,
    principals: Arc<dyn PrincipalResolver>,
    credentials: CredentialStore,
    settings: RegistrationSettings,
}

impl<UR, FR, M> UserService<UR, FR, M>
where
    UR: UserRepository,
    FR: FollowerRepository,
    M: Mailer,
{
    /// Create a new user service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - User and invitation persistence
    /// * `followers` - Follow relationship persistence
    /// * `mailer` - Welcome email delivery
    /// * `principals` - Resolver whose cached copies are dropped on delete
    /// * `credentials` - Password hashing with bounded concurrency
    /// * `settings` - Invitation lifetime, activation URL and deadline
    pub fn new(
        repository: Arc<UR>,
        followers: Arc<FR>,
        mailer: Arc<M>,
        principals: Arc<dyn PrincipalResolver>,
        credentials: CredentialStore,
        settings: RegistrationSettings,
    ) -> Self {
        Self {
            repository,
            followers,
            mailer,
            principals,
            credentials,
            settings,
        }
    }

    fn activation_link(&self, token: &InvitationToken) -> String {
        format!(
            "{}/{}",
            self.settings.activation_url.trim_end_matches('/'),
            token.expose()
        )
    }
}

/// Send the welcome email, deleting the new user again if that fails.
///
/// Runs on its own task, so a dropped request cannot stop between the failed
/// send and the delete. Rollback failures are only logged.
async fn deliver_welcome<UR, M>(
    repository: Arc<UR>,
    mailer: Arc<M>,
    email: WelcomeEmail,
    user_id: UserId,
    settings: RegistrationSettings,
) -> Result<(), UserError>
where
    UR: UserRepository,
    M: Mailer,
{
    let sent = deadline::within(settings.mail_deadline, "send welcome email", async {
        mailer.send_welcome(&email).await.map_err(UserError::from)
    })
    .await;

    let Err(e) = sent else {
        return Ok(());
    };

    tracing::error!(user_id = %user_id, error = %e, "Failed to send welcome email");
    match deadline::within(
        settings.deadline,
        "delete unconfirmed user",
        repository.delete(&user_id),
    )
    .await
    {
        Ok(()) => tracing::info!(user_id = %user_id, "Rolled back registration"),
        Err(rollback) => {
            tracing::error!(user_id = %user_id, error = %rollback, "Failed to roll back registration")
        }
    }

    Err(e)
}

#[async_trait]
impl<UR, FR, M> UserServicePort for UserService<UR, FR, M>
where
    UR: UserRepository,
    FR: FollowerRepository,
    M: Mailer,
{
    async fn register(&self, command: RegisterUserCommand) -> Result<Registration, UserError> {
        let credential = self.credentials.set(command.password).await?;

        let now = Utc::now();
        let token = InvitationToken::generate();
        let user = User {
            id: UserId::new(),
            username: command.username,
            email: command.email,
            first_name: command.first_name,
            last_name: command.last_name,
            bio: String::new(),
            credential,
            is_active: false,
            created_at: now,
        };
        let invitation = Invitation {
            digest: token.digest(),
            user_id: user.id,
            expires_at: now + self.settings.invitation_ttl,
        };

        let user = deadline::within(
            self.settings.deadline,
            "create user",
            self.repository.create_and_invite(user, invitation),
        )
        .await?;

        let delivery = tokio::spawn(deliver_welcome(
            Arc::clone(&self.repository),
            Arc::clone(&self.mailer),
            WelcomeEmail::new(&user, self.activation_link(&token)),
            user.id,
            self.settings.clone(),
        ));

        delivery
            .await
            .map_err(|e| UserError::Unknown(format!("welcome email task failed: {e}")))??;

        tracing::info!(user_id = %user.id, "Registered user");
        Ok(Registration { user, token })
    }

    async fn activate(&self, token: &InvitationToken) -> Result<(), UserError> {
        let digest = token.digest();

        let user_id = deadline::within(
            self.settings.deadline,
            "activate user",
            self.repository.activate(&digest, Utc::now()),
        )
        .await?;

        tracing::info!(user_id = %user_id, "Activated user");
        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<User, UserError> {
        let user = deadline::within(
            self.settings.deadline,
            "find user by email",
            self.repository.find_active_by_email(email),
        )
        .await?;

        let Some(user) = user else {
            self.credentials.verify_absent(password).await?;
            return Err(UserError::NotFoundByEmail(email.to_string()));
        };

        if !self.credentials.verify(password, &user.credential).await? {
            return Err(UserError::InvalidCredentials);
        }

        Ok(user)
    }

    async fn get_user(&self, id: &UserId) -> Result<User, UserError> {
        deadline::within(
            self.settings.deadline,
            "find user by id",
            self.repository.find_active_by_id(id),
        )
        .await?
        .ok_or(UserError::NotFound(id.to_string()))
    }

    async fn follow(&self, follower: &UserId, target: &UserId) -> Result<(), UserError> {
        if follower == target {
            return Err(UserError::CannotFollowSelf);
        }

        deadline::within(
            self.settings.deadline,
            "follow user",
            self.followers.follow(target, follower),
        )
        .await
    }

    async fn unfollow(&self, follower: &UserId, target: &UserId) -> Result<(), UserError> {
        deadline::within(
            self.settings.deadline,
            "unfollow user",
            self.followers.unfollow(target, follower),
        )
        .await
    }

    async fn delete_user(&self, id: &UserId) -> Result<(), UserError> {
        deadline::within(
            self.settings.deadline,
            "delete user",
            self.repository.delete(id),
        )
        .await?;

        if let Err(e) = self.principals.invalidate(id).await {
            tracing::error!(user_id = %id, error = %e, "Failed to invalidate cached principal");
        }

        Ok(())
    }
}
