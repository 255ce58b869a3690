use async_trait::async_trait;
use auth::InvitationToken;
use auth::TokenDigest;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::user::models::Invitation;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::Registration;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::WelcomeEmail;
use crate::user::errors::MailerError;
use crate::user::errors::UserError;

/// Port for user domain service operations.
#[async_trait]
pub trait UserServicePort: Send + Sync + 'static {
    /// Register an inactive user and send the activation email.
    ///
    /// The user and its invitation are persisted atomically. If the email
    /// cannot be sent the user is deleted again before the error is returned.
    ///
    /// # Returns
    /// Created user and the plaintext invitation token
    ///
    /// # Errors
    /// * `UsernameAlreadyExists` / `EmailAlreadyExists` - Unique credential taken
    /// * `Password` - Hashing failed
    /// * `Mailer` - Activation email could not be sent
    /// * `DatabaseError` / `Timeout` - Persistence failed
    async fn register(&self, command: RegisterUserCommand) -> Result<Registration, UserError>;

    /// Exchange an invitation token for an active account.
    ///
    /// # Errors
    /// * `InvitationNotFound` - Token unknown or expired; nothing is mutated
    /// * `DatabaseError` / `Timeout` - Persistence failed
    async fn activate(&self, token: &InvitationToken) -> Result<(), UserError>;

    /// Verify basic credentials of an active user.
    ///
    /// # Errors
    /// * `NotFoundByEmail` - No active user with this email
    /// * `InvalidCredentials` - Password does not match
    /// * `DatabaseError` / `Timeout` / `Password` - Backend failure
    async fn authenticate(&self, email: &str, password: &str) -> Result<User, UserError>;

    /// Retrieve an active user by identifier.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist or is not active
    /// * `DatabaseError` - Database operation failed
    async fn get_user(&self, id: &UserId) -> Result<User, UserError>;

    /// Make `follower` follow `target`.
    ///
    /// # Errors
    /// * `CannotFollowSelf` - Both IDs are equal
    /// * `AlreadyFollowing` - Relationship already exists
    /// * `NotFound` - Target user does not exist
    async fn follow(&self, follower: &UserId, target: &UserId) -> Result<(), UserError>;

    /// Remove the follow relationship if it exists.
    async fn unfollow(&self, follower: &UserId, target: &UserId) -> Result<(), UserError>;

    /// Delete a user together with its invitations.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn delete_user(&self, id: &UserId) -> Result<(), UserError>;
}

/// Persistence operations for the user aggregate and its invitations.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist a new user and its invitation as one unit.
    ///
    /// Either both rows commit or neither does.
    ///
    /// # Errors
    /// * `UsernameAlreadyExists` - Username is already taken
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn create_and_invite(&self, user: User, invitation: Invitation)
        -> Result<User, UserError>;

    /// Activate the user owning the invitation with `digest`, if it has not
    /// expired at `now`, and delete all of that user's invitations.
    ///
    /// # Returns
    /// ID of the activated user
    ///
    /// # Errors
    /// * `InvitationNotFound` - No invitation with this digest, or it expired
    /// * `DatabaseError` - Database operation failed
    async fn activate(&self, digest: &TokenDigest, now: DateTime<Utc>)
        -> Result<UserId, UserError>;

    /// Retrieve an active user by identifier.
    ///
    /// # Returns
    /// Optional user entity (None if not found or inactive)
    async fn find_active_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;

    /// Retrieve an active user by email address.
    ///
    /// # Returns
    /// Optional user entity (None if not found or inactive)
    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>, UserError>;

    /// Remove a user and all of its invitations.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn delete(&self, id: &UserId) -> Result<(), UserError>;
}

/// Persistence operations for the follow relationship.
#[async_trait]
pub trait FollowerRepository: Send + Sync + 'static {
    /// Record that `follower_id` follows `user_id`.
    ///
    /// # Errors
    /// * `AlreadyFollowing` - Relationship already exists
    /// * `NotFound` - One of the users does not exist
    async fn follow(&self, user_id: &UserId, follower_id: &UserId) -> Result<(), UserError>;

    /// Remove the relationship; absent relationships are not an error.
    async fn unfollow(&self, user_id: &UserId, follower_id: &UserId) -> Result<(), UserError>;
}

/// Outbound email delivery.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// Send the welcome message carrying the activation link.
    ///
    /// # Errors
    /// * `Template` - Message could not be rendered
    /// * `Transport` / `Rejected` - Provider unreachable or refused the message
    async fn send_welcome(&self, email: &WelcomeEmail) -> Result<(), MailerError>;
}
