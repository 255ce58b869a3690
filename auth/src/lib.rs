//! Authentication utilities library
//!
//! Provides the credential primitives the services build on:
//! - Password hashing (Argon2id, cost fixed at construction)
//! - JWT token issuance and validation (HS256, typed claims)
//! - Invitation tokens (random plaintext, SHA-256 digest for storage)
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Bearer Tokens
//! ```
//! use auth::Authenticator;
//! use chrono::Duration;
//!
//! let auth = Authenticator::new(b"secret_key_at_least_32_bytes_long!", "planner", Duration::hours(72));
//! let issued = auth.issue_token("user123").unwrap();
//! let claims = auth.validate_token(&issued.access_token).unwrap();
//! assert_eq!(claims.sub, "user123");
//! ```
//!
//! ## Invitation Tokens
//! ```
//! use auth::InvitationToken;
//!
//! let token = InvitationToken::generate();
//! let digest = token.digest();
//! assert_ne!(digest.as_str(), token.expose());
//! ```

pub mod authenticator;
pub mod invitation;
pub mod jwt;
pub mod password;

pub use authenticator::Authenticator;
pub use authenticator::IssuedToken;
pub use invitation::InvitationToken;
pub use invitation::TokenDigest;
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::PasswordError;
pub use password::PasswordHasher;
