use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;

/// Bearer token issuer and verifier.
///
/// Owns the issuance policy: the issuer/audience and the token lifetime come
/// from configuration, never from the client.
pub struct Authenticator {
    jwt_handler: JwtHandler,
    issuer: String,
    token_ttl: Duration,
}

/// Result of issuing a bearer token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Signed JWT
    pub access_token: String,
    /// Expiration instant of the token
    pub expires_at: DateTime<Utc>,
}

impl Authenticator {
    /// Create a new authenticator.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for JWT signing
    /// * `issuer` - Issuer name, also used as audience
    /// * `token_ttl` - Lifetime of issued tokens
    pub fn new(jwt_secret: &[u8], issuer: impl Into<String>, token_ttl: Duration) -> Self {
        let issuer = issuer.into();

        Self {
            jwt_handler: JwtHandler::new(jwt_secret, &issuer, &issuer),
            issuer,
            token_ttl,
        }
    }

    /// Lifetime of issued tokens.
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Issue a token asserting `subject`, valid from now for the configured lifetime.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token signing failed
    pub fn issue_token(&self, subject: impl ToString) -> Result<IssuedToken, JwtError> {
        let now = Utc::now();
        let claims = Claims::new(subject, &self.issuer, now, self.token_ttl);
        let access_token = self.generate_token(&claims)?;

        Ok(IssuedToken {
            access_token,
            expires_at: claims.expires_at().unwrap_or(now + self.token_ttl),
        })
    }

    /// Sign an explicit claim set.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token signing failed
    pub fn generate_token(&self, claims: &Claims) -> Result<String, JwtError> {
        self.jwt_handler.encode(claims)
    }

    /// Verify a token and return its claims.
    ///
    /// Validity is a pure function of the signature, the claims and the current
    /// time; there is no server-side revocation.
    ///
    /// # Errors
    /// * `JwtError` - Token validation or decoding failed
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.jwt_handler.decode(token)
    }
}
