use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Bearer token claims.
///
/// Every field is required: a token whose payload does not carry the full set
/// is rejected at decode time, before the subject is looked at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user identifier)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Create claims for a subject, valid from `now` for `ttl`.
    ///
    /// # Arguments
    /// * `subject` - Unique user identifier
    /// * `issuer` - Token issuer, also used as audience
    /// * `now` - Issuance instant
    /// * `ttl` - Lifetime of the token
    pub fn new(
        subject: impl ToString,
        issuer: impl ToString,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let issuer = issuer.to_string();

        Self {
            sub: subject.to_string(),
            aud: issuer.clone(),
            iss: issuer,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    /// Override the audience.
    pub fn with_audience(mut self, aud: impl ToString) -> Self {
        self.aud = aud.to_string();
        self
    }

    /// Expiration as a UTC instant.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}
