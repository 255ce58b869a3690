use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use super::JsonBody;
use super::UserData;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::PersonName;
use crate::domain::user::models::PlaintextPassword;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::Registration;
use crate::domain::user::models::Username;
use crate::inbound::http::router::AppState;
use crate::user::errors::EmailError;
use crate::user::errors::NameError;
use crate::user::errors::PasswordPolicyError;
use crate::user::errors::UsernameError;

pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterUserRequest>,
) -> Result<ApiSuccess<RegisterUserResponseData>, ApiError> {
    state
        .user_service
        .register(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|ref registration| ApiSuccess::new(StatusCode::CREATED, registration.into()))
}

/// HTTP request body for registering a user (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterUserRequest {
    username: String,
    email: String,
    password: String,
    first_name: String,
    last_name: String,
}

#[derive(Debug, Clone, Error)]
enum ParseRegisterUserRequestError {
    #[error("Invalid username: {0}")]
    Username(#[from] UsernameError),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Invalid password: {0}")]
    Password(#[from] PasswordPolicyError),

    #[error("Invalid {field}: {source}")]
    Name {
        field: &'static str,
        source: NameError,
    },
}

impl RegisterUserRequest {
    fn try_into_command(self) -> Result<RegisterUserCommand, ParseRegisterUserRequestError> {
        let username = Username::new(self.username)?;
        let email = EmailAddress::new(self.email)?;
        let password = PlaintextPassword::new(self.password)?;
        let first_name = PersonName::new(self.first_name).map_err(|source| {
            ParseRegisterUserRequestError::Name {
                field: "first name",
                source,
            }
        })?;
        let last_name = PersonName::new(self.last_name).map_err(|source| {
            ParseRegisterUserRequestError::Name {
                field: "last name",
                source,
            }
        })?;

        Ok(RegisterUserCommand {
            username,
            email,
            password,
            first_name,
            last_name,
        })
    }
}

impl From<ParseRegisterUserRequestError> for ApiError {
    fn from(err: ParseRegisterUserRequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterUserResponseData {
    pub user: UserData,
    /// Plaintext invitation token, returned once.
    pub token: String,
}

impl From<&Registration> for RegisterUserResponseData {
    fn from(registration: &Registration) -> Self {
        Self {
            user: (&registration.user).into(),
            token: registration.token.expose().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterUserRequest {
        RegisterUserRequest {
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password: "longenough1".to_string(),
            first_name: "A".to_string(),
            last_name: "L".to_string(),
        }
    }

    #[test]
    fn test_valid_request_converts() {
        let command = request().try_into_command().unwrap();
        assert_eq!(command.username.as_str(), "alice");
        assert_eq!(command.password.expose(), "longenough1");
    }

    #[test]
    fn test_blank_last_name_is_rejected() {
        let mut body = request();
        body.last_name = "  ".to_string();

        let err = body.try_into_command().unwrap_err();
        assert_eq!(err.to_string(), "Invalid last name: Name must not be empty");
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let raw = r#"{"username":"alice","email":"a@x.com","password":"longenough1","first_name":"A","last_name":"L","is_active":true}"#;
        assert!(serde_json::from_str::<RegisterUserRequest>(raw).is_err());
    }
}
