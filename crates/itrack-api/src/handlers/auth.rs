//! Register, login, and current-user handlers.

use axum::{extract::State, response::Response};
use serde::{Deserialize, Serialize};
use tracing::info;

use itrack_core::defaults::PASSWORD_MIN_LEN;
use itrack_core::validation::{is_valid_email, non_blank, normalize_email};
use itrack_core::{CreateUserRequest, UserRepository, UserSummary};

use crate::auth::{hash_password, verify_password, AuthUser, INVALID_CREDENTIALS_MSG};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::response;
use crate::state::AppState;
use crate::validation::Checks;

pub const USER_NOT_FOUND_MSG: &str = "User not found.";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginBody {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// `data` of register and login.
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: UserSummary,
}

struct Registration {
    name: String,
    email: String,
    password: String,
}

fn validate_register(body: RegisterBody) -> Result<Registration, ApiError> {
    let mut checks = Checks::new();

    let name = non_blank(body.name);
    checks.check(name.is_some(), "name", "Name is required");

    let email = body.email.filter(|e| is_valid_email(e));
    checks.check(email.is_some(), "email", "Valid email is required");

    let password = body
        .password
        .filter(|p| p.chars().count() >= PASSWORD_MIN_LEN);
    checks.check(
        password.is_some(),
        "password",
        "Password must be at least 6 characters",
    );

    let registration = match (name, email, password) {
        (Some(name), Some(email), Some(password)) => Some(Registration {
            name,
            email: normalize_email(&email),
            password,
        }),
        _ => None,
    };
    checks.finish_with(registration)
}

fn validate_login(body: LoginBody) -> Result<(String, String), ApiError> {
    let mut checks = Checks::new();

    let email = body.email.filter(|e| is_valid_email(e));
    checks.check(email.is_some(), "email", "Valid email is required");

    let password = body.password.filter(|p| !p.is_empty());
    checks.check(password.is_some(), "password", "Password is required");

    let credentials = email
        .zip(password)
        .map(|(email, password)| (normalize_email(&email), password));
    checks.finish_with(credentials)
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterBody>,
) -> Result<Response, ApiError> {
    let input = validate_register(body)?;
    let password_hash = hash_password(input.password, state.bcrypt_cost).await?;

    let user = state
        .db
        .users
        .create(CreateUserRequest {
            name: input.name,
            email: input.email,
            password_hash,
        })
        .await?;

    let summary = UserSummary::from(&user);
    let token = state.tokens.issue(&summary)?;
    info!(user_id = %user.id, "Account created");

    Ok(response::created(
        "Account created successfully",
        AuthPayload {
            token,
            user: summary,
        },
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginBody>,
) -> Result<Response, ApiError> {
    let (email, password) = validate_login(body)?;

    let user = state
        .db
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS_MSG.to_string()))?;

    if !verify_password(password, user.password_hash.clone()).await? {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS_MSG.to_string()));
    }

    let summary = UserSummary::from(&user);
    let token = state.tokens.issue(&summary)?;

    Ok(response::ok(
        "Logged in successfully",
        AuthPayload {
            token,
            user: summary,
        },
    ))
}

pub async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<Response, ApiError> {
    let user = state
        .db
        .users
        .get(auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND_MSG.to_string()))?;

    Ok(response::ok("User retrieved", user))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(err: ApiError) -> Vec<String> {
        match err {
            ApiError::Validation(errors) => errors.into_iter().map(|e| e.message).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_register_reports_every_field() {
        let err = validate_register(RegisterBody::default()).err().unwrap();
        assert_eq!(
            messages(err),
            vec![
                "Name is required",
                "Valid email is required",
                "Password must be at least 6 characters"
            ]
        );
    }

    #[test]
    fn test_register_normalizes_email() {
        let input = validate_register(RegisterBody {
            name: Some("  Ada  ".into()),
            email: Some(" Ada@Example.COM".into()),
            password: Some("secret".into()),
        })
        .ok()
        .unwrap();
        assert_eq!(input.name, "Ada");
        assert_eq!(input.email, "ada@example.com");
    }

    #[test]
    fn test_register_short_password() {
        let err = validate_register(RegisterBody {
            name: Some("Ada".into()),
            email: Some("ada@example.com".into()),
            password: Some("12345".into()),
        })
        .err()
        .unwrap();
        assert_eq!(messages(err), vec!["Password must be at least 6 characters"]);
    }

    #[test]
    fn test_login_requires_password() {
        let err = validate_login(LoginBody {
            email: Some("ada@example.com".into()),
            password: Some(String::new()),
        })
        .unwrap_err();
        assert_eq!(messages(err), vec!["Password is required"]);

        let (email, _) = validate_login(LoginBody {
            email: Some("ADA@example.com".into()),
            password: Some("x".into()),
        })
        .unwrap();
        assert_eq!(email, "ada@example.com");
    }
}
