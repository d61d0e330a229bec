use super::{
    auth::{AccessClaims, AccessTokenSigner, JournHasher},
    AuthToken, AuthTokenValue, FullUserStore, NewUser, PasswordCredentials, User,
    UserDetailsUpdate,
};
use crate::clock::Clock;
use crate::verification::VerificationCode;
use chrono::Duration;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PHONE_NUMBER_LENGTH: usize = 20;

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex");
    static ref UNIQUE_VIOLATION_REGEX: Regex =
        Regex::new(r"UNIQUE constraint failed: user\.(\w+)").expect("valid constraint regex");
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("User not found")]
    NotFound,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("The new password must differ from the old one")]
    PasswordReused,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub phone_number: Option<String>,
    pub password: String,
}

/// A freshly created, still inactive account and the code that activates it.
#[derive(Debug, Clone)]
pub struct RegisteredUser {
    pub user_id: usize,
    pub email: String,
    pub username: String,
    pub code: VerificationCode,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: usize,
    pub user_email: String,
}

/// Account operations: registration, login, token refresh and profile changes.
pub struct UserManager {
    store: Arc<dyn FullUserStore>,
    signer: AccessTokenSigner,
    refresh_token_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl UserManager {
    pub fn new(
        store: Arc<dyn FullUserStore>,
        signer: AccessTokenSigner,
        refresh_token_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            signer,
            refresh_token_ttl,
            clock,
        }
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        self.refresh_token_ttl
    }

    pub fn register(&self, registration: Registration) -> Result<RegisteredUser, UserError> {
        let email = registration.email.trim().to_string();
        let username = registration.username.trim().to_string();
        validate_email(&email)?;
        validate_username(&username)?;
        let contact = match registration.phone_number {
            Some(phone) if !phone.trim().is_empty() => {
                validate_phone_number(phone.trim())?;
                Some(phone.trim().to_string())
            }
            _ => None,
        };
        validate_password(&registration.password)?;

        let code = VerificationCode::generate();
        let new_user = NewUser {
            email: email.clone(),
            username: username.clone(),
            contact: contact.clone(),
            credentials: hash_password(&registration.password)?,
            verification_code: code.to_string(),
            verification_issued_at: self.clock.now(),
        };

        let user_id = self.store.create_user(&new_user).map_err(|err| {
            map_unique_violation(err, &email, &username, contact.as_deref())
        })?;
        info!("Registered user {} ({})", user_id, email);

        Ok(RegisteredUser {
            user_id,
            email,
            username,
            code,
        })
    }

    pub fn login(&self, email: &str, password: &str) -> Result<TokenPair, UserError> {
        let user = self
            .store
            .get_user_by_email(email.trim())?
            .ok_or(UserError::InvalidCredentials)?;
        let credentials = self
            .store
            .get_password_credentials(user.id)?
            .ok_or(UserError::InvalidCredentials)?;

        if !credentials.hasher.verify(password, &credentials.hash)? {
            debug!("Wrong password for user {}", user.id);
            return Err(UserError::InvalidCredentials);
        }

        self.issue_tokens(&user)
    }

    /// Exchanges a refresh token for a new pair. The old refresh token is revoked.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, UserError> {
        let value = AuthTokenValue(refresh_token.to_string());
        let token = self
            .store
            .delete_auth_token(&value)?
            .ok_or(UserError::InvalidToken)?;
        if token.is_expired(self.clock.now(), self.refresh_token_ttl) {
            return Err(UserError::InvalidToken);
        }

        let user = self
            .store
            .get_user(token.user_id)?
            .ok_or(UserError::InvalidToken)?;
        self.issue_tokens(&user)
    }

    /// Revokes a refresh token. Unknown tokens are reported as invalid.
    pub fn logout(&self, refresh_token: &str) -> Result<(), UserError> {
        let value = AuthTokenValue(refresh_token.to_string());
        match self.store.delete_auth_token(&value)? {
            Some(token) => {
                info!("User {} logged out", token.user_id);
                Ok(())
            }
            None => Err(UserError::InvalidToken),
        }
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, UserError> {
        self.signer
            .verify(token)
            .map_err(|_| UserError::InvalidToken)
    }

    pub fn reset_password(
        &self,
        user_id: usize,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), UserError> {
        let credentials = self
            .store
            .get_password_credentials(user_id)?
            .ok_or(UserError::NotFound)?;
        if !credentials.hasher.verify(old_password, &credentials.hash)? {
            return Err(UserError::InvalidCredentials);
        }
        if old_password == new_password {
            return Err(UserError::PasswordReused);
        }
        validate_password(new_password)?;

        self.store
            .update_password_credentials(user_id, &hash_password(new_password)?)?;
        info!("Password changed for user {}", user_id);
        Ok(())
    }

    pub fn update_details(
        &self,
        user_id: usize,
        update: UserDetailsUpdate,
    ) -> Result<User, UserError> {
        let update = UserDetailsUpdate {
            email: update.email.map(|e| e.trim().to_string()),
            username: update.username.map(|u| u.trim().to_string()),
            phone_number: update.phone_number.map(|p| p.trim().to_string()),
        };
        if update.is_empty() {
            return Err(UserError::Invalid("Nothing to update".to_string()));
        }
        if let Some(email) = &update.email {
            validate_email(email)?;
        }
        if let Some(username) = &update.username {
            validate_username(username)?;
        }
        if let Some(phone) = &update.phone_number {
            validate_phone_number(phone)?;
        }

        let updated = self
            .store
            .update_user_details(user_id, &update)
            .map_err(|err| {
                map_unique_violation(
                    err,
                    update.email.as_deref().unwrap_or_default(),
                    update.username.as_deref().unwrap_or_default(),
                    update.phone_number.as_deref(),
                )
            })?;
        if !updated {
            return Err(UserError::NotFound);
        }
        self.get_details(user_id)
    }

    pub fn get_details(&self, user_id: usize) -> Result<User, UserError> {
        self.store.get_user(user_id)?.ok_or(UserError::NotFound)
    }

    fn issue_tokens(&self, user: &User) -> Result<TokenPair, UserError> {
        let now = self.clock.now();
        let access_token = self.signer.issue(user, now)?;
        let refresh = AuthToken {
            user_id: user.id,
            value: AuthTokenValue::generate(),
            created: now,
        };
        self.store.add_auth_token(&refresh)?;

        Ok(TokenPair {
            access_token,
            refresh_token: refresh.value.0,
            user_id: user.id,
            user_email: user.email.clone(),
        })
    }
}

fn hash_password(password: &str) -> anyhow::Result<PasswordCredentials> {
    let hasher = JournHasher::Argon2;
    let salt = hasher.generate_b64_salt();
    let hash = hasher.hash(password.as_bytes(), &salt)?;
    Ok(PasswordCredentials { salt, hash, hasher })
}

fn validate_email(email: &str) -> Result<(), UserError> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(UserError::Invalid(format!("'{}' is not a valid email", email)))
    }
}

fn validate_username(username: &str) -> Result<(), UserError> {
    if username.is_empty() {
        return Err(UserError::Invalid("The username cannot be empty".to_string()));
    }
    Ok(())
}

fn validate_phone_number(phone: &str) -> Result<(), UserError> {
    if phone.chars().count() > MAX_PHONE_NUMBER_LENGTH {
        return Err(UserError::Invalid(format!(
            "The phone number cannot be longer than {} characters",
            MAX_PHONE_NUMBER_LENGTH
        )));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), UserError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(UserError::Invalid(format!(
            "The password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn map_unique_violation(
    err: anyhow::Error,
    email: &str,
    username: &str,
    contact: Option<&str>,
) -> UserError {
    let full = format!("{:#}", err);
    let column = UNIQUE_VIOLATION_REGEX
        .captures(&full)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());
    match column.as_deref() {
        Some("email") => {
            UserError::Duplicate(format!("The email '{}' is already registered.", email))
        }
        Some("username") => {
            UserError::Duplicate(format!("The username '{}' is already taken.", username))
        }
        Some("contact") => UserError::Duplicate(format!(
            "The contact '{}' is already in use.",
            contact.unwrap_or_default()
        )),
        _ => UserError::Store(err),
    }
}
