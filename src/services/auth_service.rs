//! Domain service for accounts: login, registration and password reset.

use thiserror::Error;

use crate::models::{User, UserPatch};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Please use a different username.")]
    DuplicateUsername,

    #[error("Please use a different email address.")]
    DuplicateEmail,

    #[error("Invalid or expired reset token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Mail error: {0}")]
    Mail(#[from] crate::services::mailer::MailError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl From<crate::db::UserWriteError> for AuthError {
    fn from(err: crate::db::UserWriteError) -> Self {
        use crate::db::UserWriteError;

        match err {
            UserWriteError::DuplicateUsername => Self::DuplicateUsername,
            UserWriteError::DuplicateEmail => Self::DuplicateEmail,
            UserWriteError::NotFound(_) => Self::UserNotFound,
            UserWriteError::DuplicateId => {
                Self::Internal("user id collision".to_string())
            }
            UserWriteError::Other(e) => e.into(),
        }
    }
}

/// Everything the registration form collects.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Optional profile fields; `password` and the location fields are ignored here
    pub details: UserPatch,
    pub lat_long: Option<String>,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials and returns the user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if the username is unknown or
    /// the password does not match.
    async fn login(&self, username: &str, password: &str) -> Result<User, AuthError>;

    /// Creates the account with fresh user and location ids.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DuplicateUsername`] or [`AuthError::DuplicateEmail`]
    /// when another account holds either value.
    async fn register(&self, registration: Registration) -> Result<User, AuthError>;

    /// Mails a reset link when `email` belongs to an account. Unknown
    /// addresses are not an error.
    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError>;

    /// The account a reset token was issued for, if the token is still valid.
    async fn verify_reset_token(&self, token: &str) -> Result<Option<User>, AuthError>;

    /// Sets a new password for the holder of `token`.
    async fn reset_password(&self, token: &str, new_password: &str) -> Result<User, AuthError>;
}
