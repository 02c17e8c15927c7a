//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::db::Store;
use crate::models::{LocationChange, NewUser, User, UserPatch};
use crate::services::auth_service::{AuthError, AuthService, Registration};
use crate::services::ids::{IdKind, IdRegistry};
use crate::services::mailer::{Mailer, reset_password_mail};
use crate::services::reset_token::ResetTokenSigner;

pub struct SeaOrmAuthService {
    store: Store,
    ids: IdRegistry,
    signer: ResetTokenSigner,
    mailer: Arc<dyn Mailer>,
    sender: String,
    public_url: String,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        ids: IdRegistry,
        signer: ResetTokenSigner,
        mailer: Arc<dyn Mailer>,
        sender: String,
        public_url: String,
    ) -> Self {
        Self {
            store,
            ids,
            signer,
            mailer,
            sender,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        self.store
            .verify_user_password(username, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }

    async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        if self.store.username_taken(&registration.username, None).await? {
            return Err(AuthError::DuplicateUsername);
        }
        if self.store.email_taken(&registration.email, None).await? {
            return Err(AuthError::DuplicateEmail);
        }

        let userid = self.ids.issue(IdKind::User).await?;
        let locationid = self.ids.issue(IdKind::Location).await?;

        let details = UserPatch {
            username: None,
            email: None,
            locationid: None,
            password: Some(registration.password),
            location: Some(LocationChange::Create {
                locationid,
                lat_long: registration.lat_long,
            }),
            ..registration.details
        };

        // Unique indexes still catch a concurrent registration of the same name.
        let user = self
            .store
            .create_user(
                NewUser {
                    userid,
                    username: registration.username,
                    email: registration.email,
                },
                details,
            )
            .await?;

        info!("Registered user {} ({})", user.username, user.userid);
        Ok(user)
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let Some(user) = self.store.get_user_by_email(email).await? else {
            info!("Password reset requested for an unknown address");
            return Ok(());
        };

        let token = self
            .signer
            .issue(&user.userid)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let reset_url = format!("{}/reset_password/{token}", self.public_url);

        self.mailer
            .send(reset_password_mail(
                &self.sender,
                &user.email,
                &user.username,
                &reset_url,
            ))
            .await?;

        info!("Password reset mail sent to {}", user.username);
        Ok(())
    }

    async fn verify_reset_token(&self, token: &str) -> Result<Option<User>, AuthError> {
        let Some(userid) = self.signer.verify(token) else {
            return Ok(None);
        };

        Ok(self.store.get_user(&userid).await?)
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<User, AuthError> {
        let user = self
            .verify_reset_token(token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let user = self
            .store
            .update_user(
                &user.userid,
                UserPatch {
                    password: Some(new_password.to_string()),
                    ..Default::default()
                },
            )
            .await?;

        info!("Password reset for {}", user.username);
        Ok(user)
    }
}
