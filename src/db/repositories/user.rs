use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use tokio::task;

use crate::config::SecurityConfig;
use super::location;
use crate::db::{UniqueField, unique_violation};
use crate::entities::user;
use crate::models::{LocationChange, NewUser, User, UserPatch};

/// Errors from writes that may collide with the unique columns of `user`.
#[derive(Debug, thiserror::Error)]
pub enum UserWriteError {
    #[error("username already taken")]
    DuplicateUsername,

    #[error("email already registered")]
    DuplicateEmail,

    #[error("user id already in use")]
    DuplicateId,

    #[error("user not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UserWriteError {
    fn from_db(err: sea_orm::DbErr, action: &'static str) -> Self {
        match unique_violation(&err) {
            Some(UniqueField::Column(column)) if column == "username" => Self::DuplicateUsername,
            Some(UniqueField::Column(column)) if column == "email" => Self::DuplicateEmail,
            Some(_) => Self::DuplicateId,
            None => Self::Other(anyhow::Error::new(err).context(action)),
        }
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    pub memory_cost_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl From<&SecurityConfig> for HashParams {
    fn from(config: &SecurityConfig) -> Self {
        Self {
            memory_cost_kib: config.argon2_memory_cost_kib,
            time_cost: config.argon2_time_cost,
            parallelism: config.argon2_parallelism,
        }
    }
}

impl Default for HashParams {
    fn default() -> Self {
        Self::from(&SecurityConfig::default())
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
    hash_params: HashParams,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection, hash_params: HashParams) -> Self {
        Self { conn, hash_params }
    }

    /// Inserts a user with `details`, and its location when one is given,
    /// in a single transaction.
    pub async fn create(&self, new_user: NewUser, details: UserPatch) -> Result<User, UserWriteError> {
        let now = Utc::now();
        let mut active = user::ActiveModel {
            userid: Set(new_user.userid),
            username: Set(new_user.username),
            email: Set(new_user.email),
            name: Set(None),
            dob: Set(None),
            gender: Set(None),
            interests: Set(None),
            github_profile: Set(None),
            about_me: Set(None),
            locationid: Set(None),
            privacy: Set(None),
            password_hash: Set(None),
            timestamp: Set(now),
            last_seen: Set(now),
        };

        let location = self.apply_patch(&mut active, details).await?;

        let txn = self.conn.begin().await.context("Failed to start transaction")?;
        let model = active
            .insert(&txn)
            .await
            .map_err(|e| UserWriteError::from_db(e, "Failed to insert user"))?;
        if let Some(change) = location {
            location::write_change(&txn, &model.userid, change).await?;
        }
        txn.commit().await.context("Failed to commit user")?;

        Ok(User::from(model))
    }

    pub async fn get_by_id(&self, userid: &str) -> Result<Option<User>> {
        let user = user::Entity::find_by_id(userid.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    /// Whether `username` belongs to an account other than `except`.
    pub async fn username_taken(&self, username: &str, except: Option<&str>) -> Result<bool> {
        let mut query = user::Entity::find().filter(user::Column::Username.eq(username));
        if let Some(userid) = except {
            query = query.filter(user::Column::Userid.ne(userid));
        }

        let count = query
            .count(&self.conn)
            .await
            .context("Failed to check username")?;
        Ok(count > 0)
    }

    /// Whether `email` belongs to an account other than `except`.
    pub async fn email_taken(&self, email: &str, except: Option<&str>) -> Result<bool> {
        let mut query = user::Entity::find().filter(user::Column::Email.eq(email));
        if let Some(userid) = except {
            query = query.filter(user::Column::Userid.ne(userid));
        }

        let count = query
            .count(&self.conn)
            .await
            .context("Failed to check email")?;
        Ok(count > 0)
    }

    /// Returns the user when `password` matches the stored hash.
    /// Note: Argon2 runs on the blocking pool because it is CPU-intensive.
    pub async fn verify_password(&self, username: &str, password: &str) -> Result<Option<User>> {
        let user = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(None);
        };

        let Some(password_hash) = user.password_hash.clone() else {
            return Ok(None);
        };
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || check_password(&password_hash, &password))
            .await
            .context("Password verification task panicked")?;

        Ok(is_valid.then(|| User::from(user)))
    }

    /// Applies a sparse update and returns the stored row.
    pub async fn update(&self, userid: &str, patch: UserPatch) -> Result<User, UserWriteError> {
        let user = user::Entity::find_by_id(userid.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query user for update")?
            .ok_or_else(|| UserWriteError::NotFound(userid.to_string()))?;

        let mut active = user.into_active_model();
        let location = self.apply_patch(&mut active, patch).await?;

        let txn = self.conn.begin().await.context("Failed to start transaction")?;
        let model = active
            .update(&txn)
            .await
            .map_err(|e| UserWriteError::from_db(e, "Failed to update user"))?;
        if let Some(change) = location {
            location::write_change(&txn, userid, change).await?;
        }
        txn.commit().await.context("Failed to commit user")?;

        Ok(User::from(model))
    }

    pub async fn touch_last_seen(&self, userid: &str) -> Result<()> {
        user::Entity::update_many()
            .col_expr(
                user::Column::LastSeen,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(user::Column::Userid.eq(userid))
            .exec(&self.conn)
            .await
            .context("Failed to update last seen")?;

        Ok(())
    }

    pub async fn count(&self) -> Result<u64> {
        user::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count users")
    }

    /// Hashes the password, writes the user columns onto `active` and hands
    /// back the location change for the caller's transaction.
    async fn apply_patch(
        &self,
        active: &mut user::ActiveModel,
        mut patch: UserPatch,
    ) -> Result<Option<LocationChange>, UserWriteError> {
        if let Some(password) = patch.password.take() {
            let params = self.hash_params;
            let hash = task::spawn_blocking(move || hash_password(&password, params))
                .await
                .context("Password hashing task panicked")??;
            active.password_hash = Set(Some(hash));
        }

        let location = patch.location.clone();
        patch.apply(active);
        Ok(location)
    }
}

/// Hash a password using Argon2id with the given cost parameters.
pub fn hash_password(password: &str, params: HashParams) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        params.memory_cost_kib,
        params.time_cost,
        params.parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Checks `password` against a PHC hash string. Malformed hashes never match.
#[must_use]
pub fn check_password(password_hash: &str, password: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(password_hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
