use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::Set;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::entities::user;

/// User data handed to handlers and views (without the password hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub userid: String,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub interests: Option<String>,
    pub github_profile: Option<String>,
    pub about_me: Option<String>,
    pub locationid: Option<String>,
    pub privacy: Option<bool>,
    pub timestamp: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl From<user::Model> for User {
    fn from(model: user::Model) -> Self {
        Self {
            userid: model.userid,
            username: model.username,
            email: model.email,
            name: model.name,
            dob: model.dob,
            gender: model.gender,
            interests: model.interests,
            github_profile: model.github_profile,
            about_me: model.about_me,
            locationid: model.locationid,
            privacy: model.privacy,
            timestamp: model.timestamp,
            last_seen: model.last_seen,
        }
    }
}

impl User {
    /// Gravatar identicon for the account e-mail.
    #[must_use]
    pub fn avatar(&self, size: u32) -> String {
        let digest = Sha256::digest(self.email.to_lowercase().as_bytes());
        format!(
            "https://www.gravatar.com/avatar/{}?d=identicon&s={size}",
            hex::encode(digest)
        )
    }

    #[must_use]
    pub fn is_private(&self) -> bool {
        self.privacy.unwrap_or(false)
    }

    /// Interests as a list, split on `;`
    #[must_use]
    pub fn interest_list(&self) -> Vec<String> {
        split_semicolons(self.interests.as_deref())
    }
}

pub(crate) fn split_semicolons(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub userid: String,
    pub username: String,
    pub email: String,
}

/// Location row written together with a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationChange {
    /// Inserts a location and points the user at it.
    Create {
        locationid: String,
        lat_long: Option<String>,
    },
    /// Rewrites the coordinates of the user's existing location.
    Update { locationid: String, lat_long: String },
}

/// Sparse update of a user row. Only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub interests: Option<String>,
    pub github_profile: Option<String>,
    pub about_me: Option<String>,
    pub locationid: Option<String>,
    pub privacy: Option<bool>,
    /// Plain text; hashed by the repository before it is stored
    pub password: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    /// Written in the same transaction as the user row
    pub location: Option<LocationChange>,
}

impl UserPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.name.is_none()
            && self.dob.is_none()
            && self.gender.is_none()
            && self.interests.is_none()
            && self.github_profile.is_none()
            && self.about_me.is_none()
            && self.locationid.is_none()
            && self.privacy.is_none()
            && self.password.is_none()
            && self.last_seen.is_none()
            && self.location.is_none()
    }

    /// Writes every present field onto `active`. `password` and `location`
    /// are left to the caller: one must be hashed first, the other is a
    /// separate row.
    pub fn apply(self, active: &mut user::ActiveModel) {
        if let Some(username) = self.username {
            active.username = Set(username);
        }
        if let Some(email) = self.email {
            active.email = Set(email);
        }
        if let Some(name) = self.name {
            active.name = Set(Some(name));
        }
        if let Some(dob) = self.dob {
            active.dob = Set(Some(dob));
        }
        if let Some(gender) = self.gender {
            active.gender = Set(Some(gender));
        }
        if let Some(interests) = self.interests {
            active.interests = Set(Some(interests));
        }
        if let Some(github_profile) = self.github_profile {
            active.github_profile = Set(Some(github_profile));
        }
        if let Some(about_me) = self.about_me {
            active.about_me = Set(Some(about_me));
        }
        if let Some(locationid) = self.locationid {
            active.locationid = Set(Some(locationid));
        } else if let Some(LocationChange::Create { locationid, .. }) = self.location {
            active.locationid = Set(Some(locationid));
        }
        if let Some(privacy) = self.privacy {
            active.privacy = Set(Some(privacy));
        }
        if let Some(last_seen) = self.last_seen {
            active.last_seen = Set(last_seen);
        }
    }
}
