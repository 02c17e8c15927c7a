use axum::{
    Extension, Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::session::{CurrentUser, flash};
use super::validation::{self, non_empty};
use super::{ApiError, AppState, FormContext, FormErrors, render};
use crate::constants::choices::{GENDERS, PRIVACY, PRIVATE, PUBLIC};
use crate::constants::limits::{AVATAR_SIZE, EMAIL_MAX, USERNAME_MAX};
use crate::db::UserWriteError;
use crate::models::{LocationChange, Project, User, UserPatch};
use crate::services::IdKind;

#[derive(Debug, Serialize)]
struct ProfileContext {
    user: User,
    avatar: String,
    interests: Vec<String>,
    is_self: bool,
    is_following: bool,
    followers_count: u64,
    followed_count: u64,
    lat_long: Option<String>,
    projects: Vec<Project>,
}

/// GET /profile/{username}
pub async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    session: Session,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    let store = state.store();
    let user = store
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::user_not_found(&username))?;

    let lat_long = match &user.locationid {
        Some(locationid) => store
            .get_location(locationid)
            .await?
            .and_then(|location| location.lat_long),
        None => None,
    };

    let context = ProfileContext {
        avatar: user.avatar(AVATAR_SIZE),
        interests: user.interest_list(),
        is_self: user.userid == current.userid,
        is_following: store.is_following(&current.userid, &user.userid).await?,
        followers_count: store.followers_count(&user.userid).await?,
        followed_count: store.followed_count(&user.userid).await?,
        projects: store.projects_for_user(&user.userid).await?,
        lat_long,
        user,
    };

    let title = context.user.username.clone();
    render(&session, "profile.html", title, context).await
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EditProfileForm {
    pub username: String,
    pub name: String,
    pub dob: String,
    pub gender: String,
    pub interests: String,
    pub github_profile: String,
    pub about_me: String,
    pub privacy: String,
    pub email: String,
    pub location: String,
}

/// GET /edit_profile
pub async fn edit_profile_page(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
) -> Result<Response, ApiError> {
    let location = match &user.locationid {
        Some(locationid) => state
            .store()
            .get_location(locationid)
            .await?
            .and_then(|location| location.lat_long),
        None => None,
    };

    let form = EditProfileForm {
        username: user.username.clone(),
        name: user.name.clone().unwrap_or_default(),
        dob: user.dob.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        gender: user.gender.clone().unwrap_or_default(),
        interests: user.interests.clone().unwrap_or_default(),
        github_profile: user.github_profile.clone().unwrap_or_default(),
        about_me: user.about_me.clone().unwrap_or_default(),
        privacy: if user.is_private() { PRIVATE } else { PUBLIC }.to_string(),
        email: user.email.clone(),
        location: location.unwrap_or_default(),
    };

    render_edit(&session, form, FormErrors::default()).await
}

/// POST /edit_profile
pub async fn edit_profile(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
    Form(form): Form<EditProfileForm>,
) -> Result<Response, ApiError> {
    let store = state.store();

    let mut errors = FormErrors::default();
    if validation::required(&mut errors, "username", &form.username) {
        validation::max_length(&mut errors, "username", &form.username, USERNAME_MAX);
    }
    if validation::required(&mut errors, "email", &form.email) {
        validation::email(&mut errors, "email", &form.email);
        validation::max_length(&mut errors, "email", &form.email, EMAIL_MAX);
    }
    let dob = validation::date(&mut errors, "dob", &form.dob);
    validation::one_of(&mut errors, "gender", &form.gender, GENDERS);
    validation::one_of(&mut errors, "privacy", &form.privacy, PRIVACY);

    let username = form.username.trim().to_string();
    let email = form.email.trim().to_string();

    if !errors.has("username")
        && store.username_taken(&username, Some(&user.userid)).await?
    {
        errors.add("username", "Please use a different username.");
    }
    if !errors.has("email") && store.email_taken(&email, Some(&user.userid)).await? {
        errors.add("email", "Please use a different email address.");
    }

    if !errors.is_empty() {
        return render_edit(&session, form, errors).await;
    }

    let mut patch = UserPatch {
        username: Some(username),
        email: Some(email),
        name: non_empty(&form.name).map(ToString::to_string),
        dob,
        gender: non_empty(&form.gender).map(ToString::to_string),
        interests: non_empty(&form.interests).map(ToString::to_string),
        github_profile: non_empty(&form.github_profile).map(ToString::to_string),
        about_me: non_empty(&form.about_me).map(ToString::to_string),
        privacy: non_empty(&form.privacy).map(|p| p == PRIVATE),
        ..Default::default()
    };

    if let Some(lat_long) = non_empty(&form.location) {
        patch.location = Some(match &user.locationid {
            Some(locationid) => LocationChange::Update {
                locationid: locationid.clone(),
                lat_long: lat_long.to_string(),
            },
            None => LocationChange::Create {
                locationid: state.ids().issue(IdKind::Location).await?,
                lat_long: Some(lat_long.to_string()),
            },
        });
    }

    match store.update_user(&user.userid, patch).await {
        Ok(_) => {}
        Err(UserWriteError::DuplicateUsername) => {
            errors.add("username", "Please use a different username.");
            return render_edit(&session, form, errors).await;
        }
        Err(UserWriteError::DuplicateEmail) => {
            errors.add("email", "Please use a different email address.");
            return render_edit(&session, form, errors).await;
        }
        Err(e) => return Err(ApiError::DatabaseError(e.to_string())),
    }

    flash(&session, "Your changes have been saved").await?;
    Ok(Redirect::to("/edit_profile").into_response())
}

async fn render_edit(
    session: &Session,
    form: EditProfileForm,
    errors: FormErrors,
) -> Result<Response, ApiError> {
    render(
        session,
        "edit_profile.html",
        "Edit Profile",
        FormContext { form, errors },
    )
    .await
}
