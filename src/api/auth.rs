use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::{error, info};

use super::session::{flash, login_user, logout_user, safe_next, session_userid};
use super::validation::{self, non_empty};
use super::{ApiError, AppState, FormContext, FormErrors, render};
use crate::constants::choices::{GENDERS, PRIVACY, PRIVATE};
use crate::constants::limits::{EMAIL_MAX, USERNAME_MAX};
use crate::models::UserPatch;
use crate::services::{AuthError, Registration};

// ============================================================================
// Forms
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub remember_me: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct LoginFormView {
    username: String,
    remember_me: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub name: String,
    pub dob: String,
    pub gender: String,
    pub interests: String,
    pub github_profile: String,
    pub about_me: String,
    pub privacy: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Optional `lat,long` for the location record
    pub location: String,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResetPasswordRequestForm {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordForm {
    pub password: String,
    pub password2: String,
}

// ============================================================================
// Login / logout
// ============================================================================

/// GET /login
pub async fn login_page(session: Session) -> Result<Response, ApiError> {
    if session_userid(&session).await?.is_some() {
        return Ok(Redirect::to("/index").into_response());
    }

    render_login(&session, LoginFormView::default(), FormErrors::default()).await
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    if session_userid(&session).await?.is_some() {
        return Ok(Redirect::to("/index").into_response());
    }

    let mut errors = FormErrors::default();
    validation::required(&mut errors, "username", &form.username);
    validation::required(&mut errors, "password", &form.password);

    let remember_me = form.remember_me.is_some();
    if !errors.is_empty() {
        let view = LoginFormView {
            username: form.username,
            remember_me,
        };
        return render_login(&session, view, errors).await;
    }

    let user = match state.auth().login(form.username.trim(), &form.password).await {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            metrics::counter!("techinder_logins_total", "outcome" => "rejected").increment(1);
            flash(&session, "Invalid username or password").await?;
            return Ok(Redirect::to("/login").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let remember_days = remember_me.then_some(state.config().server.remember_me_days);
    login_user(&session, &user.userid, remember_days).await?;
    metrics::counter!("techinder_logins_total", "outcome" => "accepted").increment(1);
    info!("User {} logged in", user.username);

    let target = safe_next(query.next.as_deref()).unwrap_or("/index");
    Ok(Redirect::to(target).into_response())
}

async fn render_login(
    session: &Session,
    form: LoginFormView,
    errors: FormErrors,
) -> Result<Response, ApiError> {
    render(session, "auth/login.html", "Sign In", FormContext { form, errors }).await
}

/// GET /logout
pub async fn logout(session: Session) -> Result<Response, ApiError> {
    logout_user(&session).await?;
    Ok(Redirect::to("/index").into_response())
}

// ============================================================================
// Registration
// ============================================================================

/// GET /register
pub async fn register_page(session: Session) -> Result<Response, ApiError> {
    if session_userid(&session).await?.is_some() {
        return Ok(Redirect::to("/index").into_response());
    }

    render_register(&session, RegistrationForm::default(), FormErrors::default()).await
}

/// POST /register
pub async fn register(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, ApiError> {
    if session_userid(&session).await?.is_some() {
        return Ok(Redirect::to("/index").into_response());
    }

    let mut errors = FormErrors::default();
    if validation::required(&mut errors, "username", &form.username) {
        validation::max_length(&mut errors, "username", &form.username, USERNAME_MAX);
    }
    validation::required(&mut errors, "name", &form.name);
    let dob = validation::date(&mut errors, "dob", &form.dob);
    if validation::required(&mut errors, "gender", &form.gender) {
        validation::one_of(&mut errors, "gender", &form.gender, GENDERS);
    }
    if validation::required(&mut errors, "privacy", &form.privacy) {
        validation::one_of(&mut errors, "privacy", &form.privacy, PRIVACY);
    }
    if validation::required(&mut errors, "email", &form.email) {
        validation::email(&mut errors, "email", &form.email);
        validation::max_length(&mut errors, "email", &form.email, EMAIL_MAX);
    }
    validation::required(&mut errors, "password", &form.password);

    let username = form.username.trim().to_string();
    let email = form.email.trim().to_string();

    if !errors.has("username") && state.store().username_taken(&username, None).await? {
        errors.add("username", AuthError::DuplicateUsername.to_string());
    }
    if !errors.has("email") && state.store().email_taken(&email, None).await? {
        errors.add("email", AuthError::DuplicateEmail.to_string());
    }

    if !errors.is_empty() {
        return render_register(&session, form, errors).await;
    }

    let registration = Registration {
        username,
        email,
        password: form.password.clone(),
        details: UserPatch {
            name: non_empty(&form.name).map(ToString::to_string),
            dob,
            gender: non_empty(&form.gender).map(ToString::to_string),
            interests: non_empty(&form.interests).map(ToString::to_string),
            github_profile: non_empty(&form.github_profile).map(ToString::to_string),
            about_me: non_empty(&form.about_me).map(ToString::to_string),
            privacy: Some(form.privacy.trim() == PRIVATE),
            ..Default::default()
        },
        lat_long: non_empty(&form.location).map(ToString::to_string),
    };

    match state.auth().register(registration).await {
        Ok(_) => {}
        Err(AuthError::DuplicateUsername) => {
            errors.add("username", AuthError::DuplicateUsername.to_string());
            return render_register(&session, form, errors).await;
        }
        Err(AuthError::DuplicateEmail) => {
            errors.add("email", AuthError::DuplicateEmail.to_string());
            return render_register(&session, form, errors).await;
        }
        Err(e) => return Err(e.into()),
    }

    metrics::counter!("techinder_registrations_total").increment(1);
    flash(&session, "Congratulations, you are now a registered user!").await?;
    Ok(Redirect::to("/login").into_response())
}

async fn render_register(
    session: &Session,
    form: RegistrationForm,
    errors: FormErrors,
) -> Result<Response, ApiError> {
    render(session, "auth/register.html", "Register", FormContext { form, errors }).await
}

// ============================================================================
// Password reset
// ============================================================================

/// GET /reset_password_request
pub async fn reset_password_request_page(session: Session) -> Result<Response, ApiError> {
    if session_userid(&session).await?.is_some() {
        return Ok(Redirect::to("/index").into_response());
    }

    render_reset_request(&session, ResetPasswordRequestForm::default(), FormErrors::default())
        .await
}

/// POST /reset_password_request
pub async fn reset_password_request(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<ResetPasswordRequestForm>,
) -> Result<Response, ApiError> {
    if session_userid(&session).await?.is_some() {
        return Ok(Redirect::to("/index").into_response());
    }

    let mut errors = FormErrors::default();
    if validation::required(&mut errors, "email", &form.email) {
        validation::email(&mut errors, "email", &form.email);
    }
    if !errors.is_empty() {
        return render_reset_request(&session, form, errors).await;
    }

    // The response is the same whether or not the address is known.
    if let Err(e) = state.auth().request_password_reset(form.email.trim()).await {
        error!("Password reset request failed: {}", e);
    }

    flash(
        &session,
        "Check your email for the instructions to reset your password",
    )
    .await?;
    Ok(Redirect::to("/login").into_response())
}

async fn render_reset_request(
    session: &Session,
    form: ResetPasswordRequestForm,
    errors: FormErrors,
) -> Result<Response, ApiError> {
    render(
        session,
        "auth/reset_password_request.html",
        "Reset Password",
        FormContext { form, errors },
    )
    .await
}

/// GET /reset_password/{token}
pub async fn reset_password_page(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    if session_userid(&session).await?.is_some() {
        return Ok(Redirect::to("/index").into_response());
    }
    if state.auth().verify_reset_token(&token).await?.is_none() {
        return Ok(Redirect::to("/index").into_response());
    }

    render_reset(&session, FormErrors::default()).await
}

/// POST /reset_password/{token}
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(token): Path<String>,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response, ApiError> {
    if session_userid(&session).await?.is_some() {
        return Ok(Redirect::to("/index").into_response());
    }
    if state.auth().verify_reset_token(&token).await?.is_none() {
        return Ok(Redirect::to("/index").into_response());
    }

    let mut errors = FormErrors::default();
    validation::required(&mut errors, "password", &form.password);
    if validation::required(&mut errors, "password2", &form.password2)
        && form.password != form.password2
    {
        errors.add("password2", "Field must be equal to password.");
    }
    if !errors.is_empty() {
        return render_reset(&session, errors).await;
    }

    match state.auth().reset_password(&token, &form.password).await {
        Ok(_) => {}
        Err(AuthError::InvalidToken) => return Ok(Redirect::to("/index").into_response()),
        Err(e) => return Err(e.into()),
    }

    flash(&session, "Your password has been reset.").await?;
    Ok(Redirect::to("/login").into_response())
}

#[derive(Serialize)]
struct EmptyForm {}

async fn render_reset(session: &Session, errors: FormErrors) -> Result<Response, ApiError> {
    render(
        session,
        "auth/reset_password.html",
        "Reset Password",
        FormContext {
            form: EmptyForm {},
            errors,
        },
    )
    .await
}
