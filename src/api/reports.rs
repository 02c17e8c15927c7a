use axum::{
    Extension, Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::info;

use super::session::{CurrentUser, flash};
use super::validation::{self, non_empty};
use super::{ApiError, AppState, FormErrors, render};
use crate::constants::limits::MISCONDUCT_DESCRIPTION_MAX;
use crate::models::User;
use crate::services::{IdKind, ReportCase};

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportForm {
    pub cause: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
struct ReportContext {
    user: User,
    cases: Vec<ReportCase>,
    form: ReportForm,
    errors: FormErrors,
}

fn profile_url(username: &str) -> String {
    format!("/profile/{}", urlencoding::encode(username))
}

async fn render_report(
    state: &AppState,
    session: &Session,
    user: User,
    form: ReportForm,
    errors: FormErrors,
) -> Result<Response, ApiError> {
    let cases = state.report_cases().sorted().into_iter().cloned().collect();
    let title = format!("Report {}", user.username);
    render(
        session,
        "report.html",
        title,
        ReportContext {
            user,
            cases,
            form,
            errors,
        },
    )
    .await
}

async fn reported_user(
    state: &AppState,
    session: &Session,
    current: &User,
    username: &str,
) -> Result<Result<User, Response>, ApiError> {
    let user = state
        .store()
        .get_user_by_username(username)
        .await?
        .ok_or_else(|| ApiError::user_not_found(username))?;

    if user.userid == current.userid {
        flash(session, "You cannot report yourself!").await?;
        return Ok(Err(Redirect::to(&profile_url(username)).into_response()));
    }
    Ok(Ok(user))
}

/// GET /report/{username}
pub async fn report_page(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    session: Session,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    let user = match reported_user(&state, &session, &current, &username).await? {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    render_report(&state, &session, user, ReportForm::default(), FormErrors::default()).await
}

/// POST /report/{username}
pub async fn report(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    session: Session,
    Path(username): Path<String>,
    Form(form): Form<ReportForm>,
) -> Result<Response, ApiError> {
    let user = match reported_user(&state, &session, &current, &username).await? {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    let mut errors = FormErrors::default();
    let case = if validation::required(&mut errors, "cause", &form.cause) {
        let case = state.report_cases().get(&form.cause).cloned();
        if case.is_none() {
            errors.add("cause", "Not a valid choice.");
        }
        case
    } else {
        None
    };
    validation::max_length(
        &mut errors,
        "description",
        &form.description,
        MISCONDUCT_DESCRIPTION_MAX,
    );

    let Some(case) = case.filter(|_| errors.is_empty()) else {
        return render_report(&state, &session, user, form, errors).await;
    };

    let causeid = state.ids().issue(IdKind::Misconduct).await?;
    state
        .store()
        .report_misconduct(
            &causeid,
            &current.userid,
            &user.userid,
            &case.case_type,
            non_empty(&form.description),
        )
        .await?;

    info!(
        "User {} reported {} for {}",
        current.username, user.username, case.case_type
    );
    flash(&session, "Thank you, your report has been filed.").await?;
    Ok(Redirect::to(&profile_url(&user.username)).into_response())
}
