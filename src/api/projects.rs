use axum::{
    Extension, Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::info;

use super::session::{CurrentUser, flash, safe_next};
use super::validation::{self, non_empty};
use super::{ApiError, AppState, FormContext, FormErrors, PageLinks, PageQuery, render};
use crate::constants::defaults;
use crate::constants::limits::{
    APPLICATION_BODY_MAX, PROJECT_DESCRIPTION_MAX, PROJECT_FIELDS_MAX,
};
use crate::db::{AcceptOutcome, PageOf, ProjectWriteError};
use crate::models::{Application, NewProject, Project, ProjectPatch, User};
use crate::services::ids::split_token;
use crate::services::IdKind;

#[derive(Debug, Serialize)]
struct ProjectListContext {
    projects: Vec<Project>,
    pagination: PageLinks,
}

fn list_context(page: PageOf<Project>, base: &str) -> ProjectListContext {
    let pagination = PageLinks::new(&page, base);
    ProjectListContext {
        projects: page.items,
        pagination,
    }
}

/// GET /, /index, /home
pub async fn index(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let per_page = state.config().pagination.projects_per_page;
    let page = state
        .store()
        .followed_projects_page(&user.userid, query.page(), per_page)
        .await?;

    render(&session, "index.html", "Home Page", list_context(page, "/index")).await
}

/// GET /explore
pub async fn explore(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let per_page = state.config().pagination.projects_per_page;
    let page = state.store().explore_page(query.page(), per_page).await?;

    render(&session, "index.html", "Explore", list_context(page, "/explore")).await
}

#[derive(Debug, Serialize)]
struct MyProjectsContext {
    user: User,
    projects: Vec<Project>,
}

/// GET /my_projects/{username}
pub async fn my_projects(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    let user = state
        .store()
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::user_not_found(&username))?;
    let projects = state.store().projects_for_user(&user.userid).await?;

    let title = format!("{}'s projects", user.username);
    render(
        &session,
        "user/my_projects.html",
        title,
        MyProjectsContext { user, projects },
    )
    .await
}

// ============================================================================
// Project creation
// ============================================================================

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NewProjectForm {
    pub name: String,
    pub fields: String,
    pub members_required: String,
    pub members: String,
    pub member_list: String,
    pub project_description: String,
    pub channel: String,
}

/// GET /create_project/{username}
pub async fn create_project_page(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    session: Session,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    if let Some(redirect) = redirect_to_own_create_page(&state, &current, &username).await? {
        return Ok(redirect);
    }

    let form = NewProjectForm {
        name: defaults::PROJECT_NAME.to_string(),
        members: "0".to_string(),
        member_list: defaults::MEMBER_LIST.to_string(),
        channel: state.ids().sample(IdKind::Channel).await?,
        ..Default::default()
    };

    render_new_project(&session, form, FormErrors::default()).await
}

/// POST /create_project/{username}
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    session: Session,
    Path(username): Path<String>,
    Form(form): Form<NewProjectForm>,
) -> Result<Response, ApiError> {
    if let Some(redirect) = redirect_to_own_create_page(&state, &current, &username).await? {
        return Ok(redirect);
    }

    let mut errors = FormErrors::default();
    validation::required(&mut errors, "name", &form.name);
    if validation::required(&mut errors, "fields", &form.fields) {
        validation::max_length(&mut errors, "fields", &form.fields, PROJECT_FIELDS_MAX);
    }
    let members_required =
        if validation::required(&mut errors, "members_required", &form.members_required) {
            validation::integer(&mut errors, "members_required", &form.members_required)
        } else {
            None
        };
    let members = validation::integer(&mut errors, "members", &form.members);
    if validation::required(&mut errors, "project_description", &form.project_description) {
        validation::max_length(
            &mut errors,
            "project_description",
            &form.project_description,
            PROJECT_DESCRIPTION_MAX,
        );
    }

    let channel = non_empty(&form.channel).map(ToString::to_string);
    if let Some(channel) = &channel {
        if split_token(channel).is_none_or(|(prefix, _)| prefix != IdKind::Channel.prefix()) {
            errors.add("channel", "Not a valid channel id.");
        } else if state.store().channel_taken(channel).await? {
            errors.add("channel", "Please use a different channel.");
        }
    }

    if !errors.is_empty() {
        return render_new_project(&session, form, errors).await;
    }

    let channel = match channel {
        Some(channel) => {
            if !state.ids().record(&channel).await? {
                errors.add("channel", "Please use a different channel.");
                return render_new_project(&session, form, errors).await;
            }
            channel
        }
        None => state.ids().issue(IdKind::Channel).await?,
    };

    let new_project = NewProject {
        projectid: state.ids().issue(IdKind::Project).await?,
        userid: current.userid.clone(),
        name: form.name.trim().to_string(),
        fields: form.fields.trim().to_string(),
        details: ProjectPatch {
            members_required,
            members: Some(members.unwrap_or(0)),
            member_list: Some(
                non_empty(&form.member_list)
                    .unwrap_or(defaults::MEMBER_LIST)
                    .to_string(),
            ),
            project_description: non_empty(&form.project_description).map(ToString::to_string),
            channel: Some(channel),
            ..Default::default()
        },
        timestamp: None,
    };

    let project = match state.store().create_project(new_project).await {
        Ok(project) => project,
        Err(ProjectWriteError::DuplicateChannel) => {
            errors.add("channel", "Please use a different channel.");
            return render_new_project(&session, form, errors).await;
        }
        Err(e) => return Err(ApiError::DatabaseError(e.to_string())),
    };

    info!("User {} created project {}", current.username, project.projectid);
    flash(&session, "Congratulations, your New Project has been created!").await?;
    Ok(Redirect::to(&format!("/my_projects/{}", current.username)).into_response())
}

/// Projects are always authored by the logged-in user; another user's
/// creation page sends them to their own.
async fn redirect_to_own_create_page(
    state: &AppState,
    current: &User,
    username: &str,
) -> Result<Option<Response>, ApiError> {
    let user = state
        .store()
        .get_user_by_username(username)
        .await?
        .ok_or_else(|| ApiError::user_not_found(username))?;

    if user.userid == current.userid {
        return Ok(None);
    }

    let own = format!("/create_project/{}", urlencoding::encode(&current.username));
    Ok(Some(Redirect::to(&own).into_response()))
}

async fn render_new_project(
    session: &Session,
    form: NewProjectForm,
    errors: FormErrors,
) -> Result<Response, ApiError> {
    render(
        session,
        "user/new_project.html",
        "New Project",
        FormContext { form, errors },
    )
    .await
}

// ============================================================================
// Applications
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApplyForm {
    pub body: String,
}

async fn load_project(state: &AppState, projectid: &str) -> Result<Project, ApiError> {
    state
        .store()
        .get_project(projectid)
        .await?
        .ok_or_else(|| ApiError::not_found("Project", projectid))
}

async fn author_profile_url(state: &AppState, project: &Project) -> Result<String, ApiError> {
    let author = state
        .store()
        .get_user(&project.userid)
        .await?
        .ok_or_else(|| ApiError::internal(format!("Author of {} is missing", project.projectid)))?;

    Ok(format!("/profile/{}", urlencoding::encode(&author.username)))
}

/// POST /project/{projectid}/apply
pub async fn apply(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    session: Session,
    Path(projectid): Path<String>,
    Form(form): Form<ApplyForm>,
) -> Result<Response, ApiError> {
    let project = load_project(&state, &projectid).await?;
    let back = author_profile_url(&state, &project).await?;
    let store = state.store();

    if project.userid == current.userid {
        flash(&session, "You cannot apply to your own project!").await?;
        return Ok(Redirect::to(&back).into_response());
    }
    if store.has_applied(&current.userid, &project.projectid).await? {
        flash(&session, "You have already applied to this project.").await?;
        return Ok(Redirect::to(&back).into_response());
    }
    if project.is_full() {
        flash(&session, "This project is not looking for members.").await?;
        return Ok(Redirect::to(&back).into_response());
    }

    let mut errors = FormErrors::default();
    validation::max_length(&mut errors, "body", &form.body, APPLICATION_BODY_MAX);
    if let Some(message) = errors.get("body").first() {
        flash(&session, message.clone()).await?;
        return Ok(Redirect::to(&back).into_response());
    }

    let appliedid = state.ids().issue(IdKind::Application).await?;
    let applied = store
        .apply_to_project(
            &appliedid,
            &current.userid,
            &project.projectid,
            non_empty(&form.body),
        )
        .await?;
    if !applied {
        flash(&session, "You have already applied to this project.").await?;
        return Ok(Redirect::to(&back).into_response());
    }

    flash(&session, format!("You applied to {}!", project.name)).await?;
    Ok(Redirect::to(&back).into_response())
}

#[derive(Debug, Serialize)]
struct ApplicationsContext {
    project: Project,
    applications: Vec<Application>,
}

/// GET /project/{projectid}/applications
pub async fn applications(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    session: Session,
    Path(projectid): Path<String>,
) -> Result<Response, ApiError> {
    let project = load_project(&state, &projectid).await?;
    if project.userid != current.userid {
        return Err(ApiError::forbidden(
            "Only the project author can see its applications",
        ));
    }

    let applications = state
        .store()
        .applications_for_project(&project.projectid)
        .await?;

    let title = format!("Applications to {}", project.name);
    render(
        &session,
        "user/applications.html",
        title,
        ApplicationsContext {
            project,
            applications,
        },
    )
    .await
}

/// POST /applications/{appliedid}/accept
pub async fn accept_application(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    session: Session,
    Path(appliedid): Path<String>,
) -> Result<Response, ApiError> {
    let store = state.store();
    let application = store
        .get_application(&appliedid)
        .await?
        .ok_or_else(|| ApiError::not_found("Application", &appliedid))?;
    let project = load_project(&state, &application.projectid).await?;

    if project.userid != current.userid {
        return Err(ApiError::forbidden(
            "Only the project author can accept applications",
        ));
    }

    match store.accept_application(&appliedid).await? {
        AcceptOutcome::Accepted => {
            flash(&session, "The applicant is now a member of your project!").await?;
        }
        AcceptOutcome::AlreadyAccepted => {
            flash(&session, "This application was already accepted.").await?;
        }
        AcceptOutcome::NotFound => {
            return Err(ApiError::not_found("Application", &appliedid));
        }
    }

    let back = format!("/project/{}/applications", project.projectid);
    Ok(Redirect::to(&back).into_response())
}

// ============================================================================
// Likes
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LikeForm {
    pub next: Option<String>,
}

/// Likes a project the user never liked, otherwise flips the existing like.
/// A like id is only issued for the first like.
async fn toggle(state: &AppState, userid: &str, projectid: &str) -> Result<bool, ApiError> {
    let store = state.store();
    if let Some(liked) = store.flip_like(userid, projectid).await? {
        return Ok(liked);
    }

    let likeid = state.ids().issue(IdKind::Like).await?;
    if store.insert_like(&likeid, userid, projectid).await? {
        return Ok(true);
    }

    // A concurrent request inserted the first like in the meantime.
    Ok(store.flip_like(userid, projectid).await?.unwrap_or(true))
}

/// POST /project/{projectid}/like
pub async fn toggle_like(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    session: Session,
    Path(projectid): Path<String>,
    Form(form): Form<LikeForm>,
) -> Result<Response, ApiError> {
    let project = load_project(&state, &projectid).await?;

    let liked = toggle(&state, &current.userid, &project.projectid).await?;

    let message = if liked {
        format!("You liked {}!", project.name)
    } else {
        format!("You no longer like {}.", project.name)
    };
    flash(&session, message).await?;

    let target = safe_next(form.next.as_deref()).unwrap_or("/explore");
    Ok(Redirect::to(target).into_response())
}
