use axum::{
    Extension, Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::session::CurrentUser;
use super::validation;
use super::{ApiError, AppState, FormErrors, PageLinks, PageQuery, render};
use crate::constants::limits::MESSAGE_MAX;
use crate::models::{ChannelMessage, Project, User};
use crate::services::IdKind;

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MessageForm {
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChannelContext {
    project: Project,
    messages: Vec<ChannelMessage>,
    pagination: PageLinks,
    can_post: bool,
    form: MessageForm,
    errors: FormErrors,
}

async fn load_channel(state: &AppState, channel: &str) -> Result<Project, ApiError> {
    state
        .store()
        .get_project_by_channel(channel)
        .await?
        .ok_or_else(|| ApiError::not_found("Channel", channel))
}

/// The author and accepted members may post.
async fn can_post(state: &AppState, user: &User, project: &Project) -> Result<bool, ApiError> {
    if project.userid == user.userid {
        return Ok(true);
    }
    Ok(state.store().is_member(&user.userid, &project.projectid).await?)
}

async fn render_channel(
    state: &AppState,
    session: &Session,
    user: &User,
    project: Project,
    page: u64,
    form: MessageForm,
    errors: FormErrors,
) -> Result<Response, ApiError> {
    let channel = project.channel.clone().unwrap_or_default();
    let per_page = state.config().pagination.messages_per_page;
    let messages = state
        .store()
        .channel_messages(&channel, page, per_page)
        .await?;

    let context = ChannelContext {
        can_post: can_post(state, user, &project).await?,
        pagination: PageLinks::new(&messages, &format!("/channel/{channel}")),
        messages: messages.items,
        project,
        form,
        errors,
    };

    let title = context.project.name.clone();
    render(session, "channel.html", title, context).await
}

/// GET /channel/{channel}
pub async fn channel(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
    Path(channel): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let project = load_channel(&state, &channel).await?;
    render_channel(
        &state,
        &session,
        &user,
        project,
        query.page(),
        MessageForm::default(),
        FormErrors::default(),
    )
    .await
}

/// POST /channel/{channel}
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
    Path(channel): Path<String>,
    Form(form): Form<MessageForm>,
) -> Result<Response, ApiError> {
    let project = load_channel(&state, &channel).await?;
    if !can_post(&state, &user, &project).await? {
        return Err(ApiError::forbidden(
            "Only the author and members can post in this channel",
        ));
    }

    let mut errors = FormErrors::default();
    if validation::required(&mut errors, "content", &form.content) {
        validation::max_length(&mut errors, "content", &form.content, MESSAGE_MAX);
    }
    if !errors.is_empty() {
        return render_channel(&state, &session, &user, project, 1, form, errors).await;
    }

    let messageid = state.ids().issue(IdKind::Message).await?;
    state
        .store()
        .post_message(&messageid, &user.userid, &channel, form.content.trim())
        .await?;

    Ok(Redirect::to(&format!("/channel/{channel}")).into_response())
}
