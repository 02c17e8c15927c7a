use axum::{
    Extension,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::session::{CurrentUser, flash};
use super::{ApiError, AppState};

fn profile_url(username: &str) -> String {
    format!("/profile/{}", urlencoding::encode(username))
}

/// POST /follow/{username}
pub async fn follow(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    session: Session,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    let Some(user) = state.store().get_user_by_username(&username).await? else {
        flash(&session, format!("User {username} not found.")).await?;
        return Ok(Redirect::to("/index").into_response());
    };

    if user.userid == current.userid {
        flash(&session, "You cannot follow yourself!").await?;
        return Ok(Redirect::to(&profile_url(&username)).into_response());
    }

    state.store().follow(&current.userid, &user.userid).await?;
    flash(&session, format!("You are following {username}!")).await?;
    Ok(Redirect::to(&profile_url(&username)).into_response())
}

/// POST /unfollow/{username}
pub async fn unfollow(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    session: Session,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    let Some(user) = state.store().get_user_by_username(&username).await? else {
        flash(&session, format!("User {username} not found.")).await?;
        return Ok(Redirect::to("/index").into_response());
    };

    if user.userid == current.userid {
        flash(&session, "You cannot unfollow yourself!").await?;
        return Ok(Redirect::to(&profile_url(&username)).into_response());
    }

    state.store().unfollow(&current.userid, &user.userid).await?;
    flash(&session, format!("You are not following {username}.")).await?;
    Ok(Redirect::to(&profile_url(&username)).into_response())
}
