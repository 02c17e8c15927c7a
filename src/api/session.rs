use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tower_sessions::{Expiry, Session};

use super::{ApiError, AppState};
use crate::constants::session::{FLASHES_KEY, USER_KEY};
use crate::models::User;

/// The logged-in user, placed in request extensions by [`require_login`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

pub async fn flash(session: &Session, message: impl Into<String>) -> Result<(), ApiError> {
    let mut messages: Vec<String> = session.get(FLASHES_KEY).await?.unwrap_or_default();
    messages.push(message.into());
    session.insert(FLASHES_KEY, messages).await?;
    Ok(())
}

pub async fn take_flashes(session: &Session) -> Result<Vec<String>, ApiError> {
    Ok(session
        .remove::<Vec<String>>(FLASHES_KEY)
        .await?
        .unwrap_or_default())
}

pub async fn session_userid(session: &Session) -> Result<Option<String>, ApiError> {
    Ok(session.get::<String>(USER_KEY).await?)
}

/// Stores `userid` in a fresh session. `remember_days` extends the session
/// past the inactivity timeout.
pub async fn login_user(
    session: &Session,
    userid: &str,
    remember_days: Option<i64>,
) -> Result<(), ApiError> {
    session.cycle_id().await?;
    session.insert(USER_KEY, userid).await?;

    if let Some(days) = remember_days {
        let until = time::OffsetDateTime::now_utc() + time::Duration::days(days);
        session.set_expiry(Some(Expiry::AtDateTime(until)));
    }
    Ok(())
}

pub async fn logout_user(session: &Session) -> Result<(), ApiError> {
    session.remove::<String>(USER_KEY).await?;
    session.set_expiry(None);
    Ok(())
}

/// `next` is only followed when it stays on this site.
#[must_use]
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

/// Redirects anonymous requests to the login page and records activity of
/// logged-in users.
pub async fn require_login(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = match session_userid(&session).await? {
        Some(userid) => state.store().get_user(&userid).await?,
        None => None,
    };

    let Some(user) = user else {
        let target = request
            .uri()
            .path_and_query()
            .map_or_else(|| request.uri().path().to_string(), ToString::to_string);
        let location = format!("/login?next={}", urlencoding::encode(&target));
        flash(&session, "Please log in to access this page.").await?;
        return Ok(Redirect::to(&location).into_response());
    };

    state.store().touch_last_seen(&user.userid).await?;
    tracing::Span::current().record("user_id", user.userid.as_str());

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/explore?page=2")), Some("/explore?page=2"));
        assert_eq!(safe_next(Some("https://evil.example")), None);
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("/\\evil.example")), None);
        assert_eq!(safe_next(None), None);
    }
}
