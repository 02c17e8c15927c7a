use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tower_sessions::Session;

use super::{ApiError, session};
use crate::db::PageOf;

/// What a template renderer needs to draw a page.
#[derive(Debug, Serialize)]
pub struct PageView<T> {
    pub template: &'static str,
    pub title: String,
    /// Flash messages queued since the last rendered page
    pub messages: Vec<String>,
    pub context: T,
}

/// Renders `template` with `context`, consuming pending flash messages.
pub async fn render<T: Serialize>(
    session: &Session,
    template: &'static str,
    title: impl Into<String>,
    context: T,
) -> Result<Response, ApiError> {
    let messages = session::take_flashes(session).await?;

    Ok(Json(PageView {
        template,
        title: title.into(),
        messages,
        context,
    })
    .into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
}

impl PageQuery {
    #[must_use]
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }
}

/// Navigation links for a paginated listing.
#[derive(Debug, Serialize)]
pub struct PageLinks {
    pub page: u64,
    pub total_pages: u64,
    pub next_url: Option<String>,
    pub prev_url: Option<String>,
}

impl PageLinks {
    #[must_use]
    pub fn new<T>(page: &PageOf<T>, base: &str) -> Self {
        Self {
            page: page.page,
            total_pages: page.total_pages,
            next_url: page
                .has_next()
                .then(|| format!("{base}?page={}", page.page + 1)),
            prev_url: page
                .has_prev()
                .then(|| format!("{base}?page={}", page.page - 1)),
        }
    }
}

/// Validation messages per form field.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }
}

/// Context of a page that shows a form.
#[derive(Debug, Serialize)]
pub struct FormContext<F> {
    pub form: F,
    pub errors: FormErrors,
}
