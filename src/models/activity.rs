use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::Serialize;

/// Application row joined with the applicant's username.
#[derive(Debug, Clone, Serialize, FromQueryResult)]
pub struct Application {
    pub appliedid: String,
    pub userid: String,
    pub username: String,
    pub projectid: String,
    pub body: Option<String>,
    pub accepted: bool,
    pub timestamp: DateTime<Utc>,
}

/// Channel message joined with the author's username.
#[derive(Debug, Clone, Serialize, FromQueryResult)]
pub struct ChannelMessage {
    pub messageid: String,
    pub userid: String,
    pub username: String,
    pub channel: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MisconductReport {
    pub causeid: String,
    pub userid: String,
    pub misconduct_userid: String,
    pub cause: String,
    pub block: bool,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<crate::entities::misconduct::Model> for MisconductReport {
    fn from(model: crate::entities::misconduct::Model) -> Self {
        Self {
            causeid: model.causeid,
            userid: model.userid,
            misconduct_userid: model.misconduct_userid,
            cause: model.cause,
            block: model.block,
            description: model.description,
            timestamp: model.timestamp,
        }
    }
}
